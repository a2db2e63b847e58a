use super::{EntityEffect, EntitySnapshot};
use crate::context::TickContext;
use crate::particles::{Particle, ParticleKind};
use glam::{DMat3, DVec3, Vec4};
use mdambient_core::EntityId;
use mdambient_physics::{BlockMode, BlockRayTrace, FluidMode};
use mdambient_world::BlockPos;
use rand::Rng;

const BUBBLE_INTERVAL: u64 = 3;
const DROWNING_BURST: usize = 8;
const BREATH_ALPHA: f32 = 0.2;

/// Visible breath: bubbles under water, frost puffs in cold air.
#[derive(Debug, Clone)]
pub struct BreathEffect {
    seed: u64,
}

impl BreathEffect {
    pub const NAME: &'static str = "breath";

    pub fn new(entity: EntityId) -> Self {
        let hash = blake3::hash(&entity.0.to_le_bytes());
        let bytes = hash.as_bytes();
        let seed = u64::from(u16::from_le_bytes([bytes[0], bytes[1]]));
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    fn is_visible(entity: &EntitySnapshot, ctx: &TickContext<'_>) -> bool {
        if ctx.is_local(entity.id) {
            return !entity.spectator;
        }
        if entity.invisible {
            return false;
        }
        let sight = BlockRayTrace::between(
            ctx.world,
            ctx.viewer.eye,
            entity.eye_position(),
            BlockMode::Collider,
            FluidMode::None,
        );
        !sight.trace().is_hit()
    }
}

fn breath_origin(entity: &EntitySnapshot) -> DVec3 {
    let mut eye = entity.eye_position();
    if entity.sneaking {
        eye.y -= 0.25;
    }
    eye.y -= if entity.child { 0.1 } else { 0.2 };
    eye + entity.look * if entity.child { 0.25 } else { 0.5 }
}

fn look_trajectory<R: Rng + ?Sized>(entity: &EntitySnapshot, rng: &mut R) -> DVec3 {
    let yaw = DMat3::from_rotation_y(f64::from(rng.gen::<f32>()) * 2.0);
    let pitch = DMat3::from_rotation_x(-f64::from(rng.gen::<f32>()) * 2.0);
    (pitch * (yaw * entity.look)).normalize_or_zero()
}

fn size_factor(entity: &EntitySnapshot) -> f32 {
    if entity.child {
        0.125
    } else {
        0.25
    }
}

fn bubble(entity: &EntitySnapshot, drowning: bool, ctx: &mut TickContext<'_>) {
    let t = look_trajectory(entity, ctx.rng);
    let factor = if drowning { 0.02 } else { 0.005 };
    let velocity = DVec3::new(t.x * factor, t.y * 0.002, t.z * factor);
    let scale = (ctx.rng.gen::<f32>() * 0.6 + 0.2) * size_factor(entity);
    ctx.spawn(
        Particle::new(ParticleKind::Bubble, breath_origin(entity), velocity)
            .with_scale(scale)
            .with_color(Vec4::new(1.0, 1.0, 1.0, BREATH_ALPHA)),
    );
}

fn frost(entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
    let t = look_trajectory(entity, ctx.rng);
    let gray = 1.0 - ctx.rng.gen::<f32>() * 0.3;
    ctx.spawn(
        Particle::new(ParticleKind::FrostBreath, breath_origin(entity), t * 0.01)
            .with_scale(1.875 * size_factor(entity))
            .with_color(Vec4::new(gray, gray, gray, BREATH_ALPHA)),
    );
}

impl EntityEffect for BreathEffect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
        if !Self::is_visible(entity, ctx) {
            return;
        }
        let c = ctx.tick.0.wrapping_add(self.seed);
        let head = BlockPos::containing(entity.eye_position());
        if !ctx.world.fluid(head).is_empty() {
            if entity.air > 0 {
                if c % BUBBLE_INTERVAL == 0 {
                    bubble(entity, false, ctx);
                }
            } else if entity.air == 0 {
                for _ in 0..DROWNING_BURST {
                    bubble(entity, true, ctx);
                }
            }
        } else if (c / 10) % 8 < 3 && ctx.world.is_air(head) && ctx.world.is_cold(head) {
            frost(entity, ctx);
        }
    }

    fn describe(&self) -> String {
        format!("{} (seed {})", Self::NAME, self.seed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Viewer;
    use crate::particles::ParticleBatch;
    use crate::EffectsConfig;
    use mdambient_audio::AudioEngine;
    use mdambient_core::{ConditionFlags, RegistryKey, SimTick};
    use mdambient_world::{SparseWorld, BLOCK_STONE, BLOCK_WATER};
    use rand::{rngs::StdRng, SeedableRng};

    struct Harness {
        world: SparseWorld,
        audio: AudioEngine,
        particles: ParticleBatch,
        rng: StdRng,
        config: EffectsConfig,
        flags: ConditionFlags,
    }

    impl Harness {
        fn new(world: SparseWorld) -> Self {
            Self {
                world,
                audio: AudioEngine::simulated(3),
                particles: ParticleBatch::new(),
                rng: StdRng::seed_from_u64(9),
                config: EffectsConfig::default(),
                flags: ConditionFlags::new(),
            }
        }

        fn run(&mut self, effect: &mut BreathEffect, entity: &EntitySnapshot, viewer: Viewer, ticks: u64) {
            for t in 0..ticks {
                let mut ctx = TickContext {
                    tick: SimTick(t),
                    world: &self.world,
                    audio: &mut self.audio,
                    particles: &mut self.particles,
                    rng: &mut self.rng,
                    config: &self.config,
                    flags: &self.flags,
                    viewer,
                };
                effect.update(entity, &mut ctx);
            }
        }
    }

    fn zombie(pos: DVec3) -> EntitySnapshot {
        EntitySnapshot::new(EntityId(42), RegistryKey::minecraft("zombie"), pos)
    }

    #[test]
    fn seed_is_stable_per_entity() {
        assert_eq!(BreathEffect::new(EntityId(5)).seed(), BreathEffect::new(EntityId(5)).seed());
        assert!(BreathEffect::new(EntityId(5)).seed() <= 0xFFFF);
    }

    #[test]
    fn submerged_entity_bubbles_every_third_tick_and_bursts_when_drowning() {
        let mut world = SparseWorld::new();
        world.fill(BlockPos { x: -2, y: 60, z: -2 }, BlockPos { x: 6, y: 70, z: 6 }, BLOCK_WATER);
        let mut harness = Harness::new(world);
        let mut effect = BreathEffect::new(EntityId(42));
        let entity = zombie(DVec3::new(0.5, 64.0, 0.5));
        let viewer = Viewer::at(DVec3::new(3.5, 64.0, 0.5));

        harness.run(&mut effect, &entity, viewer, 30);
        assert_eq!(harness.particles.count(ParticleKind::Bubble), 10);

        harness.particles.clear();
        let mut drowning = entity.clone();
        drowning.air = 0;
        harness.run(&mut effect, &drowning, viewer, 1);
        assert_eq!(harness.particles.count(ParticleKind::Bubble), DROWNING_BURST);
    }

    #[test]
    fn frost_needs_cold_air_and_line_of_sight() {
        let mut world = SparseWorld::new();
        world.set_temperature(-0.5);
        let mut harness = Harness::new(world);
        let mut effect = BreathEffect::new(EntityId(42));
        let entity = zombie(DVec3::new(0.5, 64.0, 0.5));
        let viewer = Viewer::at(DVec3::new(4.5, 64.0, 0.5));

        harness.run(&mut effect, &entity, viewer, 80);
        // 3 of every 8 ten-tick windows.
        assert_eq!(harness.particles.count(ParticleKind::FrostBreath), 30);

        harness.particles.clear();
        harness.world.fill(BlockPos { x: 2, y: 60, z: -2 }, BlockPos { x: 2, y: 70, z: 2 }, BLOCK_STONE);
        harness.run(&mut effect, &entity, viewer, 80);
        assert!(harness.particles.is_empty());
    }
}
