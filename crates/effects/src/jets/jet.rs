//! Position-anchored particle emitters.

use super::block_effect::{splash_source_valid, steam_source_valid, MAX_STRENGTH};
use super::JetAcoustics;
use crate::context::TickContext;
use crate::particles::{Particle, ParticleKind};
use glam::DVec3;
use mdambient_audio::{in_range, AcousticEvent, AudioEngine, PlayTarget, SoundHandle, SoundInstance};
use mdambient_world::BlockPos;
use rand::Rng;
use std::f64::consts::TAU;
use std::fmt;

/// Ticks between particle spawns unless a kind overrides it.
pub const DEFAULT_UPDATE_FREQUENCY: u32 = 3;

/// Waterfall loop index (`waterfall/N`) by splash strength.
const WATERFALL_INDEX: [usize; MAX_STRENGTH as usize + 1] = [0, 0, 1, 1, 2, 3, 3, 4, 4, 5, 5];

/// Lifecycle of an emitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JetState {
    Alive,
    /// Death observed; owned sounds are being stopped.
    Dying,
    Dead,
}

/// Kind-specific emitter data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum JetKind {
    /// Flames or lava droplets rising from a hot surface.
    Fire { lava: bool, solid: bool },
    /// Steam cloud above water next to something hot.
    Steam,
    /// Bubble column in water.
    Bubble,
    /// Grains trickling from an unsupported block.
    Dust,
    /// Lava drops thrown upward.
    Fountain,
    /// Spray at the foot of a waterfall.
    WaterSplash { spray_y: f64, spray_limit: u32 },
}

impl JetKind {
    pub const fn name(&self) -> &'static str {
        match self {
            JetKind::Fire { .. } => "fire",
            JetKind::Steam => "steam",
            JetKind::Bubble => "bubble",
            JetKind::Dust => "dust",
            JetKind::Fountain => "fountain",
            JetKind::WaterSplash { .. } => "water_splash",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct LoopingSound {
    template: Option<SoundInstance>,
    handle: Option<SoundHandle>,
}

/// Standard normal sample (Box-Muller).
pub(crate) fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (TAU * u2).cos()
}

fn random_max_age<R: Rng + ?Sized>(strength: u32, rng: &mut R) -> u32 {
    (rng.gen_range(0..strength) + 2) * 20
}

/// A short-lived emitter anchored to one voxel.
///
/// Each tick an alive jet first checks its death condition. A dying jet stops
/// any sound it owns and is never ticked again. Otherwise it spawns particles
/// every `update_frequency` ticks, ages by one and runs its sound update.
#[derive(Debug, Clone, PartialEq)]
pub struct Jet {
    kind: JetKind,
    pos: BlockPos,
    origin: DVec3,
    strength: u32,
    update_frequency: u32,
    max_age: Option<u32>,
    age: u32,
    state: JetState,
    sound_fired: bool,
    looping: Option<LoopingSound>,
}

impl Jet {
    fn with_kind<R: Rng + ?Sized>(
        kind: JetKind,
        origin: DVec3,
        strength: u32,
        update_frequency: u32,
        rng: &mut R,
    ) -> Self {
        let strength = strength.max(1);
        Self {
            kind,
            pos: BlockPos::containing(origin),
            origin,
            strength,
            update_frequency: update_frequency.max(1),
            max_age: Some(random_max_age(strength, rng)),
            age: 0,
            state: JetState::Alive,
            sound_fired: false,
            looping: None,
        }
    }

    /// Fire jet. `solid` jets burn on top of a block and jitter sideways;
    /// fluid jets have a one in three chance of throwing lava instead.
    pub fn fire<R: Rng + ?Sized>(origin: DVec3, strength: u32, solid: bool, rng: &mut R) -> Self {
        let lava = !solid && rng.gen_range(0..3) == 0;
        Self::with_kind(
            JetKind::Fire { lava, solid },
            origin,
            strength,
            DEFAULT_UPDATE_FREQUENCY,
            rng,
        )
    }

    pub fn steam<R: Rng + ?Sized>(origin: DVec3, strength: u32, rng: &mut R) -> Self {
        Self::with_kind(JetKind::Steam, origin, strength, DEFAULT_UPDATE_FREQUENCY, rng)
    }

    pub fn bubble<R: Rng + ?Sized>(origin: DVec3, strength: u32, rng: &mut R) -> Self {
        Self::with_kind(JetKind::Bubble, origin, strength, DEFAULT_UPDATE_FREQUENCY, rng)
    }

    pub fn dust<R: Rng + ?Sized>(origin: DVec3, rng: &mut R) -> Self {
        Self::with_kind(JetKind::Dust, origin, 2, 2, rng)
    }

    pub fn fountain<R: Rng + ?Sized>(origin: DVec3, rng: &mut R) -> Self {
        Self::with_kind(JetKind::Fountain, origin, 5, 1, rng)
    }

    /// Splash at the foot of a waterfall. Lives until the waterfall goes
    /// away; `spray_y` is the absolute height the spray starts from.
    pub fn water_splash(pos: BlockPos, strength: u32, spray_y: f64) -> Self {
        let strength = strength.max(1);
        let spray_limit = ((strength as f32 * 2.5) as u32).clamp(5, 20);
        Self {
            kind: JetKind::WaterSplash {
                spray_y,
                spray_limit,
            },
            pos,
            origin: pos.center(),
            strength,
            update_frequency: 4,
            max_age: None,
            age: 0,
            state: JetState::Alive,
            sound_fired: false,
            looping: None,
        }
    }

    /// Re-anchor the jet to another voxel key.
    pub fn with_key(mut self, pos: BlockPos) -> Self {
        self.pos = pos;
        self
    }

    pub fn kind(&self) -> JetKind {
        self.kind
    }

    /// Voxel the jet is keyed by.
    pub fn pos(&self) -> BlockPos {
        self.pos
    }

    /// Point particles are emitted from.
    pub fn origin(&self) -> DVec3 {
        self.origin
    }

    pub fn strength(&self) -> u32 {
        self.strength
    }

    pub fn update_frequency(&self) -> u32 {
        self.update_frequency
    }

    /// Age limit; `None` for jets that only die when their source goes away.
    pub fn max_age(&self) -> Option<u32> {
        self.max_age
    }

    pub fn age(&self) -> u32 {
        self.age
    }

    pub fn state(&self) -> JetState {
        self.state
    }

    pub fn is_alive(&self) -> bool {
        self.state == JetState::Alive
    }

    /// Handle of the looping sound, while one is submitted.
    pub fn loop_handle(&self) -> Option<SoundHandle> {
        self.looping.as_ref().and_then(|l| l.handle)
    }

    fn aged_out(&self) -> bool {
        self.max_age.is_some_and(|max| self.age >= max)
    }

    /// Death condition, evaluated at the start of every tick.
    pub fn should_die(&self, ctx: &TickContext<'_>) -> bool {
        match self.kind {
            JetKind::Steam => self.aged_out() || !steam_source_valid(ctx.world, self.pos),
            // Validity is only re-checked every half second.
            JetKind::WaterSplash { .. } => {
                self.age % 10 == 0 && !splash_source_valid(ctx.world, self.pos)
            }
            _ => self.aged_out(),
        }
    }

    /// Advance one tick. Returns the state after the tick.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>, acoustics: &JetAcoustics) -> JetState {
        if self.state != JetState::Alive {
            return self.state;
        }
        if self.should_die(ctx) {
            self.expire(ctx.audio);
            return self.state;
        }
        if self.age % self.update_frequency == 0 {
            self.spawn_particles(ctx);
        }
        self.age += 1;
        self.sound_update(ctx, acoustics);
        self.state
    }

    /// Retire the jet and stop anything it is playing.
    pub fn expire(&mut self, audio: &mut AudioEngine) {
        if self.state != JetState::Alive {
            return;
        }
        self.state = JetState::Dying;
        if let Some(handle) = self.looping.as_mut().and_then(|l| l.handle.take()) {
            audio.stop(handle);
        }
        self.state = JetState::Dead;
    }

    fn spawn_particles(&self, ctx: &mut TickContext<'_>) {
        let origin = self.origin;
        let strength = f64::from(self.strength);
        match self.kind {
            JetKind::Fire { lava, solid } => {
                let mut speed_y = if lava { 0.0 } else { strength / 10.0 };
                let mut scale = self.strength as f32;
                let mut at = origin;
                if solid {
                    at.x += (ctx.rng.gen::<f64>() - ctx.rng.gen::<f64>()) * 0.5;
                    at.z += (ctx.rng.gen::<f64>() - ctx.rng.gen::<f64>()) * 0.5;
                    if self.strength == 1 {
                        speed_y *= 0.5;
                        scale *= 0.5;
                    }
                }
                let particle = if lava {
                    Particle::new(ParticleKind::LavaFlame, at, DVec3::new(0.0, speed_y, 0.0))
                } else {
                    Particle::new(ParticleKind::Flame, at, DVec3::new(0.0, speed_y, 0.0))
                        .with_scale(scale)
                };
                ctx.spawn(particle);
            }
            JetKind::Steam => {
                ctx.spawn(Particle::new(ParticleKind::Steam, origin, DVec3::new(0.0, 0.1, 0.0)));
            }
            JetKind::Bubble => {
                let velocity = DVec3::new(0.0, 0.5 + strength / 10.0, 0.0);
                ctx.spawn(Particle::new(ParticleKind::Bubble, origin, velocity));
            }
            JetKind::Dust => {
                let at = DVec3::new(
                    origin.x + gaussian(ctx.rng) * 0.2,
                    origin.y,
                    origin.z + gaussian(ctx.rng) * 0.2,
                );
                ctx.spawn(Particle::new(ParticleKind::Dust, at, DVec3::ZERO));
            }
            JetKind::Fountain => {
                let velocity = DVec3::new(gaussian(ctx.rng) * 0.03, 0.5, gaussian(ctx.rng) * 0.03);
                let at = DVec3::new(
                    origin.x + gaussian(ctx.rng) * 0.2,
                    origin.y,
                    origin.z + gaussian(ctx.rng) * 0.2,
                );
                ctx.spawn(Particle::new(ParticleKind::Fountain, at, velocity));
            }
            JetKind::WaterSplash {
                spray_y,
                spray_limit,
            } => {
                let count = ctx.config.particle_density.scale(spray_limit);
                let motion = f64::from(self.strength + 3) / 20.0;
                for _ in 0..count {
                    let xo = f64::from(ctx.rng.gen::<f32>() * 2.0 - 1.0);
                    let zo = f64::from(ctx.rng.gen::<f32>() * 2.0 - 1.0);
                    let at = DVec3::new(origin.x + xo, spray_y, origin.z + zo);
                    if ctx.world.is_solid(BlockPos::containing(at)) {
                        continue;
                    }
                    let velocity = DVec3::new(
                        xo * motion,
                        0.1 + f64::from(ctx.rng.gen::<f32>()) * motion,
                        zo * motion,
                    );
                    ctx.spawn(Particle::new(ParticleKind::Splash, at, velocity));
                }
            }
        }
    }

    fn sound_update(&mut self, ctx: &mut TickContext<'_>, acoustics: &JetAcoustics) {
        match self.kind {
            JetKind::Fire { .. } => {
                if !self.sound_fired {
                    self.sound_fired = true;
                    if self.strength > 1 {
                        ctx.play(&acoustics.fire, AcousticEvent::None, PlayTarget::At(self.origin));
                    }
                }
            }
            JetKind::WaterSplash { .. } => {
                if ctx.config.toggles.waterfall_sound {
                    self.waterfall_update(ctx, acoustics);
                }
            }
            _ => {}
        }
    }

    fn waterfall_update(&mut self, ctx: &mut TickContext<'_>, acoustics: &JetAcoustics) {
        if self.looping.is_none() {
            let index = WATERFALL_INDEX[(self.strength as usize).min(WATERFALL_INDEX.len() - 1)];
            let center = self.pos.center();
            let template = acoustics.waterfall[index]
                .factory(AcousticEvent::None, ctx.flags, ctx.rng)
                .map(|factory| {
                    let mut sound = factory.create_sound_at(center, ctx.rng);
                    sound.repeat = true;
                    sound.repeat_delay = 0;
                    sound.repeat_delay_range = (0, 0);
                    sound
                });
            self.looping = Some(LoopingSound {
                template,
                handle: None,
            });
        }
        let Some(looping) = self.looping.as_mut() else {
            return;
        };
        let Some(template) = &looping.template else {
            return;
        };

        let pad = f64::from(ctx.config.waterfall_pad);
        let in_range = in_range(ctx.viewer.eye, template, pad);
        let active = looping.handle.is_some_and(|h| ctx.audio.is_active(h));
        if in_range && !active {
            looping.handle = ctx.play_instance(template.clone()).handle;
        } else if !in_range && active {
            if let Some(handle) = looping.handle.take() {
                ctx.audio.stop(handle);
            }
        }
    }
}

impl fmt::Display for Jet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} jet at {} strength={} age={}",
            self.kind.name(),
            self.pos,
            self.strength,
            self.age
        )?;
        if let Some(max) = self.max_age {
            write!(f, "/{max}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Viewer;
    use crate::particles::ParticleBatch;
    use crate::EffectsConfig;
    use mdambient_audio::{Acoustic, SoundBuilder, SoundCategory};
    use mdambient_core::{ConditionFlags, RegistryKey, SimTick};
    use mdambient_world::{SparseWorld, BLOCK_LAVA, BLOCK_STONE, BLOCK_WATER, STATE_FLUID_FALLING};
    use rand::{rngs::StdRng, SeedableRng};
    use std::sync::Arc;

    struct Harness {
        world: SparseWorld,
        audio: AudioEngine,
        particles: ParticleBatch,
        rng: StdRng,
        config: EffectsConfig,
        flags: ConditionFlags,
        viewer: Viewer,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                world: SparseWorld::new(),
                audio: AudioEngine::simulated(1),
                particles: ParticleBatch::new(),
                rng: StdRng::seed_from_u64(11),
                config: EffectsConfig::default(),
                flags: ConditionFlags::new(),
                viewer: Viewer::at(DVec3::new(0.5, 64.0, 0.5)),
            }
        }

        fn ctx(&mut self, tick: u64) -> TickContext<'_> {
            TickContext {
                tick: SimTick(tick),
                world: &self.world,
                audio: &mut self.audio,
                particles: &mut self.particles,
                rng: &mut self.rng,
                config: &self.config,
                flags: &self.flags,
                viewer: self.viewer,
            }
        }
    }

    fn looping_acoustics() -> JetAcoustics {
        let mut builder = SoundBuilder::with_category(RegistryKey::local("waterfall/0"), SoundCategory::Block);
        builder.set_volume(1.0);
        let acoustic = Arc::new(Acoustic::simple(builder));
        let mut acoustics = JetAcoustics::silent();
        acoustics.waterfall = std::array::from_fn(|_| Arc::clone(&acoustic));
        acoustics
    }

    #[test]
    fn max_age_follows_strength() {
        let mut rng = StdRng::seed_from_u64(5);
        for _ in 0..200 {
            let jet = Jet::bubble(DVec3::ZERO, 5, &mut rng);
            let max = jet.max_age().unwrap();
            assert!((40..=120).contains(&max), "max age {max}");
            assert_eq!(max % 20, 0);
        }
        // Strength is clamped to one.
        let jet = Jet::steam(DVec3::ZERO, 0, &mut rng);
        assert_eq!(jet.strength(), 1);
        assert_eq!(jet.max_age(), Some(40));
    }

    #[test]
    fn spawns_on_update_frequency_until_max_age() {
        let mut h = Harness::new();
        let mut jet = Jet::bubble(DVec3::new(0.5, 60.1, 0.5), 1, &mut h.rng);
        let acoustics = JetAcoustics::silent();
        let mut ticks = 0;
        while jet.is_alive() {
            let mut ctx = h.ctx(ticks);
            jet.tick(&mut ctx, &acoustics);
            ticks += 1;
            assert!(jet.age() <= jet.max_age().unwrap());
        }
        assert_eq!(jet.state(), JetState::Dead);
        assert_eq!(jet.age(), 40);
        // Ages 0, 3, ..., 39.
        assert_eq!(h.particles.count(ParticleKind::Bubble), 14);
        // The dying tick does not age the jet.
        assert_eq!(ticks, 41);
    }

    #[test]
    fn fire_sound_plays_once_for_strong_jets() {
        let mut h = Harness::new();
        let mut acoustics = JetAcoustics::silent();
        let mut builder = SoundBuilder::with_category(RegistryKey::minecraft("block.fire.ambient"), SoundCategory::Block);
        builder.set_volume(1.0);
        acoustics.fire = Arc::new(Acoustic::simple(builder));

        let mut weak = Jet::fire(DVec3::new(0.5, 64.0, 0.5), 1, true, &mut h.rng);
        let mut strong = Jet::fire(DVec3::new(1.5, 64.0, 0.5), 3, true, &mut h.rng);
        for t in 0..10 {
            let mut ctx = h.ctx(t);
            weak.tick(&mut ctx, &acoustics);
            strong.tick(&mut ctx, &acoustics);
        }
        assert_eq!(h.audio.stats().submitted, 1);
        let flame = h.particles.particles()[0];
        assert_eq!(flame.kind, ParticleKind::Flame);
        assert_eq!(flame.scale, 0.5);
    }

    #[test]
    fn steam_dies_when_heat_goes_away() {
        let mut h = Harness::new();
        let pos = BlockPos::new(0, 63, 0);
        h.world.set_block(pos, BLOCK_WATER);
        h.world.set_block(pos.down(), BLOCK_LAVA);
        let mut jet = Jet::steam(DVec3::new(0.5, 63.9, 0.5), 1, &mut h.rng).with_key(pos);
        let acoustics = JetAcoustics::silent();
        jet.tick(&mut h.ctx(0), &acoustics);
        assert!(jet.is_alive());
        h.world.set_block(pos.down(), BLOCK_STONE);
        jet.tick(&mut h.ctx(1), &acoustics);
        assert_eq!(jet.state(), JetState::Dead);
        assert_eq!(h.particles.count(ParticleKind::Steam), 1);
    }

    fn waterfall(world: &mut SparseWorld) -> BlockPos {
        world.fill(BlockPos::new(-2, 60, -2), BlockPos::new(2, 60, 2), BLOCK_STONE);
        world.fill(BlockPos::new(0, 61, 0), BlockPos::new(0, 64, 0), BLOCK_WATER);
        for y in 62..=64 {
            world.set_block_state(BlockPos::new(0, y, 0), BLOCK_WATER, STATE_FLUID_FALLING);
        }
        BlockPos::new(0, 61, 0)
    }

    #[test]
    fn waterfall_loop_follows_listener_range() {
        let mut h = Harness::new();
        let foot = waterfall(&mut h.world);
        let acoustics = looping_acoustics();
        let mut jet = Jet::water_splash(foot, 4, 62.1);

        h.audio.set_listener_position(h.viewer.eye);
        jet.tick(&mut h.ctx(0), &acoustics);
        let handle = jet.loop_handle().expect("loop started in range");
        assert!(h.audio.is_active(handle));
        assert!(h.particles.count(ParticleKind::Splash) > 0);

        // Walk away beyond range + pad.
        h.viewer = Viewer::at(DVec3::new(100.5, 64.0, 0.5));
        jet.tick(&mut h.ctx(1), &acoustics);
        assert_eq!(jet.loop_handle(), None);
        h.audio.tick();
        assert!(!h.audio.is_active(handle));
    }

    #[test]
    fn splash_stops_loop_when_waterfall_dries_up() {
        let mut h = Harness::new();
        let foot = waterfall(&mut h.world);
        let acoustics = looping_acoustics();
        let mut jet = Jet::water_splash(foot, 4, 62.1);
        h.audio.set_listener_position(h.viewer.eye);
        for t in 0..10 {
            jet.tick(&mut h.ctx(t), &acoustics);
        }
        let handle = jet.loop_handle().unwrap();
        for y in 62..=64 {
            h.world.clear(BlockPos::new(0, y, 0));
        }
        jet.tick(&mut h.ctx(10), &acoustics);
        assert_eq!(jet.state(), JetState::Dead);
        h.audio.tick();
        assert!(!h.audio.is_active(handle));
    }

    #[test]
    fn minimal_density_suppresses_spray() {
        let mut h = Harness::new();
        let foot = waterfall(&mut h.world);
        h.config.particle_density = crate::ParticleDensity::Minimal;
        let mut jet = Jet::water_splash(foot, 10, 62.1);
        jet.tick(&mut h.ctx(0), &JetAcoustics::silent());
        assert!(jet.is_alive());
        assert_eq!(h.particles.count(ParticleKind::Splash), 0);
    }

    #[test]
    fn gaussian_is_roughly_standard() {
        let mut rng = StdRng::seed_from_u64(99);
        let n = 20_000;
        let samples: Vec<f64> = (0..n).map(|_| gaussian(&mut rng)).collect();
        let mean = samples.iter().sum::<f64>() / n as f64;
        let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n as f64;
        assert!(mean.abs() < 0.05, "mean {mean}");
        assert!((var - 1.0).abs() < 0.1, "variance {var}");
    }
}
