//! Property-based tests for emitter and manager lifecycles
//!
//! - A voxel never holds more than one jet, and every accepted jet retires
//!   within its age limit
//! - Entity managers exist exactly for living entities inside the effect range

use glam::DVec3;
use mdambient_audio::AudioEngine;
use mdambient_core::{ConditionFlags, EntityId, RegistryKey, SimTick};
use mdambient_effects::entity::EntityEffectSystem;
use mdambient_effects::jets::{Jet, JetAcoustics, JetEngine};
use mdambient_effects::{
    EffectsConfig, EngineContext, EntitySnapshot, EntityView, ParticleBatch, TickContext, Viewer,
};
use mdambient_world::{BlockRegistry, SparseWorld};
use proptest::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::BTreeSet;

struct Bench {
    world: SparseWorld,
    audio: AudioEngine,
    particles: ParticleBatch,
    rng: StdRng,
    config: EffectsConfig,
    flags: ConditionFlags,
    viewer: Viewer,
}

impl Bench {
    fn new(seed: u64) -> Self {
        let viewer = Viewer::at(DVec3::new(0.5, 64.0, 0.5));
        let mut audio = AudioEngine::simulated(seed);
        audio.set_listener_position(viewer.eye);
        Self {
            world: SparseWorld::new(),
            audio,
            particles: ParticleBatch::new(),
            rng: StdRng::seed_from_u64(seed),
            config: EffectsConfig::default(),
            flags: ConditionFlags::new(),
            viewer,
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

fn make_jet(kind: u8, origin: DVec3, strength: u32, rng: &mut StdRng) -> Jet {
    match kind {
        0 => Jet::fire(origin, strength, true, rng),
        1 => Jet::bubble(origin, strength, rng),
        2 => Jet::dust(origin, rng),
        _ => Jet::fountain(origin, rng),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn one_jet_per_voxel_and_all_retire(
        specs in prop::collection::vec((-8i32..8, 0i32..4, -8i32..8, 0u8..4, 1u32..6), 1..40),
        seed in any::<u64>(),
    ) {
        let mut bench = Bench::new(seed);
        let mut jets = JetEngine::new(JetAcoustics::silent());
        let mut keys = BTreeSet::new();
        for (x, y, z, kind, strength) in &specs {
            let origin = DVec3::new(*x as f64 + 0.5, 64.0 + *y as f64, *z as f64 + 0.5);
            let jet = make_jet(*kind, origin, *strength, &mut bench.rng);
            let fresh = keys.insert(jet.pos());
            prop_assert_eq!(jets.add(jet), fresh);
        }
        let stats = jets.stats();
        prop_assert_eq!(stats.spawned as usize, keys.len());
        prop_assert_eq!((stats.spawned + stats.rejected) as usize, specs.len());
        prop_assert_eq!(jets.len(), keys.len());

        // The longest possible life is (strength + 1) * 20 ticks.
        for tick in 0..200 {
            jets.tick(&mut bench.ctx(tick));
            for jet in jets.iter() {
                prop_assert!(jet.max_age().is_some_and(|max| jet.age() <= max));
            }
        }
        prop_assert!(jets.is_empty());
        prop_assert_eq!(jets.stats().retired, jets.stats().spawned);
    }

    #[test]
    fn managers_track_range_and_liveness(
        entities in prop::collection::vec((-40.0f64..40.0, -40.0f64..40.0, any::<bool>()), 1..24),
        moves in prop::collection::vec((-20.0f64..20.0, any::<bool>()), 24),
        seed in any::<u64>(),
    ) {
        let mut bench = Bench::new(seed);
        let engine = EngineContext::new(&bench.config, &BlockRegistry::with_defaults());
        let range_sq = bench.config.effect_range_sq();
        let mut system = EntityEffectSystem::new();
        let mut view = EntityView::new();
        for (i, (x, z, alive)) in entities.iter().enumerate() {
            let mut entity = EntitySnapshot::new(
                EntityId(i as u32 + 10),
                RegistryKey::minecraft("zombie"),
                DVec3::new(*x, 64.0, *z),
            );
            entity.alive = *alive;
            view.insert(entity);
        }

        let check = |system: &EntityEffectSystem, view: &EntityView, viewer: DVec3| {
            for entity in view.iter() {
                let wanted = entity.alive && entity.position.distance_squared(viewer) <= range_sq;
                if system.get(entity.id).is_some() != wanted {
                    return Err(format!("{} wanted={wanted}", entity.id));
                }
            }
            Ok(())
        };

        system.tick(&view, &mut bench.ctx(0), &engine);
        prop_assert_eq!(check(&system, &view, bench.viewer.position), Ok(()));

        for (i, (dx, kill)) in moves.iter().enumerate() {
            if let Some(entity) = view.get_mut(EntityId(i as u32 + 10)) {
                entity.position.x += dx;
                if *kill {
                    entity.alive = false;
                }
            }
        }
        system.tick(&view, &mut bench.ctx(1), &engine);
        prop_assert_eq!(check(&system, &view, bench.viewer.position), Ok(()));

        system.clear(&mut bench.audio);
        prop_assert!(system.is_empty());
    }
}
