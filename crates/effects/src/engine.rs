//! The ambient engine: one object that owns every subsystem and runs a tick.

use crate::config::{ConfigHandle, EffectsConfig};
use crate::context::{EngineContext, TickContext, Viewer};
use crate::diagnostics::TickTimer;
use crate::entity::{EntityEffectSystem, EntityStats, EntityView};
use crate::jets::{BlockEffectScanner, JetEngine, ScanStats};
use crate::particles::ParticleSink;
use mdambient_audio::{AudioEngine, AudioSettings};
use mdambient_core::{scoped_rng, ConditionFlags, SimTick};
use mdambient_world::{BlockRegistry, VoxelAccessor};
use rand::rngs::StdRng;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

/// Ticks between tick-cost log lines.
const TIMER_LOG_INTERVAL: u64 = 200;

/// RNG domain for effect rolls, kept apart from the audio backend's stream.
const EFFECT_RNG_DOMAIN: u64 = 0x6566_6665_6374;

/// What happened during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub tick: SimTick,
    /// The configuration changed and the engine context was rebuilt.
    pub reloaded: bool,
    pub scan: ScanStats,
    pub entities: EntityStats,
    /// Live jets after the tick.
    pub jets: usize,
    /// Sounds tracked by the audio engine after the tick.
    pub sounds: usize,
}

/// Point-in-time counts for overlays and logs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
    pub tick: u64,
    pub jets: usize,
    pub managers: usize,
    pub dummy_managers: usize,
    pub tracked_sounds: usize,
    /// Attached effects per manager.
    pub effects: Vec<String>,
}

/// Ambient effect engine.
///
/// Call [`AmbientEngine::tick`] once per game tick with a read-only view of
/// the world and the entities around the viewer.
pub struct AmbientEngine {
    config: ConfigHandle,
    snapshot: Arc<EffectsConfig>,
    version: u64,
    blocks: BlockRegistry,
    context: EngineContext,
    audio: AudioEngine,
    jets: JetEngine,
    entities: EntityEffectSystem,
    rng: StdRng,
    tick: SimTick,
    timers: TickTimer,
}

impl AmbientEngine {
    pub fn new(config: ConfigHandle, blocks: BlockRegistry, mut audio: AudioEngine) -> Self {
        let (snapshot, version) = config.snapshot();
        let context = EngineContext::new(&snapshot, &blocks);
        apply_audio_settings(&mut audio, &snapshot);
        let jets = JetEngine::new(context.jet_acoustics.clone());
        let rng = scoped_rng(snapshot.seed, EFFECT_RNG_DOMAIN, SimTick::ZERO);
        info!(version, backend = audio.backend_name(), "Ambient engine started");
        Self {
            config,
            snapshot,
            version,
            blocks,
            context,
            audio,
            jets,
            entities: EntityEffectSystem::new(),
            rng,
            tick: SimTick::ZERO,
            timers: TickTimer::default(),
        }
    }

    /// Engine on the simulated audio backend with the built-in blocks.
    pub fn simulated(config: EffectsConfig) -> Self {
        let seed = config.seed;
        Self::new(
            ConfigHandle::new(config),
            BlockRegistry::with_defaults(),
            AudioEngine::simulated(seed),
        )
    }

    pub fn config(&self) -> &ConfigHandle {
        &self.config
    }

    pub fn context(&self) -> &EngineContext {
        &self.context
    }

    /// Mutable context, for registering extra factory handlers. Handlers are
    /// lost when a configuration change rebuilds the context.
    pub fn context_mut(&mut self) -> &mut EngineContext {
        &mut self.context
    }

    pub fn audio(&self) -> &AudioEngine {
        &self.audio
    }

    pub fn audio_mut(&mut self) -> &mut AudioEngine {
        &mut self.audio
    }

    pub fn jets(&self) -> &JetEngine {
        &self.jets
    }

    pub fn entities(&self) -> &EntityEffectSystem {
        &self.entities
    }

    pub fn timers(&self) -> &TickTimer {
        &self.timers
    }

    pub fn current_tick(&self) -> SimTick {
        self.tick
    }

    /// Take this tick's configuration snapshot, rebuilding derived state
    /// when the version moved.
    fn refresh_config(&mut self) -> bool {
        let (snapshot, version) = self.config.snapshot();
        self.snapshot = snapshot;
        if version == self.version {
            return false;
        }
        self.version = version;
        self.jets.clear(&mut self.audio);
        self.entities.clear(&mut self.audio);
        self.context = EngineContext::new(&self.snapshot, &self.blocks);
        self.jets.set_acoustics(self.context.jet_acoustics.clone());
        apply_audio_settings(&mut self.audio, &self.snapshot);
        info!(version, "Effects configuration applied");
        true
    }

    /// Run one tick: block scan, jets, entity effects, then the audio backend.
    pub fn tick(
        &mut self,
        world: &dyn VoxelAccessor,
        view: &EntityView,
        viewer: Viewer,
        flags: &ConditionFlags,
        particles: &mut dyn ParticleSink,
    ) -> TickReport {
        let reloaded = self.refresh_config();
        self.audio.set_listener_position(viewer.eye);
        let config = Arc::clone(&self.snapshot);

        let mut ctx = TickContext {
            tick: self.tick,
            world,
            audio: &mut self.audio,
            particles,
            rng: &mut self.rng,
            config: &config,
            flags,
            viewer,
        };
        let scan = self.timers.time("scan", || {
            BlockEffectScanner::scan(&mut ctx, &self.context.block_effects, &mut self.jets)
        });
        self.timers.time("jets", || self.jets.tick(&mut ctx));
        let entity_stats = self
            .timers
            .time("entities", || self.entities.tick(view, &mut ctx, &self.context));
        drop(ctx);

        self.timers.time("audio", || self.audio.tick());

        if self.tick.0 % TIMER_LOG_INTERVAL == 0 {
            self.timers.log();
        }
        let report = TickReport {
            tick: self.tick,
            reloaded,
            scan,
            entities: entity_stats,
            jets: self.jets.len(),
            sounds: self.audio.tracked_count(),
        };
        self.tick = self.tick.advance(1);
        report
    }

    /// Forget everything tied to the old world: jets, managers and sounds.
    pub fn on_world_change(&mut self) {
        debug!(tick = self.tick.0, "World changed");
        self.jets.clear(&mut self.audio);
        self.entities.clear(&mut self.audio);
        self.audio.stop_all();
        self.audio.tick();
    }

    pub fn diagnostics(&self) -> Diagnostics {
        let dummy_managers = self.entities.managers().filter(|m| m.is_dummy()).count();
        Diagnostics {
            tick: self.tick.0,
            jets: self.jets.len(),
            managers: self.entities.len() - dummy_managers,
            dummy_managers,
            tracked_sounds: self.audio.tracked_count(),
            effects: self.entities.diagnostics(),
        }
    }
}

fn apply_audio_settings(audio: &mut AudioEngine, config: &EffectsConfig) {
    let muted = audio.settings().muted;
    audio.update_settings(AudioSettings {
        master: config.master_volume,
        categories: config.category_volumes.clone(),
        muted,
    });
    audio.set_occlusion(config.occlusion);
    audio.set_sound_limit(config.sound_limit);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::EntitySnapshot;
    use crate::particles::ParticleBatch;
    use glam::DVec3;
    use mdambient_core::{EntityId, RegistryKey};
    use mdambient_world::{BlockPos, SparseWorld, BLOCK_LAVA, BLOCK_STONE};

    fn scene() -> (SparseWorld, EntityView, Viewer) {
        let mut world = SparseWorld::new();
        world.fill(BlockPos::new(-12, 63, -12), BlockPos::new(12, 63, 12), BLOCK_STONE);
        world.fill(BlockPos::new(-3, 62, 4), BlockPos::new(3, 62, 8), BLOCK_LAVA);
        world.fill(BlockPos::new(-3, 63, 4), BlockPos::new(3, 63, 8), mdambient_world::BLOCK_AIR);
        let mut view = EntityView::new();
        view.insert(EntitySnapshot::new(
            EntityId(2),
            RegistryKey::minecraft("zombie"),
            DVec3::new(3.5, 64.0, 0.5),
        ));
        let player = EntitySnapshot::player(EntityId(1), DVec3::new(0.5, 64.0, 0.5));
        let viewer = Viewer::at(player.position).with_entity(player.id);
        view.insert(player);
        (world, view, viewer)
    }

    #[test]
    fn tick_attaches_managers_and_advances() {
        let (world, view, viewer) = scene();
        let mut engine = AmbientEngine::simulated(EffectsConfig::default());
        let mut particles = ParticleBatch::new();
        let flags = ConditionFlags::new();

        let report = engine.tick(&world, &view, viewer, &flags, &mut particles);
        assert_eq!(report.tick, SimTick::ZERO);
        assert!(!report.reloaded);
        assert_eq!(report.entities.attached, 2);
        assert_eq!(report.scan.sampled, 667 * 2);
        assert_eq!(engine.current_tick(), SimTick(1));

        let diagnostics = engine.diagnostics();
        assert_eq!(diagnostics.managers, 2);
        assert_eq!(diagnostics.dummy_managers, 0);
        assert!(diagnostics.effects.iter().any(|l| l.contains("toolbar")));
    }

    #[test]
    fn config_change_rebuilds_and_clears() {
        let (world, view, viewer) = scene();
        let mut engine = AmbientEngine::simulated(EffectsConfig::default());
        let mut particles = ParticleBatch::new();
        let flags = ConditionFlags::new();
        engine.tick(&world, &view, viewer, &flags, &mut particles);
        assert_eq!(engine.entities().len(), 2);

        let mut config = EffectsConfig::default();
        config.player_effects = String::new();
        config.entity_effects.clear();
        engine.config().replace(config);

        let report = engine.tick(&world, &view, viewer, &flags, &mut particles);
        assert!(report.reloaded);
        assert_eq!(report.entities.attached, 2);
        assert_eq!(report.entities.dummies, 2);
        assert_eq!(engine.diagnostics().managers, 0);
    }

    #[test]
    fn world_change_drops_everything() {
        let (world, view, viewer) = scene();
        let mut engine = AmbientEngine::simulated(EffectsConfig::default());
        let mut particles = ParticleBatch::new();
        let flags = ConditionFlags::new();
        for _ in 0..20 {
            engine.tick(&world, &view, viewer, &flags, &mut particles);
        }
        engine.on_world_change();
        let diagnostics = engine.diagnostics();
        assert_eq!(diagnostics.jets, 0);
        assert_eq!(diagnostics.managers + diagnostics.dummy_managers, 0);
        assert_eq!(diagnostics.tracked_sounds, 0);
    }
}
