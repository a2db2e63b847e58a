//! Per-tick and per-configuration state shared by every effect subsystem.

use crate::config::EffectsConfig;
use crate::defaults;
use crate::entity::{default_handlers, EffectLibrary, FactoryHandler, FootstepLibrary, ItemLibrary};
use crate::jets::{BlockEffectTable, JetAcoustics};
use crate::particles::{Particle, ParticleSink};
use anyhow::{Context as _, Result};
use glam::DVec3;
use mdambient_audio::{Acoustic, AcousticEvent, AcousticLibrary, AudioEngine, PlayOutcome, PlayTarget, SoundHandle, SoundInstance};
use mdambient_core::{ConditionFlags, EntityId, SimTick, DEFAULT_NAMESPACE};
use mdambient_world::{BlockRegistry, VoxelAccessor};
use rand::rngs::StdRng;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

/// Eye height of a standing player.
pub const PLAYER_EYE_HEIGHT: f64 = 1.62;

/// Where the local player is looking from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Viewer {
    /// Entity id of the local player, when it is tracked.
    pub entity: Option<EntityId>,
    /// Feet position.
    pub position: DVec3,
    /// Eye position; range checks for sounds use this.
    pub eye: DVec3,
    pub first_person: bool,
}

impl Viewer {
    /// Anonymous first-person viewer standing at `position`.
    pub fn at(position: DVec3) -> Self {
        Self {
            entity: None,
            position,
            eye: position + DVec3::new(0.0, PLAYER_EYE_HEIGHT, 0.0),
            first_person: true,
        }
    }

    pub fn with_entity(mut self, entity: EntityId) -> Self {
        self.entity = Some(entity);
        self
    }
}

/// Everything an effect may touch during one tick.
///
/// Built fresh each tick; nothing here outlives it.
pub struct TickContext<'a> {
    pub tick: SimTick,
    pub world: &'a dyn VoxelAccessor,
    pub audio: &'a mut AudioEngine,
    pub particles: &'a mut dyn ParticleSink,
    pub rng: &'a mut StdRng,
    pub config: &'a EffectsConfig,
    pub flags: &'a ConditionFlags,
    pub viewer: Viewer,
}

impl TickContext<'_> {
    /// Play every sound an acoustic produces for `event`. Returns the handle
    /// of the first accepted sound.
    pub fn play(&mut self, acoustic: &Acoustic, event: AcousticEvent, target: PlayTarget) -> Option<SoundHandle> {
        if acoustic.is_null() {
            return None;
        }
        let sounds = acoustic.collect(event, &target, self.flags, self.rng);
        let mut first = None;
        for sound in sounds {
            let outcome = self.audio.play(sound, self.world);
            first = first.or(outcome.handle);
        }
        first
    }

    /// Submit a prepared instance.
    pub fn play_instance(&mut self, sound: SoundInstance) -> PlayOutcome {
        self.audio.play(sound, self.world)
    }

    pub fn spawn(&mut self, particle: Particle) {
        self.particles.spawn(particle);
    }

    /// True when `entity` is the local player.
    pub fn is_local(&self, entity: EntityId) -> bool {
        self.viewer.entity == Some(entity)
    }
}

/// Registries and libraries derived from one configuration version.
///
/// Rebuilt whenever the configuration changes; subsystems borrow it instead
/// of reaching for global tables.
pub struct EngineContext {
    pub acoustics: AcousticLibrary,
    pub items: Arc<ItemLibrary>,
    pub footsteps: Arc<FootstepLibrary>,
    pub effects: EffectLibrary,
    pub block_effects: BlockEffectTable,
    pub jet_acoustics: JetAcoustics,
    handlers: Vec<Box<dyn FactoryHandler>>,
}

impl EngineContext {
    /// Build from configuration. Acoustic documents that fail to load are
    /// logged and skipped.
    pub fn new(config: &EffectsConfig, blocks: &BlockRegistry) -> Self {
        let mut acoustics = AcousticLibrary::from_registry(defaults::sound_registry());
        if let Err(err) = acoustics.load_json(DEFAULT_NAMESPACE, defaults::ACOUSTICS_JSON) {
            warn!("Built-in acoustics failed to compile: {err}");
        }
        for (namespace, path) in &config.acoustic_files {
            if let Err(err) = load_acoustic_file(&mut acoustics, namespace, path) {
                warn!("{err:#}");
            }
        }

        let items = Arc::new(ItemLibrary::new(&mut acoustics));
        let footsteps = Arc::new(FootstepLibrary::new(&mut acoustics));
        let effects = EffectLibrary::from_config(config);
        let block_effects = BlockEffectTable::from_config(config, blocks, &mut acoustics);
        let jet_acoustics = JetAcoustics::resolve(&mut acoustics);
        let handlers = default_handlers(&config.toggles, &items, &footsteps);
        debug!(handlers = handlers.len(), "Engine context built");

        Self {
            acoustics,
            items,
            footsteps,
            effects,
            block_effects,
            jet_acoustics,
            handlers,
        }
    }

    /// Add a factory handler after the built-in ones.
    pub fn register_handler(&mut self, handler: Box<dyn FactoryHandler>) {
        debug!(name = handler.name(), "Factory handler registered");
        self.handlers.push(handler);
    }

    pub fn handlers(&self) -> &[Box<dyn FactoryHandler>] {
        &self.handlers
    }
}

fn load_acoustic_file(library: &mut AcousticLibrary, namespace: &str, path: &Path) -> Result<usize> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read acoustics from {}", path.display()))?;
    let count = library
        .load_json(namespace, &json)
        .with_context(|| format!("failed to compile acoustics in {}", path.display()))?;
    Ok(count)
}

/// Owned backing state for building [`TickContext`]s in unit tests.
#[cfg(test)]
pub(crate) struct TestTick {
    pub world: mdambient_world::SparseWorld,
    pub audio: AudioEngine,
    pub particles: crate::particles::ParticleBatch,
    pub rng: StdRng,
    pub config: EffectsConfig,
    pub flags: ConditionFlags,
    pub viewer: Viewer,
}

#[cfg(test)]
impl TestTick {
    pub fn new(world: mdambient_world::SparseWorld, viewer: Viewer) -> Self {
        use rand::SeedableRng;
        let mut audio = AudioEngine::simulated(11);
        audio.set_listener_position(viewer.eye);
        Self {
            world,
            audio,
            particles: crate::particles::ParticleBatch::new(),
            rng: StdRng::seed_from_u64(11),
            config: EffectsConfig::default(),
            flags: ConditionFlags::new(),
            viewer,
        }
    }

    pub fn ctx(&mut self, tick: u64) -> TickContext<'_> {
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

    /// Acoustic library with the built-in sounds and definitions.
    pub fn acoustics() -> AcousticLibrary {
        let mut acoustics = AcousticLibrary::from_registry(defaults::sound_registry());
        if let Err(err) = acoustics.load_json(DEFAULT_NAMESPACE, defaults::ACOUSTICS_JSON) {
            panic!("built-in acoustics: {err}");
        }
        acoustics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mdambient_core::RegistryKey;
    use std::collections::BTreeMap;

    #[test]
    fn context_loads_extra_acoustic_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("extra.json");
        fs::write(&good, r#"{"chime": {"_type": "simple", "name": "@block.lava.pop"}}"#).unwrap();
        let mut config = EffectsConfig::default();
        config.acoustic_files = BTreeMap::from([
            ("extra".to_string(), good),
            ("broken".to_string(), dir.path().join("missing.json")),
        ]);

        let ctx = EngineContext::new(&config, &BlockRegistry::with_defaults());
        let chime = RegistryKey::new("extra", "chime").unwrap();
        assert!(ctx.acoustics.get(&chime).is_some_and(|a| !a.is_null()));
        assert!(!ctx.jet_acoustics.fire.is_null());
        assert!(!ctx.handlers().is_empty());
    }

    #[test]
    fn viewer_eye_sits_above_feet() {
        let viewer = Viewer::at(DVec3::new(1.0, 64.0, 1.0)).with_entity(EntityId(7));
        assert_eq!(viewer.eye.y, 64.0 + PLAYER_EYE_HEIGHT);
        assert_eq!(viewer.entity, Some(EntityId(7)));
    }
}
