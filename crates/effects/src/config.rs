//! Effect configuration and its hot-reloadable handle.

use anyhow::Result;
use mdambient_audio::{OcclusionPolicy, SoundCategory, DEFAULT_SOUND_LIMIT};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tracing::{info, warn};

/// Default location of the effects configuration.
pub const DEFAULT_CONFIG_PATH: &str = "config/effects.toml";

/// Errors raised while reading configuration strictly.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// File could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
    /// File is not valid configuration.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: toml::de::Error,
    },
    /// Values parsed but are out of range.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

/// How many particles spray-type effects emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticleDensity {
    /// Full count.
    #[default]
    All,
    /// Half count.
    Decreased,
    /// No spray particles.
    Minimal,
}

impl ParticleDensity {
    /// Scale a particle count by this density.
    pub fn scale(self, count: u32) -> u32 {
        match self {
            ParticleDensity::All => count,
            ParticleDensity::Decreased => count / 2,
            ParticleDensity::Minimal => 0,
        }
    }
}

/// Per-effect switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectToggles {
    pub breath: bool,
    pub footprints: bool,
    pub swing: bool,
    pub bow: bool,
    pub toolbar: bool,
    pub fire_jets: bool,
    pub steam_jets: bool,
    pub bubble_jets: bool,
    pub dust_jets: bool,
    pub fountain_jets: bool,
    pub water_splash: bool,
    /// Play the looping waterfall sound next to splash jets.
    pub waterfall_sound: bool,
}

impl Default for EffectToggles {
    fn default() -> Self {
        Self {
            breath: true,
            footprints: true,
            swing: true,
            bow: true,
            toolbar: true,
            fire_jets: true,
            steam_jets: true,
            bubble_jets: true,
            dust_jets: true,
            fountain_jets: true,
            water_splash: true,
            waterfall_sound: true,
        }
    }
}

/// One block effect bound to a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockEffectAssignment {
    /// Block key, `@` selects the `minecraft` namespace
    pub block: String,
    /// Effect name (`fire_jet`, `steam_jet`, `bubble_jet`, `dust_jet`,
    /// `fountain_jet`, `splash_jet`)
    pub effect: String,
    /// One in `chance` samples trigger; 0 always triggers
    #[serde(default)]
    pub chance: u32,
    /// Condition expression that must hold
    #[serde(default)]
    pub conditions: Option<String>,
}

/// Acoustic played when the scanner samples a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSoundAssignment {
    /// Block key
    pub block: String,
    /// Acoustic definition
    pub acoustic: String,
    /// One in `chance` samples play
    #[serde(default = "default_block_sound_chance")]
    pub chance: u32,
}

fn default_block_sound_chance() -> u32 {
    25
}

/// Ambient effect configuration.
///
/// Every field has a default, so a partial file only overrides what it names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectsConfig {
    /// Distance in blocks within which entities get effects and jets live.
    pub effect_range: u32,
    pub toggles: EffectToggles,
    /// Master volume, 0-100.
    pub master_volume: u8,
    /// Per-category volume, 0-100. Missing categories play at 100.
    pub category_volumes: BTreeMap<SoundCategory, u8>,
    pub particle_density: ParticleDensity,
    pub occlusion: OcclusionPolicy,
    /// Extra blocks beyond a sound's range before a waterfall loop starts.
    pub waterfall_pad: u32,
    /// Sounds the audio backend may hold at once.
    pub sound_limit: usize,
    /// Random block samples per tick for each scan radius.
    pub scan_budget: u32,
    /// Inner and outer scan radius.
    pub scan_ranges: Vec<u32>,
    /// Entity kind to comma separated effect names.
    pub entity_effects: BTreeMap<String, String>,
    /// Effects for player entities.
    pub player_effects: String,
    pub block_effects: Vec<BlockEffectAssignment>,
    pub block_sounds: Vec<BlockSoundAssignment>,
    /// Extra acoustic JSON documents, keyed by namespace.
    pub acoustic_files: BTreeMap<String, PathBuf>,
    /// Seed for effect randomness.
    pub seed: u64,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        let entity_effects = [
            ("@zombie", "breath,footprint,swing"),
            ("@skeleton", "breath,footprint,swing,bow"),
            ("@villager", "breath,footprint"),
            ("@cow", "breath,footprint"),
            ("@pillager", "footprint,swing,bow"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let block_effects = vec![
            jet("@lava", "fire_jet", 1800, None),
            jet("@fire", "fire_jet", 0, Some("!raining".to_string())),
            jet("@water", "steam_jet", 10, None),
            jet("@water", "bubble_jet", 1800, None),
            jet("@water", "splash_jet", 0, None),
            jet("@sand", "dust_jet", 500, None),
            jet("@gravel", "dust_jet", 500, None),
            jet("@magma_block", "fountain_jet", 2000, None),
        ];
        let block_sounds = vec![
            BlockSoundAssignment {
                block: "@lava".to_string(),
                acoustic: "@block.lava.pop".to_string(),
                chance: 40,
            },
            BlockSoundAssignment {
                block: "@fire".to_string(),
                acoustic: "@block.fire.ambient".to_string(),
                chance: 25,
            },
        ];

        Self {
            effect_range: 24,
            toggles: EffectToggles::default(),
            master_volume: 100,
            category_volumes: BTreeMap::new(),
            particle_density: ParticleDensity::All,
            occlusion: OcclusionPolicy::default(),
            waterfall_pad: 4,
            sound_limit: DEFAULT_SOUND_LIMIT,
            scan_budget: 667,
            scan_ranges: vec![16, 32],
            entity_effects,
            player_effects: "breath,footprint,swing,bow,toolbar".to_string(),
            block_effects,
            block_sounds,
            acoustic_files: BTreeMap::new(),
            seed: 0x5EED,
        }
    }
}

fn jet(block: &str, effect: &str, chance: u32, conditions: Option<String>) -> BlockEffectAssignment {
    BlockEffectAssignment {
        block: block.to_string(),
        effect: effect.to_string(),
        chance,
        conditions,
    }
}

impl EffectsConfig {
    /// Load configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match Self::try_load_from_path(path) {
            Ok(cfg) => cfg,
            Err(ConfigError::Read { source, .. })
                if path == Path::new(DEFAULT_CONFIG_PATH)
                    && source.kind() == std::io::ErrorKind::NotFound =>
            {
                warn!(
                    "Effects config not found at {}. Using defaults",
                    path.display()
                );
                EffectsConfig::default()
            }
            Err(err) => {
                warn!("{err}. Using defaults");
                EffectsConfig::default()
            }
        }
    }

    /// Load and validate, reporting every failure to the caller.
    pub fn try_load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: EffectsConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Reject values that cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.master_volume > 100 {
            return Err(ConfigError::Invalid {
                field: "master_volume",
                reason: format!("{} is above 100", self.master_volume),
            });
        }
        if let Some((cat, v)) = self.category_volumes.iter().find(|(_, v)| **v > 100) {
            return Err(ConfigError::Invalid {
                field: "category_volumes",
                reason: format!("{cat} is {v}, above 100"),
            });
        }
        if self.scan_ranges.iter().any(|r| *r == 0) {
            return Err(ConfigError::Invalid {
                field: "scan_ranges",
                reason: "ranges must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Volume percent for a category.
    pub fn category_volume(&self, category: SoundCategory) -> u8 {
        self.category_volumes.get(&category).copied().unwrap_or(100)
    }

    /// Squared effect range in blocks.
    pub fn effect_range_sq(&self) -> f64 {
        let r = f64::from(self.effect_range);
        r * r
    }
}

/// Shared, versioned holder of the current configuration.
///
/// Consumers take one [`ConfigHandle::snapshot`] per tick and keep it no
/// longer than that tick, so a reload takes effect on the next tick.
#[derive(Debug, Clone, Default)]
pub struct ConfigHandle {
    inner: Arc<RwLock<Versioned>>,
}

#[derive(Debug, Default)]
struct Versioned {
    config: Arc<EffectsConfig>,
    version: u64,
}

impl ConfigHandle {
    /// Handle holding `config` at version 0.
    pub fn new(config: EffectsConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Versioned {
                config: Arc::new(config),
                version: 0,
            })),
        }
    }

    /// Current configuration and its version.
    pub fn snapshot(&self) -> (Arc<EffectsConfig>, u64) {
        match self.inner.read() {
            Ok(guard) => (Arc::clone(&guard.config), guard.version),
            Err(poisoned) => {
                let guard = poisoned.into_inner();
                (Arc::clone(&guard.config), guard.version)
            }
        }
    }

    /// Current version.
    pub fn version(&self) -> u64 {
        self.snapshot().1
    }

    /// Replace the configuration and bump the version.
    pub fn replace(&self, config: EffectsConfig) -> u64 {
        let mut guard = match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.config = Arc::new(config);
        guard.version += 1;
        guard.version
    }

    /// Re-read a file. An unreadable or invalid file keeps the current values.
    pub fn reload_from_path(&self, path: &Path) -> Result<u64, ConfigError> {
        let config = EffectsConfig::try_load_from_path(path)?;
        let version = self.replace(config);
        info!(path = %path.display(), version, "Reloaded effects config");
        Ok(version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("effects.toml");
        fs::write(
            &path,
            "effect_range = 8\nparticle_density = \"minimal\"\n[toggles]\nbreath = false\n",
        )
        .unwrap();
        let cfg = EffectsConfig::load_from_path(&path);
        assert_eq!(cfg.effect_range, 8);
        assert_eq!(cfg.particle_density, ParticleDensity::Minimal);
        assert!(!cfg.toggles.breath);
        assert!(cfg.toggles.swing);
        assert_eq!(cfg.waterfall_pad, 4);
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("effects.toml");
        fs::write(&path, "effect_range = \"far\"").unwrap();
        assert_eq!(EffectsConfig::load_from_path(&path), EffectsConfig::default());
        assert!(matches!(
            EffectsConfig::try_load_from_path(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn save_then_load_preserves_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/effects.toml");
        let mut cfg = EffectsConfig::default();
        cfg.category_volumes.insert(SoundCategory::Footsteps, 40);
        cfg.occlusion = OcclusionPolicy::Silence;
        cfg.save_to_path(&path).unwrap();
        assert_eq!(EffectsConfig::load_from_path(&path), cfg);
    }

    #[test]
    fn out_of_range_volume_is_rejected() {
        let mut cfg = EffectsConfig::default();
        cfg.category_volumes.insert(SoundCategory::Block, 140);
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid { field: "category_volumes", .. })));
    }

    #[test]
    fn handle_versions_replacements() {
        let handle = ConfigHandle::new(EffectsConfig::default());
        let (before, v0) = handle.snapshot();
        let mut next = EffectsConfig::default();
        next.effect_range = 4;
        assert_eq!(handle.replace(next), v0 + 1);
        let (after, _) = handle.snapshot();
        assert_eq!(before.effect_range, 24);
        assert_eq!(after.effect_range, 4);
    }

    #[test]
    fn failed_reload_keeps_current_values() {
        let handle = ConfigHandle::new(EffectsConfig::default());
        let missing = Path::new("/nonexistent/effects.toml");
        assert!(handle.reload_from_path(missing).is_err());
        assert_eq!(handle.version(), 0);
    }

    #[test]
    fn density_scales_counts() {
        assert_eq!(ParticleDensity::All.scale(12), 12);
        assert_eq!(ParticleDensity::Decreased.scale(12), 6);
        assert_eq!(ParticleDensity::Minimal.scale(12), 0);
    }
}
