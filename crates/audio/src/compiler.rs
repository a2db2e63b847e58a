//! Compiles JSON acoustic documents into [`Acoustic`]s.
//!
//! A document is an object mapping acoustic names to definitions:
//!
//! ```json
//! {
//!   "waterfall.big": { "name": "waterfall/5", "category": "ambient", "volume": 80 },
//!   "steam": "@block.fire.extinguish",
//!   "lava.pops": {
//!     "_type": "probability",
//!     "map": { "3": "@block.lava.pop", "1": { "name": "@block.lava.ambient", "pitch": 120 } }
//!   }
//! }
//! ```
//!
//! Volume, pitch and delay ranges are written as percents (volume, pitch) and
//! ticks (delay). A malformed entry is logged and skipped; the rest of the
//! document still compiles.

use crate::acoustic::{
    Acoustic, AcousticEvent, AcousticFactory, AcousticKind, WeightedAcoustic,
};
use crate::builder::SoundBuilder;
use crate::registry::SoundRegistry;
use crate::SoundCategory;
use mdambient_core::{Condition, ConditionError, RegistryKey, RegistryKeyError};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Default volume range of compiled sounds.
pub const DEFAULT_VOLUME: (f32, f32) = (0.9, 1.0);
/// Default pitch range of compiled sounds.
pub const DEFAULT_PITCH: (f32, f32) = (0.95, 1.05);
/// Default delay range of delayed acoustics, in ticks.
pub const DEFAULT_DELAY: (u32, u32) = (0, 0);

/// Error raised while compiling an acoustic definition.
#[derive(Debug, Error)]
pub enum AcousticError {
    /// The document is not valid JSON.
    #[error("invalid acoustic JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The document or a nested value has the wrong JSON shape.
    #[error("acoustic `{acoustic}`: expected {expected}")]
    Shape {
        /// Acoustic being compiled
        acoustic: String,
        /// What the compiler wanted
        expected: &'static str,
    },
    /// `_type` names no known acoustic kind.
    #[error("unknown acoustic type `{0}`")]
    UnknownType(String),
    /// An event selector key names no known event.
    #[error("unknown acoustic event `{0}`")]
    UnknownEvent(String),
    /// A category name is not recognised.
    #[error("unknown sound category `{0}`")]
    UnknownCategory(String),
    /// An inline sound is not in the sound registry.
    #[error("sound `{0}` is not registered")]
    UnknownSound(RegistryKey),
    /// A probability weight is not a non-negative integer.
    #[error("invalid weight `{0}`")]
    Weight(String),
    /// A name does not form a valid registry key.
    #[error(transparent)]
    Key(#[from] RegistryKeyError),
    /// A `conditions` string does not parse.
    #[error(transparent)]
    Condition(#[from] ConditionError),
}

fn shape(acoustic: &RegistryKey, expected: &'static str) -> AcousticError {
    AcousticError::Shape {
        acoustic: acoustic.to_string(),
        expected,
    }
}

/// Turns JSON definitions into acoustics. Names without a namespace resolve
/// into the compiler's namespace.
#[derive(Debug, Clone)]
pub struct AcousticCompiler<'r> {
    namespace: String,
    registry: &'r SoundRegistry,
    volume: (f32, f32),
    pitch: (f32, f32),
    delay: (u32, u32),
}

impl<'r> AcousticCompiler<'r> {
    /// Compiler for documents owned by `namespace`.
    pub fn new(namespace: &str, registry: &'r SoundRegistry) -> Self {
        Self {
            namespace: namespace.to_ascii_lowercase(),
            registry,
            volume: DEFAULT_VOLUME,
            pitch: DEFAULT_PITCH,
            delay: DEFAULT_DELAY,
        }
    }

    /// Override the default volume range.
    pub fn set_volume_range(&mut self, min: f32, max: f32) -> &mut Self {
        self.volume = (min, max);
        self
    }

    /// Override the default pitch range.
    pub fn set_pitch_range(&mut self, min: f32, max: f32) -> &mut Self {
        self.pitch = (min, max);
        self
    }

    /// Override the default delay range.
    pub fn set_delay_range(&mut self, min: u32, max: u32) -> &mut Self {
        self.delay = (min, max);
        self
    }

    /// Document namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Parse and compile a JSON document.
    pub fn compile_str(&self, json: &str) -> Result<Vec<Acoustic>, AcousticError> {
        let doc: Value = serde_json::from_str(json)?;
        self.compile(&doc)
    }

    /// Compile a parsed document. Entries that fail are logged and skipped.
    pub fn compile(&self, doc: &Value) -> Result<Vec<Acoustic>, AcousticError> {
        let obj = doc.as_object().ok_or_else(|| AcousticError::Shape {
            acoustic: self.namespace.clone(),
            expected: "an object of acoustic definitions",
        })?;
        let mut out = Vec::with_capacity(obj.len());
        for (name, value) in obj {
            match self.compile_entry(name, value) {
                Ok(acoustic) => out.push(acoustic),
                Err(err) => warn!(namespace = %self.namespace, acoustic = %name, %err, "Skipping acoustic"),
            }
        }
        Ok(out)
    }

    /// Compile one named definition.
    pub fn compile_entry(&self, name: &str, value: &Value) -> Result<Acoustic, AcousticError> {
        let key = RegistryKey::resolve(&self.namespace, name)?;
        self.dispatch(key, value)
    }

    fn dispatch(&self, name: RegistryKey, value: &Value) -> Result<Acoustic, AcousticError> {
        let obj = match value {
            Value::String(sound) => return self.inline(name, sound),
            Value::Object(obj) => obj,
            _ => return Err(shape(&name, "a sound name or an object")),
        };
        let kind = match obj.get("_type") {
            None => "simple",
            Some(Value::String(t)) => t.as_str(),
            Some(_) => return Err(shape(&name, "`_type` to be a string")),
        };
        let kind = match kind {
            "simple" => AcousticKind::Simple(AcousticFactory::new(self.builder(&name, obj)?)),
            "delayed" => {
                let factory = AcousticFactory::new(self.builder(&name, obj)?);
                let (delay_min, delay_max) = match int(obj, "delay") {
                    Some(d) => (d, d),
                    None => (
                        int(obj, "delay_min").unwrap_or(self.delay.0),
                        int(obj, "delay_max").unwrap_or(self.delay.1),
                    ),
                };
                AcousticKind::Delayed {
                    factory,
                    delay_min,
                    delay_max,
                }
            }
            "simultaneous" => AcousticKind::Simultaneous(self.list(&name, obj)?),
            "probability" => AcousticKind::Probability(self.weighted(&name, obj)?),
            "event" => {
                let mut map = BTreeMap::new();
                for (key, child) in self.map(&name, obj)? {
                    let event = AcousticEvent::from_name(key)
                        .ok_or_else(|| AcousticError::UnknownEvent(key.clone()))?;
                    map.insert(event, Arc::new(self.dispatch(child_name(&name, key), child)?));
                }
                AcousticKind::EventSelector(map)
            }
            other => return Err(AcousticError::UnknownType(other.to_string())),
        };
        Ok(Acoustic::new(name, kind))
    }

    fn inline(&self, name: RegistryKey, sound: &str) -> Result<Acoustic, AcousticError> {
        let sound = RegistryKey::resolve(&self.namespace, sound)?;
        if !self.registry.contains(&sound) {
            return Err(AcousticError::UnknownSound(sound));
        }
        let builder = SoundBuilder::with_category(sound, SoundCategory::Neutral);
        Ok(Acoustic::new(
            name,
            AcousticKind::Simple(AcousticFactory::new(builder)),
        ))
    }

    fn builder(
        &self,
        acoustic: &RegistryKey,
        obj: &Map<String, Value>,
    ) -> Result<SoundBuilder, AcousticError> {
        let sound = match obj.get("name") {
            Some(Value::String(s)) if !s.trim().is_empty() => RegistryKey::resolve(&self.namespace, s)?,
            _ => return Err(shape(acoustic, "a non-empty `name`")),
        };

        let category = match obj.get("category") {
            Some(Value::String(c)) => Some(
                SoundCategory::from_name(c)
                    .ok_or_else(|| AcousticError::UnknownCategory(c.clone()))?,
            ),
            Some(_) => return Err(shape(acoustic, "`category` to be a string")),
            None => None,
        };
        let mut builder = SoundBuilder::registered(self.registry, sound, SoundCategory::Neutral);
        if let Some(category) = category {
            builder.set_category(category);
        }

        match percent(obj, "pitch") {
            Some(p) => builder.set_pitch(p),
            None => builder.set_pitch_range(
                percent(obj, "pitch_min").unwrap_or(self.pitch.0),
                percent(obj, "pitch_max").unwrap_or(self.pitch.1),
            ),
        };
        match percent(obj, "volume") {
            Some(v) => builder.set_volume(v),
            None => builder.set_volume_range(
                percent(obj, "vol_min").unwrap_or(self.volume.0),
                percent(obj, "vol_max").unwrap_or(self.volume.1),
            ),
        };
        Ok(builder)
    }

    fn list(
        &self,
        name: &RegistryKey,
        obj: &Map<String, Value>,
    ) -> Result<Vec<Arc<Acoustic>>, AcousticError> {
        let Some(array) = obj.get("array") else {
            return Ok(Vec::new());
        };
        let array = array
            .as_array()
            .ok_or_else(|| shape(name, "`array` to be an array"))?;
        let mut out = Vec::with_capacity(array.len());
        for (i, value) in array.iter().enumerate() {
            match self.dispatch(child_name(name, &i.to_string()), value) {
                Ok(a) => out.push(Arc::new(a)),
                Err(err) => warn!(acoustic = %name, index = i, %err, "Skipping array entry"),
            }
        }
        Ok(out)
    }

    fn map<'v>(
        &self,
        name: &RegistryKey,
        obj: &'v Map<String, Value>,
    ) -> Result<&'v Map<String, Value>, AcousticError> {
        obj.get("map")
            .and_then(Value::as_object)
            .ok_or_else(|| shape(name, "a `map` object"))
    }

    /// Probability entries come from `map` (weight keys) and/or `array`
    /// (objects carrying `weight`, optional `conditions` and `acoustic`).
    fn weighted(
        &self,
        name: &RegistryKey,
        obj: &Map<String, Value>,
    ) -> Result<Vec<WeightedAcoustic>, AcousticError> {
        let mut out = Vec::new();
        if obj.contains_key("map") {
            for (key, child) in self.map(name, obj)? {
                let weight = key
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| AcousticError::Weight(key.clone()))?;
                out.push(WeightedAcoustic {
                    weight,
                    condition: Condition::Always,
                    acoustic: Arc::new(self.dispatch(child_name(name, key), child)?),
                });
            }
        }
        if let Some(array) = obj.get("array") {
            let array = array
                .as_array()
                .ok_or_else(|| shape(name, "`array` to be an array"))?;
            for (i, entry) in array.iter().enumerate() {
                let entry = entry
                    .as_object()
                    .ok_or_else(|| shape(name, "weighted entries to be objects"))?;
                let weight = match entry.get("weight") {
                    Some(w) => w
                        .as_u64()
                        .and_then(|w| u32::try_from(w).ok())
                        .ok_or_else(|| AcousticError::Weight(w.to_string()))?,
                    None => 1,
                };
                let condition = match entry.get("conditions") {
                    Some(Value::String(c)) => Condition::parse(c)?,
                    Some(_) => return Err(shape(name, "`conditions` to be a string")),
                    None => Condition::Always,
                };
                let child = entry
                    .get("acoustic")
                    .ok_or_else(|| shape(name, "weighted entries to carry `acoustic`"))?;
                out.push(WeightedAcoustic {
                    weight,
                    condition,
                    acoustic: Arc::new(self.dispatch(child_name(name, &i.to_string()), child)?),
                });
            }
        }
        Ok(out)
    }
}

fn child_name(parent: &RegistryKey, suffix: &str) -> RegistryKey {
    let suffix: String = suffix
        .to_ascii_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    RegistryKey::new(parent.namespace(), &format!("{}/{}", parent.path(), suffix))
        .unwrap_or_else(|_| parent.clone())
}

fn percent(obj: &Map<String, Value>, key: &str) -> Option<f32> {
    obj.get(key).and_then(Value::as_f64).map(|v| v as f32 / 100.0)
}

fn int(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    obj.get(key)
        .and_then(Value::as_u64)
        .map(|v| u32::try_from(v).unwrap_or(u32::MAX))
}
