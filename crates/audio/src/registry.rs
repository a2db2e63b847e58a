//! Registry of known sound events and their metadata.

use crate::SoundCategory;
use mdambient_core::RegistryKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distance in blocks over which a linear-attenuated sound fades out.
pub const DEFAULT_ATTENUATION_DISTANCE: u32 = 16;

/// A playable sound resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoundEvent {
    /// Sound resource name
    pub key: RegistryKey,
    /// Category from sound metadata, if the resource declares one
    #[serde(default)]
    pub category: Option<SoundCategory>,
    /// Audible distance for linear attenuation
    #[serde(default = "default_attenuation_distance")]
    pub attenuation_distance: u32,
    /// Nominal clip length in ticks
    #[serde(default = "default_length_ticks")]
    pub length_ticks: u32,
}

fn default_attenuation_distance() -> u32 {
    DEFAULT_ATTENUATION_DISTANCE
}

fn default_length_ticks() -> u32 {
    40
}

impl SoundEvent {
    /// Event with default metadata.
    pub fn new(key: RegistryKey) -> Self {
        Self {
            key,
            category: None,
            attenuation_distance: DEFAULT_ATTENUATION_DISTANCE,
            length_ticks: default_length_ticks(),
        }
    }

    /// Builder-style category override.
    pub fn with_category(mut self, category: SoundCategory) -> Self {
        self.category = Some(category);
        self
    }
}

/// Name to sound event table.
#[derive(Debug, Clone, Default)]
pub struct SoundRegistry {
    sounds: BTreeMap<RegistryKey, SoundEvent>,
}

impl SoundRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding the vanilla sounds referenced by the built-in effects.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for path in [
            "block.fire.ambient",
            "block.lava.ambient",
            "block.lava.pop",
            "block.fire.extinguish",
            "entity.player.attack.sweep",
            "entity.player.attack.nodamage",
            "entity.player.breath",
            "item.armor.equip_generic",
            "item.crossbow.loading_start",
            "item.shield.block",
            "entity.arrow.shoot",
        ] {
            registry.register(SoundEvent::new(RegistryKey::minecraft(path)));
        }
        registry
    }

    /// Add or replace a sound.
    pub fn register(&mut self, event: SoundEvent) {
        self.sounds.insert(event.key.clone(), event);
    }

    /// Look up a sound.
    pub fn get(&self, key: &RegistryKey) -> Option<&SoundEvent> {
        self.sounds.get(key)
    }

    /// True when `key` names a registered sound.
    pub fn contains(&self, key: &RegistryKey) -> bool {
        self.sounds.contains_key(key)
    }

    /// Category declared by the sound's metadata, or `default`.
    pub fn category_of(&self, key: &RegistryKey, default: SoundCategory) -> SoundCategory {
        self.sounds
            .get(key)
            .and_then(|e| e.category)
            .unwrap_or(default)
    }

    /// Attenuation distance of a sound, defaulting for unknown names.
    pub fn attenuation_distance(&self, key: &RegistryKey) -> u32 {
        self.sounds
            .get(key)
            .map(|e| e.attenuation_distance)
            .unwrap_or(DEFAULT_ATTENUATION_DISTANCE)
    }

    /// Iterate registered sounds in key order.
    pub fn iter(&self) -> impl Iterator<Item = &SoundEvent> {
        self.sounds.values()
    }

    /// Number of registered sounds.
    pub fn len(&self) -> usize {
        self.sounds.len()
    }

    /// True when no sounds are registered.
    pub fn is_empty(&self) -> bool {
        self.sounds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_falls_back_to_default() {
        let mut registry = SoundRegistry::new();
        let ambient = RegistryKey::local("waterfall/2");
        registry.register(SoundEvent::new(ambient.clone()).with_category(SoundCategory::Ambient));
        let plain = RegistryKey::local("plain");
        registry.register(SoundEvent::new(plain.clone()));

        assert_eq!(
            registry.category_of(&ambient, SoundCategory::Neutral),
            SoundCategory::Ambient
        );
        assert_eq!(
            registry.category_of(&plain, SoundCategory::Neutral),
            SoundCategory::Neutral
        );
        assert_eq!(
            registry.category_of(&RegistryKey::local("missing"), SoundCategory::Block),
            SoundCategory::Block
        );
    }

    #[test]
    fn sound_event_metadata_deserializes_with_defaults() {
        let event: SoundEvent =
            serde_json::from_str(r#"{ "key": "minecraft:block.fire.ambient" }"#).unwrap();
        assert_eq!(event.attenuation_distance, DEFAULT_ATTENUATION_DISTANCE);
        assert_eq!(event.category, None);
    }
}
