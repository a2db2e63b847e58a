use super::EntitySnapshot;
use crate::config::EffectsConfig;
use mdambient_core::{RegistryKey, DEFAULT_NAMESPACE};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Entity kind to the names of the effects it gets.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EffectLibrary {
    by_kind: BTreeMap<RegistryKey, BTreeSet<String>>,
    player: BTreeSet<String>,
    empty: BTreeSet<String>,
}

fn parse_names(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(|name| name.trim().to_ascii_lowercase())
        .filter(|name| !name.is_empty())
        .collect()
}

impl EffectLibrary {
    pub fn from_config(config: &EffectsConfig) -> Self {
        let mut library = Self {
            player: parse_names(&config.player_effects),
            ..Self::default()
        };
        for (kind, effects) in &config.entity_effects {
            match RegistryKey::resolve(DEFAULT_NAMESPACE, kind) {
                Ok(key) => {
                    library.by_kind.insert(key, parse_names(effects));
                }
                Err(err) => warn!(kind = %kind, "Skipping entity effects: {err}"),
            }
        }
        debug!(kinds = library.by_kind.len(), "Effect library built");
        library
    }

    /// Effects assigned to an entity. Players use the player assignment
    /// whatever their kind says.
    pub fn effects_for(&self, entity: &EntitySnapshot) -> &BTreeSet<String> {
        if entity.is_player {
            return &self.player;
        }
        self.by_kind.get(&entity.kind).unwrap_or(&self.empty)
    }

    pub fn has_effect(&self, entity: &EntitySnapshot, name: &str) -> bool {
        self.effects_for(entity).contains(name)
    }
}
