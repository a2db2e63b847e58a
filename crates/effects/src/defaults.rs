//! Built-in sounds and acoustic definitions.

use mdambient_audio::{SoundCategory, SoundEvent, SoundRegistry};
use mdambient_core::RegistryKey;

/// Block materials that have a footstep acoustic (`footstep.<material>`).
pub const FOOTSTEP_MATERIALS: [&str; 9] = [
    "stone", "dirt", "grass", "sand", "gravel", "wood", "glass", "snow", "wool",
];

const FOOTSTEP_SOUNDS: [&str; 9] = [
    "footstep/stone",
    "footstep/dirt",
    "footstep/grass",
    "footstep/sand",
    "footstep/gravel",
    "footstep/wood",
    "footstep/glass",
    "footstep/snow",
    "footstep/wool",
];

const ITEM_SOUNDS: [&str; 9] = [
    "item/tool_swing",
    "item/tool_equip",
    "item/sword_swing",
    "item/sword_equip",
    "item/axe_swing",
    "item/axe_equip",
    "item/bow_pull",
    "item/bow_equip",
    "item/utility_equip",
];

const WATERFALL_SOUNDS: [&str; 6] = [
    "waterfall/0",
    "waterfall/1",
    "waterfall/2",
    "waterfall/3",
    "waterfall/4",
    "waterfall/5",
];

/// Sound registry with the vanilla sounds plus the engine's own.
pub fn sound_registry() -> SoundRegistry {
    let mut registry = SoundRegistry::with_defaults();
    for path in WATERFALL_SOUNDS {
        registry.register(SoundEvent::new(RegistryKey::local(path)).with_category(SoundCategory::Ambient));
    }
    for path in FOOTSTEP_SOUNDS {
        registry.register(SoundEvent::new(RegistryKey::local(path)).with_category(SoundCategory::Footsteps));
    }
    for path in ITEM_SOUNDS {
        registry.register(SoundEvent::new(RegistryKey::local(path)).with_category(SoundCategory::Toolbar));
    }
    for path in ["entity.player.swim", "entity.generic.splash"] {
        registry.register(SoundEvent::new(RegistryKey::minecraft(path)).with_category(SoundCategory::Player));
    }
    registry
}

/// Acoustic definitions compiled into every engine context, in the default
/// namespace.
pub const ACOUSTICS_JSON: &str = r#"{
  "footstep.stone": { "_type": "event", "map": {
    "walk":   { "name": "footstep/stone", "category": "footsteps", "vol_min": 25, "vol_max": 35 },
    "run":    { "name": "footstep/stone", "category": "footsteps", "vol_min": 35, "vol_max": 45, "pitch_min": 100, "pitch_max": 110 },
    "wander": { "name": "footstep/stone", "category": "footsteps", "volume": 15 } } },
  "footstep.dirt": { "_type": "event", "map": {
    "walk":   { "name": "footstep/dirt", "category": "footsteps", "vol_min": 25, "vol_max": 35 },
    "run":    { "name": "footstep/dirt", "category": "footsteps", "vol_min": 35, "vol_max": 45, "pitch_min": 100, "pitch_max": 110 },
    "wander": { "name": "footstep/dirt", "category": "footsteps", "volume": 15 } } },
  "footstep.grass": { "_type": "event", "map": {
    "walk":   { "name": "footstep/grass", "category": "footsteps", "vol_min": 25, "vol_max": 35 },
    "run":    { "name": "footstep/grass", "category": "footsteps", "vol_min": 35, "vol_max": 45, "pitch_min": 100, "pitch_max": 110 },
    "wander": { "name": "footstep/grass", "category": "footsteps", "volume": 15 } } },
  "footstep.sand": { "_type": "event", "map": {
    "walk":   { "name": "footstep/sand", "category": "footsteps", "vol_min": 25, "vol_max": 35 },
    "run":    { "name": "footstep/sand", "category": "footsteps", "vol_min": 35, "vol_max": 45 },
    "wander": { "name": "footstep/sand", "category": "footsteps", "volume": 15 } } },
  "footstep.gravel": { "_type": "event", "map": {
    "walk":   { "name": "footstep/gravel", "category": "footsteps", "vol_min": 25, "vol_max": 35 },
    "run":    { "name": "footstep/gravel", "category": "footsteps", "vol_min": 35, "vol_max": 45 },
    "wander": { "name": "footstep/gravel", "category": "footsteps", "volume": 15 } } },
  "footstep.wood": { "_type": "event", "map": {
    "walk":   { "name": "footstep/wood", "category": "footsteps", "vol_min": 25, "vol_max": 35 },
    "run":    { "name": "footstep/wood", "category": "footsteps", "vol_min": 35, "vol_max": 45, "pitch_min": 100, "pitch_max": 110 },
    "wander": { "name": "footstep/wood", "category": "footsteps", "volume": 15 } } },
  "footstep.glass": { "_type": "event", "map": {
    "walk":   { "name": "footstep/glass", "category": "footsteps", "vol_min": 20, "vol_max": 30, "pitch_min": 105, "pitch_max": 115 },
    "run":    { "name": "footstep/glass", "category": "footsteps", "vol_min": 30, "vol_max": 40, "pitch_min": 110, "pitch_max": 120 },
    "wander": { "name": "footstep/glass", "category": "footsteps", "volume": 10 } } },
  "footstep.snow": { "_type": "event", "map": {
    "walk":   { "name": "footstep/snow", "category": "footsteps", "vol_min": 20, "vol_max": 30 },
    "run":    { "name": "footstep/snow", "category": "footsteps", "vol_min": 30, "vol_max": 40 },
    "wander": { "name": "footstep/snow", "category": "footsteps", "volume": 10 } } },
  "footstep.wool": { "_type": "event", "map": {
    "walk":   { "name": "footstep/wool", "category": "footsteps", "vol_min": 15, "vol_max": 25 },
    "run":    { "name": "footstep/wool", "category": "footsteps", "vol_min": 25, "vol_max": 35 },
    "wander": { "name": "footstep/wool", "category": "footsteps", "volume": 10 } } },
  "footstep.swim": { "_type": "event", "map": {
    "swim": { "name": "@entity.player.swim", "category": "footsteps", "vol_min": 20, "vol_max": 30 },
    "walk": { "name": "@entity.generic.splash", "category": "footsteps", "vol_min": 10, "vol_max": 20 } } },

  "tool.swing":     { "name": "item/tool_swing", "category": "toolbar", "vol_min": 80, "vol_max": 100 },
  "tool.equip":     { "name": "item/tool_equip", "category": "toolbar" },
  "sword.swing":    { "name": "item/sword_swing", "category": "toolbar", "vol_min": 80, "vol_max": 100 },
  "sword.equip":    { "name": "item/sword_equip", "category": "toolbar" },
  "axe.swing":      { "name": "item/axe_swing", "category": "toolbar", "vol_min": 80, "vol_max": 100 },
  "axe.equip":      { "name": "item/axe_equip", "category": "toolbar" },
  "bow.pull":       { "name": "item/bow_pull", "category": "toolbar" },
  "bow.equip":      { "name": "item/bow_equip", "category": "toolbar" },
  "crossbow.pull":  { "name": "@item.crossbow.loading_start", "category": "toolbar" },
  "shield.use":     { "name": "@item.shield.block", "category": "toolbar", "volume": 60 },
  "shield.equip":   { "name": "@item.armor.equip_generic", "category": "toolbar" },
  "utility.equip":  { "name": "item/utility_equip", "category": "toolbar", "volume": 60 }
}"#;

#[cfg(test)]
mod tests {
    use super::*;
    use mdambient_audio::AcousticLibrary;
    use mdambient_core::DEFAULT_NAMESPACE;

    #[test]
    fn builtin_acoustics_compile_completely() {
        let mut library = AcousticLibrary::from_registry(sound_registry());
        let count = library.load_json(DEFAULT_NAMESPACE, ACOUSTICS_JSON).unwrap();
        assert_eq!(count, FOOTSTEP_MATERIALS.len() + 1 + 12);
        for material in FOOTSTEP_MATERIALS {
            let acoustic = library.resolve_default(&format!("footstep.{material}"));
            assert!(!acoustic.is_null(), "{material}");
        }
    }
}
