//! Item classes and the swing, use and equip acoustics they play.

use super::EntitySnapshot;
use crate::context::TickContext;
use mdambient_audio::{Acoustic, AcousticEvent, AcousticLibrary, SoundCategory, SoundHandle};
use mdambient_core::{ItemStack, ItemType, ToolType};
use std::fmt;
use std::sync::Arc;

/// Volume scale for item sounds made by anyone but the local player.
pub const OTHER_ENTITY_VOLUME_SCALE: f32 = 0.75;

/// Sound family of an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ItemClass {
    /// Anything without a dedicated class; only equips make a sound.
    None,
    Sword,
    Axe,
    Tool,
    Bow,
    Crossbow,
    Shield,
}

impl ItemClass {
    pub const ALL: [ItemClass; 7] = [
        ItemClass::None,
        ItemClass::Sword,
        ItemClass::Axe,
        ItemClass::Tool,
        ItemClass::Bow,
        ItemClass::Crossbow,
        ItemClass::Shield,
    ];

    pub fn of(item: ItemType) -> Self {
        match item {
            ItemType::Tool(ToolType::Sword, _) => ItemClass::Sword,
            ItemType::Tool(ToolType::Axe, _) => ItemClass::Axe,
            ItemType::Tool(_, _) => ItemClass::Tool,
            ItemType::Bow => ItemClass::Bow,
            ItemType::Crossbow => ItemClass::Crossbow,
            ItemType::Shield => ItemClass::Shield,
            ItemType::Block(_) | ItemType::Food(_) | ItemType::Item(_) => ItemClass::None,
        }
    }

    /// Acoustic names for swing, use and equip. `None` plays nothing.
    fn acoustic_names(self) -> [Option<&'static str>; 3] {
        match self {
            ItemClass::None => [None, None, Some("utility.equip")],
            ItemClass::Sword => [Some("sword.swing"), None, Some("sword.equip")],
            ItemClass::Axe => [Some("axe.swing"), None, Some("axe.equip")],
            ItemClass::Tool => [Some("tool.swing"), None, Some("tool.equip")],
            ItemClass::Bow => [Some("tool.swing"), Some("bow.pull"), Some("bow.equip")],
            ItemClass::Crossbow => [Some("tool.swing"), Some("crossbow.pull"), Some("bow.equip")],
            ItemClass::Shield => [Some("tool.swing"), Some("shield.use"), Some("shield.equip")],
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ItemClass::None => "none",
            ItemClass::Sword => "sword",
            ItemClass::Axe => "axe",
            ItemClass::Tool => "tool",
            ItemClass::Bow => "bow",
            ItemClass::Crossbow => "crossbow",
            ItemClass::Shield => "shield",
        }
    }
}

impl fmt::Display for ItemClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which of an item's sounds to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemSound {
    Swing,
    Use,
    Equip,
}

impl ItemSound {
    fn event(self) -> AcousticEvent {
        match self {
            ItemSound::Swing => AcousticEvent::Swing,
            ItemSound::Use => AcousticEvent::Use,
            ItemSound::Equip => AcousticEvent::Equip,
        }
    }
}

/// Resolved acoustics of one item class.
#[derive(Debug, Clone)]
pub struct ItemData {
    class: ItemClass,
    swing: Arc<Acoustic>,
    use_: Arc<Acoustic>,
    equip: Arc<Acoustic>,
}

impl ItemData {
    fn resolve(class: ItemClass, library: &mut AcousticLibrary) -> Self {
        let [swing, use_, equip] = class.acoustic_names().map(|name| match name {
            Some(name) => library.resolve_default(name),
            None => library.null(),
        });
        Self {
            class,
            swing,
            use_,
            equip,
        }
    }

    pub fn class(&self) -> ItemClass {
        self.class
    }

    pub fn acoustic(&self, sound: ItemSound) -> &Arc<Acoustic> {
        match sound {
            ItemSound::Swing => &self.swing,
            ItemSound::Use => &self.use_,
            ItemSound::Equip => &self.equip,
        }
    }

    /// Play one of the item's sounds for `entity`.
    ///
    /// The local player hears an unpositioned toolbar sound; anyone else is
    /// heard at their position, a little quieter.
    pub fn play(
        &self,
        sound: ItemSound,
        entity: &EntitySnapshot,
        ctx: &mut TickContext<'_>,
    ) -> Option<SoundHandle> {
        let factory = self.acoustic(sound).factory(sound.event(), ctx.flags, ctx.rng)?;
        let instance = if ctx.is_local(entity.id) {
            let mut instance = factory.create_sound(ctx.rng);
            instance.category = SoundCategory::Toolbar;
            instance
        } else {
            let mut instance = factory.create_sound_at(entity.position, ctx.rng);
            instance.volume *= OTHER_ENTITY_VOLUME_SCALE;
            instance
        };
        ctx.play_instance(instance).handle
    }
}

/// Item class to resolved acoustics.
#[derive(Debug, Clone)]
pub struct ItemLibrary {
    data: [ItemData; 7],
}

impl ItemLibrary {
    pub fn new(library: &mut AcousticLibrary) -> Self {
        Self {
            data: ItemClass::ALL.map(|class| ItemData::resolve(class, library)),
        }
    }

    pub fn get(&self, class: ItemClass) -> &ItemData {
        // ALL lists the classes in declaration order.
        &self.data[class as usize]
    }

    pub fn for_item(&self, item: ItemType) -> &ItemData {
        self.get(ItemClass::of(item))
    }

    /// Data for a held stack; `None` for an empty hand.
    pub fn for_stack(&self, stack: Option<&ItemStack>) -> Option<&ItemData> {
        stack
            .filter(|s| !s.is_empty())
            .map(|s| self.for_item(s.item_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Viewer;
    use crate::defaults;
    use crate::particles::NullParticles;
    use crate::EffectsConfig;
    use glam::DVec3;
    use mdambient_audio::{AudioEngine, Attenuation};
    use mdambient_core::{ConditionFlags, EntityId, RegistryKey, SimTick, ToolMaterial, DEFAULT_NAMESPACE};
    use mdambient_world::SparseWorld;
    use rand::{rngs::StdRng, SeedableRng};

    fn library() -> ItemLibrary {
        let mut acoustics = AcousticLibrary::from_registry(defaults::sound_registry());
        acoustics.load_json(DEFAULT_NAMESPACE, defaults::ACOUSTICS_JSON).unwrap();
        ItemLibrary::new(&mut acoustics)
    }

    #[test]
    fn classes_follow_item_types() {
        assert_eq!(ItemClass::of(ItemType::Tool(ToolType::Sword, ToolMaterial::Iron)), ItemClass::Sword);
        assert_eq!(ItemClass::of(ItemType::Tool(ToolType::Shovel, ToolMaterial::Wood)), ItemClass::Tool);
        assert_eq!(ItemClass::of(ItemType::Block(3)), ItemClass::None);
        let items = library();
        for class in ItemClass::ALL {
            assert_eq!(items.get(class).class(), class);
        }
        assert!(items.get(ItemClass::None).acoustic(ItemSound::Swing).is_null());
        assert!(!items.get(ItemClass::None).acoustic(ItemSound::Equip).is_null());
        assert!(items.get(ItemClass::Sword).acoustic(ItemSound::Use).is_null());
        assert!(!items.get(ItemClass::Bow).acoustic(ItemSound::Use).is_null());
        assert!(items.for_stack(Some(&ItemStack::new(ItemType::Bow, 0))).is_none());
    }

    #[test]
    fn local_player_hears_unattenuated_toolbar_sound() {
        let items = library();
        let world = SparseWorld::new();
        let mut audio = AudioEngine::simulated(2);
        audio.set_listener_position(DVec3::new(0.5, 64.0 + crate::context::PLAYER_EYE_HEIGHT, 0.5));
        let mut particles = NullParticles;
        let mut rng = StdRng::seed_from_u64(1);
        let config = EffectsConfig::default();
        let flags = ConditionFlags::new();
        let player = EntitySnapshot::player(EntityId(1), DVec3::new(0.5, 64.0, 0.5));
        let zombie = EntitySnapshot::new(EntityId(2), RegistryKey::minecraft("zombie"), DVec3::new(3.5, 64.0, 0.5));
        let mut ctx = TickContext {
            tick: SimTick::ZERO,
            world: &world,
            audio: &mut audio,
            particles: &mut particles,
            rng: &mut rng,
            config: &config,
            flags: &flags,
            viewer: Viewer::at(player.position).with_entity(player.id),
        };

        let sword = items.get(ItemClass::Sword);
        let mine = sword.play(ItemSound::Swing, &player, &mut ctx).unwrap();
        let theirs = sword.play(ItemSound::Swing, &zombie, &mut ctx).unwrap();
        assert!(sword.play(ItemSound::Use, &player, &mut ctx).is_none());

        let tracked: Vec<_> = audio.tracked().map(|(h, t)| (*h, t.sound.clone())).collect();
        let mine = &tracked.iter().find(|(h, _)| *h == mine).unwrap().1;
        let theirs = &tracked.iter().find(|(h, _)| *h == theirs).unwrap().1;
        assert_eq!(mine.attenuation, Attenuation::None);
        assert_eq!(mine.category, SoundCategory::Toolbar);
        assert_ne!(theirs.attenuation, Attenuation::None);
        assert!(theirs.volume <= OTHER_ENTITY_VOLUME_SCALE);
    }
}
