use super::{EntityEffect, EntitySnapshot, ItemLibrary, ItemSound};
use crate::context::TickContext;
use mdambient_core::{ItemStack, ItemType};
use std::sync::Arc;

fn held_type(stack: Option<&ItemStack>) -> Option<ItemType> {
    stack.filter(|s| !s.is_empty()).map(|s| s.item_type)
}

/// Equip sounds when a player changes what is in either hand.
pub struct ToolbarEffect {
    items: Arc<ItemLibrary>,
    last_slot: u8,
    last_main: Option<ItemType>,
    last_off: Option<ItemType>,
}

impl ToolbarEffect {
    pub const NAME: &'static str = "toolbar";

    /// Start tracking from what `player` holds now, so attaching is silent.
    pub fn new(items: Arc<ItemLibrary>, player: &EntitySnapshot) -> Self {
        Self {
            items,
            last_slot: player.selected_slot,
            last_main: held_type(player.main_hand.as_ref()),
            last_off: held_type(player.off_hand.as_ref()),
        }
    }

    fn equip(&self, stack: Option<&ItemStack>, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
        if let Some(data) = self.items.for_stack(stack) {
            data.play(ItemSound::Equip, entity, ctx);
        }
    }
}

impl EntityEffect for ToolbarEffect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
        let main = held_type(entity.main_hand.as_ref());
        if entity.selected_slot != self.last_slot || main != self.last_main {
            self.equip(entity.main_hand.as_ref(), entity, ctx);
            self.last_main = main;
        }
        self.last_slot = entity.selected_slot;

        let off = held_type(entity.off_hand.as_ref());
        if off != self.last_off {
            self.equip(entity.off_hand.as_ref(), entity, ctx);
            self.last_off = off;
        }
    }

    fn describe(&self) -> String {
        format!("{} (slot {})", Self::NAME, self.last_slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{TestTick, Viewer};
    use glam::DVec3;
    use mdambient_core::{EntityId, ToolMaterial, ToolType};
    use mdambient_world::SparseWorld;

    #[test]
    fn equips_on_slot_and_hand_changes_only() {
        let mut acoustics = TestTick::acoustics();
        let items = Arc::new(ItemLibrary::new(&mut acoustics));
        let mut player = EntitySnapshot::player(EntityId(1), DVec3::new(0.5, 64.0, 0.5));
        player.main_hand = Some(ItemStack::new(ItemType::Tool(ToolType::Pickaxe, ToolMaterial::Stone), 1));
        let mut harness = TestTick::new(SparseWorld::new(), Viewer::at(player.position).with_entity(player.id));
        let mut effect = ToolbarEffect::new(items, &player);

        effect.update(&player, &mut harness.ctx(0));
        assert_eq!(harness.audio.stats().submitted, 0);

        player.selected_slot = 3;
        player.main_hand = None;
        effect.update(&player, &mut harness.ctx(1));
        assert_eq!(harness.audio.stats().submitted, 0, "empty hands are silent");

        player.main_hand = Some(ItemStack::new(ItemType::Shield, 1));
        effect.update(&player, &mut harness.ctx(2));
        assert_eq!(harness.audio.stats().submitted, 1);

        player.off_hand = Some(ItemStack::new(ItemType::Block(4), 12));
        effect.update(&player, &mut harness.ctx(3));
        effect.update(&player, &mut harness.ctx(4));
        assert_eq!(harness.audio.stats().submitted, 2);
    }

    #[test]
    fn holding_the_same_item_equips_once() {
        let mut acoustics = TestTick::acoustics();
        let items = Arc::new(ItemLibrary::new(&mut acoustics));
        let mut player = EntitySnapshot::player(EntityId(1), DVec3::new(0.5, 64.0, 0.5));
        let mut harness = TestTick::new(SparseWorld::new(), Viewer::at(player.position).with_entity(player.id));
        let mut effect = ToolbarEffect::new(items, &player);

        player.main_hand = Some(ItemStack::new(ItemType::Tool(ToolType::Sword, ToolMaterial::Iron), 1));
        for tick in 0..100 {
            effect.update(&player, &mut harness.ctx(tick));
        }
        assert_eq!(harness.audio.stats().submitted, 1);
    }
}
