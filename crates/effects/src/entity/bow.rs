use super::{EntityEffect, EntitySnapshot, ItemLibrary, ItemSound};
use crate::context::TickContext;
use mdambient_core::ItemStack;
use std::sync::Arc;

/// Draw sound when an entity starts using a bow, crossbow or shield.
pub struct BowEffect {
    items: Arc<ItemLibrary>,
    last_active: Option<ItemStack>,
}

impl BowEffect {
    pub const NAME: &'static str = "bow";

    pub fn new(items: Arc<ItemLibrary>) -> Self {
        Self {
            items,
            last_active: None,
        }
    }
}

impl EntityEffect for BowEffect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
        let current = entity.active_item.as_ref().filter(|stack| !stack.is_empty());
        let Some(current) = current else {
            self.last_active = None;
            return;
        };
        if self.last_active.as_ref() == Some(current) {
            return;
        }
        if current.item_type.is_ranged_or_guard() {
            self.items
                .for_item(current.item_type)
                .play(ItemSound::Use, entity, ctx);
        }
        self.last_active = Some(current.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{TestTick, Viewer};
    use glam::DVec3;
    use mdambient_core::{EntityId, ItemType, RegistryKey};
    use mdambient_world::SparseWorld;

    #[test]
    fn drawing_plays_once_per_new_active_item() {
        let mut acoustics = TestTick::acoustics();
        let mut effect = BowEffect::new(Arc::new(ItemLibrary::new(&mut acoustics)));
        let mut skeleton = EntitySnapshot::new(EntityId(4), RegistryKey::minecraft("skeleton"), DVec3::new(2.5, 64.0, 0.5));
        let mut harness = TestTick::new(SparseWorld::new(), Viewer::at(DVec3::new(0.5, 64.0, 0.5)));

        skeleton.active_item = Some(ItemStack::new(ItemType::Bow, 1));
        for tick in 0..5 {
            effect.update(&skeleton, &mut harness.ctx(tick));
        }
        assert_eq!(harness.audio.stats().submitted, 1);

        skeleton.active_item = None;
        effect.update(&skeleton, &mut harness.ctx(5));
        skeleton.active_item = Some(ItemStack::new(ItemType::Bow, 1));
        effect.update(&skeleton, &mut harness.ctx(6));
        assert_eq!(harness.audio.stats().submitted, 2);

        skeleton.active_item = Some(ItemStack::new(ItemType::Food(mdambient_core::FoodType::Apple), 1));
        effect.update(&skeleton, &mut harness.ctx(7));
        assert_eq!(harness.audio.stats().submitted, 2);
    }

    #[test]
    fn held_draw_is_voiced_once_over_a_hundred_ticks() {
        let mut acoustics = TestTick::acoustics();
        let mut effect = BowEffect::new(Arc::new(ItemLibrary::new(&mut acoustics)));
        let mut guard = EntitySnapshot::new(EntityId(5), RegistryKey::minecraft("pillager"), DVec3::new(1.5, 64.0, 0.5));
        let mut harness = TestTick::new(SparseWorld::new(), Viewer::at(DVec3::new(0.5, 64.0, 0.5)));

        guard.active_item = Some(ItemStack::new(ItemType::Bow, 1));
        for tick in 0..100 {
            effect.update(&guard, &mut harness.ctx(tick));
        }
        assert_eq!(harness.audio.stats().submitted, 1);
    }
}
