use super::{EntityEffect, EntitySnapshot, ItemClass, ItemLibrary};
use crate::context::TickContext;
use mdambient_physics::{BlockMode, BlockRayTrace, FluidMode};
use std::sync::Arc;

/// Ticks after a right-click on a block during which swings stay silent.
pub const RIGHT_CLICK_GRACE: u64 = 5;

/// Swoosh when the local player starts swinging at nothing. Other entities
/// carry the effect but never voice it.
pub struct SwingEffect {
    items: Arc<ItemLibrary>,
    swing_progress: u32,
    is_swinging: bool,
}

impl SwingEffect {
    pub const NAME: &'static str = "swing";

    pub fn new(items: Arc<ItemLibrary>) -> Self {
        Self {
            items,
            swing_progress: 0,
            is_swinging: false,
        }
    }

    fn click_ok(entity: &EntitySnapshot, ctx: &TickContext<'_>) -> bool {
        if !ctx.is_local(entity.id) {
            return false;
        }
        entity
            .last_use_tick
            .map_or(true, |last| ctx.tick.since(last) > RIGHT_CLICK_GRACE)
    }

    /// The swing does not reach any block outline.
    fn free_swing(entity: &EntitySnapshot, ctx: &TickContext<'_>) -> bool {
        let eyes = entity.eye_position();
        let end = eyes + entity.look * entity.reach();
        let trace = BlockRayTrace::between(ctx.world, eyes, end, BlockMode::Outline, FluidMode::SourceOnly);
        !trace.trace().is_hit()
    }
}

impl EntityEffect for SwingEffect {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn update(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
        if entity.riding_boat {
            return;
        }
        if entity.swinging && entity.swing_progress > self.swing_progress {
            if !self.is_swinging && Self::click_ok(entity, ctx) && Self::free_swing(entity, ctx) {
                let data = self
                    .items
                    .for_stack(entity.main_hand.as_ref())
                    .unwrap_or_else(|| self.items.get(ItemClass::None));
                data.play(super::ItemSound::Swing, entity, ctx);
            }
            self.is_swinging = true;
        } else {
            self.is_swinging = false;
        }
        self.swing_progress = entity.swing_progress;
    }

    fn describe(&self) -> String {
        format!("{} (progress {}, swinging {})", Self::NAME, self.swing_progress, self.is_swinging)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{TestTick, Viewer};
    use glam::DVec3;
    use mdambient_core::{EntityId, ItemStack, ItemType, SimTick, ToolMaterial, ToolType};
    use mdambient_world::{BlockPos, SparseWorld, BLOCK_STONE};

    fn setup() -> (TestTick, SwingEffect, EntitySnapshot) {
        let mut acoustics = TestTick::acoustics();
        let items = Arc::new(ItemLibrary::new(&mut acoustics));
        let mut player = EntitySnapshot::player(EntityId(1), DVec3::new(0.5, 64.0, 0.5));
        player.main_hand = Some(ItemStack::new(ItemType::Tool(ToolType::Sword, ToolMaterial::Iron), 1));
        let viewer = Viewer::at(player.position).with_entity(player.id);
        (TestTick::new(SparseWorld::new(), viewer), SwingEffect::new(items), player)
    }

    fn swing(effect: &mut SwingEffect, harness: &mut TestTick, player: &mut EntitySnapshot, start: u64) {
        for (i, progress) in [1, 2, 3, 0].into_iter().enumerate() {
            player.swinging = progress != 0;
            player.swing_progress = progress;
            effect.update(player, &mut harness.ctx(start + i as u64));
        }
    }

    #[test]
    fn one_sound_per_swing_into_air() {
        let (mut harness, mut effect, mut player) = setup();
        swing(&mut effect, &mut harness, &mut player, 100);
        assert_eq!(harness.audio.stats().submitted, 1);
        swing(&mut effect, &mut harness, &mut player, 200);
        assert_eq!(harness.audio.stats().submitted, 2);
    }

    #[test]
    fn swings_at_blocks_and_after_clicks_are_silent() {
        let (mut harness, mut effect, mut player) = setup();
        player.last_use_tick = Some(SimTick(98));
        swing(&mut effect, &mut harness, &mut player, 100);
        assert_eq!(harness.audio.stats().submitted, 0);

        player.last_use_tick = None;
        harness.world.set_block(BlockPos::new(0, 65, 2), BLOCK_STONE);
        swing(&mut effect, &mut harness, &mut player, 200);
        assert_eq!(harness.audio.stats().submitted, 0);
    }

    #[test]
    fn only_the_local_player_swooshes() {
        let (mut harness, mut effect, _) = setup();
        let mut zombie = EntitySnapshot::new(
            EntityId(7),
            mdambient_core::RegistryKey::minecraft("zombie"),
            DVec3::new(3.5, 64.0, 0.5),
        );
        zombie.main_hand = Some(ItemStack::new(ItemType::Tool(ToolType::Sword, ToolMaterial::Iron), 1));
        swing(&mut effect, &mut harness, &mut zombie, 100);
        swing(&mut effect, &mut harness, &mut zombie, 200);
        assert_eq!(harness.audio.stats().submitted, 0);
    }

    #[test]
    fn boat_riders_never_swing() {
        let (mut harness, mut effect, mut player) = setup();
        player.riding_boat = true;
        swing(&mut effect, &mut harness, &mut player, 100);
        assert_eq!(harness.audio.stats().submitted, 0);
    }
}
