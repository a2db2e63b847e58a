//! Scripted scenes: a small world plus entities that follow a list of actions.

use glam::DVec3;
use mdambient_core::{ConditionFlags, EntityId, ItemStack, RegistryKey};
use mdambient_effects::{EntitySnapshot, EntityView, Viewer};
use mdambient_world::{BlockId, BlockPos, SparseWorld, BLOCK_STONE};
use std::collections::VecDeque;

/// Height of the floor surface in [`Scene::flat`]; entities stand at this y.
pub const FLOOR_Y: i32 = 64;

/// Ticks a scripted swing lasts.
const SWING_TICKS: u32 = 6;

/// One scripted step.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Walk in a straight line at `speed` blocks per tick.
    MoveTo {
        /// Destination feet position.
        target: DVec3,
        /// Blocks per tick.
        speed: f64,
    },
    /// Stand still.
    Wait(u64),
    /// Start a hand swing.
    Swing,
    /// Change the selected hotbar slot.
    SelectSlot(u8),
    /// Put a stack in the main hand.
    Hold(Option<ItemStack>),
    /// Start or stop using an item.
    UseItem(Option<ItemStack>),
    /// Set remaining air.
    SetAir(i32),
    /// The entity dies.
    Kill,
}

/// An entity and the actions it still has to perform.
#[derive(Debug, Clone)]
pub struct ScriptedEntity {
    snapshot: EntitySnapshot,
    script: VecDeque<Action>,
    waiting: u64,
    swing_ticks: u32,
}

impl ScriptedEntity {
    /// Entity with an empty script.
    pub fn new(snapshot: EntitySnapshot) -> Self {
        Self {
            snapshot,
            script: VecDeque::new(),
            waiting: 0,
            swing_ticks: 0,
        }
    }

    /// Queue an action.
    pub fn then(mut self, action: Action) -> Self {
        self.script.push_back(action);
        self
    }

    /// Queue an action on an entity already in a scene.
    pub fn push(&mut self, action: Action) -> &mut Self {
        self.script.push_back(action);
        self
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> &EntitySnapshot {
        &self.snapshot
    }

    /// Mutable snapshot, for poking flags the script has no action for.
    pub fn snapshot_mut(&mut self) -> &mut EntitySnapshot {
        &mut self.snapshot
    }

    /// True once every action ran.
    pub fn finished(&self) -> bool {
        self.script.is_empty() && self.waiting == 0
    }

    /// Advance the script by one tick.
    pub fn step(&mut self) {
        let s = &mut self.snapshot;
        s.motion = DVec3::ZERO;
        if self.swing_ticks > 0 {
            self.swing_ticks -= 1;
            s.swing_progress += 1;
            s.swinging = self.swing_ticks > 0;
        }
        if self.waiting > 0 {
            self.waiting -= 1;
            return;
        }

        // Instant actions run back to back until one takes time.
        while let Some(action) = self.script.pop_front() {
            match action {
                Action::MoveTo { target, speed } => {
                    let delta = target - s.position;
                    let distance = delta.length();
                    if distance <= speed || speed <= 0.0 {
                        s.motion = delta;
                        s.position = target;
                    } else {
                        s.motion = delta / distance * speed;
                        s.position += s.motion;
                        self.script.push_front(Action::MoveTo { target, speed });
                    }
                    let horizontal = DVec3::new(s.motion.x, 0.0, s.motion.z);
                    if horizontal.length_squared() > 0.0 {
                        s.look = horizontal.normalize();
                        s.yaw = (-s.motion.x).atan2(s.motion.z).to_degrees() as f32;
                    }
                    return;
                }
                Action::Wait(ticks) => {
                    self.waiting = ticks.saturating_sub(1);
                    return;
                }
                Action::Swing => {
                    s.swinging = true;
                    s.swing_progress = 0;
                    self.swing_ticks = SWING_TICKS;
                }
                Action::SelectSlot(slot) => s.selected_slot = slot,
                Action::Hold(stack) => s.main_hand = stack,
                Action::UseItem(stack) => s.active_item = stack,
                Action::SetAir(air) => s.air = air,
                Action::Kill => s.alive = false,
            }
        }
    }
}

/// A world, the scripted entities in it and the local player.
#[derive(Debug, Clone)]
pub struct Scene {
    /// Voxel contents.
    pub world: SparseWorld,
    /// Weather and time flags.
    pub flags: ConditionFlags,
    entities: Vec<ScriptedEntity>,
    player: EntityId,
    next_id: u32,
}

impl Scene {
    /// Stone floor spanning `radius` blocks around the origin, top face at
    /// [`FLOOR_Y`], with the local player standing at the origin block.
    pub fn flat(radius: i32) -> Self {
        let mut world = SparseWorld::new();
        world.fill(
            BlockPos::new(-radius, FLOOR_Y - 1, -radius),
            BlockPos::new(radius, FLOOR_Y - 1, radius),
            BLOCK_STONE,
        );
        let player = EntityId(1);
        let snapshot = EntitySnapshot::player(player, DVec3::new(0.5, FLOOR_Y as f64, 0.5));
        Self {
            world,
            flags: ConditionFlags::new(),
            entities: vec![ScriptedEntity::new(snapshot)],
            player,
            next_id: 2,
        }
    }

    /// Place `block` over an inclusive box.
    pub fn fill(&mut self, a: BlockPos, b: BlockPos, block: BlockId) -> &mut Self {
        self.world.fill(a, b, block);
        self
    }

    /// Id of the local player.
    pub fn player_id(&self) -> EntityId {
        self.player
    }

    /// The local player's script. The player is always the first entity.
    pub fn player(&mut self) -> &mut ScriptedEntity {
        &mut self.entities[0]
    }

    /// Add a mob of `kind` at `position` and return its id.
    pub fn spawn(
        &mut self,
        kind: &'static str,
        position: DVec3,
        script: impl FnOnce(ScriptedEntity) -> ScriptedEntity,
    ) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        let snapshot = EntitySnapshot::new(id, RegistryKey::minecraft(kind), position);
        self.entities.push(script(ScriptedEntity::new(snapshot)));
        id
    }

    /// Remove an entity entirely, as if it unloaded. The local player stays.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if id == self.player {
            return false;
        }
        let before = self.entities.len();
        self.entities.retain(|e| e.snapshot.id != id);
        self.entities.len() != before
    }

    /// Scripted entity by id.
    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut ScriptedEntity> {
        self.entities.iter_mut().find(|e| e.snapshot.id == id)
    }

    /// Advance every script by one tick.
    pub fn step(&mut self) {
        for entity in &mut self.entities {
            entity.step();
        }
    }

    /// Entity view for the current tick.
    pub fn view(&self) -> EntityView {
        let mut view = EntityView::new();
        for entity in &self.entities {
            view.insert(entity.snapshot.clone());
        }
        view
    }

    /// Viewer standing where the local player is.
    pub fn viewer(&self) -> Viewer {
        Viewer::at(self.entities[0].snapshot.position).with_entity(self.player)
    }
}
