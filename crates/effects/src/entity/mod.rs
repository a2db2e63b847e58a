//! Per-entity effects and the managers that attach them.
//!
//! Entities are observed through [`EntitySnapshot`]s in an [`EntityView`]
//! arena keyed by [`EntityId`]. Effects and managers only ever hold the id; an
//! id missing from the view is an entity that has left.

mod bow;
mod breath;
mod footprint;
mod items;
mod library;
mod manager;
mod swing;
mod toolbar;

pub use bow::BowEffect;
pub use breath::BreathEffect;
pub use footprint::{FootprintEffect, FootstepLibrary, Generator};
pub use items::{ItemClass, ItemData, ItemLibrary, ItemSound};
pub use library::EffectLibrary;
pub use manager::{EffectManager, EntityEffectSystem, EntityStats};
pub use swing::{SwingEffect, RIGHT_CLICK_GRACE};
pub use toolbar::ToolbarEffect;

use crate::config::EffectToggles;
use crate::context::{TickContext, PLAYER_EYE_HEIGHT};
use glam::DVec3;
use mdambient_audio::AudioEngine;
use mdambient_core::{EntityId, ItemStack, RegistryKey, SimTick};
use std::collections::BTreeMap;
use std::sync::Arc;

/// What the engine can observe about one entity this tick.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub kind: RegistryKey,
    /// Feet position (bottom of the bounding box).
    pub position: DVec3,
    /// Motion in blocks per tick.
    pub motion: DVec3,
    /// Yaw in degrees.
    pub yaw: f32,
    /// Unit look vector.
    pub look: DVec3,
    pub eye_height: f64,
    pub width: f64,
    pub child: bool,

    pub alive: bool,
    pub is_player: bool,
    pub spectator: bool,
    pub invisible: bool,
    pub on_ground: bool,
    pub on_ladder: bool,
    pub riding_boat: bool,
    pub sneaking: bool,
    pub jumping: bool,
    /// Remaining air; zero or below means drowning.
    pub air: i32,
    pub fall_distance: f32,

    /// A hand swing is in progress.
    pub swinging: bool,
    /// Swing animation step; grows while the swing runs.
    pub swing_progress: u32,
    pub main_hand: Option<ItemStack>,
    pub off_hand: Option<ItemStack>,
    /// Item being drawn or raised.
    pub active_item: Option<ItemStack>,
    pub selected_slot: u8,
    /// Block reach, when known. Mobs fall back to `width * 2 + 0.6`.
    pub reach: Option<f64>,
    /// Tick of the last right-click on a block.
    pub last_use_tick: Option<SimTick>,
}

impl EntitySnapshot {
    /// Standing adult mob of `kind` at `position`, facing +Z.
    pub fn new(id: EntityId, kind: RegistryKey, position: DVec3) -> Self {
        Self {
            id,
            kind,
            position,
            motion: DVec3::ZERO,
            yaw: 0.0,
            look: DVec3::Z,
            eye_height: PLAYER_EYE_HEIGHT,
            width: 0.6,
            child: false,
            alive: true,
            is_player: false,
            spectator: false,
            invisible: false,
            on_ground: true,
            on_ladder: false,
            riding_boat: false,
            sneaking: false,
            jumping: false,
            air: 300,
            fall_distance: 0.0,
            swinging: false,
            swing_progress: 0,
            main_hand: None,
            off_hand: None,
            active_item: None,
            selected_slot: 0,
            reach: None,
            last_use_tick: None,
        }
    }

    /// Player entity with a 4.5 block reach.
    pub fn player(id: EntityId, position: DVec3) -> Self {
        let mut snapshot = Self::new(id, RegistryKey::minecraft("player"), position);
        snapshot.is_player = true;
        snapshot.reach = Some(4.5);
        snapshot
    }

    pub fn eye_position(&self) -> DVec3 {
        self.position + DVec3::new(0.0, self.eye_height, 0.0)
    }

    /// Reach used for swing ray traces.
    pub fn reach(&self) -> f64 {
        self.reach.unwrap_or(self.width * 2.0 + 0.6)
    }
}

/// Arena of entity snapshots keyed by id.
#[derive(Debug, Clone, Default)]
pub struct EntityView {
    entities: BTreeMap<EntityId, EntitySnapshot>,
}

impl EntityView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a snapshot.
    pub fn insert(&mut self, snapshot: EntitySnapshot) {
        self.entities.insert(snapshot.id, snapshot);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<EntitySnapshot> {
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntitySnapshot> {
        self.entities.get(&id)
    }

    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut EntitySnapshot> {
        self.entities.get_mut(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntitySnapshot> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn clear(&mut self) {
        self.entities.clear();
    }
}

/// Behaviour bound to one entity for as long as its manager lives.
pub trait EntityEffect {
    fn name(&self) -> &'static str;

    /// Observe the entity and emit sounds or particles.
    fn update(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>);

    /// Called once when the manager tears down. Stop owned sounds here.
    fn die(&mut self, _audio: &mut AudioEngine) {}

    /// Whether the effect wants one more update after its entity died.
    fn receive_last_call(&self) -> bool {
        false
    }

    /// One-line state for diagnostics.
    fn describe(&self) -> String {
        self.name().to_string()
    }
}

/// Decides whether an effect applies to an entity and builds it.
pub trait FactoryHandler {
    /// Effect name as written in the entity effect configuration.
    fn name(&self) -> &'static str;

    fn applies_to(&self, entity: &EntitySnapshot, library: &EffectLibrary) -> bool {
        library.has_effect(entity, self.name())
    }

    fn create(&self, entity: &EntitySnapshot) -> Box<dyn EntityEffect>;
}

type EffectBuilder = Box<dyn Fn(&EntitySnapshot) -> Box<dyn EntityEffect>>;

/// Factory handler backed by a closure.
pub struct EffectFactory {
    name: &'static str,
    players_only: bool,
    build: EffectBuilder,
}

impl EffectFactory {
    pub fn new<F>(name: &'static str, build: F) -> Self
    where
        F: Fn(&EntitySnapshot) -> Box<dyn EntityEffect> + 'static,
    {
        Self {
            name,
            players_only: false,
            build: Box::new(build),
        }
    }

    /// Restrict the handler to player entities.
    pub fn players_only(mut self) -> Self {
        self.players_only = true;
        self
    }
}

impl FactoryHandler for EffectFactory {
    fn name(&self) -> &'static str {
        self.name
    }

    fn applies_to(&self, entity: &EntitySnapshot, library: &EffectLibrary) -> bool {
        (!self.players_only || entity.is_player) && library.has_effect(entity, self.name)
    }

    fn create(&self, entity: &EntitySnapshot) -> Box<dyn EntityEffect> {
        (self.build)(entity)
    }
}

/// Handlers for the built-in effects that are switched on.
pub fn default_handlers(
    toggles: &EffectToggles,
    items: &Arc<ItemLibrary>,
    footsteps: &Arc<FootstepLibrary>,
) -> Vec<Box<dyn FactoryHandler>> {
    let mut handlers: Vec<Box<dyn FactoryHandler>> = Vec::new();
    if toggles.breath {
        handlers.push(Box::new(EffectFactory::new(BreathEffect::NAME, |e| {
            Box::new(BreathEffect::new(e.id))
        })));
    }
    // Footprint particles have their own toggle; footstep sounds always run.
    let footsteps = Arc::clone(footsteps);
    handlers.push(Box::new(EffectFactory::new(FootprintEffect::NAME, move |_| {
        Box::new(FootprintEffect::new(Arc::clone(&footsteps)))
    })));
    if toggles.swing {
        let items = Arc::clone(items);
        handlers.push(Box::new(EffectFactory::new(SwingEffect::NAME, move |_| {
            Box::new(SwingEffect::new(Arc::clone(&items)))
        })));
    }
    if toggles.bow {
        let items = Arc::clone(items);
        handlers.push(Box::new(EffectFactory::new(BowEffect::NAME, move |_| {
            Box::new(BowEffect::new(Arc::clone(&items)))
        })));
    }
    if toggles.toolbar {
        let items = Arc::clone(items);
        handlers.push(Box::new(
            EffectFactory::new(ToolbarEffect::NAME, move |e| {
                Box::new(ToolbarEffect::new(Arc::clone(&items), e))
            })
            .players_only(),
        ));
    }
    handlers
}
