//! Per-entity effect managers and the scan that attaches and detaches them.

use super::{EntityEffect, EntitySnapshot, EntityView};
use crate::context::{EngineContext, TickContext};
use mdambient_audio::AudioEngine;
use mdambient_core::EntityId;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Effects attached to one entity.
///
/// A manager with no effects is a dummy: it only records that the entity was
/// already examined so the handlers are not asked again every tick.
pub struct EffectManager {
    entity: EntityId,
    effects: Vec<Box<dyn EntityEffect>>,
    active: bool,
    dead: bool,
    range_sq: f64,
}

impl EffectManager {
    pub fn new(entity: EntityId, effects: Vec<Box<dyn EntityEffect>>) -> Self {
        Self {
            entity,
            effects,
            active: true,
            dead: false,
            range_sq: 0.0,
        }
    }

    pub fn dummy(entity: EntityId) -> Self {
        Self::new(entity, Vec::new())
    }

    pub fn entity(&self) -> EntityId {
        self.entity
    }

    pub fn is_dummy(&self) -> bool {
        self.effects.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Squared distance to the viewer at the last update.
    pub fn range_to_viewer_sq(&self) -> f64 {
        self.range_sq
    }

    pub fn effect_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.effects.iter().map(|e| e.name())
    }

    /// Run every effect. A dead entity deactivates the manager, and only
    /// effects that asked for a last call see that final update.
    pub fn update(&mut self, entity: &EntitySnapshot, ctx: &mut TickContext<'_>) {
        if !self.active {
            return;
        }
        self.active = entity.alive;
        self.range_sq = entity.position.distance_squared(ctx.viewer.position);
        for effect in &mut self.effects {
            if self.active || effect.receive_last_call() {
                effect.update(entity, ctx);
            }
        }
    }

    /// Tear down the effects. Later calls do nothing.
    pub fn die(&mut self, audio: &mut AudioEngine) {
        self.active = false;
        if std::mem::replace(&mut self.dead, true) {
            return;
        }
        for effect in &mut self.effects {
            effect.die(audio);
        }
    }

    /// One line per attached effect.
    pub fn attached_effects(&self) -> Vec<String> {
        if self.effects.is_empty() {
            return vec!["No effects".to_string()];
        }
        self.effects.iter().map(|e| e.describe()).collect()
    }
}

/// Counters from one entity scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EntityStats {
    pub attached: usize,
    pub detached: usize,
    /// Managers with effects after the scan.
    pub active: usize,
    pub dummies: usize,
}

/// Keeps one manager per nearby living entity.
#[derive(Default)]
pub struct EntityEffectSystem {
    managers: BTreeMap<EntityId, EffectManager>,
}

impl EntityEffectSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: EntityId) -> Option<&EffectManager> {
        self.managers.get(&id)
    }

    pub fn managers(&self) -> impl Iterator<Item = &EffectManager> {
        self.managers.values()
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    fn create(entity: &EntitySnapshot, engine: &EngineContext) -> EffectManager {
        let effects: Vec<_> = engine
            .handlers()
            .iter()
            .filter(|h| h.applies_to(entity, &engine.effects))
            .map(|h| h.create(entity))
            .collect();
        if effects.is_empty() {
            EffectManager::dummy(entity.id)
        } else {
            EffectManager::new(entity.id, effects)
        }
    }

    /// Attach, update and detach managers for the entities in `view`.
    pub fn tick(&mut self, view: &EntityView, ctx: &mut TickContext<'_>, engine: &EngineContext) -> EntityStats {
        let mut stats = EntityStats::default();
        let range_sq = ctx.config.effect_range_sq();

        // Entities that left the view.
        let gone: Vec<EntityId> = self
            .managers
            .keys()
            .copied()
            .filter(|id| view.get(*id).is_none())
            .collect();
        for id in gone {
            if let Some(mut manager) = self.managers.remove(&id) {
                manager.die(ctx.audio);
                stats.detached += 1;
                trace!(entity = %id, "Detached, entity gone");
            }
        }

        for entity in view.iter() {
            let in_range = entity.position.distance_squared(ctx.viewer.position) <= range_sq;
            match self.managers.get_mut(&entity.id) {
                None => {
                    if in_range && entity.alive {
                        let mut manager = Self::create(entity, engine);
                        if !manager.is_dummy() {
                            trace!(entity = %entity.id, effects = ?manager.effect_names().collect::<Vec<_>>(), "Attached");
                        }
                        manager.update(entity, ctx);
                        self.managers.insert(entity.id, manager);
                        stats.attached += 1;
                    }
                }
                Some(manager) => {
                    if in_range {
                        manager.update(entity, ctx);
                    }
                    if !in_range || !manager.is_active() {
                        manager.die(ctx.audio);
                        self.managers.remove(&entity.id);
                        stats.detached += 1;
                        trace!(entity = %entity.id, in_range, "Detached");
                    }
                }
            }
        }

        for manager in self.managers.values() {
            if manager.is_dummy() {
                stats.dummies += 1;
            } else {
                stats.active += 1;
            }
        }
        stats
    }

    /// Drop every manager, on world change or configuration reload.
    pub fn clear(&mut self, audio: &mut AudioEngine) {
        if !self.managers.is_empty() {
            debug!(managers = self.managers.len(), "Clearing entity effect managers");
        }
        for manager in self.managers.values_mut() {
            manager.die(audio);
        }
        self.managers.clear();
    }

    /// Diagnostic lines: one header per manager followed by its effects.
    pub fn diagnostics(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for manager in self.managers.values().filter(|m| !m.is_dummy()) {
            lines.push(format!("{} (range² {:.1})", manager.entity(), manager.range_to_viewer_sq()));
            lines.extend(manager.attached_effects().into_iter().map(|l| format!("  {l}")));
        }
        lines
    }
}
