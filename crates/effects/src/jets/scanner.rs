//! Random block sampling around the viewer.

use super::block_effect::{BlockEffect, BlockEffectKind};
use super::JetEngine;
use crate::config::EffectsConfig;
use crate::context::TickContext;
use mdambient_audio::{Acoustic, AcousticEvent, AcousticLibrary, PlayTarget};
use mdambient_core::{Condition, RegistryKey, DEFAULT_NAMESPACE};
use mdambient_world::{BlockId, BlockPos, BlockRegistry};
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Acoustic played when a sampled block wins its roll.
#[derive(Debug, Clone)]
pub struct BlockSound {
    pub acoustic: Arc<Acoustic>,
    /// One in `chance` samples play; 0 always plays.
    pub chance: u32,
}

impl BlockSound {
    fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.chance == 0 || rng.gen_range(0..self.chance) == 0
    }
}

/// Block id to the effects and sounds bound to it.
#[derive(Debug, Clone, Default)]
pub struct BlockEffectTable {
    effects: BTreeMap<BlockId, Vec<BlockEffect>>,
    sounds: BTreeMap<BlockId, Vec<BlockSound>>,
}

fn block_id(registry: &BlockRegistry, name: &str) -> Option<BlockId> {
    let key = match RegistryKey::resolve(DEFAULT_NAMESPACE, name) {
        Ok(key) => key,
        Err(err) => {
            warn!(block = name, "Bad block name: {err}");
            return None;
        }
    };
    let id = registry.id_of(&key);
    if id.is_none() {
        warn!(block = %key, "Unknown block");
    }
    id
}

impl BlockEffectTable {
    /// Build from configuration. Bad entries are logged and skipped; effects
    /// switched off in the toggles are left out.
    pub fn from_config(
        config: &EffectsConfig,
        registry: &BlockRegistry,
        library: &mut AcousticLibrary,
    ) -> Self {
        let mut table = Self::default();

        for entry in &config.block_effects {
            let Some(kind) = BlockEffectKind::from_name(&entry.effect) else {
                warn!(effect = %entry.effect, "Unknown block effect");
                continue;
            };
            if !kind.enabled(&config.toggles) {
                continue;
            }
            let Some(id) = block_id(registry, &entry.block) else {
                continue;
            };
            let condition = match entry.conditions.as_deref() {
                None => Condition::Always,
                Some(text) => match Condition::parse(text) {
                    Ok(condition) => condition,
                    Err(err) => {
                        warn!(block = %entry.block, effect = %kind, "Bad condition: {err}");
                        continue;
                    }
                },
            };
            table.add_effect(id, BlockEffect::new(kind, entry.chance).with_condition(condition));
        }

        for entry in &config.block_sounds {
            let Some(id) = block_id(registry, &entry.block) else {
                continue;
            };
            let acoustic = library.resolve(DEFAULT_NAMESPACE, &entry.acoustic);
            if acoustic.is_null() {
                warn!(block = %entry.block, acoustic = %entry.acoustic, "Block sound resolves to nothing");
                continue;
            }
            table.add_sound(
                id,
                BlockSound {
                    acoustic,
                    chance: entry.chance,
                },
            );
        }

        debug!(
            effects = table.effects.values().map(Vec::len).sum::<usize>(),
            sounds = table.sounds.values().map(Vec::len).sum::<usize>(),
            "Block effect table built"
        );
        table
    }

    pub fn add_effect(&mut self, id: BlockId, effect: BlockEffect) {
        self.effects.entry(id).or_default().push(effect);
    }

    pub fn add_sound(&mut self, id: BlockId, sound: BlockSound) {
        self.sounds.entry(id).or_default().push(sound);
    }

    pub fn effects(&self, id: BlockId) -> &[BlockEffect] {
        self.effects.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sounds(&self, id: BlockId) -> &[BlockSound] {
        self.sounds.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when the block has anything bound to it.
    pub fn is_interesting(&self, id: BlockId) -> bool {
        self.effects.contains_key(&id) || self.sounds.contains_key(&id)
    }
}

/// Counters for one scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub sampled: u32,
    pub interesting: u32,
    pub jets: u32,
    pub sounds: u32,
}

/// Samples random voxels near the viewer each tick and fires what is bound
/// to them.
#[derive(Debug, Default)]
pub struct BlockEffectScanner;

impl BlockEffectScanner {
    /// Take `scan_budget` samples per configured range. Offsets per axis are
    /// `rand(range) - rand(range)`, so samples cluster toward the viewer.
    pub fn scan(
        ctx: &mut TickContext<'_>,
        table: &BlockEffectTable,
        jets: &mut JetEngine,
    ) -> ScanStats {
        let mut stats = ScanStats::default();
        let center = BlockPos::containing(ctx.viewer.position);
        let budget = ctx.config.scan_budget;
        let ranges = ctx.config.scan_ranges.clone();
        for range in ranges {
            let range = i32::try_from(range.max(1)).unwrap_or(i32::MAX);
            for _ in 0..budget {
                let mut offset = || ctx.rng.gen_range(0..range) - ctx.rng.gen_range(0..range);
                let pos = center.add(offset(), offset(), offset());
                stats.sampled += 1;
                Self::sample(ctx, table, jets, pos, &mut stats);
            }
        }
        stats
    }

    /// Run everything bound to the block at `pos`.
    pub fn sample(
        ctx: &mut TickContext<'_>,
        table: &BlockEffectTable,
        jets: &mut JetEngine,
        pos: BlockPos,
        stats: &mut ScanStats,
    ) {
        let id = ctx.world.voxel(pos).id;
        if !table.is_interesting(id) {
            return;
        }
        stats.interesting += 1;

        for effect in table.effects(id) {
            if effect.can_trigger(ctx.world, pos, jets, ctx.flags, ctx.rng) {
                if let Some(jet) = effect.do_effect(ctx.world, pos, ctx.rng) {
                    if jets.add(jet) {
                        stats.jets += 1;
                    }
                }
            }
        }

        if let Some(sound) = table.sounds(id).iter().find(|s| s.roll(ctx.rng)) {
            ctx.play(&sound.acoustic, AcousticEvent::None, PlayTarget::At(pos.center()));
            stats.sounds += 1;
        }
    }
}
