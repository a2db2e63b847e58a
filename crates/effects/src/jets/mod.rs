//! Jet engine: the set of live emitters, one per voxel.

mod block_effect;
mod jet;
mod scanner;

pub use block_effect::{
    count_cube, count_vertical, splash_source_valid, steam_source_valid, BlockEffect,
    BlockEffectKind, MAX_STRENGTH,
};
pub use jet::{Jet, JetKind, JetState, DEFAULT_UPDATE_FREQUENCY};
pub use scanner::{BlockEffectScanner, BlockEffectTable, BlockSound, ScanStats};

use crate::context::TickContext;
use mdambient_audio::{Acoustic, AcousticLibrary, AudioEngine};
use mdambient_world::BlockPos;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

/// Number of waterfall loop variants (`waterfall/0` to `waterfall/5`).
pub const WATERFALL_VARIANTS: usize = 6;

/// Acoustics jets play, resolved once per engine context.
#[derive(Debug, Clone)]
pub struct JetAcoustics {
    pub fire: Arc<Acoustic>,
    pub waterfall: [Arc<Acoustic>; WATERFALL_VARIANTS],
}

impl JetAcoustics {
    pub fn resolve(library: &mut AcousticLibrary) -> Self {
        Self {
            fire: library.resolve_default("@block.fire.ambient"),
            waterfall: std::array::from_fn(|i| library.resolve_default(&format!("waterfall/{i}"))),
        }
    }

    /// Every jet plays nothing.
    pub fn silent() -> Self {
        let null = Arc::new(Acoustic::null());
        Self {
            fire: Arc::clone(&null),
            waterfall: std::array::from_fn(|_| Arc::clone(&null)),
        }
    }
}

/// Running counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JetStats {
    pub spawned: u64,
    pub retired: u64,
    pub rejected: u64,
}

/// Owns every live jet.
#[derive(Debug)]
pub struct JetEngine {
    jets: BTreeMap<BlockPos, Jet>,
    acoustics: JetAcoustics,
    last_center: Option<BlockPos>,
    stats: JetStats,
}

impl JetEngine {
    pub fn new(acoustics: JetAcoustics) -> Self {
        Self {
            jets: BTreeMap::new(),
            acoustics,
            last_center: None,
            stats: JetStats::default(),
        }
    }

    pub fn set_acoustics(&mut self, acoustics: JetAcoustics) {
        self.acoustics = acoustics;
    }

    /// Only one jet may occupy a voxel.
    pub fn ok_to_spawn(&self, pos: BlockPos) -> bool {
        !self.jets.contains_key(&pos)
    }

    /// Add a jet. A jet for an occupied voxel is rejected so the live one
    /// keeps ownership of its sounds.
    pub fn add(&mut self, jet: Jet) -> bool {
        if !jet.is_alive() || !self.ok_to_spawn(jet.pos()) {
            self.stats.rejected += 1;
            return false;
        }
        trace!(%jet, "Jet spawned");
        self.stats.spawned += 1;
        self.jets.insert(jet.pos(), jet);
        true
    }

    pub fn get(&self, pos: BlockPos) -> Option<&Jet> {
        self.jets.get(&pos)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Jet> {
        self.jets.values()
    }

    pub fn len(&self) -> usize {
        self.jets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jets.is_empty()
    }

    pub fn stats(&self) -> JetStats {
        self.stats
    }

    /// Tick every jet and drop the dead ones.
    ///
    /// When the viewer has moved to another voxel, jets outside the cube of
    /// `effect_range` blocks around it are expired instead of ticked.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) {
        let center = BlockPos::containing(ctx.viewer.position);
        let moved = self.last_center != Some(center);
        self.last_center = Some(center);
        let range = i32::try_from(ctx.config.effect_range).unwrap_or(i32::MAX);
        let outside = |pos: &BlockPos| {
            (pos.x - center.x).abs() > range
                || (pos.y - center.y).abs() > range
                || (pos.z - center.z).abs() > range
        };

        let acoustics = &self.acoustics;
        let stats = &mut self.stats;
        self.jets.retain(|pos, jet| {
            if moved && outside(pos) {
                jet.expire(ctx.audio);
            } else {
                jet.tick(ctx, acoustics);
            }
            if jet.is_alive() {
                true
            } else {
                trace!(%jet, "Jet retired");
                stats.retired += 1;
                false
            }
        });
    }

    /// Expire every jet, stopping their sounds.
    pub fn clear(&mut self, audio: &mut AudioEngine) {
        if self.jets.is_empty() {
            return;
        }
        debug!(count = self.jets.len(), "Clearing jets");
        for jet in self.jets.values_mut() {
            jet.expire(audio);
        }
        self.stats.retired += self.jets.len() as u64;
        self.jets.clear();
        self.last_center = None;
    }
}
