//! Block effects: per-block triggers that start jets.

use super::jet::Jet;
use super::JetEngine;
use glam::DVec3;
use crate::config::EffectToggles;
use mdambient_core::{Condition, ConditionFlags};
use mdambient_physics::VoxelShape;
use mdambient_world::{BlockPos, Direction, VoxelAccessor};
use rand::Rng;
use std::fmt;

/// Highest strength a counted jet can reach.
pub const MAX_STRENGTH: u32 = 10;

/// Kind of jet a block effect starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum BlockEffectKind {
    FireJet,
    SteamJet,
    BubbleJet,
    DustJet,
    FountainJet,
    SplashJet,
}

impl BlockEffectKind {
    pub const ALL: [BlockEffectKind; 6] = [
        BlockEffectKind::FireJet,
        BlockEffectKind::SteamJet,
        BlockEffectKind::BubbleJet,
        BlockEffectKind::DustJet,
        BlockEffectKind::FountainJet,
        BlockEffectKind::SplashJet,
    ];

    /// Configuration name.
    pub const fn as_str(self) -> &'static str {
        match self {
            BlockEffectKind::FireJet => "fire_jet",
            BlockEffectKind::SteamJet => "steam_jet",
            BlockEffectKind::BubbleJet => "bubble_jet",
            BlockEffectKind::DustJet => "dust_jet",
            BlockEffectKind::FountainJet => "fountain_jet",
            BlockEffectKind::SplashJet => "splash_jet",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Whether the toggle for this kind is on.
    pub fn enabled(self, toggles: &EffectToggles) -> bool {
        match self {
            BlockEffectKind::FireJet => toggles.fire_jets,
            BlockEffectKind::SteamJet => toggles.steam_jets,
            BlockEffectKind::BubbleJet => toggles.bubble_jets,
            BlockEffectKind::DustJet => toggles.dust_jets,
            BlockEffectKind::FountainJet => toggles.fountain_jets,
            BlockEffectKind::SplashJet => toggles.water_splash,
        }
    }
}

impl fmt::Display for BlockEffectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Count consecutive voxels matching `predicate`, starting at `pos` and moving
/// `step` blocks vertically each time. Stops at [`MAX_STRENGTH`].
pub fn count_vertical<W, P>(world: &W, pos: BlockPos, predicate: P, step: i32) -> u32
where
    W: VoxelAccessor + ?Sized,
    P: Fn(&W, BlockPos) -> bool,
{
    let mut count = 0;
    let mut cursor = pos;
    while count < MAX_STRENGTH && predicate(world, cursor) {
        count += 1;
        cursor = cursor.add(0, step, 0);
    }
    count
}

/// Count voxels matching `predicate` in the 3x3x3 cube centred on `pos`.
/// With `fast_first` the count stops at the first match.
pub fn count_cube<W, P>(world: &W, pos: BlockPos, predicate: P, fast_first: bool) -> u32
where
    W: VoxelAccessor + ?Sized,
    P: Fn(&W, BlockPos) -> bool,
{
    let mut count = 0;
    for k in -1..=1 {
        for j in -1..=1 {
            for i in -1..=1 {
                if predicate(world, pos.add(i, j, k)) {
                    if fast_first {
                        return 1;
                    }
                    count += 1;
                }
            }
        }
    }
    count
}

fn is_lava<W: VoxelAccessor + ?Sized>(world: &W, pos: BlockPos) -> bool {
    world.fluid(pos).is_lava()
}

fn is_water<W: VoxelAccessor + ?Sized>(world: &W, pos: BlockPos) -> bool {
    world.fluid(pos).is_water()
}

fn is_fluid<W: VoxelAccessor + ?Sized>(world: &W, pos: BlockPos) -> bool {
    !world.fluid(pos).is_empty()
}

fn is_hot<W: VoxelAccessor + ?Sized>(world: &W, pos: BlockPos) -> bool {
    world.is_hot(pos)
}

/// Steam rises from a voxel with air above and a hot block next to it.
pub fn steam_source_valid<W: VoxelAccessor + ?Sized>(world: &W, pos: BlockPos) -> bool {
    world.is_air(pos.up()) && count_cube(world, pos, is_hot, true) > 0
}

/// Any horizontal neighbour is air or partially filled fluid.
fn is_unbounded_liquid<W: VoxelAccessor + ?Sized>(world: &W, pos: BlockPos) -> bool {
    Direction::CARDINALS.into_iter().any(|dir| {
        let p = pos.offset(dir);
        if world.is_air(p) {
            return true;
        }
        let fluid = world.fluid(p);
        !fluid.is_empty() && fluid.amount > 0 && fluid.amount < 8 && !fluid.falling
    })
}

/// No horizontal neighbour is air, falling fluid or partially filled fluid.
fn is_bounded_liquid<W: VoxelAccessor + ?Sized>(world: &W, pos: BlockPos) -> bool {
    Direction::CARDINALS.into_iter().all(|dir| {
        let p = pos.offset(dir);
        if world.is_air(p) {
            return false;
        }
        let fluid = world.fluid(p);
        if fluid.is_empty() {
            return true;
        }
        !(fluid.falling || fluid.amount < 8)
    })
}

/// Foot of a waterfall: fluid with fluid above, spilling sideways, landing on
/// something solid or on a contained pool.
pub fn splash_source_valid<W: VoxelAccessor + ?Sized>(world: &W, pos: BlockPos) -> bool {
    if world.fluid(pos).is_empty() || world.fluid(pos.up()).is_empty() {
        return false;
    }
    if !is_unbounded_liquid(world, pos) {
        return false;
    }
    let down = pos.down();
    world.is_solid(down) || is_bounded_liquid(world, down)
}

/// A jet trigger bound to a block.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEffect {
    kind: BlockEffectKind,
    chance: u32,
    condition: Condition,
}

impl BlockEffect {
    /// Effect that triggers on one in `chance` samples; 0 always triggers.
    pub fn new(kind: BlockEffectKind, chance: u32) -> Self {
        Self {
            kind,
            chance,
            condition: Condition::Always,
        }
    }

    pub fn with_condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn kind(&self) -> BlockEffectKind {
        self.kind
    }

    pub fn chance(&self) -> u32 {
        self.chance
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    fn roll<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        self.chance == 0 || rng.gen_range(0..self.chance) == 0
    }

    fn roll_and_check<R: Rng + ?Sized>(
        &self,
        pos: BlockPos,
        jets: &JetEngine,
        flags: &ConditionFlags,
        rng: &mut R,
    ) -> bool {
        self.roll(rng) && jets.ok_to_spawn(pos) && self.condition.evaluate(flags)
    }

    /// Whether the effect fires for the voxel at `pos` this sample.
    ///
    /// The kind-specific placement check runs before the chance roll, except
    /// for splash jets whose validity check is the more expensive one.
    pub fn can_trigger<W, R>(
        &self,
        world: &W,
        pos: BlockPos,
        jets: &JetEngine,
        flags: &ConditionFlags,
        rng: &mut R,
    ) -> bool
    where
        W: VoxelAccessor + ?Sized,
        R: Rng + ?Sized,
    {
        match self.kind {
            BlockEffectKind::FireJet | BlockEffectKind::FountainJet => {
                world.is_air(pos.up()) && self.roll_and_check(pos, jets, flags, rng)
            }
            BlockEffectKind::SteamJet => {
                steam_source_valid(world, pos) && self.roll_and_check(pos, jets, flags, rng)
            }
            BlockEffectKind::BubbleJet => {
                is_water(world, pos)
                    && world.is_solid(pos.down())
                    && self.roll_and_check(pos, jets, flags, rng)
            }
            BlockEffectKind::DustJet => {
                world.is_air(pos.down()) && self.roll_and_check(pos, jets, flags, rng)
            }
            BlockEffectKind::SplashJet => {
                self.roll_and_check(pos, jets, flags, rng) && splash_source_valid(world, pos)
            }
        }
    }

    /// Build the jet for the voxel at `pos`, if the surroundings give it any
    /// strength. The jet is keyed by `pos`.
    pub fn do_effect<W, R>(&self, world: &W, pos: BlockPos, rng: &mut R) -> Option<Jet>
    where
        W: VoxelAccessor + ?Sized,
        R: Rng + ?Sized,
    {
        self.build_jet(world, pos, rng).map(|jet| jet.with_key(pos))
    }

    fn build_jet<W, R>(&self, world: &W, pos: BlockPos, rng: &mut R) -> Option<Jet>
    where
        W: VoxelAccessor + ?Sized,
        R: Rng + ?Sized,
    {
        let center = pos.center();
        let at = |height: f64| DVec3::new(center.x, height, center.z);
        let y = f64::from(pos.y);
        match self.kind {
            BlockEffectKind::FireJet => {
                let fluid = world.fluid(pos);
                let (strength, height, solid) = if !fluid.is_empty() {
                    let strength = count_vertical(world, pos, is_lava, -1);
                    (strength, y + f64::from(fluid.height()) + 0.1, false)
                } else {
                    let shape = VoxelShape::from_kind(world.outline_shape(pos));
                    let strength = if world.is_solid(pos) { 2 } else { 1 };
                    (strength, y + shape.max_y(), true)
                };
                (strength > 0).then(|| Jet::fire(at(height), strength, solid, rng))
            }
            BlockEffectKind::SteamJet => {
                let strength = count_cube(world, pos, is_hot, false);
                let fluid = world.fluid(pos);
                let height = if fluid.is_empty() {
                    y + 0.9
                } else {
                    y + f64::from(fluid.height()) + 0.1
                };
                (strength > 0).then(|| Jet::steam(at(height), strength, rng))
            }
            BlockEffectKind::BubbleJet => {
                let strength = count_vertical(world, pos, is_water, 1);
                (strength > 0).then(|| Jet::bubble(at(y + 0.1), strength, rng))
            }
            BlockEffectKind::DustJet => Some(Jet::dust(at(y - 0.2), rng)),
            BlockEffectKind::FountainJet => Some(Jet::fountain(at(y + 1.1), rng)),
            BlockEffectKind::SplashJet => {
                let strength = count_vertical(world, pos, is_fluid, 1);
                let surface = y + f64::from(world.fluid_height(pos)) + 0.1;
                (strength > 1).then(|| Jet::water_splash(pos, strength, surface))
            }
        }
    }
}

impl fmt::Display for BlockEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "type: {} chance: {}", self.kind, self.chance)
    }
}
