#![warn(missing_docs)]
//! Core primitives shared across the ambient effect workspace.

pub mod conditions;
pub mod item;
pub mod registry;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

// Re-export commonly used types
pub use conditions::{Condition, ConditionError, ConditionFlags};
pub use item::{FoodType, ItemStack, ItemType, ToolMaterial, ToolType};
pub use registry::{RegistryKey, RegistryKeyError, DEFAULT_NAMESPACE, MINECRAFT_NAMESPACE};

/// Number of simulation ticks per second (20 TPS => 50 ms per tick).
pub const TICKS_PER_SECOND: u64 = 20;

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }

    /// Ticks elapsed since `earlier` (saturating at zero).
    pub fn since(self, earlier: SimTick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

/// Stable identifier for an entity tracked by the client.
///
/// Effects and managers store the id rather than a reference; looking the id up
/// in the entity view and finding nothing is the "entity has left" case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity#{}", self.0)
    }
}

/// Helper to derive a reproducible RNG seeded by world + tick domains.
pub fn scoped_rng(world_seed: u64, domain_hash: u64, tick: SimTick) -> StdRng {
    let seed = world_seed ^ domain_hash ^ tick.0;
    StdRng::seed_from_u64(seed)
}
