//! Item model observed by toolbar, swing and bow effects.

use serde::{Deserialize, Serialize};

/// Item type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    /// A tool (pickaxe, axe, etc.)
    Tool(ToolType, ToolMaterial),
    /// Bow
    Bow,
    /// Crossbow
    Crossbow,
    /// Shield
    Shield,
    /// A placeable block
    Block(u16), // BlockId
    /// Food item
    Food(FoodType),
    /// Generic item
    Item(u16),
}

/// Tool types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToolType {
    /// Pickaxe - mines stone, ores
    Pickaxe,
    /// Axe - chops wood
    Axe,
    /// Shovel - digs dirt, sand, gravel
    Shovel,
    /// Sword - combat weapon
    Sword,
    /// Hoe - tills farmland
    Hoe,
}

/// Tool material tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ToolMaterial {
    /// Wooden tools (tier 0)
    Wood = 0,
    /// Stone tools (tier 1)
    Stone = 1,
    /// Iron tools (tier 2)
    Iron = 2,
    /// Diamond tools (tier 3)
    Diamond = 3,
    /// Gold tools
    Gold = 4,
}

/// Food types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FoodType {
    /// Apple
    Apple,
    /// Bread
    Bread,
    /// Raw meat
    RawMeat,
    /// Cooked meat
    CookedMeat,
}

impl ItemType {
    /// True for items whose "use" action is drawing or raising them.
    pub fn is_ranged_or_guard(self) -> bool {
        matches!(self, ItemType::Bow | ItemType::Crossbow | ItemType::Shield)
    }
}

/// An item stack held by an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    /// Type of item
    pub item_type: ItemType,
    /// Quantity in stack
    pub count: u32,
}

impl ItemStack {
    /// Create a new item stack
    pub fn new(item_type: ItemType, count: u32) -> Self {
        Self { item_type, count }
    }

    /// Stacks with a zero count are treated as an empty hand.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_stacks_and_guard_items() {
        assert!(ItemStack::new(ItemType::Bow, 0).is_empty());
        assert!(!ItemStack::new(ItemType::Food(FoodType::Apple), 3).is_empty());
        assert!(ItemType::Shield.is_ranged_or_guard());
        assert!(!ItemType::Tool(ToolType::Sword, ToolMaterial::Iron).is_ranged_or_guard());
        assert!(!ItemType::Food(FoodType::Bread).is_ranged_or_guard());
    }
}
