use std::collections::HashMap;

use crate::accessor::VoxelAccessor;
use crate::block::{BlockId, BlockRegistry, BLOCK_AIR};
use crate::voxel::{BlockPos, BlockState, Voxel};

/// Hash-map backed world where every unset voxel is air.
#[derive(Debug, Clone)]
pub struct SparseWorld {
    registry: BlockRegistry,
    voxels: HashMap<BlockPos, Voxel>,
    temperature: f32,
}

impl SparseWorld {
    pub fn new() -> Self {
        Self::with_registry(BlockRegistry::with_defaults())
    }

    pub fn with_registry(registry: BlockRegistry) -> Self {
        Self {
            registry,
            voxels: HashMap::new(),
            temperature: 0.8,
        }
    }

    pub fn set_voxel(&mut self, pos: BlockPos, voxel: Voxel) {
        if voxel.is_air() {
            self.voxels.remove(&pos);
        } else {
            self.voxels.insert(pos, voxel);
        }
    }

    pub fn set_block(&mut self, pos: BlockPos, id: BlockId) {
        self.set_voxel(pos, Voxel::new(id, 0));
    }

    pub fn set_block_state(&mut self, pos: BlockPos, id: BlockId, state: BlockState) {
        self.set_voxel(pos, Voxel::new(id, state));
    }

    /// Fill the inclusive box spanned by `a` and `b`.
    pub fn fill(&mut self, a: BlockPos, b: BlockPos, id: BlockId) {
        for x in a.x.min(b.x)..=a.x.max(b.x) {
            for y in a.y.min(b.y)..=a.y.max(b.y) {
                for z in a.z.min(b.z)..=a.z.max(b.z) {
                    self.set_block(BlockPos::new(x, y, z), id);
                }
            }
        }
    }

    pub fn clear(&mut self, pos: BlockPos) {
        self.set_block(pos, BLOCK_AIR);
    }

    /// Uniform biome temperature for the whole world.
    pub fn set_temperature(&mut self, temperature: f32) {
        self.temperature = temperature;
    }

    /// Number of non-air voxels.
    pub fn len(&self) -> usize {
        self.voxels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voxels.is_empty()
    }
}

impl Default for SparseWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl VoxelAccessor for SparseWorld {
    fn voxel(&self, pos: BlockPos) -> Voxel {
        self.voxels.get(&pos).copied().unwrap_or(Voxel::AIR)
    }

    fn registry(&self) -> &BlockRegistry {
        &self.registry
    }

    fn temperature(&self, _pos: BlockPos) -> f32 {
        self.temperature
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::*;
    use crate::voxel::STATE_FLUID_LEVEL_MASK;

    #[test]
    fn unset_voxels_are_air() {
        let world = SparseWorld::new();
        assert!(world.is_air(BlockPos::new(5, -3, 100)));
        assert!(!world.is_solid(BlockPos::ORIGIN));
    }

    #[test]
    fn setting_air_removes_entry() {
        let mut world = SparseWorld::new();
        let pos = BlockPos::new(1, 2, 3);
        world.set_block(pos, BLOCK_STONE);
        assert_eq!(world.len(), 1);
        world.clear(pos);
        assert!(world.is_empty());
    }

    #[test]
    fn fill_is_inclusive_and_order_independent() {
        let mut world = SparseWorld::new();
        world.fill(BlockPos::new(2, 2, 2), BlockPos::new(0, 0, 0), BLOCK_DIRT);
        assert_eq!(world.len(), 27);
    }

    #[test]
    fn hot_blocks_include_lava_magma_and_lit_furnaces() {
        let mut world = SparseWorld::new();
        world.set_block(BlockPos::new(0, 0, 0), BLOCK_LAVA);
        world.set_block(BlockPos::new(1, 0, 0), BLOCK_MAGMA);
        world.set_block(BlockPos::new(2, 0, 0), BLOCK_FURNACE_LIT);
        world.set_block(BlockPos::new(3, 0, 0), BLOCK_FURNACE);
        assert!(world.is_hot(BlockPos::new(0, 0, 0)));
        assert!(world.is_hot(BlockPos::new(1, 0, 0)));
        assert!(world.is_hot(BlockPos::new(2, 0, 0)));
        assert!(!world.is_hot(BlockPos::new(3, 0, 0)));
    }

    #[test]
    fn fluid_height_fills_under_a_column() {
        let mut world = SparseWorld::new();
        let pos = BlockPos::new(0, 10, 0);
        world.set_block_state(pos, BLOCK_WATER, 4 & STATE_FLUID_LEVEL_MASK);
        assert!((world.fluid_height(pos) - 4.0 / 9.0).abs() < 1e-6);
        world.set_block(pos.up(), BLOCK_WATER);
        assert_eq!(world.fluid_height(pos), 1.0);
    }

    #[test]
    fn temperature_drives_cold_checks() {
        let mut world = SparseWorld::new();
        assert!(!world.is_cold(BlockPos::ORIGIN));
        world.set_temperature(-0.5);
        assert!(world.is_cold(BlockPos::ORIGIN));
    }
}
