use crate::block::{BlockProperties, BlockRegistry, ShapeKind, BLOCK_FURNACE_LIT};
use crate::voxel::{BlockPos, FluidState, Voxel};

/// Biome temperature below which breath condenses and snow falls.
pub const COLD_TEMPERATURE: f32 = 0.15;

/// Read-only view of the voxel world, confined to the tick thread.
///
/// Implementors only supply raw voxels, the block registry and temperatures;
/// shape and fluid queries are derived here so every accessor agrees on them.
pub trait VoxelAccessor {
    /// Voxel at `pos`. Unloaded or out-of-world positions read as air.
    fn voxel(&self, pos: BlockPos) -> Voxel;

    /// Registry used to interpret voxel ids.
    fn registry(&self) -> &BlockRegistry;

    /// Biome temperature at `pos`.
    fn temperature(&self, _pos: BlockPos) -> f32 {
        0.8
    }

    fn properties(&self, pos: BlockPos) -> &BlockProperties {
        let id = self.voxel(pos).id;
        self.registry().get(id)
    }

    fn fluid(&self, pos: BlockPos) -> FluidState {
        self.voxel(pos).fluid()
    }

    fn is_air(&self, pos: BlockPos) -> bool {
        self.voxel(pos).is_air()
    }

    /// Material at `pos` blocks movement.
    fn is_solid(&self, pos: BlockPos) -> bool {
        self.properties(pos).is_solid()
    }

    /// Lava, a hot block, or a lit furnace.
    fn is_hot(&self, pos: BlockPos) -> bool {
        let voxel = self.voxel(pos);
        voxel.fluid().is_lava()
            || voxel.id == BLOCK_FURNACE_LIT
            || self.registry().get(voxel.id).is_hot()
    }

    fn is_cold(&self, pos: BlockPos) -> bool {
        self.temperature(pos) < COLD_TEMPERATURE
    }

    fn collision_shape(&self, pos: BlockPos) -> ShapeKind {
        self.properties(pos).collision
    }

    fn outline_shape(&self, pos: BlockPos) -> ShapeKind {
        self.properties(pos).outline
    }

    /// Fluid surface height inside the voxel; a column of the same fluid above
    /// fills the voxel completely.
    fn fluid_height(&self, pos: BlockPos) -> f32 {
        let fluid = self.fluid(pos);
        if fluid.is_empty() {
            return 0.0;
        }
        if self.fluid(pos.up()).kind == fluid.kind {
            1.0
        } else {
            fluid.height()
        }
    }
}

impl<T: VoxelAccessor + ?Sized> VoxelAccessor for &T {
    fn voxel(&self, pos: BlockPos) -> Voxel {
        (**self).voxel(pos)
    }

    fn registry(&self) -> &BlockRegistry {
        (**self).registry()
    }

    fn temperature(&self, pos: BlockPos) -> f32 {
        (**self).temperature(pos)
    }
}
