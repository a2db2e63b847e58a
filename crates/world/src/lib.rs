//! Read-only voxel world model consumed by the ambient effect engine.
//!
//! The engine never owns world data. Everything it needs goes through the
//! [`VoxelAccessor`] trait; [`SparseWorld`] is the in-memory implementation used
//! by the demo binary and tests.

mod accessor;
mod block;
mod sparse;
mod voxel;

pub use accessor::*;
pub use block::*;
pub use sparse::*;
pub use voxel::*;
