#![warn(missing_docs)]
//! Physics primitives (AABB, voxel shapes) and voxel ray tracing.

mod raycast;
mod shape;

pub use raycast::{BlockMode, BlockRayTrace, FluidMode, HitKind, RayHit, RayTraceIterator};
pub use shape::VoxelShape;

use glam::DVec3;
use mdambient_world::Direction;

/// Axis-aligned bounding box used for collisions and ray tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner (x, y, z).
    pub min: DVec3,
    /// Maximum corner (x, y, z).
    pub max: DVec3,
}

impl Aabb {
    /// Create a new AABB ensuring min <= max per axis.
    pub fn new(min: DVec3, max: DVec3) -> Self {
        debug_assert!(min.x <= max.x && min.y <= max.y && min.z <= max.z);
        Self { min, max }
    }

    /// Unit cube spanning one voxel.
    pub const UNIT: Self = Self {
        min: DVec3::ZERO,
        max: DVec3::ONE,
    };

    /// Tests intersection with another AABB.
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Strict containment (points on a face are outside).
    pub fn contains(&self, p: DVec3) -> bool {
        p.x > self.min.x
            && p.x < self.max.x
            && p.y > self.min.y
            && p.y < self.max.y
            && p.z > self.min.z
            && p.z < self.max.z
    }

    /// Translate by `offset`.
    pub fn offset(&self, offset: DVec3) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// Intersect the segment `start..end` with this box using the slab method.
    ///
    /// Returns the segment parameter `t` in `[0, 1]` of the entry point and the
    /// face that was entered.
    pub fn clip(&self, start: DVec3, end: DVec3) -> Option<(f64, Direction)> {
        const EPSILON: f64 = 1.0E-7;

        let dir = end - start;
        let mut t_enter = f64::NEG_INFINITY;
        let mut t_exit = f64::INFINITY;
        let mut face = None;

        let axes = [
            (start.x, dir.x, self.min.x, self.max.x, Direction::West, Direction::East),
            (start.y, dir.y, self.min.y, self.max.y, Direction::Down, Direction::Up),
            (start.z, dir.z, self.min.z, self.max.z, Direction::North, Direction::South),
        ];

        for (s, d, lo, hi, neg_face, pos_face) in axes {
            if d.abs() < f64::EPSILON {
                if s < lo || s > hi {
                    return None;
                }
                continue;
            }
            let (near, far, entered) = if d > 0.0 {
                ((lo - s) / d, (hi - s) / d, neg_face)
            } else {
                ((hi - s) / d, (lo - s) / d, pos_face)
            };
            if near > t_enter {
                t_enter = near;
                face = Some(entered);
            }
            t_exit = t_exit.min(far);
        }

        let face = face?;
        if t_enter > t_exit || t_enter < -EPSILON || t_enter > 1.0 {
            return None;
        }
        Some((t_enter.max(0.0), face))
    }
}
