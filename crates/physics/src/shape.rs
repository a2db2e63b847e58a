use glam::DVec3;
use mdambient_world::{BlockPos, Direction, ShapeKind};

use crate::Aabb;

/// Union of boxes in voxel-local coordinates (`0..1` per axis).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VoxelShape {
    boxes: Vec<Aabb>,
}

impl VoxelShape {
    /// Shape with no volume; rays always pass through.
    pub fn empty() -> Self {
        Self { boxes: Vec::new() }
    }

    /// Full unit cube.
    pub fn full() -> Self {
        Self {
            boxes: vec![Aabb::UNIT],
        }
    }

    /// Single box spanning `min..max` in sixteenths of a voxel.
    pub fn pixels(min: [f64; 3], max: [f64; 3]) -> Self {
        Self {
            boxes: vec![Aabb::new(
                DVec3::from_array(min) / 16.0,
                DVec3::from_array(max) / 16.0,
            )],
        }
    }

    /// Fluid body filling the voxel up to `height`.
    pub fn fluid(height: f32) -> Self {
        if height <= 0.0 {
            return Self::empty();
        }
        Self {
            boxes: vec![Aabb::new(
                DVec3::ZERO,
                DVec3::new(1.0, f64::from(height.min(1.0)), 1.0),
            )],
        }
    }

    /// Geometry for a block shape family.
    pub fn from_kind(kind: ShapeKind) -> Self {
        match kind {
            ShapeKind::Empty => Self::empty(),
            ShapeKind::Full => Self::full(),
            ShapeKind::BottomSlab => Self::pixels([0.0, 0.0, 0.0], [16.0, 8.0, 16.0]),
            ShapeKind::TopSlab => Self::pixels([0.0, 8.0, 0.0], [16.0, 16.0, 16.0]),
            ShapeKind::Carpet => Self::pixels([0.0, 0.0, 0.0], [16.0, 1.0, 16.0]),
            ShapeKind::Cross => Self::pixels([2.0, 0.0, 2.0], [14.0, 13.0, 14.0]),
        }
    }

    /// True when the shape has no boxes.
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Boxes in voxel-local coordinates.
    pub fn boxes(&self) -> &[Aabb] {
        &self.boxes
    }

    /// Highest point of the shape, 0 when empty.
    pub fn max_y(&self) -> f64 {
        self.boxes.iter().map(|b| b.max.y).fold(0.0, f64::max)
    }

    /// Trace the world-space segment against this shape placed at `pos`.
    ///
    /// Returns the hit point, the entered face, and whether the segment started
    /// inside the shape. A start point inside reports a hit right at the start,
    /// facing back along the ray.
    pub fn ray_trace(
        &self,
        start: DVec3,
        end: DVec3,
        pos: BlockPos,
    ) -> Option<(DVec3, Direction, bool)> {
        if self.is_empty() {
            return None;
        }
        let dir = end - start;
        if dir.length_squared() < 1.0E-7 {
            return None;
        }

        let origin = pos.corner();
        let probe = start + dir * 0.001;
        if self.boxes.iter().any(|b| b.contains(probe - origin)) {
            return Some((probe, Direction::from_vector(dir).opposite(), true));
        }

        self.boxes
            .iter()
            .filter_map(|b| b.offset(origin).clip(start, end))
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(t, face)| (start + dir * t, face, false))
    }
}
