//! Voxel ray tracing using the DDA (Digital Differential Analyzer) algorithm.

use glam::DVec3;
use mdambient_world::{BlockPos, Direction, FluidState, VoxelAccessor};
use tracing::trace;

use crate::shape::VoxelShape;

/// Bias applied when lerping the segment ends so a trace never starts exactly
/// on a voxel boundary.
const NUDGE: f64 = -1.0E-7;

/// Which block shape a trace tests against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockMode {
    /// Movement collision shape.
    #[default]
    Collider,
    /// Selection outline shape.
    Outline,
    /// Outline of opaque blocks only; glass and foliage let the ray through.
    Visual,
}

/// Which fluids a trace tests against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FluidMode {
    /// Fluids are ignored.
    #[default]
    None,
    /// Only source blocks stop the ray.
    SourceOnly,
    /// Any fluid stops the ray.
    Any,
}

impl FluidMode {
    fn test(self, fluid: &FluidState) -> bool {
        match self {
            FluidMode::None => false,
            FluidMode::SourceOnly => fluid.is_source(),
            FluidMode::Any => !fluid.is_empty(),
        }
    }
}

/// What a trace ran into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitKind {
    /// A block shape.
    Block,
    /// A fluid surface.
    Fluid,
    /// Nothing between start and end.
    Miss,
}

/// Result of a single trace.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Hit classification.
    pub kind: HitKind,
    /// Voxel that was hit (the voxel containing `end` for a miss).
    pub pos: BlockPos,
    /// World-space hit point (`end` for a miss).
    pub point: DVec3,
    /// Face that was entered.
    pub face: Direction,
    /// The trace started inside the hit shape.
    pub inside: bool,
}

impl RayHit {
    /// True for block and fluid hits.
    pub fn is_hit(&self) -> bool {
        self.kind != HitKind::Miss
    }
}

/// Reusable trace context; start and end may be rebound between queries.
pub struct BlockRayTrace<'w, W: VoxelAccessor + ?Sized> {
    world: &'w W,
    /// Segment start.
    pub start: DVec3,
    /// Segment end.
    pub end: DVec3,
    block_mode: BlockMode,
    fluid_mode: FluidMode,
}

impl<'w, W: VoxelAccessor + ?Sized> BlockRayTrace<'w, W> {
    /// Context with both ends at the origin.
    pub fn new(world: &'w W, block_mode: BlockMode, fluid_mode: FluidMode) -> Self {
        Self::between(world, DVec3::ZERO, DVec3::ZERO, block_mode, fluid_mode)
    }

    /// Context bound to a segment.
    pub fn between(
        world: &'w W,
        start: DVec3,
        end: DVec3,
        block_mode: BlockMode,
        fluid_mode: FluidMode,
    ) -> Self {
        Self {
            world,
            start,
            end,
            block_mode,
            fluid_mode,
        }
    }

    /// Rebind the segment and trace it.
    pub fn trace_segment(&mut self, start: DVec3, end: DVec3) -> RayHit {
        self.start = start;
        self.end = end;
        self.trace()
    }

    /// Trace the currently bound segment.
    pub fn trace(&self) -> RayHit {
        if self.start == self.end {
            trace!(start = ?self.start, "Degenerate ray treated as a miss");
            return self.miss();
        }

        let lerp_start = self.start.lerp(self.end, NUDGE);
        let mut x = lerp_start.x.floor() as i32;
        let mut y = lerp_start.y.floor() as i32;
        let mut z = lerp_start.z.floor() as i32;

        // The voxel containing the start is checked before any stepping.
        if let Some(hit) = self.hit_check(BlockPos::new(x, y, z)) {
            return hit;
        }

        let lerp_end = self.end.lerp(self.start, NUDGE);
        let len = lerp_end - lerp_start;
        let dir_x = signum(len.x);
        let dir_y = signum(len.y);
        let dir_z = signum(len.z);
        let delta_x = if dir_x == 0 { f64::MAX } else { dir_x as f64 / len.x };
        let delta_y = if dir_y == 0 { f64::MAX } else { dir_y as f64 / len.y };
        let delta_z = if dir_z == 0 { f64::MAX } else { dir_z as f64 / len.z };
        let mut t_x = delta_x * boundary_fraction(lerp_start.x, dir_x);
        let mut t_y = delta_y * boundary_fraction(lerp_start.y, dir_y);
        let mut t_z = delta_z * boundary_fraction(lerp_start.z, dir_z);

        loop {
            if t_x > 1.0 && t_y > 1.0 && t_z > 1.0 {
                return self.miss();
            }

            if t_x < t_y {
                if t_x < t_z {
                    x += dir_x;
                    t_x += delta_x;
                } else {
                    z += dir_z;
                    t_z += delta_z;
                }
            } else if t_y < t_z {
                y += dir_y;
                t_y += delta_y;
            } else {
                z += dir_z;
                t_z += delta_z;
            }

            if let Some(hit) = self.hit_check(BlockPos::new(x, y, z)) {
                return hit;
            }
        }
    }

    fn miss(&self) -> RayHit {
        RayHit {
            kind: HitKind::Miss,
            pos: BlockPos::containing(self.end),
            point: self.end,
            face: Direction::from_vector(self.start - self.end),
            inside: false,
        }
    }

    fn block_shape(&self, pos: BlockPos) -> VoxelShape {
        let world = self.world;
        match self.block_mode {
            BlockMode::Collider => VoxelShape::from_kind(world.collision_shape(pos)),
            BlockMode::Outline => VoxelShape::from_kind(world.outline_shape(pos)),
            BlockMode::Visual => {
                if world.properties(pos).is_opaque() {
                    VoxelShape::from_kind(world.outline_shape(pos))
                } else {
                    VoxelShape::empty()
                }
            }
        }
    }

    // Air is by far the most common voxel, so it short-circuits both shape
    // lookups. A voxel may carry a block and a fluid at once (waterlogged).
    fn hit_check(&self, pos: BlockPos) -> Option<RayHit> {
        let voxel = self.world.voxel(pos);

        let block_hit = if voxel.is_air() {
            None
        } else {
            self.block_shape(pos)
                .ray_trace(self.start, self.end, pos)
                .map(|(point, face, inside)| RayHit {
                    kind: HitKind::Block,
                    pos,
                    point,
                    face,
                    inside,
                })
        };

        let fluid = voxel.fluid();
        let fluid_hit = if self.fluid_mode.test(&fluid) {
            VoxelShape::fluid(self.world.fluid_height(pos))
                .ray_trace(self.start, self.end, pos)
                .map(|(point, face, inside)| RayHit {
                    kind: HitKind::Fluid,
                    pos,
                    point,
                    face,
                    inside,
                })
        } else {
            None
        };

        match (block_hit, fluid_hit) {
            (None, None) => None,
            (Some(block), None) => Some(block),
            (None, Some(fluid)) => Some(fluid),
            (Some(block), Some(fluid)) => {
                let block_dist = self.start.distance_squared(block.point);
                let fluid_dist = self.start.distance_squared(fluid.point);
                Some(if block_dist <= fluid_dist { block } else { fluid })
            }
        }
    }
}

fn signum(v: f64) -> i32 {
    if v > 0.0 {
        1
    } else if v < 0.0 {
        -1
    } else {
        0
    }
}

/// Fraction of a voxel between `v` and the next boundary in direction `dir`.
fn boundary_fraction(v: f64, dir: i32) -> f64 {
    let frac = v - v.floor();
    if dir > 0 {
        1.0 - frac
    } else {
        frac
    }
}

/// Yields successive hits along a segment, continuing past each hit.
///
/// After a hit the trace restarts one block length further along the ray
/// direction. Iteration ends on a miss, once the voxel containing the original
/// end point has been yielded, or once the restart point passes the end. The
/// number of yielded hits never exceeds the Manhattan distance between the
/// start and end voxels plus one.
pub struct RayTraceIterator<'w, W: VoxelAccessor + ?Sized> {
    trace: BlockRayTrace<'w, W>,
    target: BlockPos,
    normal: DVec3,
    pending: Option<RayHit>,
    budget: u32,
}

impl<'w, W: VoxelAccessor + ?Sized> RayTraceIterator<'w, W> {
    /// Start iterating the segment bound in `trace`.
    pub fn new(trace: BlockRayTrace<'w, W>) -> Self {
        let target = BlockPos::containing(trace.end);
        let normal = (trace.end - trace.start).normalize_or_zero();
        let budget = BlockPos::containing(trace.start).manhattan_distance(target) + 1;
        let first = trace.trace();
        Self {
            trace,
            target,
            normal,
            pending: first.is_hit().then_some(first),
            budget,
        }
    }
}

impl<W: VoxelAccessor + ?Sized> Iterator for RayTraceIterator<'_, W> {
    type Item = RayHit;

    fn next(&mut self) -> Option<RayHit> {
        let hit = self.pending.take()?;
        self.budget = self.budget.saturating_sub(1);

        let restart = hit.point + self.normal;
        let past_end = (self.trace.end - restart).dot(self.normal) <= 0.0;
        if hit.pos != self.target && !past_end && self.budget > 0 {
            self.trace.start = restart;
            let next = self.trace.trace();
            self.pending = next.is_hit().then_some(next);
        }
        Some(hit)
    }
}
