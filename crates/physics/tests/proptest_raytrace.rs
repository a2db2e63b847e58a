//! Property-based tests for voxel ray tracing
//!
//! Validates tracing invariants:
//! - Tracing is deterministic for a fixed grid and segment
//! - A zero-length segment always misses
//! - Iteration terminates within the Manhattan distance of the segment
//! - Every reported hit lies on the segment

use glam::DVec3;
use mdambient_physics::{BlockMode, BlockRayTrace, FluidMode, HitKind, RayTraceIterator};
use mdambient_world::{BlockPos, SparseWorld, BLOCK_OAK_SLAB, BLOCK_STONE, BLOCK_WATER};
use proptest::prelude::*;

const GRID: i32 = 12;

fn build_world(seed: u64) -> SparseWorld {
    let mut world = SparseWorld::new();
    for x in 0..GRID {
        for y in 0..GRID {
            for z in 0..GRID {
                let h = seed
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add((x + y * GRID + z * GRID * GRID) as u64)
                    .rotate_left(17);
                match h % 11 {
                    0 => world.set_block(BlockPos::new(x, y, z), BLOCK_STONE),
                    1 => world.set_block(BlockPos::new(x, y, z), BLOCK_WATER),
                    2 => world.set_block(BlockPos::new(x, y, z), BLOCK_OAK_SLAB),
                    _ => {}
                }
            }
        }
    }
    world
}

fn point() -> impl Strategy<Value = DVec3> {
    (0.0..GRID as f64, 0.0..GRID as f64, 0.0..GRID as f64).prop_map(|(x, y, z)| DVec3::new(x, y, z))
}

proptest! {
    /// Property: repeated traces agree
    #[test]
    fn trace_is_deterministic(seed in any::<u64>(), start in point(), end in point()) {
        let world = build_world(seed);
        let trace = BlockRayTrace::between(&world, start, end, BlockMode::Collider, FluidMode::Any);
        prop_assert_eq!(trace.trace(), trace.trace());
    }

    /// Property: a degenerate segment never hits
    #[test]
    fn zero_length_trace_misses(seed in any::<u64>(), p in point()) {
        let world = build_world(seed);
        let trace = BlockRayTrace::between(&world, p, p, BlockMode::Outline, FluidMode::Any);
        let hit = trace.trace();
        prop_assert_eq!(hit.kind, HitKind::Miss);
        prop_assert_eq!(hit.point, p);
    }

    /// Property: iteration is bounded by the voxel distance of the segment
    #[test]
    fn iterator_terminates(seed in any::<u64>(), start in point(), end in point()) {
        let world = build_world(seed);
        let bound = BlockPos::containing(start).manhattan_distance(BlockPos::containing(end)) + 1;
        let trace = BlockRayTrace::between(&world, start, end, BlockMode::Outline, FluidMode::SourceOnly);
        let count = RayTraceIterator::new(trace).take(bound as usize + 8).count();
        prop_assert!(count <= bound as usize, "{} hits exceeds bound {}", count, bound);
    }

    /// Property: first hit lies within the segment's bounding box
    #[test]
    fn hit_point_on_segment(seed in any::<u64>(), start in point(), end in point()) {
        let world = build_world(seed);
        let trace = BlockRayTrace::between(&world, start, end, BlockMode::Collider, FluidMode::Any);
        let hit = trace.trace();
        let lo = start.min(end) - DVec3::splat(1.0e-3);
        let hi = start.max(end) + DVec3::splat(1.0e-3);
        prop_assert!(hit.point.cmpge(lo).all() && hit.point.cmple(hi).all());
    }
}
