use glam::{DVec3, IVec3};
use std::fmt;

use crate::block::{BlockId, BLOCK_AIR, BLOCK_LAVA, BLOCK_WATER};

/// Block state metadata bits.
pub type BlockState = u16;

/// Low bits of a fluid block's state: 0 is a source, 1..=7 a flowing level.
pub const STATE_FLUID_LEVEL_MASK: BlockState = 0b0111;
/// Flowing fluid that is falling straight down.
pub const STATE_FLUID_FALLING: BlockState = 0b1000;
/// Non-fluid block that is also filled with a water source.
pub const STATE_WATERLOGGED: BlockState = 0b1_0000;

/// Integer world coordinate of a voxel.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then y, then z).
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const ORIGIN: Self = Self::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Voxel containing a world-space point.
    pub fn containing(point: DVec3) -> Self {
        Self::new(
            point.x.floor() as i32,
            point.y.floor() as i32,
            point.z.floor() as i32,
        )
    }

    pub fn add(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn up(self) -> Self {
        self.add(0, 1, 0)
    }

    pub fn down(self) -> Self {
        self.add(0, -1, 0)
    }

    pub fn offset(self, direction: Direction) -> Self {
        let n = direction.normal();
        self.add(n.x, n.y, n.z)
    }

    /// Minimum corner of the voxel in world space.
    pub fn corner(self) -> DVec3 {
        DVec3::new(self.x as f64, self.y as f64, self.z as f64)
    }

    /// Center of the voxel in world space.
    pub fn center(self) -> DVec3 {
        self.corner() + DVec3::splat(0.5)
    }

    /// Sum of absolute per-axis differences.
    pub fn manhattan_distance(self, other: BlockPos) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y) + self.z.abs_diff(other.z)
    }

    pub fn to_ivec3(self) -> IVec3 {
        IVec3::new(self.x, self.y, self.z)
    }
}

impl From<IVec3> for BlockPos {
    fn from(v: IVec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One of the six voxel faces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Direction {
    pub const ALL: [Direction; 6] = [
        Direction::Down,
        Direction::Up,
        Direction::North,
        Direction::South,
        Direction::West,
        Direction::East,
    ];

    /// Horizontal neighbours in the order west, east, north, south.
    pub const CARDINALS: [Direction; 4] = [
        Direction::West,
        Direction::East,
        Direction::North,
        Direction::South,
    ];

    pub const fn normal(self) -> IVec3 {
        match self {
            Direction::Down => IVec3::new(0, -1, 0),
            Direction::Up => IVec3::new(0, 1, 0),
            Direction::North => IVec3::new(0, 0, -1),
            Direction::South => IVec3::new(0, 0, 1),
            Direction::West => IVec3::new(-1, 0, 0),
            Direction::East => IVec3::new(1, 0, 0),
        }
    }

    pub const fn opposite(self) -> Self {
        match self {
            Direction::Down => Direction::Up,
            Direction::Up => Direction::Down,
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West => Direction::East,
            Direction::East => Direction::West,
        }
    }

    /// Face whose normal best matches `v`.
    ///
    /// Ties resolve in [`Direction::ALL`] order; a zero vector yields `North`.
    pub fn from_vector(v: DVec3) -> Self {
        let mut best = Direction::North;
        let mut best_dot = f64::MIN_POSITIVE;
        for dir in Direction::ALL {
            let dot = dir.normal().as_dvec3().dot(v);
            if dot > best_dot {
                best_dot = dot;
                best = dir;
            }
        }
        best
    }
}

/// Per-voxel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct Voxel {
    pub id: BlockId,
    pub state: BlockState,
}

impl Voxel {
    pub const AIR: Self = Self::new(BLOCK_AIR, 0);

    pub const fn new(id: BlockId, state: BlockState) -> Self {
        Self { id, state }
    }

    #[inline]
    pub fn is_air(&self) -> bool {
        self.id == BLOCK_AIR
    }

    /// Fluid occupying this voxel, derived from the id and state bits.
    pub fn fluid(&self) -> FluidState {
        let kind = match self.id {
            BLOCK_WATER => FluidKind::Water,
            BLOCK_LAVA => FluidKind::Lava,
            _ if self.state & STATE_WATERLOGGED != 0 => return FluidState::source(FluidKind::Water),
            _ => return FluidState::EMPTY,
        };

        if self.state & STATE_FLUID_FALLING != 0 {
            return FluidState {
                kind: Some(kind),
                amount: FluidState::FULL_AMOUNT,
                falling: true,
            };
        }

        let level = (self.state & STATE_FLUID_LEVEL_MASK) as u8;
        FluidState {
            kind: Some(kind),
            amount: FluidState::FULL_AMOUNT - level,
            falling: false,
        }
    }
}

/// Fluid family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum FluidKind {
    Water,
    Lava,
}

/// Fluid contents of a voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FluidState {
    pub kind: Option<FluidKind>,
    /// Fill amount, 8 for a source or falling column, 1..=7 for flowing fluid.
    pub amount: u8,
    pub falling: bool,
}

impl FluidState {
    pub const FULL_AMOUNT: u8 = 8;

    pub const EMPTY: Self = Self {
        kind: None,
        amount: 0,
        falling: false,
    };

    pub const fn source(kind: FluidKind) -> Self {
        Self {
            kind: Some(kind),
            amount: Self::FULL_AMOUNT,
            falling: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.kind.is_none()
    }

    pub fn is_water(&self) -> bool {
        self.kind == Some(FluidKind::Water)
    }

    pub fn is_lava(&self) -> bool {
        self.kind == Some(FluidKind::Lava)
    }

    pub fn is_source(&self) -> bool {
        self.kind.is_some() && self.amount == Self::FULL_AMOUNT && !self.falling
    }

    /// Surface height inside the voxel, ignoring fluid stacked above.
    pub fn height(&self) -> f32 {
        if self.is_empty() {
            0.0
        } else {
            self.amount as f32 / 9.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_pos_from_point_floors() {
        let pos = BlockPos::containing(DVec3::new(-0.5, 64.99, 3.0));
        assert_eq!(pos, BlockPos::new(-1, 64, 3));
        assert_eq!(pos.center(), DVec3::new(-0.5, 64.5, 3.5));
    }

    #[test]
    fn direction_from_vector_picks_dominant_axis() {
        assert_eq!(Direction::from_vector(DVec3::new(0.1, -3.0, 1.0)), Direction::Down);
        assert_eq!(Direction::from_vector(DVec3::new(2.0, 0.0, 1.0)), Direction::East);
        assert_eq!(Direction::from_vector(DVec3::ZERO), Direction::North);
    }

    #[test]
    fn fluid_state_decodes_levels() {
        let source = Voxel::new(BLOCK_WATER, 0).fluid();
        assert!(source.is_source());
        assert!(source.is_water());

        let flowing = Voxel::new(BLOCK_LAVA, 3).fluid();
        assert!(flowing.is_lava());
        assert_eq!(flowing.amount, 5);
        assert!(!flowing.is_source());

        let falling = Voxel::new(BLOCK_WATER, STATE_FLUID_FALLING).fluid();
        assert!(falling.falling);
        assert_eq!(falling.amount, FluidState::FULL_AMOUNT);

        assert!(Voxel::AIR.fluid().is_empty());
    }

    #[test]
    fn waterlogged_blocks_report_water() {
        let voxel = Voxel::new(crate::block::BLOCK_OAK_SLAB, STATE_WATERLOGGED);
        assert!(voxel.fluid().is_source());
    }
}
