use mdambient_core::RegistryKey;
use std::collections::HashMap;
use tracing::debug;

/// Block identifier referencing the registry.
pub type BlockId = u16;

/// Reserved ID for air.
pub const BLOCK_AIR: BlockId = 0;
pub const BLOCK_STONE: BlockId = 1;
pub const BLOCK_DIRT: BlockId = 2;
pub const BLOCK_GRASS: BlockId = 3;
pub const BLOCK_SAND: BlockId = 4;
pub const BLOCK_GRAVEL: BlockId = 5;
pub const BLOCK_WATER: BlockId = 6;
pub const BLOCK_LAVA: BlockId = 7;
pub const BLOCK_FIRE: BlockId = 8;
pub const BLOCK_MAGMA: BlockId = 9;
pub const BLOCK_FURNACE: BlockId = 10;
pub const BLOCK_FURNACE_LIT: BlockId = 11;
pub const BLOCK_NETHERRACK: BlockId = 12;
pub const BLOCK_ICE: BlockId = 13;
pub const BLOCK_SNOW: BlockId = 14;
pub const BLOCK_OAK_SLAB: BlockId = 15;
pub const BLOCK_GLASS: BlockId = 16;
pub const BLOCK_TALL_GRASS: BlockId = 17;
pub const BLOCK_OAK_PLANKS: BlockId = 18;
pub const BLOCK_CARPET: BlockId = 19;

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    /// Coarse material properties of a block.
    pub struct BlockFlags: u8 {
        /// Material blocks movement.
        const SOLID = 0b0000_0001;
        /// Full opaque cube.
        const OPAQUE = 0b0000_0010;
        /// Radiates heat (magma, lit furnaces).
        const HOT = 0b0000_0100;
        /// Block is a fluid.
        const LIQUID = 0b0000_1000;
        /// Loose material that sheds dust when undermined.
        const DUSTY = 0b0001_0000;
        /// Can be replaced by placing into it (grass, snow layers).
        const REPLACEABLE = 0b0010_0000;
    }
}

impl Default for BlockFlags {
    fn default() -> Self {
        BlockFlags::empty()
    }
}

/// Shape family of a block in voxel-local space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    Empty,
    Full,
    BottomSlab,
    TopSlab,
    /// Thin 1/16 layer on the floor.
    Carpet,
    /// Plant-like cross shape, 2..14 wide and 13/16 tall.
    Cross,
}

/// Acoustic material group used to pick step sounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockMaterial {
    Air,
    Stone,
    Dirt,
    Grass,
    Sand,
    Gravel,
    Wood,
    Glass,
    Snow,
    Wool,
    Liquid,
    Fire,
}

impl BlockMaterial {
    pub const fn as_str(self) -> &'static str {
        match self {
            BlockMaterial::Air => "air",
            BlockMaterial::Stone => "stone",
            BlockMaterial::Dirt => "dirt",
            BlockMaterial::Grass => "grass",
            BlockMaterial::Sand => "sand",
            BlockMaterial::Gravel => "gravel",
            BlockMaterial::Wood => "wood",
            BlockMaterial::Glass => "glass",
            BlockMaterial::Snow => "snow",
            BlockMaterial::Wool => "wool",
            BlockMaterial::Liquid => "liquid",
            BlockMaterial::Fire => "fire",
        }
    }
}

/// Static description of a block kind.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockProperties {
    pub key: RegistryKey,
    pub flags: BlockFlags,
    pub material: BlockMaterial,
    /// Shape used for movement collision.
    pub collision: ShapeKind,
    /// Selection/outline shape.
    pub outline: ShapeKind,
}

impl BlockProperties {
    fn new(
        path: &'static str,
        flags: BlockFlags,
        material: BlockMaterial,
        collision: ShapeKind,
        outline: ShapeKind,
    ) -> Self {
        Self {
            key: RegistryKey::minecraft(path),
            flags,
            material,
            collision,
            outline,
        }
    }

    pub fn is_solid(&self) -> bool {
        self.flags.contains(BlockFlags::SOLID)
    }

    pub fn is_opaque(&self) -> bool {
        self.flags.contains(BlockFlags::OPAQUE)
    }

    pub fn is_hot(&self) -> bool {
        self.flags.contains(BlockFlags::HOT)
    }
}

/// Id-indexed table of block properties with a name lookup.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    blocks: Vec<BlockProperties>,
    by_key: HashMap<RegistryKey, BlockId>,
}

impl BlockRegistry {
    /// Empty registry containing only air at id 0.
    pub fn new() -> Self {
        let mut registry = Self {
            blocks: Vec::new(),
            by_key: HashMap::new(),
        };
        registry.register(BlockProperties::new(
            "air",
            BlockFlags::REPLACEABLE,
            BlockMaterial::Air,
            ShapeKind::Empty,
            ShapeKind::Empty,
        ));
        registry
    }

    /// Registry with the built-in blocks at their `BLOCK_*` ids.
    pub fn with_defaults() -> Self {
        use BlockFlags as F;
        use BlockMaterial as M;
        use ShapeKind as S;

        let solid = F::SOLID | F::OPAQUE;
        let mut registry = Self::new();
        let defaults = [
            ("stone", solid, M::Stone, S::Full, S::Full),
            ("dirt", solid, M::Dirt, S::Full, S::Full),
            ("grass_block", solid, M::Grass, S::Full, S::Full),
            ("sand", solid | F::DUSTY, M::Sand, S::Full, S::Full),
            ("gravel", solid | F::DUSTY, M::Gravel, S::Full, S::Full),
            ("water", F::LIQUID, M::Liquid, S::Empty, S::Empty),
            ("lava", F::LIQUID, M::Liquid, S::Empty, S::Empty),
            ("fire", F::REPLACEABLE, M::Fire, S::Empty, S::Empty),
            ("magma_block", solid | F::HOT, M::Stone, S::Full, S::Full),
            ("furnace", solid, M::Stone, S::Full, S::Full),
            ("lit_furnace", solid | F::HOT, M::Stone, S::Full, S::Full),
            ("netherrack", solid, M::Stone, S::Full, S::Full),
            ("ice", solid, M::Glass, S::Full, S::Full),
            ("snow", F::REPLACEABLE, M::Snow, S::Empty, S::Carpet),
            ("oak_slab", F::SOLID, M::Wood, S::BottomSlab, S::BottomSlab),
            ("glass", F::SOLID, M::Glass, S::Full, S::Full),
            ("tall_grass", F::REPLACEABLE, M::Grass, S::Empty, S::Cross),
            ("oak_planks", solid, M::Wood, S::Full, S::Full),
            ("white_carpet", F::empty(), M::Wool, S::Carpet, S::Carpet),
        ];
        for (path, flags, material, collision, outline) in defaults {
            registry.register(BlockProperties::new(
                path, flags, material, collision, outline,
            ));
        }
        debug_assert_eq!(registry.id_of(&RegistryKey::minecraft("lava")), Some(BLOCK_LAVA));
        debug_assert_eq!(
            registry.id_of(&RegistryKey::minecraft("white_carpet")),
            Some(BLOCK_CARPET)
        );
        registry
    }

    /// Append a block and return its id. Re-registering a key replaces the entry.
    pub fn register(&mut self, properties: BlockProperties) -> BlockId {
        if let Some(&id) = self.by_key.get(&properties.key) {
            debug!(key = %properties.key, id, "Replacing registered block");
            self.blocks[id as usize] = properties;
            return id;
        }
        let id = self.blocks.len() as BlockId;
        self.by_key.insert(properties.key.clone(), id);
        self.blocks.push(properties);
        id
    }

    /// Properties for `id`; unknown ids read as air.
    pub fn get(&self, id: BlockId) -> &BlockProperties {
        self.blocks
            .get(id as usize)
            .unwrap_or(&self.blocks[BLOCK_AIR as usize])
    }

    pub fn id_of(&self, key: &RegistryKey) -> Option<BlockId> {
        self.by_key.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
