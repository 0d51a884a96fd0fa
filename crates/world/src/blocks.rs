//! Block catalog: the per-block facts vein placement asks the host about.
//!
//! [`DefaultBlocks`] is the built-in palette used by the reference world and
//! tests; data-driven packs implement [`BlockCatalog`] in `terra-assets`.

use crate::chunk::BlockId;
use terra_core::RegistryKey;

/// Block IDs of the built-in palette. Mirrors `config/blocks.json` index for index.
pub mod ids {
    use crate::chunk::BlockId;

    pub const AIR: BlockId = 0;
    pub const STONE: BlockId = 1;
    pub const DIRT: BlockId = 2;
    pub const GRASS: BlockId = 3;
    pub const SAND: BlockId = 4;
    pub const GRAVEL: BlockId = 5;
    pub const WATER: BlockId = 6;
    pub const GRANITE: BlockId = 7;
    pub const TALL_GRASS: BlockId = 8;
    pub const BEDROCK: BlockId = 9;
    pub const OAK_LOG: BlockId = 10;
    pub const OAK_LEAVES: BlockId = 11;

    // Ore block IDs
    pub const COAL_ORE: BlockId = 12;
    pub const IRON_ORE: BlockId = 13;
    pub const GOLD_ORE: BlockId = 14;
    pub const DIAMOND_ORE: BlockId = 15;

    // Surface markers placed above veins
    pub const COAL_PEBBLE: BlockId = 16;
    pub const IRON_PEBBLE: BlockId = 17;
    pub const GOLD_PEBBLE: BlockId = 18;
}

/// Well-known tags.
pub mod tags {
    use terra_core::RegistryKey;

    /// Stone-class blocks plus gravel: the default replacement target for ores.
    pub const ORE_REPLACEABLES: &str = "terra:ore_replaceables";
    /// Natural stone variants.
    pub const STONE: &str = "terra:stone";
    /// Tree trunks; the surface scan treats them like air.
    pub const LOGS: &str = "terra:logs";

    /// Parse one of the constants above (or any other known-valid tag literal).
    pub fn key(name: &str) -> RegistryKey {
        RegistryKey::parse(name).expect("built-in tag names are valid registry keys")
    }
}

/// Per-block facts supplied by a block registry.
pub trait BlockCatalog {
    /// Air-like blocks that the surface scan passes through.
    fn is_replaceable(&self, id: BlockId) -> bool;
    /// Blocks able to support something resting on top.
    fn is_solid(&self, id: BlockId) -> bool;
    /// Blocks that may only sit on a solid block.
    fn needs_support(&self, id: BlockId) -> bool;
    /// Tag membership test.
    fn has_tag(&self, id: BlockId, tag: &RegistryKey) -> bool;
}

/// Built-in block palette.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultBlocks;

impl BlockCatalog for DefaultBlocks {
    fn is_replaceable(&self, id: BlockId) -> bool {
        matches!(id, ids::AIR | ids::WATER | ids::TALL_GRASS)
    }

    fn is_solid(&self, id: BlockId) -> bool {
        !self.is_replaceable(id)
            && !matches!(id, ids::COAL_PEBBLE | ids::IRON_PEBBLE | ids::GOLD_PEBBLE)
    }

    fn needs_support(&self, id: BlockId) -> bool {
        matches!(
            id,
            ids::COAL_PEBBLE | ids::IRON_PEBBLE | ids::GOLD_PEBBLE | ids::TALL_GRASS
        )
    }

    fn has_tag(&self, id: BlockId, tag: &RegistryKey) -> bool {
        if tag.namespace() != "terra" {
            return false;
        }
        match tag.path() {
            "ore_replaceables" => matches!(id, ids::STONE | ids::GRANITE | ids::GRAVEL),
            "stone" => matches!(id, ids::STONE | ids::GRANITE),
            "logs" => id == ids::OAK_LOG,
            _ => false,
        }
    }
}
