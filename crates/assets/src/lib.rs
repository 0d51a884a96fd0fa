#![warn(missing_docs)]
//! Data pack schema + validation helpers: block packs and vein packs.

mod loader;
mod registry;
mod veins;

pub use loader::{registry_from_file, registry_from_str, vein_pack_from_file, vein_pack_from_str};
pub use registry::{BlockDescriptor, BlockRegistry};
pub use veins::{CurveDef, PebbleDef, ReplacerDef, StageDef, VeinDef, VeinPack};

use serde::Deserialize;
use terra_core::RegistryKeyError;
use thiserror::Error;

/// Block definition as written in a block pack. The position in the pack is the block id.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockDefinition {
    /// Human-readable identifier (e.g., "stone").
    pub name: String,
    /// Whether something can rest on top of the block.
    #[serde(default = "default_true")]
    pub solid: bool,
    /// Air-like blocks the pebble surface scan passes through.
    #[serde(default)]
    pub replaceable: bool,
    /// Blocks that may only sit on a solid block.
    #[serde(default)]
    pub needs_support: bool,
    /// Tag keys (e.g., "terra:ore_replaceables").
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_true() -> bool {
    true
}

/// Errors emitted during pack loading.
#[derive(Debug, Error)]
pub enum AssetError {
    /// Wrap IO errors when reading packs.
    #[error("failed to read asset pack: {0}")]
    Io(#[from] std::io::Error),
    /// Wrap serde parsing issues.
    #[error("failed to parse asset pack: {0}")]
    Parse(#[from] serde_json::Error),
    /// A vein references a block the registry does not know.
    #[error("vein `{vein}` references unknown block `{block}`")]
    UnknownBlock {
        /// Vein being resolved.
        vein: String,
        /// Missing block name.
        block: String,
    },
    /// A tag key failed validation.
    #[error("invalid key `{key}`: {source}")]
    InvalidKey {
        /// Offending input.
        key: String,
        /// Validation failure.
        #[source]
        source: RegistryKeyError,
    },
    /// Structurally valid JSON describing an unusable pack.
    #[error("invalid asset pack: {0}")]
    Invalid(String),
}

/// Parse a JSON string into a list of blocks.
pub fn load_blocks_from_str(input: &str) -> Result<Vec<BlockDefinition>, AssetError> {
    Ok(serde_json::from_str(input)?)
}
