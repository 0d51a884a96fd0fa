use std::fs;
use std::path::Path;

use tracing::debug;

use crate::{AssetError, BlockDescriptor, BlockRegistry, VeinPack};

/// Load a block registry from the provided JSON file path.
pub fn registry_from_file(path: &Path) -> Result<BlockRegistry, AssetError> {
    let data = fs::read_to_string(path)?;
    let registry = registry_from_str(&data)?;
    debug!(path = %path.display(), blocks = registry.len(), "loaded block pack");
    Ok(registry)
}

/// Load a block registry from an in-memory JSON string.
pub fn registry_from_str(input: &str) -> Result<BlockRegistry, AssetError> {
    let defs = crate::load_blocks_from_str(input)?;
    let descriptors = defs
        .into_iter()
        .map(BlockDescriptor::from_definition)
        .collect::<Result<Vec<_>, _>>()?;
    BlockRegistry::new(descriptors)
}

/// Load a vein pack from the provided JSON file path.
pub fn vein_pack_from_file(path: &Path) -> Result<VeinPack, AssetError> {
    let data = fs::read_to_string(path)?;
    vein_pack_from_str(&data)
}

/// Load a vein pack from an in-memory JSON string.
pub fn vein_pack_from_str(input: &str) -> Result<VeinPack, AssetError> {
    Ok(serde_json::from_str(input)?)
}
