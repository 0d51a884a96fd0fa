use std::collections::{BTreeSet, HashMap};

use terra_core::RegistryKey;
use terra_world::{BlockCatalog, BlockId, BlockState};

use crate::{AssetError, BlockDefinition};

/// Block metadata loaded from packs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDescriptor {
    /// Human-readable identifier (e.g., "stone").
    pub name: String,
    /// Whether something can rest on top of the block.
    pub solid: bool,
    /// Air-like blocks the surface scan passes through.
    pub replaceable: bool,
    /// Blocks that may only sit on a solid block.
    pub needs_support: bool,
    /// Tags the block belongs to.
    pub tags: BTreeSet<RegistryKey>,
}

impl BlockDescriptor {
    /// Construct descriptor from the JSON definition.
    pub fn from_definition(def: BlockDefinition) -> Result<Self, AssetError> {
        let tags = def
            .tags
            .iter()
            .map(|tag| {
                RegistryKey::parse(tag).map_err(|source| AssetError::InvalidKey {
                    key: tag.clone(),
                    source,
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(Self {
            name: def.name,
            solid: def.solid && !def.replaceable,
            replaceable: def.replaceable,
            needs_support: def.needs_support,
            tags,
        })
    }

    /// Helper for tests that need a simple descriptor.
    pub fn simple(name: &str, solid: bool) -> Self {
        Self {
            name: name.to_string(),
            solid,
            replaceable: !solid,
            needs_support: false,
            tags: BTreeSet::new(),
        }
    }
}

/// Registry storing block descriptors keyed by id.
#[derive(Debug, Clone)]
pub struct BlockRegistry {
    descriptors: Vec<BlockDescriptor>,
    name_to_id: HashMap<String, BlockId>,
}

impl BlockRegistry {
    /// Construct a registry from the supplied descriptors.
    pub fn new(descriptors: Vec<BlockDescriptor>) -> Result<Self, AssetError> {
        if descriptors.len() > usize::from(BlockId::MAX) + 1 {
            return Err(AssetError::Invalid(format!(
                "{} blocks exceed the id space",
                descriptors.len()
            )));
        }
        let mut name_to_id = HashMap::new();
        for (id, desc) in descriptors.iter().enumerate() {
            if name_to_id.insert(desc.name.clone(), id as BlockId).is_some() {
                return Err(AssetError::Invalid(format!(
                    "duplicate block name `{}`",
                    desc.name
                )));
            }
        }
        Ok(Self {
            descriptors,
            name_to_id,
        })
    }

    /// Number of registered blocks.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Look up a descriptor by numeric id.
    pub fn descriptor(&self, id: BlockId) -> Option<&BlockDescriptor> {
        self.descriptors.get(id as usize)
    }

    /// Resolve a block id by its name.
    pub fn id_by_name(&self, name: &str) -> Option<BlockId> {
        self.name_to_id.get(name).copied()
    }

    /// Default state of the named block.
    pub fn state_by_name(&self, name: &str) -> Option<BlockState> {
        self.id_by_name(name).map(BlockState::of)
    }

    /// Ids carrying `tag`, ascending.
    pub fn ids_with_tag(&self, tag: &RegistryKey) -> Vec<BlockId> {
        (0..self.descriptors.len())
            .filter(|&id| self.descriptors[id].tags.contains(tag))
            .map(|id| id as BlockId)
            .collect()
    }
}

impl BlockCatalog for BlockRegistry {
    fn is_replaceable(&self, id: BlockId) -> bool {
        self.descriptor(id).map(|d| d.replaceable).unwrap_or(true)
    }

    fn is_solid(&self, id: BlockId) -> bool {
        self.descriptor(id).map(|d| d.solid).unwrap_or(false)
    }

    fn needs_support(&self, id: BlockId) -> bool {
        self.descriptor(id).map(|d| d.needs_support).unwrap_or(false)
    }

    fn has_tag(&self, id: BlockId, tag: &RegistryKey) -> bool {
        self.descriptor(id)
            .map(|d| d.tags.contains(tag))
            .unwrap_or(false)
    }
}
