use std::collections::BTreeMap;

use terra_core::RegistryKey;

use crate::access::{WorldAccess, WorldBounds};
use crate::blocks::{BlockCatalog, DefaultBlocks};
use crate::chunk::{BlockPos, BlockState, Chunk, ChunkPos};

/// In-memory chunk arena.
/// Uses BTreeMap for deterministic iteration order.
#[derive(Default)]
pub struct ChunkStorage {
    chunks: BTreeMap<ChunkPos, Chunk>,
}

impl ChunkStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resident chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true when no chunks are currently stored.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn contains(&self, pos: ChunkPos) -> bool {
        self.chunks.contains_key(&pos)
    }

    /// Insert a generated chunk, replacing any previous chunk at that position.
    pub fn insert(&mut self, chunk: Chunk) {
        self.chunks.insert(chunk.position(), chunk);
    }

    /// Obtain mutable access to a chunk, creating an empty one if necessary.
    pub fn ensure_chunk(&mut self, pos: ChunkPos) -> &mut Chunk {
        self.chunks.entry(pos).or_insert_with(|| Chunk::new(pos))
    }

    /// Attempt to fetch a chunk immutably.
    pub fn get(&self, pos: ChunkPos) -> Option<&Chunk> {
        self.chunks.get(&pos)
    }

    /// Fetch a chunk mutably (without creating it).
    pub fn get_mut(&mut self, pos: ChunkPos) -> Option<&mut Chunk> {
        self.chunks.get_mut(&pos)
    }

    /// Iterate over currently resident chunk positions.
    pub fn iter_positions(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.chunks.keys().copied()
    }
}

/// Reference host world: resident chunks plus a block catalog.
///
/// A chunk "exists" once it has been inserted into the storage.
pub struct ChunkWorld<C: BlockCatalog = DefaultBlocks> {
    storage: ChunkStorage,
    catalog: C,
    bounds: WorldBounds,
}

impl ChunkWorld<DefaultBlocks> {
    pub fn with_default_blocks() -> Self {
        Self::new(DefaultBlocks)
    }
}

impl<C: BlockCatalog> ChunkWorld<C> {
    pub fn new(catalog: C) -> Self {
        Self {
            storage: ChunkStorage::new(),
            catalog,
            bounds: WorldBounds::default(),
        }
    }

    pub fn with_bounds(mut self, bounds: WorldBounds) -> Self {
        self.bounds = bounds;
        self
    }

    pub fn storage(&self) -> &ChunkStorage {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut ChunkStorage {
        &mut self.storage
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }
}

impl<C: BlockCatalog> WorldAccess for ChunkWorld<C> {
    fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    fn chunk_exists(&self, chunk: ChunkPos) -> bool {
        self.storage.contains(chunk)
    }

    fn block_state(&self, pos: BlockPos) -> BlockState {
        if !self.bounds.contains_y(pos.y) {
            return BlockState::AIR;
        }
        match (self.storage.get(pos.chunk()), pos.local()) {
            (Some(chunk), Some(local)) => chunk.block(local.x, local.y, local.z),
            _ => BlockState::AIR,
        }
    }

    fn set_block_state(&mut self, pos: BlockPos, state: BlockState) {
        if !self.bounds.contains_y(pos.y) {
            return;
        }
        let Some(local) = pos.local() else {
            return;
        };
        if let Some(chunk) = self.storage.get_mut(pos.chunk()) {
            chunk.set_block(local.x, local.y, local.z, state);
        }
    }

    fn is_replaceable(&self, state: BlockState) -> bool {
        self.catalog.is_replaceable(state.id)
    }

    fn state_has_tag(&self, state: BlockState, tag: &RegistryKey) -> bool {
        self.catalog.has_tag(state.id, tag)
    }

    fn is_valid_placement(&self, state: BlockState, pos: BlockPos) -> bool {
        if !self.bounds.contains_y(pos.y) {
            return false;
        }
        if self.catalog.needs_support(state.id) {
            return self.catalog.is_solid(self.block_state(pos.down()).id);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::ids;

    #[test]
    fn iter_positions_is_deterministic() {
        let mut storage = ChunkStorage::new();

        // Insert in non-sorted order
        storage.ensure_chunk(ChunkPos::new(5, 5));
        storage.ensure_chunk(ChunkPos::new(1, 2));
        storage.ensure_chunk(ChunkPos::new(3, 0));
        storage.ensure_chunk(ChunkPos::new(0, 0));

        let order: Vec<_> = storage.iter_positions().collect();
        assert_eq!(
            order,
            vec![
                ChunkPos::new(0, 0),
                ChunkPos::new(1, 2),
                ChunkPos::new(3, 0),
                ChunkPos::new(5, 5),
            ]
        );
    }

    #[test]
    fn get_returns_none_for_missing_chunk() {
        let mut storage = ChunkStorage::new();
        assert!(storage.get(ChunkPos::new(999, 999)).is_none());
        assert!(storage.get_mut(ChunkPos::new(999, 999)).is_none());
    }

    #[test]
    fn missing_chunks_read_as_air_and_ignore_writes() {
        let mut world = ChunkWorld::with_default_blocks();
        let pos = BlockPos::new(40, 10, 40);
        assert!(!world.chunk_exists(pos.chunk()));
        world.set_block_state(pos, BlockState::of(ids::STONE));
        assert_eq!(world.block_state(pos), BlockState::AIR);
    }

    #[test]
    fn writes_land_in_resident_chunk() {
        let mut world = ChunkWorld::with_default_blocks();
        world.storage_mut().ensure_chunk(ChunkPos::new(-1, 0));
        let pos = BlockPos::new(-3, 70, 5);
        world.set_block_state(pos, BlockState::of(ids::IRON_ORE));
        assert_eq!(world.block_state(pos), BlockState::of(ids::IRON_ORE));
    }

    #[test]
    fn supported_blocks_need_solid_floor() {
        let mut world = ChunkWorld::with_default_blocks();
        world.storage_mut().ensure_chunk(ChunkPos::new(0, 0));
        let pebble = BlockState::of(ids::IRON_PEBBLE);
        let pos = BlockPos::new(2, 65, 2);
        assert!(!world.is_valid_placement(pebble, pos));
        world.set_block_state(pos.down(), BlockState::of(ids::GRASS));
        assert!(world.is_valid_placement(pebble, pos));
        world.set_block_state(pos.down(), BlockState::of(ids::WATER));
        assert!(!world.is_valid_placement(pebble, pos));
        assert!(!world.is_valid_placement(pebble, BlockPos::new(2, 256, 2)));
    }
}
