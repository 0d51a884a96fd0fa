use std::fmt;

/// Chunk width (X axis) in voxels.
pub const CHUNK_SIZE_X: usize = 16;
/// Chunk height (Y axis) in voxels.
pub const CHUNK_SIZE_Y: usize = 256;
/// Chunk depth (Z axis) in voxels.
pub const CHUNK_SIZE_Z: usize = 16;
/// Total voxel count per chunk.
pub const CHUNK_VOLUME: usize = CHUNK_SIZE_X * CHUNK_SIZE_Y * CHUNK_SIZE_Z;

/// Block identifier referencing the registry.
pub type BlockId = u16;

/// Reserved ID for air.
pub const BLOCK_AIR: BlockId = 0;

/// What occupies a voxel: block type plus variant bits.
///
/// Opaque to vein generation; only the host decides what two states have in common.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct BlockState {
    pub id: BlockId,
    pub meta: u16,
}

impl BlockState {
    pub const AIR: Self = Self::of(BLOCK_AIR);

    pub const fn new(id: BlockId, meta: u16) -> Self {
        Self { id, meta }
    }

    /// Default variant of a block.
    pub const fn of(id: BlockId) -> Self {
        Self { id, meta: 0 }
    }

    #[inline]
    pub fn is_air(&self) -> bool {
        self.id == BLOCK_AIR
    }
}

/// Chunk-local position (X, Y, Z).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalPos {
    pub x: usize,
    pub y: usize,
    pub z: usize,
}

impl LocalPos {
    /// Convert to a linear index within the voxel array.
    pub fn index(self) -> usize {
        debug_assert!(self.x < CHUNK_SIZE_X);
        debug_assert!(self.y < CHUNK_SIZE_Y);
        debug_assert!(self.z < CHUNK_SIZE_Z);
        (self.y * CHUNK_SIZE_Z + self.z) * CHUNK_SIZE_X + self.x
    }
}

/// Chunk coordinate (X,Z) in chunk space.
/// Implements Ord for deterministic iteration in BTreeMap/BTreeSet (sorts by x, then z).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct ChunkPos {
    pub x: i32,
    pub z: i32,
}

impl ChunkPos {
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Chunk column owning a block position.
    pub const fn containing(pos: BlockPos) -> Self {
        Self {
            x: pos.x >> 4,
            z: pos.z >> 4,
        }
    }

    /// World X of the chunk's minimum corner.
    pub const fn min_block_x(self) -> i32 {
        self.x * CHUNK_SIZE_X as i32
    }

    /// World Z of the chunk's minimum corner.
    pub const fn min_block_z(self) -> i32 {
        self.z * CHUNK_SIZE_Z as i32
    }
}

impl fmt::Display for ChunkPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Absolute block position in world space.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    #[inline]
    pub const fn chunk(self) -> ChunkPos {
        ChunkPos::containing(self)
    }

    #[inline]
    pub const fn up(self) -> Self {
        Self::new(self.x, self.y + 1, self.z)
    }

    #[inline]
    pub const fn down(self) -> Self {
        Self::new(self.x, self.y - 1, self.z)
    }

    /// Position inside the owning chunk, or `None` when Y is outside the column.
    pub fn local(self) -> Option<LocalPos> {
        if self.y < 0 || self.y >= CHUNK_SIZE_Y as i32 {
            return None;
        }
        Some(LocalPos {
            x: self.x.rem_euclid(CHUNK_SIZE_X as i32) as usize,
            y: self.y as usize,
            z: self.z.rem_euclid(CHUNK_SIZE_Z as i32) as usize,
        })
    }
}

impl fmt::Display for BlockPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    /// Dirty flags set whenever chunk data changes.
    pub struct DirtyFlags: u8 {
        const BLOCKS = 0b0000_0001;
        const DECORATED = 0b0000_0010;
    }
}

impl Default for DirtyFlags {
    fn default() -> Self {
        DirtyFlags::empty()
    }
}

/// Chunk storing one block state per voxel plus dirty flags.
pub struct Chunk {
    position: ChunkPos,
    voxels: Vec<BlockState>,
    dirty: DirtyFlags,
}

impl Chunk {
    /// Allocate a fresh chunk filled with air.
    pub fn new(position: ChunkPos) -> Self {
        Self {
            position,
            voxels: vec![BlockState::AIR; CHUNK_VOLUME],
            dirty: DirtyFlags::BLOCKS,
        }
    }

    #[inline]
    pub fn position(&self) -> ChunkPos {
        self.position
    }

    fn index(x: usize, y: usize, z: usize) -> usize {
        LocalPos { x, y, z }.index()
    }

    /// Fetch a block state copy.
    pub fn block(&self, x: usize, y: usize, z: usize) -> BlockState {
        self.voxels[Self::index(x, y, z)]
    }

    /// Set a block state and mark the chunk dirty when it changed.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, state: BlockState) {
        let idx = Self::index(x, y, z);
        if self.voxels[idx] != state {
            self.voxels[idx] = state;
            self.dirty.insert(DirtyFlags::BLOCKS);
        }
    }

    /// Record that decoration (veins + deferred drain) has run for this chunk.
    pub fn mark_decorated(&mut self) {
        self.dirty.insert(DirtyFlags::DECORATED);
    }

    /// Consume and return the current dirty flags.
    pub fn take_dirty_flags(&mut self) -> DirtyFlags {
        let flags = self.dirty;
        self.dirty = DirtyFlags::empty();
        flags
    }

    /// Count voxels holding the given block id.
    pub fn count_blocks(&self, id: BlockId) -> usize {
        self.voxels.iter().filter(|state| state.id == id).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_block_marks_dirty() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        assert!(chunk.take_dirty_flags().contains(DirtyFlags::BLOCKS));
        chunk.set_block(1, 2, 3, BlockState::new(5, 1));
        assert_eq!(chunk.block(1, 2, 3), BlockState::new(5, 1));
        assert!(chunk.take_dirty_flags().contains(DirtyFlags::BLOCKS));
    }

    #[test]
    fn test_set_same_block_no_dirty() {
        let mut chunk = Chunk::new(ChunkPos::new(0, 0));
        chunk.take_dirty_flags();
        chunk.set_block(0, 0, 0, BlockState::AIR);
        assert!(chunk.take_dirty_flags().is_empty());
    }

    #[test]
    fn test_local_pos_index() {
        assert_eq!(LocalPos { x: 0, y: 0, z: 0 }.index(), 0);
        assert_eq!(LocalPos { x: 15, y: 0, z: 0 }.index(), 15);
        assert_eq!(
            LocalPos { x: 0, y: 1, z: 0 }.index(),
            CHUNK_SIZE_Z * CHUNK_SIZE_X
        );
    }

    #[test]
    fn block_pos_maps_to_owning_chunk() {
        assert_eq!(BlockPos::new(0, 64, 0).chunk(), ChunkPos::new(0, 0));
        assert_eq!(BlockPos::new(15, 64, 15).chunk(), ChunkPos::new(0, 0));
        assert_eq!(BlockPos::new(16, 64, -1).chunk(), ChunkPos::new(1, -1));
        assert_eq!(BlockPos::new(-16, 0, -17).chunk(), ChunkPos::new(-1, -2));
    }

    #[test]
    fn negative_positions_have_positive_local_coords() {
        let local = BlockPos::new(-1, 10, -16).local().unwrap();
        assert_eq!((local.x, local.y, local.z), (15, 10, 0));
        assert!(BlockPos::new(0, -1, 0).local().is_none());
        assert!(BlockPos::new(0, 256, 0).local().is_none());
    }

    #[test]
    fn test_chunk_pos_display() {
        assert_eq!(format!("{}", ChunkPos::new(5, -3)), "(5, -3)");
    }

    #[test]
    fn test_chunk_pos_ordering() {
        // ChunkPos implements Ord for BTreeMap determinism
        assert!(ChunkPos::new(0, 0) < ChunkPos::new(1, 0));
        assert!(ChunkPos::new(0, 0) < ChunkPos::new(0, 1));
    }

    #[test]
    fn test_chunk_new_is_air() {
        let chunk = Chunk::new(ChunkPos::new(0, 0));
        assert_eq!(chunk.count_blocks(BLOCK_AIR), CHUNK_VOLUME);
    }

    #[test]
    fn test_block_state_serialization() {
        let state = BlockState::new(42, 7);
        let serialized = serde_json::to_string(&state).unwrap();
        let deserialized: BlockState = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, state);
    }
}
