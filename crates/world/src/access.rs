//! Host world interface consumed by vein generation and the deferred drain.

use crate::chunk::{BlockPos, BlockState, ChunkPos, CHUNK_SIZE_Y};
use terra_core::RegistryKey;

/// Vertical build limits plus the altitude the pebble surface scan starts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorldBounds {
    /// Lowest buildable Y (inclusive).
    pub min_y: i32,
    /// Highest buildable Y (exclusive).
    pub max_y: i32,
    /// Y the downward surface scan starts at.
    pub surface_scan_start: i32,
}

impl Default for WorldBounds {
    fn default() -> Self {
        Self {
            min_y: 0,
            max_y: CHUNK_SIZE_Y as i32,
            surface_scan_start: 128,
        }
    }
}

impl WorldBounds {
    #[inline]
    pub fn contains_y(&self, y: i32) -> bool {
        y >= self.min_y && y < self.max_y
    }
}

/// Everything vein generation needs from the live world.
///
/// Implementations decide what "exists" means: a chunk must report `true` from
/// [`WorldAccess::chunk_exists`] before its deferred entries are drained.
pub trait WorldAccess {
    fn bounds(&self) -> WorldBounds;

    /// Whether the chunk column has been generated (or is being generated).
    fn chunk_exists(&self, chunk: ChunkPos) -> bool;

    fn block_state(&self, pos: BlockPos) -> BlockState;

    fn set_block_state(&mut self, pos: BlockPos, state: BlockState);

    /// Air-like blocks the surface scan passes through.
    fn is_replaceable(&self, state: BlockState) -> bool;

    fn state_has_tag(&self, state: BlockState, tag: &RegistryKey) -> bool;

    /// Whether `state` could stay at `pos` (e.g. needs a solid block below).
    /// Does not look at what currently occupies `pos`.
    fn is_valid_placement(&self, state: BlockState, pos: BlockPos) -> bool;

    /// Equality used by exact-state replacers. Defaults to full state equality.
    fn states_match(&self, existing: BlockState, expected: BlockState) -> bool {
        existing == expected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_bounds_match_chunk_height() {
        let bounds = WorldBounds::default();
        assert!(bounds.contains_y(0));
        assert!(bounds.contains_y(255));
        assert!(!bounds.contains_y(256));
        assert!(!bounds.contains_y(-1));
        assert_eq!(bounds.surface_scan_start, 128);
    }
}
