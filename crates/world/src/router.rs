//! Splits vein candidates into immediate writes and deferred writes.

use crate::access::WorldAccess;
use crate::chunk::{BlockPos, BlockState};
use crate::deferred::DeferredStore;
use crate::vein::replacer::ReplacerList;

/// Where a candidate ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Target chunk exists; the caller writes it now.
    Immediate,
    /// Recorded in the deferred store under the target chunk.
    Deferred,
    /// Outside the vertical build limits.
    Dropped,
}

/// Stateless routing policy over a locked [`DeferredStore`].
///
/// Callers hold the store lock across a whole vein so existence checks and
/// deferred inserts stay consistent with concurrent drains.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementRouter;

impl PlacementRouter {
    pub fn route_ore<W: WorldAccess + ?Sized>(
        &self,
        world: &W,
        store: &mut DeferredStore,
        pos: BlockPos,
        replacers: &ReplacerList,
    ) -> Routed {
        if !world.bounds().contains_y(pos.y) {
            return Routed::Dropped;
        }
        let chunk = pos.chunk();
        if world.chunk_exists(chunk) {
            return Routed::Immediate;
        }
        store.ores_for(chunk).insert(pos, replacers.clone());
        store.mark_dirty();
        Routed::Deferred
    }

    /// Route a pebble column. Deferred pebbles are stored at `y = 0`; their
    /// surface is found when the target chunk drains.
    pub fn route_pebble<W: WorldAccess + ?Sized>(
        &self,
        world: &W,
        store: &mut DeferredStore,
        x: i32,
        z: i32,
        pebble: BlockState,
    ) -> Routed {
        let column = BlockPos::new(x, 0, z);
        let chunk = column.chunk();
        if world.chunk_exists(chunk) {
            return Routed::Immediate;
        }
        store.pebbles_for(chunk).insert(column, pebble);
        store.mark_dirty();
        Routed::Deferred
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::ids;
    use crate::chunk::ChunkPos;
    use crate::storage::ChunkWorld;
    use crate::vein::replacer::Replacer;

    fn coal() -> ReplacerList {
        vec![Replacer::ore(BlockState::of(ids::COAL_ORE))].into()
    }

    #[test]
    fn existing_chunk_routes_immediately() {
        let mut world = ChunkWorld::with_default_blocks();
        world.storage_mut().ensure_chunk(ChunkPos::new(0, 0));
        let mut store = DeferredStore::new();
        let routed = PlacementRouter.route_ore(&world, &mut store, BlockPos::new(3, 40, 3), &coal());
        assert_eq!(routed, Routed::Immediate);
        assert!(store.is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn missing_chunk_defers_into_owning_entry() {
        let world = ChunkWorld::with_default_blocks();
        let mut store = DeferredStore::new();
        let pos = BlockPos::new(-1, 40, 17);
        let routed = PlacementRouter.route_ore(&world, &mut store, pos, &coal());
        assert_eq!(routed, Routed::Deferred);
        assert!(store.is_dirty());
        let entry = store.entry(ChunkPos::new(-1, 1)).unwrap();
        assert_eq!(entry.ores.get(&pos), Some(&coal()));
    }

    #[test]
    fn out_of_bounds_ores_are_dropped() {
        let world = ChunkWorld::with_default_blocks();
        let mut store = DeferredStore::new();
        for y in [-1, 256, 1000] {
            let routed = PlacementRouter.route_ore(&world, &mut store, BlockPos::new(0, y, 0), &coal());
            assert_eq!(routed, Routed::Dropped);
        }
        assert!(store.is_empty());
    }

    #[test]
    fn deferred_pebbles_keep_column_only() {
        let world = ChunkWorld::with_default_blocks();
        let mut store = DeferredStore::new();
        let pebble = BlockState::of(ids::IRON_PEBBLE);
        let routed = PlacementRouter.route_pebble(&world, &mut store, 20, -5, pebble);
        assert_eq!(routed, Routed::Deferred);
        let entry = store.entry(ChunkPos::new(1, -1)).unwrap();
        assert_eq!(entry.pebbles.get(&BlockPos::new(20, 0, -5)), Some(&pebble));
    }
}
