//! Routers and a drain racing on the shared deferred store.
//!
//! Several generator threads route ores into two missing chunks while another
//! thread generates one of them and drains it. Every write must end up in
//! exactly one place: applied by the drain, written immediately by a router
//! that saw the chunk exist, or still pending for the chunk nobody generated.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Barrier;
use std::thread;

use terra_core::RegistryKey;
use terra_world::{
    ids, on_chunk_generated, BlockPos, BlockState, ChunkPos, ChunkWorld, PlacementRouter,
    Replacer, ReplacerList, Routed, SharedDeferredStore, WorldAccess, WorldBounds,
};

const WRITERS: i32 = 4;
const WRITES_PER_WRITER: i32 = 256;

const DRAINED: ChunkPos = ChunkPos { x: 2, z: -3 };
const UNTOUCHED: ChunkPos = ChunkPos { x: -5, z: 7 };

/// What a router on another thread sees: `DRAINED` exists once the flag is set,
/// `UNTOUCHED` never does. Reads and writes are never issued for routing.
struct RouterView<'a> {
    drained_exists: &'a AtomicBool,
}

impl WorldAccess for RouterView<'_> {
    fn bounds(&self) -> WorldBounds {
        WorldBounds::default()
    }

    fn chunk_exists(&self, chunk: ChunkPos) -> bool {
        chunk == DRAINED && self.drained_exists.load(Ordering::Acquire)
    }

    fn block_state(&self, _pos: BlockPos) -> BlockState {
        BlockState::AIR
    }

    fn set_block_state(&mut self, _pos: BlockPos, _state: BlockState) {}

    fn is_replaceable(&self, _state: BlockState) -> bool {
        true
    }

    fn state_has_tag(&self, _state: BlockState, _tag: &RegistryKey) -> bool {
        false
    }

    fn is_valid_placement(&self, _state: BlockState, _pos: BlockPos) -> bool {
        true
    }
}

/// Unique position in `chunk` for write `index` of `writer`.
fn target(chunk: ChunkPos, writer: i32, index: i32) -> BlockPos {
    BlockPos::new(
        chunk.min_block_x() + index % 16,
        10 + writer * 16 + index / 16,
        chunk.min_block_z() + (index / 4) % 16,
    )
}

fn all_targets(chunk: ChunkPos) -> BTreeSet<BlockPos> {
    (0..WRITERS)
        .flat_map(|writer| (0..WRITES_PER_WRITER).map(move |index| target(chunk, writer, index)))
        .collect()
}

/// The drained chunk as generated terrain: stone up to y = 100.
fn stone_world() -> ChunkWorld {
    let mut world = ChunkWorld::with_default_blocks();
    let chunk = world.storage_mut().ensure_chunk(DRAINED);
    for y in 0..100 {
        for z in 0..16 {
            for x in 0..16 {
                chunk.set_block(x, y, z, BlockState::of(ids::STONE));
            }
        }
    }
    world
}

#[test]
fn targets_are_unique() {
    let targets = all_targets(DRAINED);
    assert_eq!(targets.len(), (WRITERS * WRITES_PER_WRITER) as usize);
    assert!(targets.iter().all(|pos| pos.chunk() == DRAINED));
    assert!(all_targets(UNTOUCHED).iter().all(|pos| pos.chunk() == UNTOUCHED));
}

#[test]
fn concurrent_routing_and_drain_lose_nothing() {
    for round in 0..8 {
        let store = SharedDeferredStore::default();
        let drained_exists = AtomicBool::new(false);
        let start = Barrier::new(WRITERS as usize + 1);
        let replacers: ReplacerList = vec![Replacer::ore(BlockState::of(ids::IRON_ORE))].into();

        let (world, stats, immediate) = thread::scope(|scope| {
            let writers: Vec<_> = (0..WRITERS)
                .map(|writer| {
                    let store = &store;
                    let start = &start;
                    let replacers = &replacers;
                    let view = RouterView {
                        drained_exists: &drained_exists,
                    };
                    scope.spawn(move || {
                        start.wait();
                        let mut immediate = Vec::new();
                        for index in 0..WRITES_PER_WRITER {
                            for chunk in [DRAINED, UNTOUCHED] {
                                let pos = target(chunk, writer, index);
                                let mut guard = store.lock();
                                match PlacementRouter.route_ore(&view, &mut guard, pos, replacers) {
                                    Routed::Immediate => immediate.push(pos),
                                    Routed::Deferred => {}
                                    Routed::Dropped => panic!("{pos} is inside the build limits"),
                                }
                            }
                            if index % 32 == 0 {
                                thread::yield_now();
                            }
                        }
                        immediate
                    })
                })
                .collect();

            let drainer = scope.spawn(|| {
                let mut world = stone_world();
                start.wait();
                while !store.has_entry(DRAINED) {
                    thread::yield_now();
                }
                // The chunk exists before its entry is drained.
                drained_exists.store(true, Ordering::Release);
                let stats = on_chunk_generated(&mut world, &store, DRAINED);
                (world, stats)
            });

            let immediate: Vec<BlockPos> = writers
                .into_iter()
                .flat_map(|writer| writer.join().unwrap())
                .collect();
            let (world, stats) = drainer.join().unwrap();
            (world, stats, immediate)
        });

        // Nothing lands in the drained chunk's entry once it exists.
        assert!(!store.has_entry(DRAINED), "round {round}");

        let applied: BTreeSet<BlockPos> = all_targets(DRAINED)
            .into_iter()
            .filter(|pos| world.block_state(*pos) == BlockState::of(ids::IRON_ORE))
            .collect();
        assert_eq!(stats.ores_pending, applied.len(), "round {round}");
        assert_eq!(stats.ores_placed, applied.len(), "round {round}");
        assert!(!applied.is_empty(), "round {round}");

        let immediate: BTreeSet<BlockPos> = immediate.into_iter().collect();
        assert!(applied.is_disjoint(&immediate), "round {round}: written twice");
        let mut accounted = applied.clone();
        accounted.extend(immediate.iter().copied());
        assert_eq!(accounted, all_targets(DRAINED), "round {round}: writes lost");

        // The other chunk was never generated: its entry holds every write.
        let snapshot = store.snapshot();
        let pending: BTreeSet<BlockPos> = snapshot
            .entry(UNTOUCHED)
            .map(|entry| entry.ores.keys().copied().collect())
            .unwrap_or_default();
        assert_eq!(pending, all_targets(UNTOUCHED), "round {round}");
        assert_eq!(snapshot.len(), 1, "round {round}");

        let mut world = world;
        assert!(on_chunk_generated(&mut world, &store, DRAINED).is_noop());
    }
}
