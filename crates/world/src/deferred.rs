//! Pending cross-chunk writes, keyed by the chunk they target.
//!
//! Entries are created when a vein reaches into a chunk that has not been
//! generated yet and are consumed exactly once, by that chunk's own
//! generation event ([`on_chunk_generated`]).

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::access::WorldAccess;
use crate::chunk::{BlockPos, BlockState, ChunkPos};
use crate::vein::grower::resolve_surface;
use crate::vein::replacer::{first_match, ReplacerList};

/// Everything waiting on one chunk.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeferredEntry {
    /// Ore candidates, resolved against the chunk's terrain at drain time.
    pub ores: BTreeMap<BlockPos, ReplacerList>,
    /// Pebble states keyed by column (`y` is always 0); surface-resolved at drain time.
    pub pebbles: BTreeMap<BlockPos, BlockState>,
}

impl DeferredEntry {
    pub fn is_empty(&self) -> bool {
        self.ores.is_empty() && self.pebbles.is_empty()
    }
}

/// Chunk-keyed map of pending writes plus a dirty flag for persistence.
///
/// Uses BTreeMap so iteration (and thus drain and save order) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeferredStore {
    entries: BTreeMap<ChunkPos, DeferredEntry>,
    dirty: bool,
}

impl DeferredStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_entries(entries: BTreeMap<ChunkPos, DeferredEntry>) -> Self {
        Self {
            entries,
            dirty: false,
        }
    }

    /// Pure presence query; never allocates.
    pub fn has_entry(&self, chunk: ChunkPos) -> bool {
        self.entries.contains_key(&chunk)
    }

    /// Pending ore map for `chunk`, creating an empty entry if absent.
    pub fn ores_for(&mut self, chunk: ChunkPos) -> &mut BTreeMap<BlockPos, ReplacerList> {
        &mut self.entries.entry(chunk).or_default().ores
    }

    /// Pending pebble map for `chunk`, creating an empty entry if absent.
    pub fn pebbles_for(&mut self, chunk: ChunkPos) -> &mut BTreeMap<BlockPos, BlockState> {
        &mut self.entries.entry(chunk).or_default().pebbles
    }

    pub fn entry(&self, chunk: ChunkPos) -> Option<&DeferredEntry> {
        self.entries.get(&chunk)
    }

    /// Delete the entry for `chunk`. No-op if absent.
    pub fn remove(&mut self, chunk: ChunkPos) {
        self.entries.remove(&chunk);
    }

    /// Remove and return the entry for `chunk`.
    pub fn take(&mut self, chunk: ChunkPos) -> Option<DeferredEntry> {
        self.entries.remove(&chunk)
    }

    /// Drop entries that hold nothing (left behind by lookups that never wrote).
    pub fn prune_empty(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_empty());
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn chunks(&self) -> impl Iterator<Item = ChunkPos> + '_ {
        self.entries.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChunkPos, &DeferredEntry)> + '_ {
        self.entries.iter().map(|(pos, entry)| (*pos, entry))
    }

    /// Total pending ore and pebble writes across all chunks.
    pub fn pending_counts(&self) -> (usize, usize) {
        self.entries.values().fold((0, 0), |(ores, pebbles), entry| {
            (ores + entry.ores.len(), pebbles + entry.pebbles.len())
        })
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Clear the dirty flag, returning its previous value.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

/// Store handle shared between concurrent chunk generations.
///
/// A single coarse lock: a router's existence check plus insert and a drain's
/// take run under the same guard, so they never interleave for one chunk.
#[derive(Debug, Clone, Default)]
pub struct SharedDeferredStore {
    inner: Arc<Mutex<DeferredStore>>,
}

impl SharedDeferredStore {
    pub fn new(store: DeferredStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    /// Lock the store. A poisoned lock is recovered; store mutations never leave
    /// it half-written.
    pub fn lock(&self) -> MutexGuard<'_, DeferredStore> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn has_entry(&self, chunk: ChunkPos) -> bool {
        self.lock().has_entry(chunk)
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> DeferredStore {
        self.lock().clone()
    }
}

/// What a drain did for one chunk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainStats {
    pub ores_pending: usize,
    pub ores_placed: usize,
    pub pebbles_pending: usize,
    pub pebbles_placed: usize,
}

impl DrainStats {
    pub fn is_noop(&self) -> bool {
        self.ores_pending == 0 && self.pebbles_pending == 0
    }
}

/// Chunk generation hook: apply and discard everything deferred for `chunk`.
///
/// The host must already report `chunk` as existing, so that routers running
/// concurrently write to it directly instead of recreating the entry.
/// Ores are applied per position without the acceptance gate. Calling this for
/// a chunk with no entry is a cheap no-op.
pub fn on_chunk_generated<W: WorldAccess + ?Sized>(
    world: &mut W,
    store: &SharedDeferredStore,
    chunk: ChunkPos,
) -> DrainStats {
    let entry = {
        let mut guard = store.lock();
        match guard.take(chunk) {
            Some(entry) => {
                guard.mark_dirty();
                entry
            }
            None => return DrainStats::default(),
        }
    };

    let mut stats = DrainStats {
        ores_pending: entry.ores.len(),
        pebbles_pending: entry.pebbles.len(),
        ..DrainStats::default()
    };

    for (pos, replacers) in &entry.ores {
        let existing = world.block_state(*pos);
        if let Some(replacer) = first_match(replacers, &*world, existing) {
            world.set_block_state(*pos, replacer.place());
            stats.ores_placed += 1;
        }
    }

    for (column, pebble) in &entry.pebbles {
        if let Some(pos) = resolve_surface(&*world, column.x, column.z, *pebble) {
            world.set_block_state(pos, *pebble);
            stats.pebbles_placed += 1;
        }
    }

    debug!(
        chunk = %chunk,
        ores_pending = stats.ores_pending,
        ores_placed = stats.ores_placed,
        pebbles_pending = stats.pebbles_pending,
        pebbles_placed = stats.pebbles_placed,
        "drained deferred entry"
    );
    stats
}
