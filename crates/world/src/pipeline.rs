//! Per-chunk decoration: grow every configured vein, then drain deferred writes.

use terra_core::feature_rng;
use tracing::{debug, instrument};

use crate::access::WorldAccess;
use crate::blocks::BlockCatalog;
use crate::chunk::ChunkPos;
use crate::deferred::{on_chunk_generated, DrainStats, SharedDeferredStore};
use crate::storage::ChunkWorld;
use crate::terrain::LayeredTerrain;
use crate::vein::{VeinConfig, VeinGrower, VeinPlacement};

/// A named vein type with its per-chunk placement.
#[derive(Debug, Clone)]
pub struct VeinFeature {
    pub name: String,
    pub placement: VeinPlacement,
    pub config: VeinConfig,
}

/// Totals for one chunk's decoration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecorationStats {
    pub veins_started: usize,
    pub veins_accepted: usize,
    pub ores_placed: usize,
    pub ores_deferred: usize,
    pub ores_dropped: usize,
    pub pebbles_placed: usize,
    pub pebbles_deferred: usize,
    pub drain: DrainStats,
}

/// Runs vein features for a chunk and the deferred drain that follows them.
#[derive(Debug, Clone)]
pub struct ChunkDecorator {
    world_seed: u64,
    features: Vec<VeinFeature>,
    grower: VeinGrower,
    store: SharedDeferredStore,
}

impl ChunkDecorator {
    pub fn new(world_seed: u64, features: Vec<VeinFeature>, store: SharedDeferredStore) -> Self {
        Self {
            world_seed,
            features,
            grower: VeinGrower::new(),
            store,
        }
    }

    pub fn store(&self) -> &SharedDeferredStore {
        &self.store
    }

    pub fn features(&self) -> &[VeinFeature] {
        &self.features
    }

    /// Decorate `chunk`, which the host must already report as existing.
    ///
    /// Each feature draws from its own RNG derived from (seed, chunk, feature
    /// index), so adding a feature never shifts the others.
    #[instrument(skip(self, world), fields(chunk = %chunk))]
    pub fn decorate<W: WorldAccess + ?Sized>(&self, world: &mut W, chunk: ChunkPos) -> DecorationStats {
        let mut stats = DecorationStats::default();

        for (index, feature) in self.features.iter().enumerate() {
            let mut rng = feature_rng(self.world_seed, chunk.x, chunk.z, index as u64);
            let Some(start) = feature.placement.start_position(chunk, &mut rng) else {
                continue;
            };

            let outcome = self
                .grower
                .grow(world, &self.store, start, &feature.config, &mut rng);
            stats.veins_started += 1;
            stats.veins_accepted += usize::from(outcome.accepted);
            stats.ores_placed += outcome.placed_ores.len();
            stats.ores_deferred += outcome.deferred_ores;
            stats.ores_dropped += outcome.dropped_ores;
            stats.pebbles_placed += outcome.placed_pebbles.len();
            stats.pebbles_deferred += outcome.deferred_pebbles;
        }

        stats.drain = on_chunk_generated(world, &self.store, chunk);

        debug!(
            veins = stats.veins_started,
            accepted = stats.veins_accepted,
            placed = stats.ores_placed,
            deferred = stats.ores_deferred,
            drained = stats.drain.ores_placed,
            "decorated chunk"
        );
        stats
    }
}

/// Terrain plus decoration over the reference [`ChunkWorld`].
pub struct WorldGenerator {
    terrain: LayeredTerrain,
    decorator: ChunkDecorator,
}

impl WorldGenerator {
    pub fn new(world_seed: u64, features: Vec<VeinFeature>, store: SharedDeferredStore) -> Self {
        Self {
            terrain: LayeredTerrain::new(world_seed),
            decorator: ChunkDecorator::new(world_seed, features, store),
        }
    }

    pub fn decorator(&self) -> &ChunkDecorator {
        &self.decorator
    }

    /// Fill terrain, register the chunk as existing, then decorate it.
    ///
    /// Generating an already resident chunk is a no-op.
    pub fn generate_chunk<C: BlockCatalog>(
        &self,
        world: &mut ChunkWorld<C>,
        pos: ChunkPos,
    ) -> Option<DecorationStats> {
        if world.chunk_exists(pos) {
            return None;
        }
        let chunk = self.terrain.generate_chunk(pos);
        world.storage_mut().insert(chunk);

        let stats = self.decorator.decorate(world, pos);
        if let Some(chunk) = world.storage_mut().get_mut(pos) {
            chunk.mark_decorated();
        }
        Some(stats)
    }
}
