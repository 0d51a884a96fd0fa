//! Layered terrain filler.
//!
//! Produces the rock a vein grows through: bedrock, stone with granite and
//! gravel pockets, a dirt and grass surface, shallow water, and a few oak
//! trunks so the pebble surface scan has logs to pass through.

use rand::Rng;
use terra_core::feature_rng;
use tracing::{debug, instrument};

use crate::blocks::ids;
use crate::chunk::{BlockState, Chunk, ChunkPos, CHUNK_SIZE_X, CHUNK_SIZE_Y, CHUNK_SIZE_Z};
use crate::noise::{NoiseConfig, NoiseGenerator};

/// Base height for terrain (ground level).
pub const BASE_HEIGHT: i32 = 64;

/// Maximum height variation around the base.
pub const HEIGHT_VARIATION: i32 = 16;

/// Water fills columns whose surface is below this.
pub const SEA_LEVEL: i32 = 62;

/// Dirt layers between stone and grass.
const SURFACE_DEPTH: usize = 3;

/// RNG domain for surface decoration (trees, grass).
const SURFACE_FEATURE: u64 = 0x7EEE;

/// Terrain generator that fills chunks with blocks.
pub struct LayeredTerrain {
    world_seed: u64,
    surface: NoiseGenerator,
    pockets: NoiseGenerator,
}

impl LayeredTerrain {
    pub fn new(world_seed: u64) -> Self {
        let seed = world_seed as u32;
        Self {
            world_seed,
            surface: NoiseGenerator::new(NoiseConfig::surface(seed)),
            pockets: NoiseGenerator::new(NoiseConfig::pockets(seed)),
        }
    }

    /// Surface height of the world column `(x, z)`.
    pub fn height_at(&self, x: i32, z: i32) -> i32 {
        let noise = self.surface.sample_2d(x as f64, z as f64);
        (BASE_HEIGHT + (noise * HEIGHT_VARIATION as f64) as i32).clamp(8, CHUNK_SIZE_Y as i32 - 16)
    }

    /// Generate terrain for one chunk.
    #[instrument(skip(self), fields(chunk_pos = %chunk_pos, world_seed = self.world_seed))]
    pub fn generate_chunk(&self, chunk_pos: ChunkPos) -> Chunk {
        let mut chunk = Chunk::new(chunk_pos);
        let mut heights = [[0usize; CHUNK_SIZE_X]; CHUNK_SIZE_Z];

        for (z, row) in heights.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                let world_x = chunk_pos.min_block_x() + x as i32;
                let world_z = chunk_pos.min_block_z() + z as i32;
                let height = self.height_at(world_x, world_z) as usize;
                self.fill_column(&mut chunk, x, z, world_x, world_z, height);
                *cell = height;
            }
        }

        self.populate_surface(&mut chunk, &heights);
        debug!("terrain filled");
        chunk
    }

    fn fill_column(
        &self,
        chunk: &mut Chunk,
        x: usize,
        z: usize,
        world_x: i32,
        world_z: i32,
        height: usize,
    ) {
        let bedrock_height = 1 + (x + z) % 5;
        for y in 0..bedrock_height {
            chunk.set_block(x, y, z, BlockState::of(ids::BEDROCK));
        }

        let stone_top = height.saturating_sub(SURFACE_DEPTH).max(bedrock_height);
        for y in bedrock_height..stone_top {
            let pocket = self
                .pockets
                .sample_3d(world_x as f64, y as f64, world_z as f64);
            let id = if pocket > 0.45 {
                ids::GRANITE
            } else if pocket < -0.5 {
                ids::GRAVEL
            } else {
                ids::STONE
            };
            chunk.set_block(x, y, z, BlockState::of(id));
        }

        for y in stone_top..height {
            chunk.set_block(x, y, z, BlockState::of(ids::DIRT));
        }

        let underwater = (height as i32) < SEA_LEVEL;
        let top = if underwater { ids::SAND } else { ids::GRASS };
        chunk.set_block(x, height, z, BlockState::of(top));

        if underwater {
            for y in height + 1..=SEA_LEVEL as usize {
                chunk.set_block(x, y, z, BlockState::of(ids::WATER));
            }
        }
    }

    /// Oak trunks on a coarse grid, tall grass elsewhere.
    fn populate_surface(&self, chunk: &mut Chunk, heights: &[[usize; CHUNK_SIZE_X]; CHUNK_SIZE_Z]) {
        let pos = chunk.position();
        let mut rng = feature_rng(self.world_seed, pos.x, pos.z, SURFACE_FEATURE);

        for z in 0..CHUNK_SIZE_Z {
            for x in 0..CHUNK_SIZE_X {
                let roll: f32 = rng.gen();
                let ground = heights[z][x];
                if chunk.block(x, ground, z).id != ids::GRASS {
                    continue;
                }

                let on_grid = x % 4 == 2 && z % 4 == 2;
                if on_grid && roll < 0.2 {
                    let trunk = rng.gen_range(4..=6);
                    place_tree(chunk, x, ground + 1, z, trunk);
                } else if roll > 0.9 && chunk.block(x, ground + 1, z).is_air() {
                    chunk.set_block(x, ground + 1, z, BlockState::of(ids::TALL_GRASS));
                }
            }
        }
    }
}

fn place_tree(chunk: &mut Chunk, x: usize, base: usize, z: usize, trunk: usize) {
    let top = base + trunk;
    if top + 1 >= CHUNK_SIZE_Y {
        return;
    }
    for y in base..top {
        chunk.set_block(x, y, z, BlockState::of(ids::OAK_LOG));
    }
    // Canopy stays inside the chunk; grid positions keep a one-block margin.
    for dz in -1i32..=1 {
        for dx in -1i32..=1 {
            let lx = (x as i32 + dx) as usize;
            let lz = (z as i32 + dz) as usize;
            if chunk.block(lx, top, lz).is_air() {
                chunk.set_block(lx, top, lz, BlockState::of(ids::OAK_LEAVES));
            }
        }
    }
}
