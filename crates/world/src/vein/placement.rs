use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::chunk::{BlockPos, ChunkPos, CHUNK_SIZE_X, CHUNK_SIZE_Z};

/// Per-chunk roll deciding whether (and where) a vein starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VeinPlacement {
    /// One vein per `chance` chunks on average.
    pub chance: u32,
    /// Lowest start Y.
    pub min_y: i32,
    /// Start Y range above `min_y`.
    pub height: u32,
}

impl Default for VeinPlacement {
    fn default() -> Self {
        Self {
            chance: 1,
            min_y: 0,
            height: 64,
        }
    }
}

impl VeinPlacement {
    /// Draw order: chance roll, then local x, height offset, local z.
    pub fn start_position<R: Rng + ?Sized>(&self, chunk: ChunkPos, rng: &mut R) -> Option<BlockPos> {
        if rng.gen_range(0..self.chance.max(1)) != 0 {
            return None;
        }
        let x = rng.gen_range(0..CHUNK_SIZE_X as i32);
        let y = rng.gen_range(0..self.height.max(1)) as i32 + self.min_y;
        let z = rng.gen_range(0..CHUNK_SIZE_Z as i32);
        Some(BlockPos::new(
            chunk.min_block_x() + x,
            y,
            chunk.min_block_z() + z,
        ))
    }
}
