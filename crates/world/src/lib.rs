mod access;
mod blocks;
mod chunk;
mod deferred;
mod noise;
mod persist;
mod pipeline;
mod router;
mod storage;
mod terrain;
pub mod vein;

pub use access::*;
pub use blocks::*;
pub use chunk::*;
pub use deferred::*;
pub use self::noise::*;
pub use persist::*;
pub use pipeline::*;
pub use router::*;
pub use storage::*;
pub use terrain::*;
pub use vein::*;
