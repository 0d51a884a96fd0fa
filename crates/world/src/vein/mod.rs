//! Ore vein growth.

pub mod config;
pub mod grower;
pub mod placement;
pub mod replacer;

pub use config::{
    Depth, DepthFn, PebbleSpec, Stage, StageBuilder, VeinConfig, VeinConfigBuilder, VeinTuning,
    MAX_STAGE_RADIUS,
};
pub use grower::{commit, resolve_surface, Commit, VeinGrower, VeinOutcome, VeinSample};
pub use placement::VeinPlacement;
pub use replacer::{first_match, Replacer, ReplacerList};
