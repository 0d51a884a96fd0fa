//! Vein configuration: stages, pebbles, depth-dependent parameters.

use std::f32::consts::FRAC_PI_2;
use std::fmt;
use std::sync::Arc;

use crate::chunk::BlockState;
use crate::vein::replacer::{Replacer, ReplacerList};

/// Vertical depth a vein starts at. Every tunable parameter is a function of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Depth(pub i32);

impl Depth {
    #[inline]
    pub fn y(self) -> i32 {
        self.0
    }
}

/// Values a [`DepthFn`] can interpolate.
pub trait DepthValue: Copy + fmt::Debug + Send + Sync + 'static {
    fn lerp(from: Self, to: Self, t: f32) -> Self;
}

impl DepthValue for i32 {
    fn lerp(from: Self, to: Self, t: f32) -> Self {
        (from as f32 + (to - from) as f32 * t).round() as i32
    }
}

impl DepthValue for f32 {
    fn lerp(from: Self, to: Self, t: f32) -> Self {
        from + (to - from) * t
    }
}

/// A parameter evaluated against the vein's starting depth.
#[derive(Clone)]
pub enum DepthFn<T> {
    Constant(T),
    /// Linear between two anchors, clamped to the anchor values outside them.
    Linear {
        from_y: i32,
        from: T,
        to_y: i32,
        to: T,
    },
    Custom(Arc<dyn Fn(Depth) -> T + Send + Sync>),
}

impl<T: DepthValue> DepthFn<T> {
    pub fn custom(f: impl Fn(Depth) -> T + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(f))
    }

    pub fn at(&self, depth: Depth) -> T {
        match self {
            Self::Constant(value) => *value,
            Self::Linear {
                from_y,
                from,
                to_y,
                to,
            } => {
                if from_y == to_y {
                    return *from;
                }
                let t = (depth.y() - from_y) as f32 / (to_y - from_y) as f32;
                T::lerp(*from, *to, t.clamp(0.0, 1.0))
            }
            Self::Custom(f) => f(depth),
        }
    }
}

impl<T> From<T> for DepthFn<T> {
    fn from(value: T) -> Self {
        Self::Constant(value)
    }
}

impl<T: fmt::Debug> fmt::Debug for DepthFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Self::Linear {
                from_y,
                from,
                to_y,
                to,
            } => f
                .debug_struct("Linear")
                .field("from_y", from_y)
                .field("from", from)
                .field("to_y", to_y)
                .field("to", to)
                .finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Largest stage radius a vein will scatter at.
pub const MAX_STAGE_RADIUS: i32 = 64;

/// One shell of a vein: where along the path it scatters blocks, and which.
#[derive(Debug, Clone)]
pub struct Stage {
    pub replacers: ReplacerList,
    pub min_radius: DepthFn<i32>,
    pub max_radius: DepthFn<i32>,
    /// Fraction of the `max² - min²` annulus area filled per segment.
    pub block_density: DepthFn<f32>,
    /// Chance the stage takes part in a given vein at all.
    pub spawn_chance: DepthFn<f32>,
}

impl Stage {
    pub fn builder() -> StageBuilder {
        StageBuilder::default()
    }

    /// `(min, max)` radius clamped to `[0, MAX_STAGE_RADIUS]` with `max >= min`.
    pub fn radii(&self, depth: Depth) -> (i32, i32) {
        let min = self.min_radius.at(depth).clamp(0, MAX_STAGE_RADIUS);
        let max = self.max_radius.at(depth).clamp(min, MAX_STAGE_RADIUS);
        (min, max)
    }

    /// Blocks scattered per segment, at most the annulus area.
    pub fn block_count(&self, depth: Depth) -> usize {
        let (min, max) = self.radii(depth);
        let area = i64::from(max) * i64::from(max) - i64::from(min) * i64::from(min);
        let density = f64::from(self.block_density.at(depth));
        let count = (area as f64 * density).round();
        if count.is_nan() || count <= 0.0 {
            0
        } else {
            count.min(area as f64) as usize
        }
    }
}

/// Surface marker dropped above the vein path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PebbleSpec {
    pub state: BlockState,
    /// Chance per segment.
    pub density: f32,
}

impl PebbleSpec {
    pub fn new(state: BlockState, density: f32) -> Self {
        Self { state, density }
    }
}

/// Empirically tuned constants of the growth walk.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VeinTuning {
    /// Fraction of live ore candidates that must be placed for pebbles to appear.
    pub acceptance_threshold: f32,
    /// Initial `1/n` odds of bending on a segment.
    pub direction_change_divisor: u32,
    /// Added to the divisor each time the vein bends.
    pub divisor_step: u32,
    /// Total rotation (radians) spread across the three axes on a bend.
    pub rotation_budget: f32,
}

impl Default for VeinTuning {
    fn default() -> Self {
        Self {
            acceptance_threshold: 1.0 / 3.0,
            direction_change_divisor: 30,
            divisor_step: 30,
            rotation_budget: FRAC_PI_2,
        }
    }
}

/// Full description of a vein type.
#[derive(Debug, Clone)]
pub struct VeinConfig {
    pub stages: Vec<Stage>,
    pub pebbles: Vec<PebbleSpec>,
    /// Length in segments, inclusive bounds.
    pub min_length: DepthFn<i32>,
    pub max_length: DepthFn<i32>,
    pub tuning: VeinTuning,
}

impl VeinConfig {
    pub fn builder() -> VeinConfigBuilder {
        VeinConfigBuilder::default()
    }

    /// `(min, max)` segment count with negative values clamped and `max >= min`.
    pub fn lengths(&self, depth: Depth) -> (u32, u32) {
        let min = self.min_length.at(depth).max(0);
        let max = self.max_length.at(depth).max(min);
        (min as u32, max as u32)
    }
}

pub struct VeinConfigBuilder {
    stages: Vec<Stage>,
    pebbles: Vec<PebbleSpec>,
    min_length: DepthFn<i32>,
    max_length: DepthFn<i32>,
    tuning: VeinTuning,
}

impl Default for VeinConfigBuilder {
    fn default() -> Self {
        Self {
            stages: Vec::new(),
            pebbles: Vec::new(),
            min_length: DepthFn::Constant(3),
            max_length: DepthFn::Constant(5),
            tuning: VeinTuning::default(),
        }
    }
}

impl VeinConfigBuilder {
    pub fn stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    pub fn pebble(mut self, state: BlockState, density: f32) -> Self {
        self.pebbles.push(PebbleSpec::new(state, density));
        self
    }

    pub fn min_length(mut self, length: impl Into<DepthFn<i32>>) -> Self {
        self.min_length = length.into();
        self
    }

    pub fn max_length(mut self, length: impl Into<DepthFn<i32>>) -> Self {
        self.max_length = length.into();
        self
    }

    /// Fix the length to exactly `length` segments.
    pub fn length(self, length: i32) -> Self {
        self.min_length(length).max_length(length)
    }

    pub fn tuning(mut self, tuning: VeinTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn build(self) -> VeinConfig {
        VeinConfig {
            stages: self.stages,
            pebbles: self.pebbles,
            min_length: self.min_length,
            max_length: self.max_length,
            tuning: self.tuning,
        }
    }
}

pub struct StageBuilder {
    replacers: Vec<Replacer>,
    min_radius: DepthFn<i32>,
    max_radius: DepthFn<i32>,
    block_density: DepthFn<f32>,
    spawn_chance: DepthFn<f32>,
}

impl Default for StageBuilder {
    fn default() -> Self {
        Self {
            replacers: Vec::new(),
            min_radius: DepthFn::Constant(0),
            max_radius: DepthFn::Constant(5),
            block_density: DepthFn::Constant(0.75),
            spawn_chance: DepthFn::Constant(1.0),
        }
    }
}

impl StageBuilder {
    /// Place `ore` over stone-class blocks and gravel.
    pub fn ore(self, ore: BlockState) -> Self {
        self.replacer(Replacer::ore(ore))
    }

    pub fn replacer(mut self, replacer: Replacer) -> Self {
        self.replacers.push(replacer);
        self
    }

    pub fn min_radius(mut self, radius: impl Into<DepthFn<i32>>) -> Self {
        self.min_radius = radius.into();
        self
    }

    pub fn max_radius(mut self, radius: impl Into<DepthFn<i32>>) -> Self {
        self.max_radius = radius.into();
        self
    }

    pub fn block_density(mut self, density: impl Into<DepthFn<f32>>) -> Self {
        self.block_density = density.into();
        self
    }

    pub fn spawn_chance(mut self, chance: impl Into<DepthFn<f32>>) -> Self {
        self.spawn_chance = chance.into();
        self
    }

    pub fn build(self) -> Stage {
        Stage {
            replacers: self.replacers.into(),
            min_radius: self.min_radius,
            max_radius: self.max_radius,
            block_density: self.block_density,
            spawn_chance: self.spawn_chance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::ids;

    #[test]
    fn linear_depth_fn_clamps_outside_anchors() {
        let curve = DepthFn::Linear {
            from_y: 0,
            from: 10,
            to_y: 64,
            to: 2,
        };
        assert_eq!(curve.at(Depth(-20)), 10);
        assert_eq!(curve.at(Depth(0)), 10);
        assert_eq!(curve.at(Depth(32)), 6);
        assert_eq!(curve.at(Depth(64)), 2);
        assert_eq!(curve.at(Depth(200)), 2);
    }

    #[test]
    fn degenerate_linear_returns_start_value() {
        let curve = DepthFn::Linear {
            from_y: 12,
            from: 0.5f32,
            to_y: 12,
            to: 0.9,
        };
        assert_eq!(curve.at(Depth(0)), 0.5);
    }

    #[test]
    fn custom_depth_fn_sees_depth() {
        let curve = DepthFn::custom(|depth: Depth| depth.y() / 2);
        assert_eq!(curve.at(Depth(40)), 20);
    }

    #[test]
    fn block_count_rounds_annulus_area() {
        let stage = Stage::builder()
            .ore(BlockState::of(ids::IRON_ORE))
            .min_radius(0)
            .max_radius(3)
            .block_density(0.75)
            .build();
        assert_eq!(stage.block_count(Depth(64)), 7);

        let ring = Stage::builder().min_radius(2).max_radius(4).block_density(0.5).build();
        assert_eq!(ring.block_count(Depth(64)), 6);
    }

    #[test]
    fn inverted_bounds_are_clamped() {
        let stage = Stage::builder().min_radius(4).max_radius(1).build();
        assert_eq!(stage.radii(Depth(0)), (4, 4));
        assert_eq!(stage.block_count(Depth(0)), 0);

        let config = VeinConfig::builder().min_length(6).max_length(-2).build();
        assert_eq!(config.lengths(Depth(0)), (6, 6));
    }

    #[test]
    fn oversized_radii_are_clamped_without_overflow() {
        let empty = Stage::builder().max_radius(50_000).block_density(0.0).build();
        assert_eq!(empty.radii(Depth(10)), (0, MAX_STAGE_RADIUS));
        assert_eq!(empty.block_count(Depth(10)), 0);

        let full = Stage::builder()
            .min_radius(i32::MAX)
            .max_radius(i32::MAX)
            .block_density(1.0)
            .build();
        assert_eq!(full.radii(Depth(10)), (MAX_STAGE_RADIUS, MAX_STAGE_RADIUS));
        assert_eq!(full.block_count(Depth(10)), 0);

        let dense = Stage::builder().max_radius(50_000).block_density(1e30).build();
        let cap = (MAX_STAGE_RADIUS * MAX_STAGE_RADIUS) as usize;
        assert_eq!(dense.block_count(Depth(10)), cap);
    }

    #[test]
    fn builder_defaults() {
        let config = VeinConfig::builder().build();
        assert_eq!(config.lengths(Depth(30)), (3, 5));
        assert_eq!(config.tuning, VeinTuning::default());

        let stage = Stage::builder().ore(BlockState::of(ids::COAL_ORE)).build();
        assert_eq!(stage.radii(Depth(30)), (0, 5));
        assert_eq!(stage.block_density.at(Depth(30)), 0.75);
        assert_eq!(stage.spawn_chance.at(Depth(30)), 1.0);
        assert_eq!(stage.replacers.len(), 1);
        assert_eq!(stage.replacers[0], Replacer::ore(BlockState::of(ids::COAL_ORE)));
    }
}
