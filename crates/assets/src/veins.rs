//! Vein pack schema, resolved against a [`BlockRegistry`] into world features.

use std::ops::RangeInclusive;

use serde::Deserialize;
use terra_core::RegistryKey;
use terra_world::{
    tags, BlockState, DepthFn, Replacer, Stage, VeinConfig, VeinFeature, VeinPlacement,
    MAX_STAGE_RADIUS,
};
use tracing::debug;

use crate::{AssetError, BlockRegistry};

/// A depth curve: either a plain value or a clamped line between two anchors.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CurveDef<T> {
    /// Same value at every depth.
    Constant(T),
    /// `from` at `from_y`, `to` at `to_y`, clamped outside.
    Linear {
        /// First anchor altitude.
        from_y: i32,
        /// Value at the first anchor.
        from: T,
        /// Second anchor altitude.
        to_y: i32,
        /// Value at the second anchor.
        to: T,
    },
}

impl<T: Copy> CurveDef<T> {
    /// Every value the curve can take at an anchor. Linear curves stay between them.
    pub fn anchor_values(&self) -> [T; 2] {
        match *self {
            Self::Constant(value) => [value, value],
            Self::Linear { from, to, .. } => [from, to],
        }
    }

    /// Convert to the runtime depth function.
    pub fn to_depth_fn(&self) -> DepthFn<T> {
        match *self {
            Self::Constant(value) => DepthFn::Constant(value),
            Self::Linear {
                from_y,
                from,
                to_y,
                to,
            } => DepthFn::Linear {
                from_y,
                from,
                to_y,
                to,
            },
        }
    }
}

/// What one replacer writes, and what it may overwrite.
///
/// With neither `replace_tag` nor `replace_block` the replacer targets
/// `terra:ore_replaceables`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplacerDef {
    /// Block written on a match.
    pub place: String,
    /// Tag the existing block must carry.
    #[serde(default)]
    pub replace_tag: Option<String>,
    /// Exact block the existing block must be.
    #[serde(default)]
    pub replace_block: Option<String>,
}

/// One stage (shell) of a vein.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StageDef {
    /// Tried in order; the first match wins.
    pub replacers: Vec<ReplacerDef>,
    /// Inner radius curve.
    #[serde(default)]
    pub min_radius: Option<CurveDef<i32>>,
    /// Outer radius curve.
    #[serde(default)]
    pub max_radius: Option<CurveDef<i32>>,
    /// Fraction of the annulus filled per segment.
    #[serde(default)]
    pub block_density: Option<CurveDef<f32>>,
    /// Chance the stage takes part in a vein.
    #[serde(default)]
    pub spawn_chance: Option<CurveDef<f32>>,
}

/// A surface marker dropped above the vein.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PebbleDef {
    /// Block placed on the surface.
    pub block: String,
    /// Per-segment chance.
    #[serde(default = "default_pebble_density")]
    pub density: f32,
}

fn default_pebble_density() -> f32 {
    0.5
}

/// A named vein with its per-chunk placement.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VeinDef {
    /// Feature name, used in logs.
    pub name: String,
    /// Per-chunk start roll.
    #[serde(default)]
    pub placement: VeinPlacement,
    /// Shortest path, in segments.
    #[serde(default)]
    pub min_length: Option<CurveDef<i32>>,
    /// Longest path, in segments.
    #[serde(default)]
    pub max_length: Option<CurveDef<i32>>,
    /// Stages, innermost first; later stages win on overlap.
    pub stages: Vec<StageDef>,
    /// Surface markers.
    #[serde(default)]
    pub pebbles: Vec<PebbleDef>,
}

/// Top-level vein pack document.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VeinPack {
    /// Veins in feature order. Order fixes each feature's RNG stream.
    pub veins: Vec<VeinDef>,
}

impl VeinPack {
    /// Resolve every vein against `registry`.
    pub fn features(&self, registry: &BlockRegistry) -> Result<Vec<VeinFeature>, AssetError> {
        let mut seen = std::collections::BTreeSet::new();
        let mut features = Vec::with_capacity(self.veins.len());
        for vein in &self.veins {
            if !seen.insert(vein.name.as_str()) {
                return Err(AssetError::Invalid(format!(
                    "duplicate vein name `{}`",
                    vein.name
                )));
            }
            features.push(vein.feature(registry)?);
        }
        debug!(veins = features.len(), "resolved vein pack");
        Ok(features)
    }
}

impl VeinDef {
    /// Resolve block names and tags into a [`VeinFeature`].
    pub fn feature(&self, registry: &BlockRegistry) -> Result<VeinFeature, AssetError> {
        if self.stages.is_empty() {
            return Err(self.invalid("has no stages"));
        }

        let mut builder = VeinConfig::builder();
        if let Some(curve) = &self.min_length {
            builder = builder.min_length(curve.to_depth_fn());
        }
        if let Some(curve) = &self.max_length {
            builder = builder.max_length(curve.to_depth_fn());
        }
        for stage in &self.stages {
            builder = builder.stage(self.stage(stage, registry)?);
        }
        for pebble in &self.pebbles {
            if !(0.0..=1.0).contains(&pebble.density) {
                return Err(self.invalid(format!("pebble density {} outside [0, 1]", pebble.density)));
            }
            builder = builder.pebble(self.block(registry, &pebble.block)?, pebble.density);
        }

        Ok(VeinFeature {
            name: self.name.clone(),
            placement: self.placement,
            config: builder.build(),
        })
    }

    fn stage(&self, def: &StageDef, registry: &BlockRegistry) -> Result<Stage, AssetError> {
        if def.replacers.is_empty() {
            return Err(self.invalid("has a stage without replacers"));
        }
        let mut builder = Stage::builder();
        for replacer in &def.replacers {
            builder = builder.replacer(self.replacer(replacer, registry)?);
        }
        let radii = 0..=MAX_STAGE_RADIUS;
        if let Some(curve) = &def.min_radius {
            self.check_curve("min_radius", curve, &radii)?;
            builder = builder.min_radius(curve.to_depth_fn());
        }
        if let Some(curve) = &def.max_radius {
            self.check_curve("max_radius", curve, &radii)?;
            builder = builder.max_radius(curve.to_depth_fn());
        }
        if let Some(curve) = &def.block_density {
            self.check_curve("block_density", curve, &(0.0..=1.0))?;
            builder = builder.block_density(curve.to_depth_fn());
        }
        if let Some(curve) = &def.spawn_chance {
            self.check_curve("spawn_chance", curve, &(0.0..=1.0))?;
            builder = builder.spawn_chance(curve.to_depth_fn());
        }
        Ok(builder.build())
    }

    fn replacer(&self, def: &ReplacerDef, registry: &BlockRegistry) -> Result<Replacer, AssetError> {
        let place = self.block(registry, &def.place)?;
        match (&def.replace_tag, &def.replace_block) {
            (Some(_), Some(_)) => Err(self.invalid(format!(
                "replacer for `{}` names both a tag and a block",
                def.place
            ))),
            (Some(tag), None) => Ok(Replacer::tag(parse_key(tag)?, place)),
            (None, Some(block)) => Ok(Replacer::state(self.block(registry, block)?, place)),
            (None, None) => Ok(Replacer::tag(parse_key(tags::ORE_REPLACEABLES)?, place)),
        }
    }

    fn block(&self, registry: &BlockRegistry, name: &str) -> Result<BlockState, AssetError> {
        registry
            .state_by_name(name)
            .ok_or_else(|| AssetError::UnknownBlock {
                vein: self.name.clone(),
                block: name.to_string(),
            })
    }

    fn check_curve<T>(
        &self,
        field: &str,
        curve: &CurveDef<T>,
        range: &RangeInclusive<T>,
    ) -> Result<(), AssetError>
    where
        T: Copy + PartialOrd + std::fmt::Debug,
    {
        match curve.anchor_values().into_iter().find(|v| !range.contains(v)) {
            Some(value) => Err(self.invalid(format!(
                "{field} {value:?} outside {:?}..={:?}",
                range.start(),
                range.end()
            ))),
            None => Ok(()),
        }
    }

    fn invalid(&self, message: impl std::fmt::Display) -> AssetError {
        AssetError::Invalid(format!("vein `{}` {message}", self.name))
    }
}

fn parse_key(key: &str) -> Result<RegistryKey, AssetError> {
    RegistryKey::parse(key).map_err(|source| AssetError::InvalidKey {
        key: key.to_string(),
        source,
    })
}
