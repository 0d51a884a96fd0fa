use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use terra_assets::{registry_from_file, vein_pack_from_file, BlockRegistry};
use terra_world::{
    ids, BlockState, ChunkPos, Replacer, Stage, VeinConfig, VeinFeature, VeinPlacement,
};
use tracing::warn;

pub const DEFAULT_CONFIG_PATH: &str = "config/terra.toml";

/// Order in which `generate` visits the chunks of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum VisitOrder {
    /// Rows of increasing z, each row by increasing x.
    RowMajor,
    /// Rows alternating direction.
    #[default]
    Serpentine,
    /// Outward from the region centre, ring by ring.
    Spiral,
    /// Fisher-Yates shuffle seeded by the world seed.
    Shuffled,
}

/// Inclusive rectangle of chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RegionConfig {
    pub min_x: i32,
    pub min_z: i32,
    pub max_x: i32,
    pub max_z: i32,
}

impl Default for RegionConfig {
    fn default() -> Self {
        Self::square(4)
    }
}

impl RegionConfig {
    /// `(2r+1)²` chunks centred on the origin.
    pub fn square(radius: i32) -> Self {
        let radius = radius.max(0);
        Self {
            min_x: -radius,
            min_z: -radius,
            max_x: radius,
            max_z: radius,
        }
    }

    pub fn len(&self) -> usize {
        let width = (self.max_x - self.min_x + 1).max(0) as usize;
        let depth = (self.max_z - self.min_z + 1).max(0) as usize;
        width * depth
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[cfg(test)]
    pub fn contains(&self, pos: ChunkPos) -> bool {
        (self.min_x..=self.max_x).contains(&pos.x) && (self.min_z..=self.max_z).contains(&pos.z)
    }

    /// Every chunk of the region exactly once, in `order`.
    pub fn chunks(&self, order: VisitOrder, seed: u64) -> Vec<ChunkPos> {
        let row_major = || {
            (self.min_z..=self.max_z)
                .flat_map(move |z| (self.min_x..=self.max_x).map(move |x| ChunkPos::new(x, z)))
        };
        match order {
            VisitOrder::RowMajor => row_major().collect(),
            VisitOrder::Serpentine => (self.min_z..=self.max_z)
                .enumerate()
                .flat_map(|(row, z)| {
                    let mut xs: Vec<i32> = (self.min_x..=self.max_x).collect();
                    if row % 2 == 1 {
                        xs.reverse();
                    }
                    xs.into_iter().map(move |x| ChunkPos::new(x, z))
                })
                .collect(),
            VisitOrder::Spiral => {
                let cx = self.min_x + (self.max_x - self.min_x) / 2;
                let cz = self.min_z + (self.max_z - self.min_z) / 2;
                let mut chunks: Vec<ChunkPos> = row_major().collect();
                // Stable sort keeps row-major order within a ring.
                chunks.sort_by_key(|pos| (pos.x - cx).abs().max((pos.z - cz).abs()));
                chunks
            }
            VisitOrder::Shuffled => {
                let mut chunks: Vec<ChunkPos> = row_major().collect();
                chunks.shuffle(&mut StdRng::seed_from_u64(seed));
                chunks
            }
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TerraConfig {
    /// Directory holding the deferred store file.
    pub world_dir: PathBuf,
    pub seed: u64,
    /// Block pack (JSON). Index in the pack is the block id.
    pub blocks: PathBuf,
    /// Vein pack (JSON).
    pub veins: PathBuf,
    pub region: RegionConfig,
    pub order: VisitOrder,
    /// Chunks generated between store saves; 0 saves only at the end.
    pub save_interval: u32,
}

impl Default for TerraConfig {
    fn default() -> Self {
        Self {
            world_dir: PathBuf::from("worlds/default"),
            seed: 12345,
            blocks: PathBuf::from("config/blocks.json"),
            veins: PathBuf::from("config/veins.json"),
            region: RegionConfig::default(),
            order: VisitOrder::default(),
            save_interval: 64,
        }
    }
}

impl TerraConfig {
    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<TerraConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    TerraConfig::default()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                warn!("Config not found at {}. Using defaults", path.display());
                TerraConfig::default()
            }
            Err(err) => {
                warn!("Failed to read {}: {err}. Using defaults", path.display());
                TerraConfig::default()
            }
        }
    }

    /// Load configuration, returning errors to the caller.
    #[cfg(test)]
    pub fn load_strict(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, toml).with_context(|| format!("Failed to write {}", path.display()))?;
        Ok(())
    }
}

/// Block palette and vein features a run generates with.
pub enum Palette {
    /// Loaded from the configured packs.
    Packs {
        registry: BlockRegistry,
        features: Vec<VeinFeature>,
    },
    /// Built-in blocks and veins.
    Builtin { features: Vec<VeinFeature> },
}

impl Palette {
    pub fn features(&self) -> &[VeinFeature] {
        match self {
            Palette::Packs { features, .. } | Palette::Builtin { features } => features,
        }
    }
}

/// Load the block and vein packs, falling back to the built-in palette on errors.
pub fn load_palette(config: &TerraConfig) -> Palette {
    match load_palette_strict(config) {
        Ok(palette) => palette,
        Err(err) => {
            warn!("Failed to load packs: {err:#}. Using built-in blocks and veins");
            Palette::Builtin {
                features: builtin_features(),
            }
        }
    }
}

/// Load the block and vein packs, returning errors to the caller.
pub fn load_palette_strict(config: &TerraConfig) -> Result<Palette> {
    let registry = registry_from_file(&config.blocks)
        .with_context(|| format!("Failed to load block pack {}", config.blocks.display()))?;
    let features = vein_pack_from_file(&config.veins)
        .and_then(|pack| pack.features(&registry))
        .with_context(|| format!("Failed to load vein pack {}", config.veins.display()))?;
    Ok(Palette::Packs { registry, features })
}

/// Coal near the surface, iron mid-depth with a gold core in gravel, deep diamond.
pub fn builtin_features() -> Vec<VeinFeature> {
    let ore = |id| Replacer::ore(BlockState::of(id));
    vec![
        VeinFeature {
            name: "coal".into(),
            placement: VeinPlacement {
                chance: 1,
                min_y: 24,
                height: 40,
            },
            config: VeinConfig::builder()
                .min_length(4)
                .max_length(8)
                .stage(Stage::builder().replacer(ore(ids::COAL_ORE)).max_radius(4).build())
                .pebble(BlockState::of(ids::COAL_PEBBLE), 0.3)
                .build(),
        },
        VeinFeature {
            name: "iron".into(),
            placement: VeinPlacement {
                chance: 2,
                min_y: 8,
                height: 48,
            },
            config: VeinConfig::builder()
                .stage(Stage::builder().replacer(ore(ids::IRON_ORE)).max_radius(3).build())
                .stage(
                    Stage::builder()
                        .replacer(Replacer::state(
                            BlockState::of(ids::GRAVEL),
                            BlockState::of(ids::GOLD_ORE),
                        ))
                        .max_radius(2)
                        .spawn_chance(0.5)
                        .build(),
                )
                .pebble(BlockState::of(ids::IRON_PEBBLE), 0.2)
                .build(),
        },
        VeinFeature {
            name: "diamond".into(),
            placement: VeinPlacement {
                chance: 8,
                min_y: 4,
                height: 12,
            },
            config: VeinConfig::builder()
                .length(3)
                .stage(Stage::builder().replacer(ore(ids::DIAMOND_ORE)).max_radius(2).build())
                .build(),
        },
    ]
}
