//! terra - deterministic ore vein generation
//!
//! Command-line driver: generates a region chunk by chunk, growing ore veins
//! and draining deferred cross-chunk placements, and inspects the persisted
//! deferred store.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{load_palette, Palette, TerraConfig, VisitOrder, DEFAULT_CONFIG_PATH};
use std::path::PathBuf;
use std::time::Instant;
use terra_world::{
    to_record, BlockCatalog, ChunkWorld, DecorationStats, DeferredStoreFile, SharedDeferredStore,
    VeinFeature, WorldGenerator,
};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about = "Deterministic ore vein generation", long_about = None)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a region and persist pending cross-chunk placements
    Generate {
        /// World seed
        #[arg(long)]
        seed: Option<u64>,

        /// Directory holding the deferred store
        #[arg(long)]
        world_dir: Option<PathBuf>,

        /// Square region radius in chunks around the origin
        #[arg(long)]
        radius: Option<i32>,

        /// Chunk visitation order
        #[arg(long, value_enum)]
        order: Option<VisitOrder>,

        /// Block pack (JSON)
        #[arg(long)]
        blocks: Option<PathBuf>,

        /// Vein pack (JSON)
        #[arg(long)]
        veins: Option<PathBuf>,
    },
    /// Print the pending entries of a persisted deferred store
    Inspect {
        /// Directory holding the deferred store
        #[arg(long)]
        world_dir: Option<PathBuf>,

        /// Dump the full record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Write the effective configuration to a file
    InitConfig {
        /// Destination (defaults to --config)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    // Initialize tracing with INFO level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let mut config = TerraConfig::load_from_path(&cli.config);

    match cli.command {
        Command::Generate {
            seed,
            world_dir,
            radius,
            order,
            blocks,
            veins,
        } => {
            if let Some(seed) = seed {
                config.seed = seed;
            }
            if let Some(dir) = world_dir {
                config.world_dir = dir;
            }
            if let Some(radius) = radius {
                config.region = config::RegionConfig::square(radius);
            }
            if let Some(order) = order {
                config.order = order;
            }
            if let Some(path) = blocks {
                config.blocks = path;
            }
            if let Some(path) = veins {
                config.veins = path;
            }
            generate(&config)
        }
        Command::Inspect { world_dir, json } => {
            if let Some(dir) = world_dir {
                config.world_dir = dir;
            }
            inspect(&config, json)
        }
        Command::InitConfig { output } => {
            let path = output.unwrap_or(cli.config);
            config.save_to_path(&path)?;
            info!("Wrote configuration to {}", path.display());
            Ok(())
        }
    }
}

fn generate(config: &TerraConfig) -> Result<()> {
    info!(
        "Starting terra v{} (seed {}, {} chunks, {:?})",
        env!("CARGO_PKG_VERSION"),
        config.seed,
        config.region.len(),
        config.order
    );

    let file = DeferredStoreFile::in_world(&config.world_dir);
    let store = file
        .load()
        .with_context(|| format!("Failed to load {}", file.path().display()))?;
    if !store.is_empty() {
        warn!(
            chunks = store.len(),
            "Continuing with pending placements from a previous run; chunks generated then are not regenerated here"
        );
    }
    let store = SharedDeferredStore::new(store);

    let palette = load_palette(config);
    info!(veins = palette.features().len(), "Loaded vein features");
    match palette {
        Palette::Packs { registry, features } => {
            run_region(config, ChunkWorld::new(registry), features, &store, &file)
        }
        Palette::Builtin { features } => run_region(
            config,
            ChunkWorld::with_default_blocks(),
            features,
            &store,
            &file,
        ),
    }
}

fn run_region<C: BlockCatalog>(
    config: &TerraConfig,
    mut world: ChunkWorld<C>,
    features: Vec<VeinFeature>,
    store: &SharedDeferredStore,
    file: &DeferredStoreFile,
) -> Result<()> {
    let generator = WorldGenerator::new(config.seed, features, store.clone());
    let chunks = config.region.chunks(config.order, config.seed);
    let start = Instant::now();
    let mut totals = DecorationStats::default();

    for (index, pos) in chunks.iter().enumerate() {
        let Some(stats) = generator.generate_chunk(&mut world, *pos) else {
            continue;
        };
        accumulate(&mut totals, &stats);

        let interval = config.save_interval as usize;
        if interval > 0 && (index + 1) % interval == 0 {
            file.save_if_dirty(store)?;
        }
    }
    file.save_if_dirty(store)?;

    let pending = store.snapshot();
    let (pending_ores, pending_pebbles) = pending.pending_counts();
    info!(
        chunks = chunks.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Generation finished"
    );
    println!("chunks generated:   {}", chunks.len());
    println!(
        "veins:              {} started, {} accepted",
        totals.veins_started, totals.veins_accepted
    );
    println!(
        "ores:               {} placed, {} deferred, {} dropped, {} applied from deferred",
        totals.ores_placed, totals.ores_deferred, totals.ores_dropped, totals.drain.ores_placed
    );
    println!(
        "pebbles:            {} placed, {} deferred, {} applied from deferred",
        totals.pebbles_placed, totals.pebbles_deferred, totals.drain.pebbles_placed
    );
    println!(
        "pending:            {} chunks ({} ores, {} pebbles) in {}",
        pending.len(),
        pending_ores,
        pending_pebbles,
        file.path().display()
    );
    Ok(())
}

fn accumulate(totals: &mut DecorationStats, stats: &DecorationStats) {
    totals.veins_started += stats.veins_started;
    totals.veins_accepted += stats.veins_accepted;
    totals.ores_placed += stats.ores_placed;
    totals.ores_deferred += stats.ores_deferred;
    totals.ores_dropped += stats.ores_dropped;
    totals.pebbles_placed += stats.pebbles_placed;
    totals.pebbles_deferred += stats.pebbles_deferred;
    totals.drain.ores_pending += stats.drain.ores_pending;
    totals.drain.ores_placed += stats.drain.ores_placed;
    totals.drain.pebbles_pending += stats.drain.pebbles_pending;
    totals.drain.pebbles_placed += stats.drain.pebbles_placed;
}

fn inspect(config: &TerraConfig, json: bool) -> Result<()> {
    let file = DeferredStoreFile::in_world(&config.world_dir);
    let store = file
        .load()
        .with_context(|| format!("Failed to load {}", file.path().display()))?;

    if json {
        let record = to_record(&store);
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    println!("{}", file.path().display());
    for (chunk, entry) in store.iter() {
        println!(
            "  chunk {chunk}: {} ores, {} pebbles",
            entry.ores.len(),
            entry.pebbles.len()
        );
    }
    let (ores, pebbles) = store.pending_counts();
    println!(
        "{} chunks pending ({ores} ores, {pebbles} pebbles)",
        store.len()
    );
    Ok(())
}
