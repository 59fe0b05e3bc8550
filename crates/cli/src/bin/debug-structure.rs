//! Debug Structure Tool
//!
//! Lays out a single structure and optionally paints it into a flat
//! in-memory world, printing a JSON summary.
//!
//! Usage:
//!   debug-structure generate --family stronghold --seed 12345 --chunk-x 4 --chunk-z -2
//!   debug-structure realize --family end_city --seed 7 --metrics target/structure_metrics.json
//!   debug-structure config --path generation.toml

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use structgen_core::ChunkPos;
use structgen_testkit::{
    fingerprint_grid, fingerprint_structure, ClipCheckingGrid, GenerationMetrics,
    MetricsReportBuilder, MetricsSink, RealizationMetrics, TestExecutionMetrics, TestResult,
};
use structgen_world::post_process::{chunk_box, touched_chunks};
use structgen_world::{
    generate_structure, realize_chunk, BuiltinTemplates, ChunkedGrid, FlatFill,
    GenerationConfig, StructureFamily, StructureStart, StructureStore, TemplateLibrary,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "debug-structure", about = "Inspect procedurally generated structures")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Lay out a structure and print its pieces
    Generate {
        #[command(flatten)]
        target: Target,
        /// Save the start into this structure directory
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Lay out a structure and paint every chunk it touches
    Realize {
        #[command(flatten)]
        target: Target,
        /// Top of the stone fill
        #[arg(long, default_value_t = 40)]
        stone_top: i32,
        /// Top of the water fill (defaults to sea level for monuments)
        #[arg(long)]
        water_top: Option<i32>,
        /// Write a metrics report here
        #[arg(long)]
        metrics: Option<PathBuf>,
    },
    /// Print the effective generation config as TOML
    Config {
        /// Config file to validate; defaults are printed when omitted
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Args)]
struct Target {
    /// Structure family (mineshaft, stronghold, ocean_monument, end_city, woodland_mansion)
    #[arg(long)]
    family: StructureFamily,
    /// World seed
    #[arg(long, default_value_t = 12345)]
    seed: u64,
    /// Origin chunk X
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    chunk_x: i32,
    /// Origin chunk Z
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    chunk_z: i32,
    /// Generation config (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Target {
    fn chunk(&self) -> ChunkPos {
        ChunkPos::new(self.chunk_x, self.chunk_z)
    }

    fn load_config(&self) -> Result<GenerationConfig> {
        match &self.config {
            Some(path) => read_config(path),
            None => Ok(GenerationConfig::default()),
        }
    }
}

fn read_config(path: &PathBuf) -> Result<GenerationConfig> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    GenerationConfig::from_toml_str(&contents)
        .with_context(|| format!("Invalid config {}", path.display()))
}

fn templates_for(config: &GenerationConfig) -> Arc<dyn TemplateLibrary> {
    Arc::new(BuiltinTemplates::with_mansion_cells(
        config.woodland_mansion.cell_size,
        config.woodland_mansion.floor_height,
    ))
}

fn lay_out(
    target: &Target,
    config: &GenerationConfig,
    templates: Arc<dyn TemplateLibrary>,
) -> Result<StructureStart> {
    generate_structure(target.family, config, templates, target.seed, target.chunk()).with_context(
        || format!("No {} could be placed at chunk {}", target.family, target.chunk()),
    )
}

fn summarize(start: &StructureStart) -> serde_json::Value {
    let pieces: Vec<_> = start
        .pieces()
        .iter()
        .map(|piece| {
            json!({
                "id": piece.id(),
                "box": piece.bounding_box().to_array(),
                "orientation": piece.orientation().map(|d| d.name()),
                "gen_depth": piece.gen_depth(),
            })
        })
        .collect();
    json!({
        "family": start.family().name(),
        "chunk": [start.chunk().x, start.chunk().z],
        "bounds": start.bounding_box().to_array(),
        "piece_count": pieces.len(),
        "fingerprint": fingerprint_structure(start),
        "pieces": pieces,
    })
}

fn run_generate(target: &Target, save: Option<&PathBuf>) -> Result<()> {
    let config = target.load_config()?;
    let start = lay_out(target, &config, templates_for(&config))?;
    if let Some(dir) = save {
        let store = StructureStore::new(dir)?;
        let mut starts = store.load_starts_lenient();
        starts.retain(|s| !(s.family() == start.family() && s.chunk() == start.chunk()));
        starts.push(start.clone());
        store.save_starts(&starts)?;
        info!(count = starts.len(), dir = %dir.display(), "saved structure starts");
    }
    println!("{}", serde_json::to_string_pretty(&summarize(&start))?);
    Ok(())
}

fn run_realize(
    target: &Target,
    stone_top: i32,
    water_top: Option<i32>,
    metrics_path: Option<&PathBuf>,
) -> Result<()> {
    let began = Instant::now();
    let config = target.load_config()?;
    let templates = templates_for(&config);
    let start = lay_out(target, &config, templates.clone())?;

    let water_top = water_top.unwrap_or(match target.family {
        StructureFamily::OceanMonument => config.sea_level,
        _ => stone_top,
    });
    let mut grid = ChunkedGrid::new(FlatFill {
        stone_top,
        water_top: water_top.max(stone_top),
    });

    let mut realization = RealizationMetrics::default();
    for chunk in touched_chunks(&start) {
        let mut checked = ClipCheckingGrid::new(&mut grid, chunk_box(chunk));
        let report = realize_chunk(&start, &mut checked, templates.as_ref(), target.seed, chunk);
        realization.record(&report);
        realization.clip_violations += checked.violations().len();
    }
    info!(
        chunks = realization.chunks,
        failed = realization.pieces_failed,
        "realized structure"
    );

    let summary = json!({
        "structure": summarize(&start),
        "realization": &realization,
        "grid_fingerprint": fingerprint_grid(&grid),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    if let Some(path) = metrics_path {
        let mut generation = GenerationMetrics::default();
        generation.record(Some(&start));
        let result = if realization.clip_violations == 0 {
            TestResult::Pass
        } else {
            TestResult::Fail
        };
        let report = MetricsReportBuilder::new(format!("debug-structure-{}", target.family))
            .result(result)
            .generation(generation)
            .realization(realization)
            .execution(TestExecutionMetrics {
                duration_seconds: began.elapsed().as_secs_f64(),
                assertions_checked: None,
            })
            .build();
        MetricsSink::create(path)?.write(&report)?;
        info!(path = %path.display(), "wrote metrics");
    }
    Ok(())
}

fn run_config(path: Option<&PathBuf>) -> Result<()> {
    let config = match path {
        Some(path) => read_config(path)?,
        None => GenerationConfig::default(),
    };
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match &cli.command {
        Command::Generate { target, save } => run_generate(target, save.as_ref()),
        Command::Realize {
            target,
            stone_top,
            water_top,
            metrics,
        } => run_realize(target, *stone_top, *water_top, metrics.as_ref()),
        Command::Config { path } => run_config(path.as_ref()),
    }
}
