//! Waterdriver CLI - water-proximity human-influence driver

mod inputs;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use waterdriver_core::io::{read_geotiff, write_geotiff, GeoTiffOptions};
use waterdriver_core::Raster;
use waterdriver_pipeline::catalog::POPULATION_DENSITY;
use waterdriver_pipeline::{
    DriverConfig, DriverInputs, DriverLayers, EdgePolicy, GeoTiffSink, InputCatalog,
    TemporalSeries, WaterDriver, WATER_DRIVER_BAND, WATER_DRIVER_PRODUCT,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "waterdriver")]
#[command(author, version, about = "Water-proximity human-influence driver", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute the water driver for one task date
    Run {
        /// Population density snapshot as DATE=PATH (repeatable)
        #[arg(short, long = "population", required = true)]
        population: Vec<String>,
        /// Surface-water occurrence raster (percent)
        #[arg(long)]
        surface_water: PathBuf,
        /// Land/ocean raster (ocean 0, land 1)
        #[arg(long)]
        ocean: PathBuf,
        /// Inland-sea polygons (GeoJSON)
        #[arg(long)]
        inland_sea: PathBuf,
        /// Optional output domain raster
        #[arg(long)]
        watermask: Option<PathBuf>,
        /// Task date (YYYY-MM-DD)
        #[arg(short, long)]
        date: String,
        /// Driver configuration (JSON); omitted fields keep their defaults
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// Also write intermediate layers under <output>/layers
        #[arg(long)]
        layers: bool,
        /// Number of worker threads
        #[arg(short, long)]
        threads: Option<usize>,
        /// Fail for dates outside the population snapshot range
        #[arg(long)]
        strict_dates: bool,
    },
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Print the effective configuration as JSON
    Config {
        /// Configuration file to merge over the defaults
        input: Option<PathBuf>,
    },
    /// List the inputs a run consumes
    Catalog,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set default subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_raster(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner(&format!("Reading {}...", path.display()));
    let raster: Raster<f64> = read_geotiff(path)
        .with_context(|| format!("Failed to read raster {}", path.display()))?;
    pb.finish_and_clear();
    info!("Input {}: {} x {}", path.display(), raster.cols(), raster.rows());
    Ok(raster)
}

fn load_config(path: Option<&Path>) -> Result<DriverConfig> {
    let config = match path {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => DriverConfig::default(),
    };
    Ok(config)
}

fn load_population(args: &[String], strict: bool) -> Result<TemporalSeries> {
    let mut snapshots = Vec::with_capacity(args.len());
    for arg in args {
        let (date, path) = inputs::parse_snapshot(arg)?;
        snapshots.push((date, read_raster(&path)?));
    }
    let policy = if strict { EdgePolicy::Strict } else { EdgePolicy::Clamp };
    Ok(TemporalSeries::new(POPULATION_DENSITY, snapshots)?.with_policy(policy))
}

fn write_layers(layers: &DriverLayers, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let named = [
        ("ocean_mask", &layers.ocean_mask),
        ("population", &layers.population),
        ("distance_to_ocean", &layers.coastal.distance_to_ocean),
        ("coastal_settlements", &layers.coastal.settlements),
        ("navigable_coast", &layers.coastal.navigable_coast),
        ("coastal_influence", &layers.coastal.influence),
        ("waterways", &layers.inland.waterways),
        ("inland_influence", &layers.inland_influence),
        ("water_presence", &layers.water_presence),
    ];
    let pb = spinner("Writing layers...");
    for (name, raster) in named {
        let path = dir.join(format!("{}.tif", name));
        write_geotiff(raster, &path, Some(GeoTiffOptions::default()))
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            population,
            surface_water,
            ocean,
            inland_sea,
            watermask,
            date,
            config,
            output,
            layers,
            threads,
            strict_dates,
        } => {
            let date: NaiveDate = inputs::parse_date(&date)?;
            let mut config = load_config(config.as_deref())?;
            if threads.is_some() {
                config.processing.threads = threads;
            }

            let driver_inputs = DriverInputs {
                population_density: Some(load_population(&population, strict_dates)?),
                surface_water: Some(read_raster(&surface_water)?),
                ocean: Some(read_raster(&ocean)?),
                inland_sea: Some(inputs::read_geojson(&inland_sea)?),
                watermask: watermask.as_deref().map(read_raster).transpose()?,
            };

            let driver = WaterDriver::local(config).context("Invalid driver configuration")?;
            let mut sink = GeoTiffSink::new(&output);

            let pb = spinner(&format!("Computing water driver for {}...", date));
            let start = Instant::now();
            let result = driver
                .run(&driver_inputs, date, &mut sink)
                .context("Water driver run failed")?;
            let elapsed = start.elapsed();
            pb.finish_and_clear();

            if layers {
                write_layers(&result, &output.join("layers"))?;
            }
            done(WATER_DRIVER_BAND, &sink.path_for(WATER_DRIVER_PRODUCT), elapsed);
        }

        Commands::Info { input } => {
            let raster = read_raster(&input)?;
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = raster.crs() {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!("  Valid cells: {}", stats.valid_count);
            println!("  Masked cells: {}", stats.nodata_count);
        }

        Commands::Config { input } => {
            let config = load_config(input.as_deref())?;
            config.validate().context("Invalid driver configuration")?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }

        Commands::Catalog => {
            let catalog = InputCatalog::water_driver();
            println!("{:<20} {:<10} {:<10} {:<9} PATH", "NAME", "KIND", "FRESHNESS", "REQUIRED");
            for spec in catalog.iter() {
                println!(
                    "{:<20} {:<10} {:<10} {:<9} {}",
                    spec.name,
                    format!("{:?}", spec.kind),
                    spec.freshness.to_string(),
                    if spec.required { "yes" } else { "no" },
                    spec.path
                );
            }
        }
    }

    Ok(())
}
