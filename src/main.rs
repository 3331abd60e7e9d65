//! Sea-State Event Counter
//!
//! Counts gale-force wind and high-wave events per region and year from
//! hourly reanalysis grids:
//! 1. Loads the yearly grid files for the configured year range
//! 2. Assigns each grid cell to a region polygon
//! 3. Detects qualifying events for every region in parallel
//! 4. Writes one annual count report per data kind
//!
//! Usage:
//!   cargo run --release                              # seastate.toml, both kinds
//!   cargo run --release -- --config other.toml
//!   cargo run --release -- --data-type wave --output-type json
//!
//! Environment:
//!   SEASTATE_CONFIG - config file path when --config is not given
//!   RUST_LOG        - log filter (default: info)

use std::path::PathBuf;
use std::process;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use seastate_events::config::{self, OutputType};
use seastate_events::model::DataSelection;
use seastate_events::processor::Processor;

#[derive(Debug, Parser)]
#[command(
    name = "seastate_events",
    about = "Count gale and high-wave events per region and year"
)]
struct CliArgs {
    /// Configuration file (defaults to $SEASTATE_CONFIG, then seastate.toml)
    #[arg(long = "config", value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the configured data type: storm, wave or both
    #[arg(long = "data-type")]
    data_type: Option<String>,

    /// Override the configured report format: csv or json
    #[arg(long = "output-type")]
    output_type: Option<String>,

    /// Worker threads for region pipelines (defaults to CPU count)
    #[arg(long = "workers")]
    workers: Option<usize>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = CliArgs::parse();

    println!("🌊 Sea-State Event Counter");
    println!("==========================\n");

    let config_path = config::config_path(args.config);
    println!("⚙️  Loading configuration from {}...", config_path.display());
    let mut config = match config::load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("\n❌ {}\n", e);
            process::exit(1);
        }
    };

    if let Some(data_type) = args.data_type {
        match data_type.parse::<DataSelection>() {
            Ok(selection) => config.data_selection = selection,
            Err(e) => {
                eprintln!("\n❌ {}\n", e);
                process::exit(1);
            }
        }
    }
    if let Some(output_type) = args.output_type {
        config.output_type = OutputType::from_name(&output_type);
    }

    println!("✓ Configuration loaded:");
    println!("  - Years: {}-{}", config.start_year, config.end_year);
    println!("  - Regions: {:?}", config.regions);
    println!("  - Data: {:?}", config.data_selection.kinds());
    println!("  - Output: {}\n", config.output_dir.display());

    let processor = match args.workers {
        Some(workers) => Processor::with_workers(config, workers),
        None => Processor::new(config),
    };

    let summaries = match processor.run() {
        Ok(summaries) => summaries,
        Err(e) => {
            eprintln!("\n❌ Processing failed: {}\n", e);
            process::exit(1);
        }
    };

    let mut failed_regions = 0;
    for summary in &summaries {
        println!("📈 {} ({} hours of data)", summary.kind, summary.hours);
        for (region, result) in &summary.results {
            match result {
                Ok(events) => println!("   ✓ region {} - {} events", region, events.counts.total()),
                Err(e) => {
                    eprintln!("   ✗ region {} - {}", region, e);
                    failed_regions += 1;
                }
            }
        }
        println!("   💾 {}\n", summary.report_path.display());
    }

    if failed_regions > 0 {
        eprintln!("❌ {} region pipeline(s) failed", failed_regions);
        process::exit(1);
    }
}
