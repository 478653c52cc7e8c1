#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the GeoMetrics layer fetcher.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, Subcommand};
use geometrics_database::load::LoadOutcome;
use geometrics_database::{db, run_migrations};
use geometrics_fetch::config::FetchConfig;
use geometrics_fetch::{fetch_layers, load_layers};

#[derive(Parser)]
#[command(name = "geometrics_fetch", about = "GeoMetrics reference layer fetcher")]
struct Cli {
    /// Layer configuration file (defaults to the embedded `layers.toml`)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download layers from the ArcGIS service into GeoJSON files
    Fetch {
        /// Comma-separated list of layers (e.g. "`land_lots,floods`")
        #[arg(long)]
        layers: Option<String>,
        /// Maximum number of features per layer (for testing)
        #[arg(long)]
        limit: Option<u64>,
    },
    /// Load downloaded GeoJSON files into PostGIS
    Load {
        /// Comma-separated list of layers
        #[arg(long)]
        layers: Option<String>,
        /// Truncate and reload layers that already have rows
        #[arg(long)]
        force: bool,
    },
    /// Run database migrations
    Migrate,
    /// List configured layers
    Layers,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let config = FetchConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Fetch { layers, limit } => {
            let kinds = config.select(layers.as_deref())?;
            let start = Instant::now();
            let succeeded = fetch_layers(&config, &kinds, limit).await?;
            log::info!(
                "Fetched {succeeded}/{} layers in {:.1}s",
                kinds.len(),
                start.elapsed().as_secs_f64()
            );
            if succeeded < kinds.len() {
                return Err(format!("{} layer(s) failed", kinds.len() - succeeded).into());
            }
        }
        Commands::Load { layers, force } => {
            let kinds = config.select(layers.as_deref())?;
            let db = db::connect_from_env().await?;
            run_migrations(db.as_ref()).await?;

            let start = Instant::now();
            let outcomes =
                load_layers(db.as_ref(), &config.out_dir, &kinds, &config.fields, force).await?;
            for (kind, outcome) in outcomes {
                match outcome {
                    LoadOutcome::Loaded(n) => log::info!("{kind}: loaded {n} rows"),
                    LoadOutcome::Skipped(n) => log::info!("{kind}: kept {n} existing rows"),
                }
            }
            log::info!("Load complete in {:.1}s", start.elapsed().as_secs_f64());
        }
        Commands::Migrate => {
            log::info!("Running database migrations...");
            let db = db::connect_from_env().await?;
            run_migrations(db.as_ref()).await?;
            log::info!("Migrations complete.");
        }
        Commands::Layers => {
            println!("{:<26} {:>9}  URL", "LAYER", "PAGE SIZE");
            println!("{}", "-".repeat(80));
            for (kind, source) in &config.layers {
                println!(
                    "{:<26} {:>9}  {}",
                    kind.as_ref(),
                    source.page_size,
                    source.query_url(&config.base_url)
                );
            }
        }
    }

    Ok(())
}
