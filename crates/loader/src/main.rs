//! Ludobot batch loader
//!
//! Populates both stores from the catalog CSV:
//! 1. Clears the document and graph stores
//! 2. Inserts the catalog and reloads it with assigned ids
//! 3. Deduplicates categorical fields and links the graph
//! 4. Seeds randomized demo interactions

mod categories;
mod demo;
mod errors;
mod pipeline;
mod populate;
mod source;
mod synthetic;

use anyhow::Context;
use ludobot_common::AppConfig;
use pipeline::Pipeline;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Load configuration
    let config = AppConfig::load().context("failed to load configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.observability.log_level.clone()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    info!("Starting ludobot loader v{}", ludobot_common::VERSION);

    let pipeline = Pipeline::new(config);
    match pipeline.run().await {
        Ok(report) => {
            info!(
                games = report.games,
                genres = report.genres,
                platforms = report.platforms,
                interactions = report.interactions_written,
                "Pipeline run complete"
            );
            if !report.is_clean() {
                warn!(
                    population_failures = report.population_failures,
                    streamer_misses = report.streamer_misses,
                    interactions_failed = report.interactions_failed,
                    "Run finished with partial write failures"
                );
            }
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Pipeline run failed");
            std::process::exit(1);
        }
    }
}
