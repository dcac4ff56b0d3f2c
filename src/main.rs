use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tweets_etl::config::Config;
use tweets_etl::credentials::EnvCredentialSource;
use tweets_etl::error::EtlError;
use tweets_etl::job::{EtlJob, TwitterConnector};
use tweets_etl::s3::S3Store;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = run().await {
        // Job failures are already logged with their kind by the job itself.
        if e.downcast_ref::<EtlError>().is_none() {
            error!("Fatal error: {e:#}");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    init_tracing()?;

    info!("Starting tweets-etl");

    let config = Config::from_env().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let store = S3Store::new(&config).await;
    let connector = TwitterConnector::new(&config);
    let job = EtlJob::new(
        config,
        Arc::new(EnvCredentialSource),
        Arc::new(connector),
        Arc::new(store),
    );

    let rows = job.run().await?;
    info!(rows, "Job complete");
    Ok(())
}

fn init_tracing() -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tweets_etl=debug"));

    // Check if JSON logging is requested
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| matches!(v.to_lowercase().as_str(), "json" | "structured"))
        .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
            .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;
    }

    Ok(())
}
