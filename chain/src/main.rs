//! Segment chain smoke test binary.
//!
//! Spawns a number of concurrent writers that each append a single space
//! many times to a fresh stream, then reports elapsed time and the chain's
//! aggregate size and append count.

use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::task::JoinSet;
use tracing_subscriber::EnvFilter;

use chain::{Config, SegmentChain, load_config};

/// CLI arguments for the smoke test.
#[derive(Parser, Debug)]
#[command(name = "chain")]
#[command(about = "Concurrent append smoke test for segment chains")]
struct CliArgs {
    /// Path to a YAML chain configuration file
    #[arg(short, long, env = "CHAIN_CONFIG_FILE")]
    config: Option<String>,

    /// Number of concurrent writers
    #[arg(short, long, default_value = "30")]
    writers: usize,

    /// Appends issued by each writer
    #[arg(short, long, default_value = "10000")]
    appends: usize,

    /// Container to write into (overrides the config file)
    #[arg(long)]
    container: Option<String>,

    /// Stream name (overrides the config file; random when neither is given)
    #[arg(long)]
    stream: Option<String>,
}

impl CliArgs {
    fn to_chain_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let config = load_config(path)?;
                tracing::info!("Loaded configuration from {}", path);
                config
            }
            None => {
                tracing::info!("No configuration file provided, using defaults");
                Config {
                    stream: uuid::Uuid::new_v4().to_string(),
                    ..Default::default()
                }
            }
        };
        if let Some(container) = &self.container {
            config.container = container.clone();
        }
        if let Some(stream) = &self.stream {
            config.stream = stream.clone();
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = CliArgs::parse();
    let config = args.to_chain_config()?;
    tracing::info!("Opening chain with config: {:?}", config);

    let stream = Arc::new(SegmentChain::open(config).await?);

    let started = Instant::now();
    let mut writers = JoinSet::new();
    for _ in 0..args.writers {
        let stream = Arc::clone(&stream);
        let appends = args.appends;
        writers.spawn(async move {
            for _ in 0..appends {
                stream.append_str(" ").await?;
            }
            Ok::<_, chain::Error>(())
        });
    }
    while let Some(joined) = writers.join_next().await {
        joined??;
    }
    tracing::info!(
        writers = args.writers,
        appends = args.appends,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "appends complete"
    );

    let started = Instant::now();
    let size = stream.total_size().await?;
    tracing::info!(
        size,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "total size"
    );

    let started = Instant::now();
    let committed = stream.total_committed_count().await?;
    tracing::info!(
        committed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "total committed count"
    );

    Ok(())
}
