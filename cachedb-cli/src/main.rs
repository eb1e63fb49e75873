mod repl;

use anyhow::Result;
use cachedb_core::{Dispatcher, FileSnapshotSink, Store, StoreConfig, DEFAULT_SNAPSHOT_DIR};
use std::time::Duration;
use tokio::io::BufReader;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Reads a numeric environment variable, falling back to `default` when unset or unparseable
fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout is reserved for protocol responses
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cachedb_cli=info,cachedb_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Configuration from environment variables
    let sweep_interval_ms = env_u64("CACHEDB_SWEEP_INTERVAL_MS", 1000).max(1);
    let shutdown_grace_secs = env_u64("CACHEDB_SHUTDOWN_GRACE_SECS", 5);
    let snapshot_dir = std::env::var("CACHEDB_SNAPSHOT_DIR")
        .unwrap_or_else(|_| DEFAULT_SNAPSHOT_DIR.to_string());

    let config = StoreConfig::default()
        .with_sweep_interval(Duration::from_millis(sweep_interval_ms))
        .with_shutdown_grace(Duration::from_secs(shutdown_grace_secs));
    let store = Store::with_config(config);
    let dispatcher = Dispatcher::new(store.clone(), FileSnapshotSink::new(&snapshot_dir));

    tracing::info!("cachedb ready, reading commands from stdin");
    tracing::info!("   Sweep interval: {}ms", sweep_interval_ms);
    tracing::info!("   Snapshot directory: {}", snapshot_dir);

    let result = repl::run(
        &dispatcher,
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
    )
    .await;

    store.shutdown().await;
    result
}
