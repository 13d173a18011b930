//! Rollup ledger binary

use rollup_ledger::{config::LogConfig, Config, HttpRollupHost, Metrics, RequestLoop};
use tracing_subscriber::EnvFilter;

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));

    if log.json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::load()?;
    config.validate()?;

    init_tracing(&config.log);

    tracing::info!(
        service = %config.service_name,
        version = %config.service_version,
        host = %config.host.url,
        "Starting rollup ledger"
    );

    let host = HttpRollupHost::new(&config.host)?;
    let metrics = Metrics::new()?;
    let mut rollup = RequestLoop::new(host, &config, metrics.clone());

    let shutdown = rollup.shutdown_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown requested");
            shutdown.cancel();
        }
    });

    rollup.run().await?;

    tracing::info!(metrics = %metrics.encode()?, "Shutting down rollup ledger");
    Ok(())
}
