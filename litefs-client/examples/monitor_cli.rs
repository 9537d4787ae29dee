//! Standalone LiteFS primary monitor (example)
//!
//! Follows a node's event stream and logs every leadership change until
//! interrupted with Ctrl-C.
//!
//! Run with: `cargo run -p litefs-client --example monitor_cli -- --help`

use std::future::Future;
use std::time::Duration;

use clap::Parser;
use litefs_client::{Client, ClientConfig, PrimaryMonitor, PrimaryStatus};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = ClientConfig::parse();

    tracing::info!(
        url = %config.url,
        retry_min_ms = config.retry_min_ms,
        retry_max_ms = config.retry_max_ms,
        "Starting LiteFS primary monitor"
    );

    let client = Client::new(config)?;
    let monitor = client.monitor_primary();

    if let Err(e) = monitor.wait_ready(Duration::from_secs(10)).await {
        tracing::warn!(error = %e, "No healthy event received yet");
    }

    watch(&monitor, Duration::from_millis(500), tokio::signal::ctrl_c()).await;

    monitor.close();
    Ok(())
}

/// Print leadership changes every `period` until `shutdown` resolves
async fn watch<F: Future>(monitor: &PrimaryMonitor, period: Duration, shutdown: F) -> usize {
    let mut last: Option<PrimaryStatus> = None;
    let mut ticks = 0;
    let mut ticker = tokio::time::interval(period);
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => ticks += 1,
        }

        let observed = match monitor.status() {
            Ok(observed) => observed,
            Err(e) => {
                tracing::debug!(error = %e, "Monitor not ready");
                continue;
            }
        };

        if last.as_ref() != Some(&observed.value) {
            println!(
                "primary={} hostname={} stale={}",
                observed.value.is_primary,
                observed.value.hostname,
                observed.is_stale()
            );
            last = Some(observed.value);
        }
    }

    ticks
}
