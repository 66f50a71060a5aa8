//! `run` and `once`: wire the MEXC source, sinks and notifier into a
//! [`FetchScheduler`].

use super::args::MonitorArgs;
use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use surge_watch_core::{MonitorConfig, SnapshotSink};
use surge_watch_data::{CsvAlertLog, FanoutSink, JsonlSink, LogNotifier};
use surge_watch_mexc::{MexcClient, MexcClientConfig};
use surge_watch_monitor::FetchScheduler;
use tracing::info;

const CSV_FILE: &str = "alerts.csv";

/// Runs until Ctrl+C.
pub async fn run(args: MonitorArgs) -> Result<()> {
    let mut scheduler = build(&args).await?;

    let stop = scheduler.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, stopping...");
            stop.stop();
        }
    });

    info!("Press Ctrl+C to stop");
    scheduler.run().await?;

    let stats = scheduler.stats();
    let stats = stats.read().await;
    info!(
        ticks = stats.ticks,
        symbols_processed = stats.symbols_processed,
        fetch_failures = stats.fetch_failures,
        alerts_emitted = stats.alerts_emitted,
        "Session totals"
    );
    Ok(())
}

/// Runs a single tick and prints its report as JSON on stdout.
pub async fn once(args: MonitorArgs) -> Result<()> {
    let mut scheduler = build(&args).await?;
    let report = scheduler.run_once().await;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn build(args: &MonitorArgs) -> Result<FetchScheduler> {
    let config = args.config.load()?;
    let source = source(&config, &args.base_url)?;
    let sink = sink(args.data_dir.as_deref()).await?;

    info!(
        mode = %config.mode,
        symbols = ?config.symbols,
        base_url = %args.base_url,
        data_dir = ?args.data_dir,
        "Configured monitor"
    );

    let scheduler = FetchScheduler::new(config, source, sink, Arc::new(LogNotifier))?;
    Ok(scheduler)
}

/// The scheduler paces every request, so the client gets no limiter of its own.
fn source(config: &MonitorConfig, base_url: &str) -> Result<Arc<MexcClient>> {
    let client = MexcClient::new(
        MexcClientConfig::default()
            .with_base_url(base_url)
            .with_timeout_ms(config.request_timeout_ms),
    )?;
    Ok(Arc::new(client))
}

/// JSON lines plus a CSV alert log under `data_dir`, or nothing at all.
async fn sink(data_dir: Option<&Path>) -> Result<Arc<dyn SnapshotSink>> {
    let mut fanout = FanoutSink::new();
    if let Some(dir) = data_dir {
        let jsonl = JsonlSink::create(dir).await?;
        fanout = fanout
            .with(Arc::new(jsonl))
            .with(Arc::new(CsvAlertLog::new(dir.join(CSV_FILE))));
    }
    Ok(Arc::new(fanout))
}
