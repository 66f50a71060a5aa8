//! Running counters and per-tick reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use surge_watch_core::{AlertRecord, FeatureSnapshot};

/// Number of symbols listed in the per-tick volume summary.
pub const SUMMARY_TOP_N: usize = 5;

/// Cumulative scheduler statistics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorStats {
    pub ticks: u64,
    /// Symbols that produced a snapshot
    pub symbols_processed: u64,
    /// Symbols whose candle fetch failed after all retries
    pub fetch_failures: u64,
    pub retries: u64,
    pub stale_snapshots: u64,
    /// Symbols still running at the tick deadline
    pub skipped_at_deadline: u64,
    /// Candle windows rejected at ingestion
    pub data_quality_rejections: u64,
    pub alerts_emitted: u64,
    pub alerts_suppressed: u64,
    pub started_at: Option<DateTime<Utc>>,
    pub last_tick_at: Option<DateTime<Utc>>,
}

impl MonitorStats {
    /// Folds one tick into the running totals.
    pub fn record_tick(&mut self, report: &TickReport) {
        self.ticks += 1;
        self.symbols_processed += report.processed as u64;
        self.fetch_failures += report.fetch_failures as u64;
        self.retries += u64::from(report.retries);
        self.stale_snapshots += report.stale.len() as u64;
        self.skipped_at_deadline += report.skipped.len() as u64;
        self.data_quality_rejections += report.rejected as u64;
        self.alerts_emitted += report.alerts.len() as u64;
        self.alerts_suppressed += report.suppressed as u64;
        self.last_tick_at = Some(report.started_at);
    }
}

/// A symbol ranked by its 5m volume ratio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeLeader {
    pub symbol: String,
    pub ratio_5m: f64,
    pub change_5m: Option<f64>,
    pub stale: bool,
}

/// What one tick did.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TickReport {
    pub tick: u64,
    pub started_at: DateTime<Utc>,
    pub elapsed_ms: u64,
    /// Symbols that produced a snapshot (fresh or stale)
    pub processed: usize,
    /// Symbols evaluated from stale history
    pub stale: Vec<String>,
    /// Symbols aborted at the tick deadline
    pub skipped: Vec<String>,
    /// Symbols with no history to evaluate
    pub no_data: Vec<String>,
    pub fetch_failures: usize,
    pub rejected: usize,
    pub retries: u32,
    /// Emitted alerts in dispatch order
    pub alerts: Vec<AlertRecord>,
    pub suppressed: usize,
    pub volume_leaders: Vec<VolumeLeader>,
}

/// Top `n` snapshots by 5m volume ratio, highest first.
#[must_use]
pub fn volume_leaders<'a, I>(snapshots: I, n: usize) -> Vec<VolumeLeader>
where
    I: IntoIterator<Item = &'a FeatureSnapshot>,
{
    let mut leaders: Vec<VolumeLeader> = snapshots
        .into_iter()
        .filter_map(|s| {
            s.volume.ratio_5m.map(|ratio_5m| VolumeLeader {
                symbol: s.symbol.clone(),
                ratio_5m,
                change_5m: s.price_change.m5,
                stale: s.stale,
            })
        })
        .collect();
    leaders.sort_by(|a, b| {
        b.ratio_5m
            .partial_cmp(&a.ratio_5m)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.symbol.cmp(&b.symbol))
    });
    leaders.truncate(n);
    leaders
}

/// Orders alerts for dispatch: higher risk first, then higher confidence.
pub fn sort_by_priority(alerts: &mut [AlertRecord]) {
    alerts.sort_by(|a, b| {
        let (risk_a, conf_a) = a.priority();
        let (risk_b, conf_b) = b.priority();
        risk_b
            .cmp(&risk_a)
            .then_with(|| conf_b.partial_cmp(&conf_a).unwrap_or(Ordering::Equal))
    });
}
