use anyhow::{Context, Result};
use async_trait::async_trait;
use csv::WriterBuilder;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use surge_watch_core::{AlertRecord, FeatureSnapshot, SnapshotSink};

const HEADER: [&str; 9] = [
    "timestamp",
    "symbol",
    "risk_level",
    "action",
    "confidence",
    "active_count",
    "emitted",
    "stale",
    "detectors",
];

/// Flat CSV log of alert records, one row per record.
///
/// Snapshots are ignored; pair it with another sink through
/// [`FanoutSink`](crate::FanoutSink) to keep them.
#[derive(Debug, Clone)]
pub struct CsvAlertLog {
    path: Arc<PathBuf>,
    lock: Arc<parking_lot::Mutex<()>>,
}

impl CsvAlertLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Arc::new(path.into()),
            lock: Arc::new(parking_lot::Mutex::new(())),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends one row, writing the header first when the file is new.
    ///
    /// # Errors
    /// Returns error if the file cannot be opened or written.
    pub fn append(&self, alert: &AlertRecord) -> Result<()> {
        let _guard = self.lock.lock();
        let is_new = std::fs::metadata(self.path.as_path())
            .map(|m| m.len() == 0)
            .unwrap_or(true);

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_path())
            .with_context(|| format!("Failed to open CSV file: {}", self.path.display()))?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);

        if is_new {
            writer.write_record(HEADER)?;
        }
        writer.write_record(row(alert))?;
        writer.flush()?;
        Ok(())
    }
}

fn row(alert: &AlertRecord) -> [String; 9] {
    let detectors = alert
        .signal
        .active_detections()
        .map(|d| format!("{}:{:.2}", d.detector, d.confidence))
        .collect::<Vec<_>>()
        .join(";");
    [
        alert.timestamp.to_rfc3339(),
        alert.symbol.clone(),
        alert.signal.risk_level.to_string(),
        alert.signal.action.to_string(),
        format!("{:.4}", alert.signal.confidence),
        alert.signal.active_count.to_string(),
        alert.emitted.to_string(),
        alert.stale.to_string(),
        detectors,
    ]
}

#[async_trait]
impl SnapshotSink for CsvAlertLog {
    async fn record_features(&self, _snapshot: &FeatureSnapshot) -> Result<()> {
        Ok(())
    }

    async fn record_alert(&self, alert: &AlertRecord) -> Result<()> {
        let log = self.clone();
        let alert = alert.clone();
        tokio::task::spawn_blocking(move || log.append(&alert))
            .await
            .context("CSV writer task panicked")?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::alert;

    #[test]
    fn writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvAlertLog::new(dir.path().join("alerts.csv"));
        log.append(&alert("BTC_USDT", true)).unwrap();
        log.append(&alert("ETH_USDT", false)).unwrap();

        let mut reader = csv::Reader::from_path(log.path()).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.get(1), Some("symbol"));

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get(1), Some("BTC_USDT"));
        assert_eq!(rows[0].get(2), Some("HIGH"));
        assert_eq!(rows[1].get(6), Some("false"));
    }

    #[tokio::test]
    async fn sink_ignores_snapshots() {
        let dir = tempfile::tempdir().unwrap();
        let log = CsvAlertLog::new(dir.path().join("alerts.csv"));
        log.record_features(&FeatureSnapshot::new("A", chrono::Utc::now(), 1.0))
            .await
            .unwrap();
        assert!(!log.path().exists());

        log.record_alert(&alert("A", true)).await.unwrap();
        assert!(log.path().exists());
    }
}
