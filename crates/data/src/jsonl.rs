//! JSON-lines persistence.
//!
//! Two append-only files under one directory: `features.jsonl` with one
//! [`FeatureSnapshot`] per line, and `alerts.jsonl` with one [`AlertRecord`]
//! per line. Each line carries its own `symbol` and `timestamp`, so the
//! files are keyed by `(symbol, timestamp)` without any index.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::{Path, PathBuf};
use surge_watch_core::{AlertRecord, FeatureSnapshot, SnapshotSink};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub const FEATURES_FILE: &str = "features.jsonl";
pub const ALERTS_FILE: &str = "alerts.jsonl";

/// Appends snapshots and alerts as JSON lines.
#[derive(Debug)]
pub struct JsonlSink {
    features_path: PathBuf,
    alerts_path: PathBuf,
    // serializes appends so concurrent lines never interleave
    write_lock: Mutex<()>,
}

impl JsonlSink {
    /// Creates the directory if needed.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub async fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
        Ok(Self {
            features_path: dir.join(FEATURES_FILE),
            alerts_path: dir.join(ALERTS_FILE),
            write_lock: Mutex::new(()),
        })
    }

    #[must_use]
    pub fn features_path(&self) -> &Path {
        &self.features_path
    }

    #[must_use]
    pub fn alerts_path(&self) -> &Path {
        &self.alerts_path
    }

    async fn append<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let mut line = serde_json::to_vec(value).context("Failed to serialize record")?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(&line)
            .await
            .with_context(|| format!("Failed to append to {}", path.display()))?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotSink for JsonlSink {
    async fn record_features(&self, snapshot: &FeatureSnapshot) -> Result<()> {
        self.append(&self.features_path, snapshot).await
    }

    async fn record_alert(&self, alert: &AlertRecord) -> Result<()> {
        self.append(&self.alerts_path, alert).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::alert;
    use chrono::Utc;

    #[tokio::test]
    async fn appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let sink = JsonlSink::create(dir.path().join("out")).await.unwrap();

        sink.record_features(&FeatureSnapshot::new("BTC_USDT", Utc::now(), 100.0))
            .await
            .unwrap();
        sink.record_features(&FeatureSnapshot::new("ETH_USDT", Utc::now(), 10.0))
            .await
            .unwrap();
        sink.record_alert(&alert("BTC_USDT", true)).await.unwrap();

        let features = tokio::fs::read_to_string(sink.features_path()).await.unwrap();
        let lines: Vec<&str> = features.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: FeatureSnapshot = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.symbol, "BTC_USDT");

        let alerts = tokio::fs::read_to_string(sink.alerts_path()).await.unwrap();
        let record: AlertRecord = serde_json::from_str(alerts.trim()).unwrap();
        assert!(record.emitted);
    }

    #[tokio::test]
    async fn reopening_keeps_existing_lines() {
        let dir = tempfile::tempdir().unwrap();
        {
            let sink = JsonlSink::create(dir.path()).await.unwrap();
            sink.record_alert(&alert("A", true)).await.unwrap();
        }
        let sink = JsonlSink::create(dir.path()).await.unwrap();
        sink.record_alert(&alert("B", false)).await.unwrap();

        let alerts = tokio::fs::read_to_string(sink.alerts_path()).await.unwrap();
        assert_eq!(alerts.lines().count(), 2);
    }
}
