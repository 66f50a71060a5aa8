use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use surge_watch_core::{AlertRecord, FeatureSnapshot, SnapshotSink};

/// In-memory sink, used by tests and `once` runs.
#[derive(Debug, Default)]
pub struct MemorySink {
    features: Mutex<Vec<FeatureSnapshot>>,
    alerts: Mutex<Vec<AlertRecord>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded snapshots in arrival order.
    #[must_use]
    pub fn features(&self) -> Vec<FeatureSnapshot> {
        self.features.lock().clone()
    }

    /// Recorded alert records (emitted and suppressed) in arrival order.
    #[must_use]
    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.alerts.lock().clone()
    }

    /// Records that passed the cooldown.
    #[must_use]
    pub fn emitted(&self) -> Vec<AlertRecord> {
        self.alerts.lock().iter().filter(|a| a.emitted).cloned().collect()
    }

    pub fn clear(&self) {
        self.features.lock().clear();
        self.alerts.lock().clear();
    }
}

#[async_trait]
impl SnapshotSink for MemorySink {
    async fn record_features(&self, snapshot: &FeatureSnapshot) -> Result<()> {
        self.features.lock().push(snapshot.clone());
        Ok(())
    }

    async fn record_alert(&self, alert: &AlertRecord) -> Result<()> {
        self.alerts.lock().push(alert.clone());
        Ok(())
    }
}
