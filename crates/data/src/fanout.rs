use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use surge_watch_core::{AlertRecord, FeatureSnapshot, SnapshotSink};
use tracing::warn;

/// Forwards every record to each inner sink.
///
/// A failing sink is logged and skipped; the others still receive the
/// record. The call fails only when every sink failed.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn SnapshotSink>>,
}

impl FanoutSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl std::fmt::Debug for FanoutSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanoutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

fn settle(results: Vec<Result<()>>) -> Result<()> {
    let total = results.len();
    let mut last_err = None;
    let mut failed = 0;
    for result in results {
        if let Err(e) = result {
            warn!(error = %e, "Sink write failed");
            failed += 1;
            last_err = Some(e);
        }
    }
    match last_err {
        Some(e) if failed == total => Err(e.context(format!("all {total} sinks failed"))),
        _ => Ok(()),
    }
}

#[async_trait]
impl SnapshotSink for FanoutSink {
    async fn record_features(&self, snapshot: &FeatureSnapshot) -> Result<()> {
        let mut results = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            results.push(sink.record_features(snapshot).await);
        }
        settle(results)
    }

    async fn record_alert(&self, alert: &AlertRecord) -> Result<()> {
        let mut results = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            results.push(sink.record_alert(alert).await);
        }
        settle(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::alert;
    use crate::MemorySink;

    struct Broken;

    #[async_trait]
    impl SnapshotSink for Broken {
        async fn record_features(&self, _snapshot: &FeatureSnapshot) -> Result<()> {
            anyhow::bail!("disk full")
        }

        async fn record_alert(&self, _alert: &AlertRecord) -> Result<()> {
            anyhow::bail!("disk full")
        }
    }

    #[tokio::test]
    async fn one_broken_sink_does_not_starve_the_rest() {
        let memory = Arc::new(MemorySink::new());
        let fanout = FanoutSink::new()
            .with(Arc::new(Broken))
            .with(memory.clone());
        assert_eq!(fanout.len(), 2);

        fanout.record_alert(&alert("A", true)).await.unwrap();
        assert_eq!(memory.alerts().len(), 1);
    }

    #[tokio::test]
    async fn all_broken_is_an_error() {
        let fanout = FanoutSink::new().with(Arc::new(Broken)).with(Arc::new(Broken));
        let err = fanout.record_alert(&alert("A", true)).await.unwrap_err();
        assert!(err.to_string().contains("all 2 sinks failed"));
    }

    #[tokio::test]
    async fn empty_fanout_accepts_everything() {
        let fanout = FanoutSink::new();
        assert!(fanout.is_empty());
        fanout.record_alert(&alert("A", true)).await.unwrap();
    }
}
