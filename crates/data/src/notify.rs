use anyhow::Result;
use async_trait::async_trait;
use surge_watch_core::{AlertNotifier, AlertRecord};
use tracing::info;

/// Delivers alerts to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl AlertNotifier for LogNotifier {
    async fn notify(&self, alert: &AlertRecord) -> Result<()> {
        info!(
            target: "alerts",
            symbol = %alert.symbol,
            risk = %alert.signal.risk_level,
            action = %alert.signal.action,
            confidence = alert.signal.confidence,
            stale = alert.stale,
            "{}",
            format_alert(alert)
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "log"
    }
}

/// One-line human readable rendering of an alert.
///
/// `[HIGH] BTC_USDT BUY conf=0.42 (volume_explosion 1.00 bullish, momentum_shift 0.58 bullish)`
#[must_use]
pub fn format_alert(alert: &AlertRecord) -> String {
    let detectors = alert
        .signal
        .active_detections()
        .map(|d| {
            format!(
                "{} {:.2} {}",
                d.detector,
                d.confidence,
                serde_json::to_value(d.direction)
                    .ok()
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    let mut line = format!(
        "[{}] {} {} conf={:.2} ({})",
        alert.signal.risk_level, alert.symbol, alert.signal.action, alert.signal.confidence, detectors
    );
    if alert.stale {
        line.push_str(" [stale]");
    }
    line
}
