//! End-to-end scheduler tests against a scripted market data source.

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use surge_watch_core::{
    AlertNotifier, AlertRecord, Candle, FetchError, MarketDataSource, MonitorConfig,
    OrderBookSnapshot, PriceLevel, RiskLevel, SnapshotSink,
};
use surge_watch_data::MemorySink;
use surge_watch_monitor::{FetchScheduler, MonitorError};

// =============================================================================
// Fixtures
// =============================================================================

#[derive(Default)]
struct ScriptedSource {
    windows: Mutex<HashMap<String, Vec<Candle>>>,
    failures: Mutex<HashMap<String, FetchError>>,
    delays: Mutex<HashMap<String, Duration>>,
    books: Mutex<HashMap<String, OrderBookSnapshot>>,
    book_delays: Mutex<HashMap<String, Duration>>,
    calls: AtomicU32,
    in_flight: AtomicU32,
    peak_in_flight: AtomicU32,
}

/// Counts a candle request as in flight until dropped.
struct InFlight<'a>(&'a AtomicU32);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl ScriptedSource {
    fn set_window(&self, symbol: &str, window: Vec<Candle>) {
        self.windows.lock().unwrap().insert(symbol.to_string(), window);
    }

    fn fail(&self, symbol: &str, err: FetchError) {
        self.failures.lock().unwrap().insert(symbol.to_string(), err);
    }

    fn recover(&self, symbol: &str) {
        self.failures.lock().unwrap().remove(symbol);
    }

    fn delay(&self, symbol: &str, delay: Duration) {
        self.delays.lock().unwrap().insert(symbol.to_string(), delay);
    }

    fn set_book(&self, symbol: &str, book: OrderBookSnapshot, delay: Duration) {
        self.books.lock().unwrap().insert(symbol.to_string(), book);
        self.book_delays.lock().unwrap().insert(symbol.to_string(), delay);
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    fn peak_in_flight(&self) -> u32 {
        self.peak_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MarketDataSource for ScriptedSource {
    async fn fetch_candles(
        &self,
        symbol: &str,
        _window_minutes: usize,
    ) -> Result<Vec<Candle>, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let delay = self.delays.lock().unwrap().get(symbol).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = self.failures.lock().unwrap().get(symbol) {
            return Err(err.clone());
        }
        Ok(self
            .windows
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        _depth: usize,
    ) -> Result<OrderBookSnapshot, FetchError> {
        let delay = self.book_delays.lock().unwrap().get(symbol).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.books
            .lock()
            .unwrap()
            .get(symbol)
            .cloned()
            .ok_or_else(|| FetchError::Network("no book in tests".into()))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[derive(Default)]
struct RecordingNotifier {
    alerts: Mutex<Vec<AlertRecord>>,
}

impl RecordingNotifier {
    fn count(&self) -> usize {
        self.alerts.lock().unwrap().len()
    }
}

#[async_trait]
impl AlertNotifier for RecordingNotifier {
    async fn notify(&self, alert: &AlertRecord) -> anyhow::Result<()> {
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

fn t0() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

fn candle(minute: i64, close: f64, volume: f64) -> Candle {
    let close = Decimal::try_from(close).unwrap();
    let volume = Decimal::try_from(volume).unwrap();
    Candle {
        timestamp: t0() - ChronoDuration::minutes(64) + ChronoDuration::minutes(minute),
        open: close,
        high: close,
        low: close,
        close,
        volume,
        quote_volume: close * volume,
    }
}

/// Ten evenly sized levels a side around 100.
fn uniform_book() -> OrderBookSnapshot {
    let level = |price: f64| PriceLevel::new(Decimal::try_from(price).unwrap(), Decimal::from(50));
    OrderBookSnapshot {
        bids: (0..10).map(|i| level(99.9 - f64::from(i) / 10.0)).collect(),
        asks: (0..10).map(|i| level(100.1 + f64::from(i) / 10.0)).collect(),
        timestamp: t0(),
    }
}

/// Zigzag 100/101 history.
fn quiet_window() -> Vec<Candle> {
    (0..64)
        .map(|m| candle(m, if m % 2 == 0 { 100.0 } else { 101.0 }, 10.0))
        .collect()
}

/// Zigzag followed by a breakout to 107 on 10x volume: Volume Explosion and
/// Momentum Shift fire together, which is HIGH by the active-count rule.
fn breakout_window() -> Vec<Candle> {
    let mut window: Vec<Candle> = (0..59)
        .map(|m| candle(m, if m % 2 == 0 { 100.0 } else { 101.0 }, 10.0))
        .collect();
    for (i, close) in [100.5, 101.0, 101.5, 102.0].iter().enumerate() {
        window.push(candle(59 + i as i64, *close, 10.0));
    }
    window.push(candle(63, 107.0, 100.0));
    window
}

fn config(symbols: &[&str]) -> MonitorConfig {
    let mut cfg = MonitorConfig::balanced().with_symbols(symbols.iter().copied());
    cfg.requests_per_second = 1_000;
    cfg.request_timeout_ms = 3_000;
    cfg.tick_deadline_ms = 5_000;
    cfg.retry.initial_backoff_ms = 10;
    cfg.retry.max_backoff_ms = 40;
    cfg.order_book.enabled = false;
    cfg
}

struct Harness {
    scheduler: FetchScheduler,
    source: Arc<ScriptedSource>,
    sink: Arc<MemorySink>,
    notifier: Arc<RecordingNotifier>,
}

fn harness(cfg: MonitorConfig) -> Harness {
    let source = Arc::new(ScriptedSource::default());
    let sink = Arc::new(MemorySink::new());
    let notifier = Arc::new(RecordingNotifier::default());
    let scheduler = FetchScheduler::new(
        cfg,
        Arc::clone(&source) as Arc<dyn MarketDataSource>,
        Arc::clone(&sink) as Arc<dyn SnapshotSink>,
        Arc::clone(&notifier) as Arc<dyn AlertNotifier>,
    )
    .unwrap();
    Harness {
        scheduler,
        source,
        sink,
        notifier,
    }
}

// =============================================================================
// Startup Tests
// =============================================================================

#[test]
fn invalid_config_blocks_start() {
    let source = Arc::new(ScriptedSource::default());
    let mut cfg = config(&["BTC_USDT"]);
    cfg.detectors.volume_explosion.weight = 0.5;

    let result = FetchScheduler::new(
        cfg,
        Arc::clone(&source) as Arc<dyn MarketDataSource>,
        Arc::new(MemorySink::new()),
        Arc::new(RecordingNotifier::default()),
    );
    assert!(matches!(result, Err(MonitorError::Config(_))));
    assert_eq!(source.calls(), 0);
}

#[test]
fn empty_symbol_list_blocks_start() {
    let result = FetchScheduler::new(
        config(&[]),
        Arc::new(ScriptedSource::default()),
        Arc::new(MemorySink::new()),
        Arc::new(RecordingNotifier::default()),
    );
    assert!(matches!(result, Err(MonitorError::NoSymbols)));
}

#[tokio::test]
async fn run_after_stop_is_rejected() {
    let mut h = harness(config(&["BTC_USDT"]));
    h.scheduler.stop_handle().stop();
    assert!(matches!(
        h.scheduler.run().await,
        Err(MonitorError::AlreadyStopped)
    ));
    assert_eq!(h.source.calls(), 0);
}

// =============================================================================
// Isolation Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn failing_symbol_does_not_affect_others() {
    let mut h = harness(config(&["GOOD_USDT", "BAD_USDT"]));
    h.source.set_window("GOOD_USDT", quiet_window());
    h.source.fail("BAD_USDT", FetchError::Network("connection reset".into()));

    let report = h.scheduler.tick_at(t0()).await;

    assert_eq!(report.processed, 1);
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.retries, 2);
    assert_eq!(report.no_data, vec!["BAD_USDT".to_string()]);
    assert!(report.skipped.is_empty());
    assert_eq!(h.scheduler.registry().get("GOOD_USDT").unwrap().len(), 64);
    assert!(h.scheduler.registry().get("BAD_USDT").unwrap().is_empty());

    let features = h.sink.features();
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].symbol, "GOOD_USDT");
}

#[tokio::test(start_paused = true)]
async fn failed_refresh_reuses_history_tagged_stale() {
    let mut h = harness(config(&["BTC_USDT"]));
    h.source.set_window("BTC_USDT", quiet_window());
    let first = h.scheduler.tick_at(t0()).await;
    assert!(first.stale.is_empty());

    h.source.fail("BTC_USDT", FetchError::rate_limit(1));
    let second = h.scheduler.tick_at(t0() + ChronoDuration::seconds(10)).await;
    assert_eq!(second.processed, 1);
    assert_eq!(second.stale, vec!["BTC_USDT".to_string()]);

    let features = h.sink.features();
    assert_eq!(features.len(), 2);
    assert!(!features[0].stale);
    assert!(features[1].stale);
    assert_eq!(features[0].close, features[1].close);

    h.source.recover("BTC_USDT");
    let third = h.scheduler.tick_at(t0() + ChronoDuration::seconds(20)).await;
    assert!(third.stale.is_empty());
}

#[tokio::test(start_paused = true)]
async fn malformed_window_is_rejected_and_history_kept() {
    let mut h = harness(config(&["BTC_USDT"]));
    h.source.set_window("BTC_USDT", quiet_window());
    h.scheduler.tick_at(t0()).await;

    let mut bad = quiet_window();
    bad[63] = candle(63, 0.0, 10.0);
    h.source.set_window("BTC_USDT", bad);
    let report = h.scheduler.tick_at(t0() + ChronoDuration::seconds(10)).await;

    assert_eq!(report.rejected, 1);
    assert_eq!(report.stale, vec!["BTC_USDT".to_string()]);
    assert_eq!(h.scheduler.registry().get("BTC_USDT").unwrap().len(), 64);
}

#[tokio::test(start_paused = true)]
async fn slow_symbol_is_skipped_at_deadline() {
    let mut cfg = config(&["FAST_USDT", "SLOW_USDT"]);
    cfg.tick_deadline_ms = 1_000;
    let mut h = harness(cfg);
    h.source.set_window("FAST_USDT", quiet_window());
    h.source.set_window("SLOW_USDT", quiet_window());
    h.source.delay("SLOW_USDT", Duration::from_secs(2));

    let report = h.scheduler.tick_at(t0()).await;

    assert_eq!(report.processed, 1);
    assert_eq!(report.skipped, vec!["SLOW_USDT".to_string()]);
    assert!(h.scheduler.registry().get("SLOW_USDT").unwrap().is_empty());

    let stats = h.scheduler.stats();
    assert_eq!(stats.read().await.skipped_at_deadline, 1);

    h.source.delay("SLOW_USDT", Duration::ZERO);
    let next = h.scheduler.tick_at(t0() + ChronoDuration::seconds(10)).await;
    assert_eq!(next.processed, 2);
    assert!(next.skipped.is_empty());
}

#[tokio::test(start_paused = true)]
async fn request_timeout_falls_back_to_stale_state() {
    let mut cfg = config(&["BTC_USDT"]);
    cfg.request_timeout_ms = 500;
    let mut h = harness(cfg);
    h.source.set_window("BTC_USDT", quiet_window());
    h.scheduler.tick_at(t0()).await;

    h.source.delay("BTC_USDT", Duration::from_secs(3));
    let report = h.scheduler.tick_at(t0() + ChronoDuration::seconds(10)).await;
    assert!(report.skipped.is_empty());
    assert_eq!(report.fetch_failures, 1);
    assert_eq!(report.stale, vec!["BTC_USDT".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn order_book_shares_the_symbol_budget() {
    let mut cfg = config(&["BTC_USDT"]);
    cfg.order_book.enabled = true;
    let mut h = harness(cfg);
    h.source.set_window("BTC_USDT", quiet_window());
    h.source.delay("BTC_USDT", Duration::from_millis(2_900));
    h.source
        .set_book("BTC_USDT", uniform_book(), Duration::from_millis(2_900));

    let started = tokio::time::Instant::now();
    let report = h.scheduler.tick_at(t0()).await;
    let elapsed = started.elapsed();

    assert!(elapsed <= Duration::from_millis(3_050), "took {elapsed:?}");
    assert_eq!(report.processed, 1);
    assert_eq!(report.fetch_failures, 0);
    assert!(report.stale.is_empty());
    assert!(h.sink.features()[0].order_book.is_none());
}

#[tokio::test(start_paused = true)]
async fn order_book_within_budget_feeds_features() {
    let mut cfg = config(&["BTC_USDT"]);
    cfg.order_book.enabled = true;
    let mut h = harness(cfg);
    h.source.set_window("BTC_USDT", quiet_window());
    h.source.delay("BTC_USDT", Duration::from_millis(1_000));
    h.source
        .set_book("BTC_USDT", uniform_book(), Duration::from_millis(1_000));

    h.scheduler.tick_at(t0()).await;
    let book = h.sink.features()[0].order_book.clone();
    assert!(book.is_some());
    assert!((book.unwrap().spread_bps - 20.0).abs() < 1e-6);
}

// =============================================================================
// Ingestion Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn open_bar_is_ingested_only_once_closed() {
    let mut h = harness(config(&["BTC_USDT"]));

    // 10s into minute 64: the exchange already reports that bar, barely traded
    let mut window = quiet_window();
    window.push(candle(64, 100.0, 1.0));
    h.source.set_window("BTC_USDT", window);
    h.scheduler.tick_at(t0() + ChronoDuration::seconds(10)).await;

    let first = h.sink.features()[0].clone();
    assert_eq!(first.timestamp, candle(63, 101.0, 10.0).timestamp);
    assert!((first.close - 101.0).abs() < 1e-9);
    assert_eq!(h.scheduler.registry().get("BTC_USDT").unwrap().len(), 64);

    // minute 64 has completed with heavy volume and minute 65 just opened
    let mut window = quiet_window();
    window.push(candle(64, 103.0, 600.0));
    window.push(candle(65, 103.0, 1.0));
    h.source.set_window("BTC_USDT", window);
    h.scheduler.tick_at(t0() + ChronoDuration::seconds(70)).await;

    let second = h.sink.features()[1].clone();
    assert!(!second.stale);
    assert_eq!(second.timestamp, candle(64, 103.0, 600.0).timestamp);
    assert!((second.close - 103.0).abs() < 1e-9);
    assert!((second.volume.volume - 600.0).abs() < 1e-9);
    assert!((second.volume.ratio_5m.unwrap() - 60.0).abs() < 1e-9);
    assert_eq!(h.scheduler.registry().get("BTC_USDT").unwrap().len(), 65);
}

#[tokio::test(start_paused = true)]
async fn window_of_only_the_open_bar_is_not_a_rejection() {
    let mut h = harness(config(&["BTC_USDT"]));
    h.source.set_window("BTC_USDT", quiet_window());
    h.scheduler.tick_at(t0()).await;

    h.source.set_window("BTC_USDT", vec![candle(64, 100.0, 1.0)]);
    let report = h.scheduler.tick_at(t0() + ChronoDuration::seconds(30)).await;
    assert_eq!(report.rejected, 0);
    assert!(report.stale.is_empty());
    assert_eq!(h.scheduler.registry().get("BTC_USDT").unwrap().len(), 64);
}

// =============================================================================
// Concurrency Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn fan_out_respects_max_concurrency() {
    let symbols: Vec<String> = (0..25).map(|i| format!("S{i:02}_USDT")).collect();
    let names: Vec<&str> = symbols.iter().map(String::as_str).collect();
    let mut cfg = config(&names);
    cfg.max_concurrency = 3;
    let mut h = harness(cfg);
    for symbol in &names {
        h.source.set_window(symbol, quiet_window());
        h.source.delay(symbol, Duration::from_millis(100));
    }

    let report = h.scheduler.tick_at(t0()).await;

    assert_eq!(report.processed, 25);
    assert!(report.skipped.is_empty());
    assert_eq!(h.source.calls(), 25);
    let peak = h.source.peak_in_flight();
    assert!(peak <= 3, "peak in flight {peak}");
    assert!(peak > 1, "symbols ran one at a time");
}

// =============================================================================
// Alerting Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn cooldown_suppresses_repeat_high_across_ticks() {
    let mut h = harness(config(&["PUMP_USDT", "CALM_USDT"]));
    h.source.set_window("PUMP_USDT", breakout_window());
    h.source.set_window("CALM_USDT", quiet_window());

    let first = h.scheduler.tick_at(t0()).await;
    assert_eq!(first.alerts.len(), 1);
    assert_eq!(first.alerts[0].symbol, "PUMP_USDT");
    assert_eq!(first.alerts[0].signal.risk_level, RiskLevel::High);
    assert_eq!(h.notifier.count(), 1);

    let second = h.scheduler.tick_at(t0() + ChronoDuration::seconds(60)).await;
    assert!(second.alerts.is_empty());
    assert_eq!(second.suppressed, 1);
    assert_eq!(h.notifier.count(), 1);

    let records = h.sink.alerts();
    assert_eq!(records.len(), 2);
    assert!(records[0].emitted);
    assert!(!records[1].emitted);

    let third = h.scheduler.tick_at(t0() + ChronoDuration::minutes(6)).await;
    assert_eq!(third.alerts.len(), 1);
    assert_eq!(h.notifier.count(), 2);

    let stats = h.scheduler.stats();
    let stats = stats.read().await;
    assert_eq!(stats.alerts_emitted, 2);
    assert_eq!(stats.alerts_suppressed, 1);
    assert_eq!(stats.ticks, 3);
}

#[tokio::test(start_paused = true)]
async fn tick_summary_ranks_volume_leaders() {
    let mut h = harness(config(&["PUMP_USDT", "CALM_USDT"]));
    h.source.set_window("PUMP_USDT", breakout_window());
    h.source.set_window("CALM_USDT", quiet_window());

    let report = h.scheduler.tick_at(t0()).await;
    assert_eq!(report.volume_leaders.len(), 2);
    assert_eq!(report.volume_leaders[0].symbol, "PUMP_USDT");
    assert!((report.volume_leaders[0].ratio_5m - 10.0).abs() < 1e-9);
}

// =============================================================================
// Loop Tests
// =============================================================================

#[tokio::test(start_paused = true)]
async fn run_ticks_until_stopped() {
    let h = harness(config(&["BTC_USDT"]));
    h.source.set_window("BTC_USDT", quiet_window());
    let stop = h.scheduler.stop_handle();
    let stats = h.scheduler.stats();
    let mut scheduler = h.scheduler;

    let task = tokio::spawn(async move { scheduler.run().await });
    tokio::time::sleep(Duration::from_secs(25)).await;
    stop.stop();

    let result = tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());

    let stats = stats.read().await;
    assert!(stats.ticks >= 2);
    assert!(stats.started_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn stop_mid_tick_dispatches_nothing() {
    let h = harness(config(&["PUMP_USDT", "SLOW_USDT"]));
    h.source.set_window("PUMP_USDT", breakout_window());
    h.source.set_window("SLOW_USDT", quiet_window());
    h.source.delay("SLOW_USDT", Duration::from_secs(2));
    let stop = h.scheduler.stop_handle();
    let stats = h.scheduler.stats();
    let mut scheduler = h.scheduler;

    let task = tokio::spawn(async move { scheduler.run().await });
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(h.source.calls(), 2);
    stop.stop();

    let result = tokio::time::timeout(Duration::from_secs(1), task)
        .await
        .unwrap()
        .unwrap();
    assert!(result.is_ok());

    // PUMP_USDT finished and would have alerted; nothing from the tick leaves
    assert_eq!(h.notifier.count(), 0);
    assert!(h.sink.features().is_empty());
    assert!(h.sink.alerts().is_empty());
    assert_eq!(stats.read().await.ticks, 0);
}
