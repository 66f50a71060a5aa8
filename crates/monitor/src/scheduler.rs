//! Tick-driven fetch scheduler.
//!
//! # Architecture
//!
//! ```text
//! interval.tick()
//!      │
//!      ▼
//! JoinSet ── per symbol (clone of SymbolState) ──────────────────────────┐
//!   │  Semaphore permit (max_concurrency)                                 │
//!   │  governor limiter (requests_per_second)                             │
//!   │  fetch_candles  ── RetryPolicy ┐ one request_timeout budget         │
//!   │  fetch_order_book (if expired) ┘ drop the still-open bar            │
//!   │  SignalPipeline::evaluate  (ingest → features → detect → cooldown)  │
//!   └─────────────────────────────────────────────────────────────────────┘
//!      │  raced against tick_deadline; stragglers aborted, state untouched
//!      ▼
//! write back completed states → sink (snapshots, alerts) → notifier (emitted,
//! highest priority first) → tick summary + MonitorStats
//! ```
//!
//! # Example
//!
//! ```ignore
//! let mut scheduler = FetchScheduler::new(config, source, sink, notifier)?;
//! let stop = scheduler.stop_handle();
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     stop.stop();
//! });
//! scheduler.run().await?;
//! ```

use crate::error::MonitorError;
use crate::registry::SymbolRegistry;
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::stats::{sort_by_priority, volume_leaders, MonitorStats, TickReport, SUMMARY_TOP_N};
use chrono::{DateTime, Utc};
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use nonzero_ext::nonzero;
use std::collections::HashSet;
use std::num::NonZeroU32;
use std::pin::pin;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use surge_watch_core::{
    AlertNotifier, AlertRecord, Candle, FeatureSnapshot, FetchError, MarketDataSource,
    MonitorConfig, OrderBookSnapshot, SnapshotSink,
};
use surge_watch_signals::{Evaluation, SignalPipeline, SymbolState};
use tokio::sync::{Notify, RwLock, Semaphore};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

// =============================================================================
// Stop Handle
// =============================================================================

/// Cloneable handle that stops a running scheduler.
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    flag: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl StopHandle {
    /// Requests a stop. In-flight symbol tasks are aborted without dispatch.
    pub fn stop(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Resolves once [`StopHandle::stop`] has been called.
    pub async fn stopped(&self) {
        let mut notified = pin!(self.notify.notified());
        // register before checking the flag so a concurrent stop is not lost
        notified.as_mut().enable();
        if self.is_stopped() {
            return;
        }
        notified.await;
    }
}

// =============================================================================
// Per-symbol Task
// =============================================================================

/// Shared, read-only inputs of every symbol task.
struct TaskContext {
    source: Arc<dyn MarketDataSource>,
    pipeline: SignalPipeline,
    limiter: Limiter,
    retry: RetryPolicy,
    candle_window: usize,
    order_book_enabled: bool,
    order_book_depth: usize,
    order_book_ttl: chrono::Duration,
    request_timeout: Duration,
}

/// What a finished symbol task hands back.
struct SymbolOutcome {
    state: SymbolState,
    evaluation: Option<Evaluation>,
    retries: u32,
    fetch_failed: bool,
    rejected: bool,
}

impl TaskContext {
    /// Fetches candles with retry until `deadline`.
    async fn fetch_candles(&self, symbol: &str, deadline: Instant) -> RetryOutcome<Vec<Candle>> {
        let attempts = AtomicU32::new(0);
        let (source, limiter, attempts_ref) = (&self.source, &self.limiter, &attempts);
        let window = self.candle_window;
        let op = move || async move {
            attempts_ref.fetch_add(1, Ordering::Relaxed);
            limiter.until_ready().await;
            source.fetch_candles(symbol, window).await
        };

        match tokio::time::timeout_at(deadline, self.retry.run(op)).await {
            Ok(outcome) => outcome,
            Err(_) => RetryOutcome {
                result: Err(FetchError::Timeout(format!(
                    "no candles within {}ms",
                    self.request_timeout.as_millis()
                ))),
                attempts: attempts.load(Ordering::Relaxed),
            },
        }
    }

    /// Fetches the book with whatever is left of the symbol's budget.
    async fn fetch_order_book(
        &self,
        symbol: &str,
        deadline: Instant,
    ) -> Result<OrderBookSnapshot, FetchError> {
        let fetch = async {
            self.limiter.until_ready().await;
            self.source.fetch_order_book(symbol, self.order_book_depth).await
        };
        tokio::time::timeout_at(deadline, fetch).await.map_err(|_| {
            FetchError::Timeout(format!(
                "no order book within the {}ms symbol budget",
                self.request_timeout.as_millis()
            ))
        })?
    }

    async fn process(&self, mut state: SymbolState, now: DateTime<Utc>) -> SymbolOutcome {
        let symbol = state.symbol().to_string();
        // candles and book share one budget
        let deadline = Instant::now() + self.request_timeout;
        let fetched = self.fetch_candles(&symbol, deadline).await;
        let retries = fetched.retries();
        let mut fetch_failed = false;
        let mut rejected = false;

        let stale = match fetched.result {
            Ok(window) => {
                rejected = !ingest_closed(&mut state, window, now);
                rejected
            }
            Err(err) => {
                warn!(
                    symbol = %symbol,
                    attempts = fetched.attempts,
                    error = %err,
                    "Candle fetch failed, evaluating last known state"
                );
                fetch_failed = true;
                true
            }
        };

        if !fetch_failed && self.order_book_enabled && !state.order_book_is_fresh(now, self.order_book_ttl)
        {
            match self.fetch_order_book(&symbol, deadline).await {
                Ok(book) => state.store_order_book(book, now),
                Err(err) => warn!(symbol = %symbol, error = %err, "Order book fetch failed"),
            }
        }

        let evaluation = self.pipeline.evaluate(&mut state, now, stale);
        SymbolOutcome {
            state,
            evaluation,
            retries,
            fetch_failed,
            rejected,
        }
    }
}

/// Ingests the bars of `window` that have closed by `now`.
///
/// The bar still being traded is dropped: once ingested, a timestamp is never
/// replaced, so its partial volume and close would stick. Returns false when
/// the window fails validation.
fn ingest_closed(state: &mut SymbolState, mut window: Vec<Candle>, now: DateTime<Utc>) -> bool {
    let received = window.len();
    window.retain(|c| c.is_closed(now));
    let open_bars = received - window.len();
    if window.is_empty() && open_bars > 0 {
        debug!(symbol = %state.symbol(), open_bars, "No closed bars yet");
        return true;
    }

    match state.ingest(&window) {
        Ok(summary) => {
            debug!(
                symbol = %state.symbol(),
                appended = summary.appended,
                ignored = summary.ignored,
                evicted = summary.evicted,
                open_bars,
                "Ingested candles"
            );
            true
        }
        Err(err) => {
            warn!(
                target: "data_quality",
                symbol = %state.symbol(),
                error = %err,
                "Rejected candle window, keeping prior history"
            );
            false
        }
    }
}

// =============================================================================
// Scheduler
// =============================================================================

/// Drives the per-tick fan-out across all configured symbols.
pub struct FetchScheduler {
    config: MonitorConfig,
    ctx: Arc<TaskContext>,
    semaphore: Arc<Semaphore>,
    registry: SymbolRegistry,
    sink: Arc<dyn SnapshotSink>,
    notifier: Arc<dyn AlertNotifier>,
    stop: StopHandle,
    stats: Arc<RwLock<MonitorStats>>,
    ticks: u64,
}

impl FetchScheduler {
    /// Validates the configuration and pre-populates symbol state.
    ///
    /// # Errors
    /// Returns [`MonitorError::Config`] for an invalid configuration and
    /// [`MonitorError::NoSymbols`] for an empty symbol list. Nothing is
    /// fetched before these checks pass.
    pub fn new(
        config: MonitorConfig,
        source: Arc<dyn MarketDataSource>,
        sink: Arc<dyn SnapshotSink>,
        notifier: Arc<dyn AlertNotifier>,
    ) -> Result<Self, MonitorError> {
        config.validate()?;
        if config.symbols.is_empty() {
            return Err(MonitorError::NoSymbols);
        }

        let rps = NonZeroU32::new(config.requests_per_second).unwrap_or(nonzero!(20u32));
        let ctx = TaskContext {
            source,
            pipeline: SignalPipeline::from_config(&config),
            limiter: RateLimiter::direct(Quota::per_second(rps)),
            retry: RetryPolicy::new(&config.retry),
            candle_window: config.candle_window,
            order_book_enabled: config.order_book.enabled,
            order_book_depth: config.order_book.depth,
            order_book_ttl: config.order_book_ttl(),
            request_timeout: config.request_timeout(),
        };

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.max_concurrency)),
            registry: SymbolRegistry::from_config(&config),
            ctx: Arc::new(ctx),
            config,
            sink,
            notifier,
            stop: StopHandle::default(),
            stats: Arc::new(RwLock::new(MonitorStats::default())),
            ticks: 0,
        })
    }

    /// Returns a handle to stop the scheduler.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Returns access to statistics.
    #[must_use]
    pub fn stats(&self) -> Arc<RwLock<MonitorStats>> {
        Arc::clone(&self.stats)
    }

    #[must_use]
    pub fn registry(&self) -> &SymbolRegistry {
        &self.registry
    }

    #[must_use]
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Ticks until stopped.
    ///
    /// # Errors
    /// Returns [`MonitorError::AlreadyStopped`] if a stop was requested before
    /// the loop started.
    pub async fn run(&mut self) -> Result<(), MonitorError> {
        if self.stop.is_stopped() {
            return Err(MonitorError::AlreadyStopped);
        }

        info!(
            mode = %self.config.mode,
            symbols = self.registry.len(),
            tick_interval_secs = self.config.tick_interval_secs,
            max_concurrency = self.config.max_concurrency,
            source = self.ctx.source.name(),
            notifier = self.notifier.name(),
            "Starting monitor"
        );
        self.mark_started().await;

        let mut interval = tokio::time::interval(self.config.tick_interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let stop = self.stop.clone();

        loop {
            tokio::select! {
                biased;
                () = stop.stopped() => break,
                _ = interval.tick() => {}
            }

            tokio::select! {
                biased;
                () = stop.stopped() => {
                    info!("Stop requested mid-tick, abandoning in-flight symbols");
                    break;
                }
                _ = self.tick_at(Utc::now()) => {}
            }
        }

        let stats = self.stats.read().await;
        info!(
            ticks = stats.ticks,
            alerts_emitted = stats.alerts_emitted,
            alerts_suppressed = stats.alerts_suppressed,
            "Monitor stopped"
        );
        Ok(())
    }

    /// Runs a single tick now.
    pub async fn run_once(&mut self) -> TickReport {
        self.mark_started().await;
        self.tick_at(Utc::now()).await
    }

    /// Runs a single tick evaluated at `now`.
    ///
    /// `now` drives cooldown and order-book freshness, so a caller replaying
    /// ticks can control time explicitly.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> TickReport {
        let started = Instant::now();
        self.ticks += 1;

        let mut tasks = JoinSet::new();
        let mut pending: HashSet<String> = HashSet::with_capacity(self.registry.len());
        for symbol in self.registry.symbols() {
            let Some(state) = self.registry.get(symbol).cloned() else {
                continue;
            };
            pending.insert(symbol.clone());
            let ctx = Arc::clone(&self.ctx);
            let semaphore = Arc::clone(&self.semaphore);
            tasks.spawn(async move {
                // the semaphore is never closed
                let _permit = semaphore.acquire_owned().await.ok();
                ctx.process(state, now).await
            });
        }

        let outcomes = self.join_until_deadline(&mut tasks).await;

        let mut report = TickReport {
            tick: self.ticks,
            started_at: now,
            ..TickReport::default()
        };
        let mut snapshots: Vec<FeatureSnapshot> = Vec::with_capacity(outcomes.len());
        let mut emitted: Vec<AlertRecord> = Vec::new();
        let mut suppressed: Vec<AlertRecord> = Vec::new();

        for outcome in outcomes {
            let symbol = outcome.state.symbol().to_string();
            pending.remove(&symbol);
            report.retries += outcome.retries;
            report.fetch_failures += usize::from(outcome.fetch_failed);
            report.rejected += usize::from(outcome.rejected);

            match outcome.evaluation {
                Some(eval) => {
                    report.processed += 1;
                    if eval.snapshot.stale {
                        report.stale.push(symbol.clone());
                    }
                    if let Some(alert) = eval.alert {
                        if alert.emitted {
                            emitted.push(alert);
                        } else {
                            suppressed.push(alert);
                        }
                    }
                    snapshots.push(eval.snapshot);
                }
                None => report.no_data.push(symbol.clone()),
            }
            self.registry.replace(outcome.state);
        }

        report.skipped = pending.into_iter().collect();
        report.skipped.sort();
        for symbol in &report.skipped {
            warn!(symbol = %symbol, "Symbol still running at tick deadline, skipped");
        }

        sort_by_priority(&mut emitted);
        self.dispatch(&snapshots, &suppressed, &emitted).await;

        report.suppressed = suppressed.len();
        report.alerts = emitted;
        report.volume_leaders = volume_leaders(&snapshots, SUMMARY_TOP_N);
        report.elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        info!(
            tick = report.tick,
            processed = report.processed,
            stale = report.stale.len(),
            skipped = report.skipped.len(),
            no_data = report.no_data.len(),
            alerts = report.alerts.len(),
            suppressed = report.suppressed,
            elapsed_ms = report.elapsed_ms,
            leaders = ?report
                .volume_leaders
                .iter()
                .map(|l| format!("{}:{:.1}x", l.symbol, l.ratio_5m))
                .collect::<Vec<_>>(),
            "Tick complete"
        );

        self.stats.write().await.record_tick(&report);
        report
    }

    async fn mark_started(&self) {
        let mut stats = self.stats.write().await;
        if stats.started_at.is_none() {
            stats.started_at = Some(Utc::now());
        }
    }

    /// Collects finished tasks until all are done or the deadline passes.
    async fn join_until_deadline(&self, tasks: &mut JoinSet<SymbolOutcome>) -> Vec<SymbolOutcome> {
        let mut outcomes = Vec::with_capacity(tasks.len());
        let mut deadline = pin!(tokio::time::sleep(self.config.tick_deadline()));

        loop {
            tokio::select! {
                joined = tasks.join_next() => match joined {
                    Some(Ok(outcome)) => outcomes.push(outcome),
                    Some(Err(err)) => warn!(error = %err, "Symbol task failed"),
                    None => break,
                },
                () = &mut deadline => {
                    debug!(outstanding = tasks.len(), "Tick deadline reached");
                    break;
                }
            }
        }

        tasks.shutdown().await;
        outcomes
    }

    /// Hands snapshots and records to the sink, emitted alerts to the notifier.
    async fn dispatch(
        &self,
        snapshots: &[FeatureSnapshot],
        suppressed: &[AlertRecord],
        emitted: &[AlertRecord],
    ) {
        for snapshot in snapshots {
            if let Err(err) = self.sink.record_features(snapshot).await {
                warn!(symbol = %snapshot.symbol, error = %err, "Failed to record snapshot");
            }
        }

        for alert in suppressed {
            if let Err(err) = self.sink.record_alert(alert).await {
                warn!(symbol = %alert.symbol, error = %err, "Failed to record suppressed alert");
            }
        }

        for alert in emitted {
            info!(
                symbol = %alert.symbol,
                risk = %alert.signal.risk_level,
                action = %alert.signal.action,
                confidence = alert.signal.confidence,
                active = alert.signal.active_count,
                stale = alert.stale,
                "Alert emitted"
            );
            if let Err(err) = self.sink.record_alert(alert).await {
                warn!(symbol = %alert.symbol, error = %err, "Failed to record alert");
            }
            if let Err(err) = self.notifier.notify(alert).await {
                warn!(
                    symbol = %alert.symbol,
                    notifier = self.notifier.name(),
                    error = %err,
                    "Failed to deliver alert"
                );
            }
        }
    }
}

impl std::fmt::Debug for FetchScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchScheduler")
            .field("mode", &self.config.mode)
            .field("symbols", &self.registry.len())
            .field("ticks", &self.ticks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stop_handle_resolves_after_stop() {
        let handle = StopHandle::default();
        assert!(!handle.is_stopped());

        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.stopped().await });
        tokio::task::yield_now().await;
        handle.stop();
        task.await.unwrap();
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn stopped_returns_immediately_when_already_stopped() {
        let handle = StopHandle::default();
        handle.stop();
        tokio::time::timeout(Duration::from_millis(100), handle.stopped())
            .await
            .unwrap();
    }
}
