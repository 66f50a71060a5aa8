//! Per-symbol evaluation: features, detectors, composite score, cooldown.
//!
//! ```text
//!   SymbolState ──▶ FeatureExtractor ──▶ DetectorSet ──▶ CompositeScorer
//!                                                              │
//!                       AlertRecord (HIGH/EXTREME) ◀── CooldownTracker
//! ```
//!
//! The pipeline is immutable and shared by every symbol task; the only state
//! it touches is the [`SymbolState`] handed to [`SignalPipeline::evaluate`].

use crate::cooldown::CooldownDecision;
use crate::features::FeatureExtractor;
use crate::generator::CompositeScorer;
use crate::registry::DetectorSet;
use crate::state::SymbolState;
use chrono::{DateTime, Utc};
use surge_watch_core::{AlertRecord, CompositeSignal, FeatureSnapshot, MonitorConfig};
use tracing::debug;

/// Everything one symbol produced in one tick.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub snapshot: FeatureSnapshot,
    pub signal: CompositeSignal,
    pub decision: CooldownDecision,
    /// Present for HIGH/EXTREME verdicts, emitted or suppressed
    pub alert: Option<AlertRecord>,
}

impl Evaluation {
    /// True when the alert passed the cooldown.
    #[must_use]
    pub fn is_emitted(&self) -> bool {
        self.decision == CooldownDecision::Emit
    }
}

/// Feature extraction, detection and scoring for one configuration.
#[derive(Debug)]
pub struct SignalPipeline {
    extractor: FeatureExtractor,
    detectors: DetectorSet,
    scorer: CompositeScorer,
}

impl SignalPipeline {
    #[must_use]
    pub fn new(extractor: FeatureExtractor, detectors: DetectorSet, scorer: CompositeScorer) -> Self {
        Self {
            extractor,
            detectors,
            scorer,
        }
    }

    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            FeatureExtractor::from_config(config),
            DetectorSet::from_settings(&config.detectors),
            CompositeScorer::from_config(config),
        )
    }

    #[must_use]
    pub fn detectors(&self) -> &DetectorSet {
        &self.detectors
    }

    /// Scores a snapshot without touching any state.
    #[must_use]
    pub fn score(&self, snapshot: &FeatureSnapshot) -> CompositeSignal {
        self.scorer.score(self.detectors.evaluate(snapshot))
    }

    /// Evaluates the symbol at `now`, updating its last snapshot and cooldown.
    ///
    /// `stale` marks a tick where no fresh candles made it into history; the
    /// flag is carried on both the snapshot and any alert record.
    ///
    /// Returns `None` only when the symbol has no history at all.
    pub fn evaluate(
        &self,
        state: &mut SymbolState,
        now: DateTime<Utc>,
        stale: bool,
    ) -> Option<Evaluation> {
        let mut snapshot = self.extractor.extract(state, now)?;
        if stale {
            snapshot = snapshot.into_stale();
        }

        let signal = self.score(&snapshot);
        let decision = state.cooldown_mut().evaluate(signal.risk_level, now);

        let alert = match decision {
            CooldownDecision::NotEligible => None,
            CooldownDecision::Emit | CooldownDecision::Suppress => {
                if decision == CooldownDecision::Suppress {
                    debug!(
                        symbol = %state.symbol(),
                        risk = %signal.risk_level,
                        confidence = signal.confidence,
                        "Alert suppressed by cooldown"
                    );
                }
                Some(AlertRecord {
                    symbol: state.symbol().to_string(),
                    timestamp: now,
                    signal: signal.clone(),
                    emitted: decision == CooldownDecision::Emit,
                    stale,
                })
            }
        };

        state.set_last_snapshot(snapshot.clone());

        Some(Evaluation {
            snapshot,
            signal,
            decision,
            alert,
        })
    }
}
