//! Per-symbol alert cooldown.
//!
//! ```text
//!            emit HIGH/EXTREME
//!   IDLE ─────────────────────────▶ COOLING(level, expiry)
//!    ▲                                 │  HIGH     -> suppressed
//!    │        now >= expiry            │  EXTREME  -> emitted, expiry refreshed
//!    └─────────────────────────────────┘
//! ```
//!
//! The return to `IDLE` happens lazily on the next evaluation; no timer runs.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use surge_watch_core::RiskLevel;

/// Cooldown state for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CooldownState {
    Idle,
    Cooling {
        level: RiskLevel,
        expires_at: DateTime<Utc>,
    },
}

/// Outcome of evaluating a verdict against the cooldown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CooldownDecision {
    /// Hand the alert off.
    Emit,
    /// Record it with `emitted = false`.
    Suppress,
    /// LOW/MEDIUM: no alert record at all.
    NotEligible,
}

/// Tracks the cooldown window of a single symbol.
#[derive(Debug, Clone)]
pub struct CooldownTracker {
    duration: Duration,
    state: CooldownState,
    last_emitted: Option<RiskLevel>,
}

impl CooldownTracker {
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            state: CooldownState::Idle,
            last_emitted: None,
        }
    }

    /// Current state, without applying lazy expiry.
    #[must_use]
    pub fn state(&self) -> CooldownState {
        self.state
    }

    /// Risk level of the most recently emitted alert.
    #[must_use]
    pub fn last_emitted(&self) -> Option<RiskLevel> {
        self.last_emitted
    }

    /// Expiry of the current window, if cooling.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        match self.state {
            CooldownState::Cooling { expires_at, .. } => Some(expires_at),
            CooldownState::Idle => None,
        }
    }

    /// Decides whether a verdict at `now` is emitted, and updates state.
    pub fn evaluate(&mut self, level: RiskLevel, now: DateTime<Utc>) -> CooldownDecision {
        if let CooldownState::Cooling { expires_at, .. } = self.state {
            if now >= expires_at {
                tracing::debug!(%expires_at, "Cooldown expired");
                self.state = CooldownState::Idle;
            }
        }

        if !level.is_alert_eligible() {
            return CooldownDecision::NotEligible;
        }

        match self.state {
            CooldownState::Idle => {
                self.start(level, now, None);
                CooldownDecision::Emit
            }
            CooldownState::Cooling { expires_at, .. } if level == RiskLevel::Extreme => {
                self.start(level, now, Some(expires_at));
                CooldownDecision::Emit
            }
            CooldownState::Cooling { .. } => CooldownDecision::Suppress,
        }
    }

    fn start(&mut self, level: RiskLevel, now: DateTime<Utc>, current: Option<DateTime<Utc>>) {
        let candidate = now + self.duration;
        // never move the expiry backwards
        let expires_at = current.map_or(candidate, |c| c.max(candidate));
        self.state = CooldownState::Cooling { level, expires_at };
        self.last_emitted = Some(level);
    }
}
