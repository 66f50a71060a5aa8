//! Composite scorer.
//!
//! Folds the per-detector results into one confidence, a risk level, and an
//! action. Under [`Normalization::FixedWeights`] an inactive detector still
//! counts in the denominator, so a perfect 1.0 needs every detector maximal.

use std::collections::HashMap;
use surge_watch_core::{
    Action, CompositeSignal, DetectionResult, DetectorKind, DetectorSettings, Direction,
    MonitorConfig, Normalization, RiskLevel,
};

/// Composite confidence above which a verdict is EXTREME.
pub const EXTREME_CONFIDENCE: f64 = 0.7;
/// Composite confidence above which a verdict is HIGH.
pub const HIGH_CONFIDENCE: f64 = 0.5;
/// Active detectors needed for the EXTREME count rule.
pub const EXTREME_MIN_ACTIVE: usize = 3;
/// Mean active confidence needed for the EXTREME count rule.
pub const EXTREME_MIN_AVERAGE: f64 = 0.6;
/// Active detectors needed for the HIGH count rule.
pub const HIGH_MIN_ACTIVE: usize = 2;
/// Mean active confidence needed for the HIGH count rule.
pub const HIGH_MIN_AVERAGE: f64 = 0.5;

/// Weighted combination of detector outputs.
#[derive(Debug, Clone)]
pub struct CompositeScorer {
    weights: HashMap<DetectorKind, f64>,
    normalization: Normalization,
}

impl CompositeScorer {
    #[must_use]
    pub fn new(settings: &DetectorSettings, normalization: Normalization) -> Self {
        let weights = DetectorKind::ALL
            .iter()
            .map(|k| (*k, settings.weight(*k)))
            .collect();
        Self {
            weights,
            normalization,
        }
    }

    #[must_use]
    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(&config.detectors, config.normalization)
    }

    #[must_use]
    pub fn weight(&self, kind: DetectorKind) -> f64 {
        self.weights.get(&kind).copied().unwrap_or(0.0)
    }

    /// Scores one tick's detections.
    ///
    /// Detections may arrive in any order; at most one per detector is used.
    #[must_use]
    pub fn score(&self, detections: Vec<DetectionResult>) -> CompositeSignal {
        // Accumulate in fixed detector order so that an all-maximal tick sums
        // to exactly the same float as the total weight.
        let mut weighted = 0.0;
        let mut total_weight = 0.0;
        let mut active_weight = 0.0;
        let mut counted: Vec<DetectionResult> = Vec::with_capacity(DetectorKind::ALL.len());
        for kind in DetectorKind::ALL {
            let w = self.weight(kind);
            total_weight += w;
            if let Some(d) = detections.iter().find(|d| d.detector == kind && d.active) {
                weighted += w * d.confidence;
                active_weight += w;
                counted.push(d.clone());
            }
        }

        let denominator = match self.normalization {
            Normalization::FixedWeights => total_weight,
            Normalization::ActiveWeights => active_weight,
        };
        let confidence = if denominator > 0.0 {
            (weighted / denominator).clamp(0.0, 1.0)
        } else {
            0.0
        };

        // count, mean and vote use the same one-per-detector set as the weights
        let active_count = counted.len();
        let average_active_confidence = if active_count == 0 {
            0.0
        } else {
            counted.iter().map(|d| d.confidence).sum::<f64>() / active_count as f64
        };

        let risk_level = classify_risk(confidence, active_count, average_active_confidence);
        let action = decide_action(&counted, risk_level);

        CompositeSignal {
            confidence,
            detections,
            active_count,
            average_active_confidence,
            risk_level,
            action,
        }
    }
}

/// Applies the risk rules in order: EXTREME, HIGH, then MEDIUM if anything fired.
#[must_use]
pub fn classify_risk(confidence: f64, active_count: usize, average: f64) -> RiskLevel {
    if confidence > EXTREME_CONFIDENCE
        || (active_count >= EXTREME_MIN_ACTIVE && average > EXTREME_MIN_AVERAGE)
    {
        RiskLevel::Extreme
    } else if confidence > HIGH_CONFIDENCE
        || (active_count >= HIGH_MIN_ACTIVE && average > HIGH_MIN_AVERAGE)
    {
        RiskLevel::High
    } else if active_count > 0 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// Confidence-weighted vote between bullish and bearish active detections.
#[must_use]
pub fn decide_action(detections: &[DetectionResult], risk: RiskLevel) -> Action {
    let (bull, bear) = detections
        .iter()
        .filter(|d| d.active)
        .fold((0.0, 0.0), |(bull, bear), d| match d.direction {
            Direction::Bullish => (bull + d.confidence, bear),
            Direction::Bearish => (bull, bear + d.confidence),
            Direction::Neutral => (bull, bear),
        });

    let strong = risk == RiskLevel::Extreme;
    if bull > bear {
        if strong {
            Action::StrongBuy
        } else {
            Action::Buy
        }
    } else if bear > bull {
        if strong {
            Action::StrongSell
        } else {
            Action::Sell
        }
    } else {
        Action::None
    }
}
