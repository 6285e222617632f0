// ============================================================
// Layer 3 — Predictions
// ============================================================
// Prediction         → raw classifier output for one input:
//                      argmax label, its probability
//                      (the "confidence") and the full
//                      distribution over the six labels.
// AdjustedPrediction → the same prediction after the
//                      confidence-threshold policy has picked
//                      the label that is actually emitted.
//
// Reference: Rust Book §5 (Structs)

use std::collections::BTreeMap;

use anyhow::anyhow;
use serde::Serialize;

use crate::domain::error::IntentError;
use crate::domain::label::{Label, NUM_LABELS};

/// Tolerance for "the distribution sums to one".
const SUM_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub predicted_label: Label,
    /// Highest probability in `distribution`, in [0, 1].
    pub confidence: f64,
    /// Probability per label, indexed by label id.
    pub distribution: [f64; NUM_LABELS],
}

impl Prediction {
    /// Build a prediction from a softmax output.
    ///
    /// The argmax is taken with first-wins tie breaking so equal
    /// probabilities resolve to the lowest label id.
    pub fn from_probabilities(probs: &[f32]) -> Result<Self, IntentError> {
        if probs.len() != NUM_LABELS {
            return Err(anyhow!(
                "classifier returned {} probabilities, expected {}",
                probs.len(),
                NUM_LABELS
            )
            .into());
        }

        let mut distribution = [0.0f64; NUM_LABELS];
        for (slot, &p) in distribution.iter_mut().zip(probs) {
            let p = p as f64;
            if !p.is_finite() || p < 0.0 {
                return Err(anyhow!("classifier returned invalid probability {p}").into());
            }
            *slot = p;
        }

        let sum: f64 = distribution.iter().sum();
        if (sum - 1.0).abs() > SUM_TOLERANCE {
            return Err(anyhow!("probabilities sum to {sum:.6}, expected 1").into());
        }

        let mut best = 0usize;
        for (i, &p) in distribution.iter().enumerate().skip(1) {
            if p > distribution[best] {
                best = i;
            }
        }

        Ok(Self {
            predicted_label: Label::ALL[best],
            confidence:      distribution[best].clamp(0.0, 1.0),
            distribution,
        })
    }

    pub fn probability(&self, label: Label) -> f64 {
        self.distribution[label.id()]
    }

    /// Label name → probability, for JSON output.
    pub fn distribution_map(&self) -> BTreeMap<String, f64> {
        Label::ALL
            .iter()
            .map(|l| (l.as_str().to_string(), self.distribution[l.id()]))
            .collect()
    }
}

/// A prediction together with the label the decision policy emitted.
/// Never persisted on its own; always derived from `raw`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdjustedPrediction {
    pub raw:         Prediction,
    pub final_label: Label,
}

impl AdjustedPrediction {
    /// True when the policy overrode the raw label with the fallback.
    pub fn is_fallback(&self) -> bool {
        self.final_label != self.raw.predicted_label
    }
}
