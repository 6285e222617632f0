// ============================================================
// Layer 3 — Confidence-Threshold Decision Policy
// ============================================================
// Turns a raw prediction into the label the assistant acts on:
//
//   confidence <  threshold  →  unclear
//   confidence >= threshold  →  predicted label
//
// threshold = 0 passes every prediction through unchanged;
// threshold = 1 forces "unclear" unless confidence is exactly 1.
//
// Test evaluation, adversarial evaluation, validation logging
// and live prediction all call ConfidencePolicy::decide. Do not
// re-implement the comparison at a call site.
//
// Reference: Rust Book §5 (Method Syntax)

use serde::{Deserialize, Serialize};

use crate::domain::error::IntentError;
use crate::domain::label::{Label, UNCLEAR_LABEL};
use crate::domain::prediction::{AdjustedPrediction, Prediction};

/// Default threshold used by the training and evaluation scripts.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// A validated threshold in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct ConfidencePolicy {
    threshold: f64,
}

impl ConfidencePolicy {
    pub fn new(threshold: f64) -> Result<Self, IntentError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(IntentError::ThresholdRange { value: threshold });
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Pure decision rule.
    pub fn decide(&self, prediction: &Prediction) -> Label {
        if prediction.confidence < self.threshold {
            UNCLEAR_LABEL
        } else {
            prediction.predicted_label
        }
    }

    pub fn adjust(&self, prediction: Prediction) -> AdjustedPrediction {
        let final_label = self.decide(&prediction);
        AdjustedPrediction { raw: prediction, final_label }
    }

    /// True when `decide` would fall back because of low confidence.
    pub fn is_low_confidence(&self, prediction: &Prediction) -> bool {
        prediction.confidence < self.threshold
    }
}

impl Default for ConfidencePolicy {
    fn default() -> Self {
        Self { threshold: DEFAULT_THRESHOLD }
    }
}

impl TryFrom<f64> for ConfidencePolicy {
    type Error = IntentError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConfidencePolicy> for f64 {
    fn from(p: ConfidencePolicy) -> f64 {
        p.threshold
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::label::NUM_LABELS;

    fn prediction(label: Label, confidence: f64) -> Prediction {
        let rest = (1.0 - confidence) / (NUM_LABELS - 1) as f64;
        let mut distribution = [rest; NUM_LABELS];
        distribution[label.id()] = confidence;
        Prediction { predicted_label: label, confidence, distribution }
    }

    #[test]
    fn test_low_confidence_falls_back_to_unclear() {
        let policy = ConfidencePolicy::new(0.7).unwrap();
        assert_eq!(policy.decide(&prediction(Label::Save, 0.69)), Label::Unclear);
        assert_eq!(policy.decide(&prediction(Label::Save, 0.70)), Label::Save);
        assert_eq!(policy.decide(&prediction(Label::Save, 0.95)), Label::Save);
    }

    #[test]
    fn test_zero_threshold_is_pass_through() {
        let policy = ConfidencePolicy::new(0.0).unwrap();
        for label in Label::ALL {
            assert_eq!(policy.decide(&prediction(label, 0.2)), label);
        }
    }

    #[test]
    fn test_threshold_one_requires_certainty() {
        let policy = ConfidencePolicy::new(1.0).unwrap();
        assert_eq!(policy.decide(&prediction(Label::Search, 0.999)), Label::Unclear);
        assert_eq!(policy.decide(&prediction(Label::Search, 1.0)), Label::Search);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        assert!(matches!(
            ConfidencePolicy::new(1.5),
            Err(IntentError::ThresholdRange { value }) if value == 1.5
        ));
        assert!(ConfidencePolicy::new(-0.01).is_err());
        assert!(ConfidencePolicy::new(f64::NAN).is_err());
        assert!(serde_json::from_str::<ConfidencePolicy>("2.0").is_err());
    }

    // Re-applying the policy to its own output changes nothing. A forced
    // "unclear" keeps the raw (low) confidence, so it stays "unclear";
    // a passed-through label keeps its (high) confidence and passes again.
    #[test]
    fn test_decision_is_idempotent() {
        let policy = ConfidencePolicy::new(0.6).unwrap();
        for &conf in &[0.1, 0.59, 0.6, 0.9] {
            for label in Label::ALL {
                let once  = policy.adjust(prediction(label, conf));
                let again = Prediction {
                    predicted_label: once.final_label,
                    confidence:      once.raw.confidence,
                    distribution:    once.raw.distribution,
                };
                let twice = policy.decide(&again);
                assert_eq!(twice, once.final_label);
            }
        }
    }

    #[test]
    fn test_unclear_count_is_monotone_in_threshold() {
        let preds: Vec<Prediction> = [0.05, 0.3, 0.45, 0.5, 0.71, 0.8, 0.99, 1.0]
            .iter()
            .map(|&c| prediction(Label::Reminder, c))
            .collect();

        let mut previous = 0usize;
        for step in 0..=20 {
            let policy  = ConfidencePolicy::new(step as f64 / 20.0).unwrap();
            let unclear = preds.iter().filter(|p| policy.decide(p) == Label::Unclear).count();
            assert!(unclear >= previous);
            previous = unclear;
        }
        assert_eq!(previous, preds.len() - 1);
    }
}
