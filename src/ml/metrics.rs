// ============================================================
// Layer 5 — Classification Metrics
// ============================================================
// Confusion matrix and per-label precision / recall / F1 over
// the six intent labels.
//
//   rows    → true label
//   columns → predicted label
//
// A label with no support or no predictions reports 0.0, not NaN.
//
// Reference: scikit-learn classification_report definitions

use serde::{Serialize, Serializer};

use crate::domain::label::{Label, NUM_LABELS};

/// Confusion matrix over the label set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    /// Row-major `KxK` counts (`truth * K + predicted`).
    counts: Vec<u32>,
}

impl Default for ConfusionMatrix {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self { counts: vec![0; NUM_LABELS * NUM_LABELS] }
    }

    pub fn add(&mut self, truth: Label, predicted: Label) {
        let idx = truth.id() * NUM_LABELS + predicted.id();
        self.counts[idx] = self.counts[idx].saturating_add(1);
    }

    pub fn get(&self, truth: Label, predicted: Label) -> u32 {
        self.counts[truth.id() * NUM_LABELS + predicted.id()]
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().map(|&c| c as u64).sum()
    }

    /// One row per true label, columns by predicted label id.
    pub fn rows(&self) -> Vec<Vec<u32>> {
        self.counts.chunks(NUM_LABELS).map(<[u32]>::to_vec).collect()
    }
}

impl Serialize for ConfusionMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.rows().serialize(serializer)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
/// Precision/recall statistics for a single label.
pub struct LabelMetrics {
    pub label: Label,
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// `TP / (TP + FN)`; also the label's accuracy.
    pub recall: f64,
    pub f1: f64,
    /// Total number of true examples for the label.
    pub support: u32,
}

/// Compute per-label precision, recall and F1 from a confusion matrix.
pub fn precision_recall_by_label(cm: &ConfusionMatrix) -> Vec<LabelMetrics> {
    Label::ALL
        .iter()
        .map(|&label| {
            let tp = cm.get(label, label) as f64;
            let mut fp = 0f64;
            let mut fn_ = 0f64;
            let mut support = 0u32;
            for &other in Label::ALL.iter() {
                let v = cm.get(label, other);
                support = support.saturating_add(v);
                if other != label {
                    fn_ += v as f64;
                    fp += cm.get(other, label) as f64;
                }
            }
            let precision = if tp + fp == 0.0 { 0.0 } else { tp / (tp + fp) };
            let recall = if tp + fn_ == 0.0 { 0.0 } else { tp / (tp + fn_) };
            let f1 = if precision + recall == 0.0 {
                0.0
            } else {
                2.0 * precision * recall / (precision + recall)
            };
            LabelMetrics { label, precision, recall, f1, support }
        })
        .collect()
}

/// Overall accuracy from a confusion matrix.
pub fn accuracy(cm: &ConfusionMatrix) -> f64 {
    let total = cm.total();
    if total == 0 {
        return 0.0;
    }
    let correct: u64 = Label::ALL.iter().map(|&l| cm.get(l, l) as u64).sum();
    correct as f64 / total as f64
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precision_recall_and_f1() {
        let mut cm = ConfusionMatrix::new();
        // save: 3 right, 1 predicted as search
        for _ in 0..3 {
            cm.add(Label::Save, Label::Save);
        }
        cm.add(Label::Save, Label::Search);
        // search: 1 right
        cm.add(Label::Search, Label::Search);

        let stats = precision_recall_by_label(&cm);
        let save = &stats[Label::Save.id()];
        assert_eq!(save.support, 4);
        assert!((save.precision - 1.0).abs() < 1e-12);
        assert!((save.recall - 0.75).abs() < 1e-12);

        let search = &stats[Label::Search.id()];
        assert!((search.precision - 0.5).abs() < 1e-12);
        assert!((search.recall - 1.0).abs() < 1e-12);
        assert!((search.f1 - 2.0 / 3.0).abs() < 1e-12);

        // unseen labels report zeros instead of NaN
        let unclear = &stats[Label::Unclear.id()];
        assert_eq!((unclear.precision, unclear.recall, unclear.f1, unclear.support), (0.0, 0.0, 0.0, 0));

        assert!((accuracy(&cm) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn test_rows_are_indexed_by_truth() {
        let mut cm = ConfusionMatrix::new();
        cm.add(Label::Reminder, Label::CancelAll);
        let rows = cm.rows();
        assert_eq!(rows.len(), NUM_LABELS);
        assert_eq!(rows[Label::Reminder.id()][Label::CancelAll.id()], 1);
        assert_eq!(cm.total(), 1);
        assert_eq!(accuracy(&ConfusionMatrix::new()), 0.0);
    }
}
