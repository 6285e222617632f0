// ============================================================
// Layer 5 — Evaluator
// ============================================================
// Scores a Predictor on labelled datasets. Never trains.
//
//   dataset ──predict (batched)──▶ ScoredExample per row
//                                   (raw prediction + policy label)
//                       │
//                       ▼
//   EvaluationReport
//     raw_accuracy         predicted_label == true label
//     adjusted_accuracy    policy.decide(prediction) == true label
//     per_label            precision / recall / F1 / support (raw)
//     confusion_matrix     rows = true, columns = raw predicted
//     misclassified        raw errors with their confidence
//     error_breakdown      errors grouped "true -> predicted",
//                          largest group first
//     low_confidence_count confidence < threshold
//
// Combined evaluation scores every named dataset on its own and
// then builds one pooled report over the concatenation of all
// scored rows, so larger datasets weigh proportionally more.
//
// Reference: scikit-learn classification_report / confusion_matrix

use serde::Serialize;

use crate::domain::error::IntentError;
use crate::domain::example::{Corpus, Example};
use crate::domain::label::Label;
use crate::domain::policy::ConfidencePolicy;
use crate::domain::prediction::AdjustedPrediction;
use crate::domain::traits::Predictor;
use crate::ml::metrics::{accuracy, precision_recall_by_label, ConfusionMatrix, LabelMetrics};

/// Example texts kept per error group.
pub const ERROR_EXAMPLES_PER_GROUP: usize = 5;

/// Name of the pooled report in a combined evaluation.
pub const POOLED_NAME: &str = "combined";

/// One dataset row after prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredExample {
    pub text:       String,
    pub true_label: Label,
    pub prediction: AdjustedPrediction,
}

impl ScoredExample {
    pub fn is_correct(&self) -> bool {
        self.prediction.raw.predicted_label == self.true_label
    }

    pub fn is_correct_adjusted(&self) -> bool {
        self.prediction.final_label == self.true_label
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Misclassification {
    pub text:            String,
    pub true_label:      Label,
    pub predicted_label: Label,
    pub confidence:      f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorExample {
    pub text:       String,
    pub confidence: f64,
}

/// All errors sharing one (true, predicted) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorGroup {
    pub true_label:      Label,
    pub predicted_label: Label,
    pub count:           usize,
    /// First few errors of the group, in dataset order.
    pub examples:        Vec<ErrorExample>,
}

impl ErrorGroup {
    /// "true -> predicted"
    pub fn key(&self) -> String {
        format!("{} -> {}", self.true_label, self.predicted_label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub dataset:              String,
    pub total:                usize,
    pub correct:              usize,
    pub correct_adjusted:     usize,
    pub raw_accuracy:         f64,
    pub adjusted_accuracy:    f64,
    pub threshold:            f64,
    pub low_confidence_count: usize,
    pub per_label:            Vec<LabelMetrics>,
    pub confusion_matrix:     ConfusionMatrix,
    pub misclassified:        Vec<Misclassification>,
    pub error_breakdown:      Vec<ErrorGroup>,
}

impl EvaluationReport {
    pub fn from_scored(
        dataset: impl Into<String>,
        scored:  &[ScoredExample],
        policy:  &ConfidencePolicy,
    ) -> Self {
        let mut confusion = ConfusionMatrix::new();
        let mut correct_adjusted     = 0usize;
        let mut low_confidence_count = 0usize;
        let mut misclassified        = Vec::new();

        for row in scored {
            let raw = &row.prediction.raw;
            confusion.add(row.true_label, raw.predicted_label);

            if row.is_correct_adjusted() {
                correct_adjusted += 1;
            }
            if policy.is_low_confidence(raw) {
                low_confidence_count += 1;
            }
            if !row.is_correct() {
                misclassified.push(Misclassification {
                    text:            row.text.clone(),
                    true_label:      row.true_label,
                    predicted_label: raw.predicted_label,
                    confidence:      raw.confidence,
                });
            }
        }

        let total   = scored.len();
        let correct = total - misclassified.len();
        let adjusted_accuracy = if total == 0 { 0.0 } else { correct_adjusted as f64 / total as f64 };

        Self {
            dataset: dataset.into(),
            total,
            correct,
            correct_adjusted,
            raw_accuracy: accuracy(&confusion),
            adjusted_accuracy,
            threshold: policy.threshold(),
            low_confidence_count,
            per_label: precision_recall_by_label(&confusion),
            error_breakdown: group_errors(&misclassified),
            confusion_matrix: confusion,
            misclassified,
        }
    }
}

/// Group errors by (true, predicted), largest group first. Groups of
/// equal size keep the order in which they first appeared.
pub fn group_errors(errors: &[Misclassification]) -> Vec<ErrorGroup> {
    let mut groups: Vec<ErrorGroup> = Vec::new();

    for e in errors {
        let pos = groups
            .iter()
            .position(|g| g.true_label == e.true_label && g.predicted_label == e.predicted_label);
        let group = match pos {
            Some(i) => &mut groups[i],
            None => {
                groups.push(ErrorGroup {
                    true_label:      e.true_label,
                    predicted_label: e.predicted_label,
                    count:           0,
                    examples:        Vec::new(),
                });
                let last = groups.len() - 1;
                &mut groups[last]
            }
        };
        group.count += 1;
        if group.examples.len() < ERROR_EXAMPLES_PER_GROUP {
            group.examples.push(ErrorExample { text: e.text.clone(), confidence: e.confidence });
        }
    }

    // sort_by is stable
    groups.sort_by(|a, b| b.count.cmp(&a.count));
    groups
}

/// Per-dataset reports plus the report over their union.
#[derive(Debug, Clone, Serialize)]
pub struct CombinedReport {
    pub datasets: Vec<EvaluationReport>,
    pub pooled:   EvaluationReport,
}

pub struct Evaluator {
    policy:     ConfidencePolicy,
    batch_size: usize,
}

impl Evaluator {
    pub fn new(policy: ConfidencePolicy, batch_size: usize) -> Result<Self, IntentError> {
        if batch_size == 0 {
            return Err(IntentError::invalid_config("batch_size", "must be at least 1"));
        }
        Ok(Self { policy, batch_size })
    }

    /// Predict every example, in dataset order.
    pub fn score<P: Predictor + ?Sized>(
        &self,
        model:    &P,
        examples: &[Example],
    ) -> Result<Vec<ScoredExample>, IntentError> {
        let mut scored = Vec::with_capacity(examples.len());

        for chunk in examples.chunks(self.batch_size) {
            let texts: Vec<&str> = chunk.iter().map(|ex| ex.text.as_str()).collect();
            let preds = model.predict(&texts)?;
            if preds.len() != chunk.len() {
                return Err(anyhow::anyhow!(
                    "classifier returned {} predictions for {} texts",
                    preds.len(),
                    chunk.len()
                )
                .into());
            }
            scored.extend(chunk.iter().zip(preds).map(|(ex, pred)| ScoredExample {
                text:       ex.text.clone(),
                true_label: ex.label,
                prediction: self.policy.adjust(pred),
            }));
        }

        Ok(scored)
    }

    pub fn evaluate<P: Predictor + ?Sized>(
        &self,
        model:   &P,
        name:    &str,
        dataset: &Corpus,
    ) -> Result<EvaluationReport, IntentError> {
        let scored = self.score(model, dataset.examples())?;
        let report = EvaluationReport::from_scored(name, &scored, &self.policy);
        log_summary(&report);
        Ok(report)
    }

    /// Evaluate each named dataset, then pool all rows into one report.
    pub fn evaluate_combined<P: Predictor + ?Sized>(
        &self,
        model:    &P,
        datasets: &[(String, Corpus)],
    ) -> Result<CombinedReport, IntentError> {
        if datasets.is_empty() {
            return Err(IntentError::invalid_config("datasets", "no evaluation dataset is available"));
        }

        let mut reports = Vec::with_capacity(datasets.len());
        let mut pooled  = Vec::new();

        for (name, corpus) in datasets {
            let scored = self.score(model, corpus.examples())?;
            let report = EvaluationReport::from_scored(name.as_str(), &scored, &self.policy);
            log_summary(&report);
            reports.push(report);
            pooled.extend(scored);
        }

        let pooled = EvaluationReport::from_scored(POOLED_NAME, &pooled, &self.policy);
        log_summary(&pooled);

        Ok(CombinedReport { datasets: reports, pooled })
    }
}

fn log_summary(report: &EvaluationReport) {
    tracing::info!(
        "[{}] {} examples | raw={:.2}% | adjusted={:.2}% (threshold {}) | low confidence: {}",
        report.dataset,
        report.total,
        report.raw_accuracy * 100.0,
        report.adjusted_accuracy * 100.0,
        report.threshold,
        report.low_confidence_count,
    );
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::test_support::{prediction_for, TablePredictor};
    use std::collections::HashMap;

    /// Dataset of `n` rows of `label`, the first `correct` predicted right,
    /// the rest predicted as `wrong`. Texts are prefixed to stay unique.
    fn dataset(
        prefix:  &str,
        label:   Label,
        n:       usize,
        correct: usize,
        wrong:   Label,
        table:   &mut HashMap<String, crate::domain::prediction::Prediction>,
    ) -> Corpus {
        (0..n)
            .map(|i| {
                let text = format!("{prefix} {i}");
                let pred = if i < correct { label } else { wrong };
                table.insert(text.clone(), prediction_for(pred, 0.9));
                Example::new(text, label)
            })
            .collect()
    }

    fn evaluator() -> Evaluator {
        Evaluator::new(ConfidencePolicy::default(), 4).unwrap()
    }

    #[test]
    fn test_pooled_accuracy_is_recomputed_over_the_union() {
        let mut table = HashMap::new();
        let a = dataset("a", Label::Save, 10, 8, Label::Search, &mut table);
        let b = dataset("b", Label::Reminder, 5, 5, Label::Search, &mut table);
        let model = TablePredictor { table };

        let report = evaluator()
            .evaluate_combined(&model, &[("a".to_string(), a), ("b".to_string(), b)])
            .unwrap();

        assert!((report.datasets[0].raw_accuracy - 0.8).abs() < 1e-12);
        assert!((report.datasets[1].raw_accuracy - 1.0).abs() < 1e-12);
        assert_eq!(report.pooled.total, 15);
        assert!((report.pooled.raw_accuracy - 13.0 / 15.0).abs() < 1e-12);
        assert!((report.pooled.raw_accuracy - 0.9).abs() > 1e-3);
        assert_eq!(report.pooled.dataset, POOLED_NAME);
    }

    #[test]
    fn test_report_counts_and_confusion() {
        let mut table = HashMap::new();
        let corpus = dataset("x", Label::CancelAll, 6, 4, Label::CancelSpecific, &mut table);
        let model  = TablePredictor { table };

        let report = evaluator().evaluate(&model, "x", &corpus).unwrap();
        assert_eq!((report.total, report.correct), (6, 4));
        assert_eq!(report.misclassified.len(), 2);
        assert_eq!(report.confusion_matrix.get(Label::CancelAll, Label::CancelSpecific), 2);
        let cancel_all = &report.per_label[Label::CancelAll.id()];
        assert_eq!(cancel_all.support, 6);
        assert!((cancel_all.recall - 4.0 / 6.0).abs() < 1e-12);
        assert_eq!(report.low_confidence_count, 0);
        assert!((report.adjusted_accuracy - report.raw_accuracy).abs() < 1e-12);
    }

    #[test]
    fn test_low_confidence_rows_fall_back_to_unclear() {
        let mut table = HashMap::new();
        table.insert("maybe".to_string(), prediction_for(Label::Save, 0.5));
        table.insert("sure".to_string(), prediction_for(Label::Save, 0.95));
        table.insert("vague".to_string(), prediction_for(Label::Search, 0.4));
        let corpus: Corpus = vec![
            Example::new("maybe", Label::Save),
            Example::new("sure", Label::Save),
            Example::new("vague", Label::Unclear),
        ]
        .into_iter()
        .collect();

        let report = evaluator().evaluate(&TablePredictor { table }, "adv", &corpus).unwrap();
        assert_eq!(report.low_confidence_count, 2);
        // raw: only "sure" is right; adjusted: "sure" and "vague"
        assert_eq!(report.correct, 1);
        assert_eq!(report.correct_adjusted, 2);
    }

    #[test]
    fn test_error_groups_sorted_by_size_with_capped_examples() {
        let err = |t: &str, truth: Label, pred: Label| Misclassification {
            text:            t.to_string(),
            true_label:      truth,
            predicted_label: pred,
            confidence:      0.8,
        };
        let mut errors = vec![err("r", Label::Reminder, Label::Save)];
        for i in 0..7 {
            errors.push(err(&format!("s{i}"), Label::Search, Label::Save));
        }
        errors.push(err("c", Label::CancelAll, Label::Unclear));
        errors.push(err("c2", Label::CancelAll, Label::Unclear));

        let groups = group_errors(&errors);
        let keys: Vec<String> = groups.iter().map(ErrorGroup::key).collect();
        assert_eq!(keys, vec!["search -> save", "cancel_all -> unclear", "reminder -> save"]);
        assert_eq!(groups[0].count, 7);
        assert_eq!(groups[0].examples.len(), ERROR_EXAMPLES_PER_GROUP);
        assert_eq!(groups[0].examples[0].text, "s0");
    }

    #[test]
    fn test_empty_dataset_list_is_rejected() {
        let model = TablePredictor { table: HashMap::new() };
        assert!(matches!(
            evaluator().evaluate_combined(&model, &[]),
            Err(IntentError::InvalidConfig { field: "datasets", .. })
        ));
    }
}
