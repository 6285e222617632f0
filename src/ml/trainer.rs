// ============================================================
// Layer 5 — Fold Trainer
// ============================================================
// Trains one classifier on one fold and returns the parameters
// of its best validation epoch.
//
// Per-fold state machine:
//
//   Training(0) ──epoch──▶ Training(1) ──▶ ... ──▶ Training(e)
//        │                                           │
//        │ patience consecutive stale epochs         │ e + 1 == max_epochs
//        ▼                                           ▼
//   EarlyStopped                               MaxEpochsReached
//
// Each epoch:
//   1. shuffle the training subset (seeded per fold)
//   2. one train_step per mini-batch, mean loss over batches
//   3. predict the validation subset, raw and adjusted accuracy
//   4. EarlyStopping::observe → maybe snapshot, maybe stop
//
// Early stopping keeps two records:
//   anchor → score of the last epoch that beat the previous
//            anchor by at least min_delta. Drives patience.
//   best   → highest score seen so far plus its snapshot.
//            A gain smaller than min_delta still replaces the
//            snapshot but counts as a stale epoch.
// So the returned snapshot always scores the maximum validation
// accuracy of all epochs run, and patience still follows the
// min_delta rule.
//
// Reference: Prechelt (1998) Early Stopping — But When?
//            Burn Book §5 (Custom Training Loop)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::error::IntentError;
use crate::domain::example::Example;
use crate::domain::policy::ConfidencePolicy;
use crate::domain::traits::{Classifier, Predictor};
use crate::infra::metrics::EpochMetrics;

// ─── Configuration ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldTrainerConfig {
    pub max_epochs: usize,
    pub patience:   usize,
    pub min_delta:  f64,
    pub batch_size: usize,
    /// Base seed; fold `f` shuffles with `seed + f`.
    pub seed:       u64,
}

impl Default for FoldTrainerConfig {
    fn default() -> Self {
        Self { max_epochs: 15, patience: 3, min_delta: 0.001, batch_size: 16, seed: 42 }
    }
}

impl FoldTrainerConfig {
    pub fn validate(&self) -> Result<(), IntentError> {
        if self.max_epochs == 0 {
            return Err(IntentError::invalid_config("max_epochs", "must be at least 1"));
        }
        if self.patience == 0 {
            return Err(IntentError::invalid_config("patience", "must be at least 1"));
        }
        if !self.min_delta.is_finite() || self.min_delta < 0.0 {
            return Err(IntentError::invalid_config(
                "min_delta",
                format!("must be a finite value >= 0, got {}", self.min_delta),
            ));
        }
        if self.batch_size == 0 {
            return Err(IntentError::invalid_config("batch_size", "must be at least 1"));
        }
        Ok(())
    }
}

// ─── State ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldState {
    /// About to run the given 0-based epoch.
    Training(usize),
    EarlyStopped,
    MaxEpochsReached,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    EarlyStopped,
    MaxEpochsReached,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EarlyStopped     => write!(f, "early_stopped"),
            StopReason::MaxEpochsReached => write!(f, "max_epochs_reached"),
        }
    }
}

// ─── Early Stopping ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct BestCheckpoint<S> {
    pub score:    f64,
    pub epoch:    usize,
    pub snapshot: S,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpochVerdict {
    Improved,
    Stale { stale_count: usize },
    Stop,
}

#[derive(Debug, Clone)]
pub struct EarlyStopping<S> {
    patience:    usize,
    min_delta:   f64,
    anchor:      Option<f64>,
    stale_count: usize,
    best:        Option<BestCheckpoint<S>>,
}

impl<S> EarlyStopping<S> {
    pub fn new(patience: usize, min_delta: f64) -> Self {
        Self { patience, min_delta, anchor: None, stale_count: 0, best: None }
    }

    /// Record one epoch's validation score. `snapshot` is only
    /// called when the score becomes the new best.
    pub fn observe(&mut self, epoch: usize, score: f64, snapshot: impl FnOnce() -> S) -> EpochVerdict {
        let improved = self.anchor.map_or(true, |a| score >= a + self.min_delta);

        if improved {
            self.anchor      = Some(score);
            self.stale_count = 0;
            self.best        = Some(BestCheckpoint { score, epoch, snapshot: snapshot() });
            return EpochVerdict::Improved;
        }

        if self.best.as_ref().map_or(true, |b| score > b.score) {
            self.best = Some(BestCheckpoint { score, epoch, snapshot: snapshot() });
        }

        self.stale_count += 1;
        if self.stale_count >= self.patience {
            EpochVerdict::Stop
        } else {
            EpochVerdict::Stale { stale_count: self.stale_count }
        }
    }

    pub fn stale_count(&self) -> usize {
        self.stale_count
    }

    pub fn best(&self) -> Option<&BestCheckpoint<S>> {
        self.best.as_ref()
    }

    pub fn into_best(self) -> Option<BestCheckpoint<S>> {
        self.best
    }
}

// ─── Results ──────────────────────────────────────────────────────────────────

/// Outcome of one fold, including the best parameters.
#[derive(Debug, Clone)]
pub struct FoldResult<S> {
    pub fold_id:                  usize,
    pub best_validation_accuracy: f64,
    /// 0-based epoch that produced the best snapshot.
    pub best_epoch:               usize,
    pub epochs_trained:           usize,
    pub stop_reason:              StopReason,
    pub history:                  Vec<EpochMetrics>,
    pub model_snapshot:           S,
}

/// A FoldResult without its snapshot, for reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoldSummary {
    pub fold_id:                  usize,
    pub best_validation_accuracy: f64,
    pub best_epoch:               usize,
    pub epochs_trained:           usize,
    pub stop_reason:              StopReason,
    pub history:                  Vec<EpochMetrics>,
}

impl<S> FoldResult<S> {
    pub fn summary(&self) -> FoldSummary {
        FoldSummary {
            fold_id:                  self.fold_id,
            best_validation_accuracy: self.best_validation_accuracy,
            best_epoch:               self.best_epoch,
            epochs_trained:           self.epochs_trained,
            stop_reason:              self.stop_reason,
            history:                  self.history.clone(),
        }
    }
}

// ─── Trainer ──────────────────────────────────────────────────────────────────

pub struct FoldTrainer {
    config: FoldTrainerConfig,
    policy: ConfidencePolicy,
}

impl FoldTrainer {
    pub fn new(config: FoldTrainerConfig, policy: ConfidencePolicy) -> Result<Self, IntentError> {
        config.validate()?;
        Ok(Self { config, policy })
    }

    /// Train `model` on `train` and early-stop on `validation`.
    /// On return the model holds its best-epoch parameters too.
    pub fn train<C: Classifier>(
        &self,
        fold_id:    usize,
        model:      &mut C,
        train:      &[&Example],
        validation: &[&Example],
    ) -> Result<FoldResult<C::Snapshot>, IntentError> {
        if train.is_empty() {
            return Err(IntentError::EmptySplit { fold: fold_id, subset: "train" });
        }
        if validation.is_empty() {
            return Err(IntentError::EmptySplit { fold: fold_id, subset: "validation" });
        }

        let cfg     = &self.config;
        let mut rng = StdRng::seed_from_u64(cfg.seed.wrapping_add(fold_id as u64));
        let mut order: Vec<usize> = (0..train.len()).collect();

        let mut stopper = EarlyStopping::new(cfg.patience, cfg.min_delta);
        let mut history = Vec::new();
        let mut state   = FoldState::Training(0);

        while let FoldState::Training(epoch) = state {

            // ── Training phase ────────────────────────────────────────────────
            order.shuffle(&mut rng);

            let mut loss_sum = 0.0f64;
            let mut batches  = 0usize;
            for chunk in order.chunks(cfg.batch_size) {
                let batch: Vec<&Example> = chunk.iter().map(|&i| train[i]).collect();
                let loss = model.train_step(&batch)?;
                if !loss.is_finite() {
                    return Err(IntentError::DivergedTraining {
                        fold: fold_id, epoch, metric: "train_loss", value: loss,
                    });
                }
                loss_sum += loss;
                batches  += 1;
            }
            let train_loss = loss_sum / batches as f64;

            // ── Validation phase ──────────────────────────────────────────────
            let (val_accuracy, val_accuracy_adjusted) = self.validate(&*model, validation)?;
            if !val_accuracy.is_finite() {
                return Err(IntentError::DivergedTraining {
                    fold: fold_id, epoch, metric: "val_accuracy", value: val_accuracy,
                });
            }

            tracing::info!(
                "Fold {} epoch {:>2}/{} | train_loss={:.4} | val_acc={:.2}% | val_acc_adjusted={:.2}%",
                fold_id + 1,
                epoch + 1,
                cfg.max_epochs,
                train_loss,
                val_accuracy * 100.0,
                val_accuracy_adjusted * 100.0,
            );

            history.push(EpochMetrics {
                fold: fold_id,
                epoch,
                train_loss,
                val_accuracy,
                val_accuracy_adjusted,
            });

            // ── Early stopping ────────────────────────────────────────────────
            let verdict = stopper.observe(epoch, val_accuracy, || model.snapshot());
            state = match verdict {
                EpochVerdict::Stop => {
                    tracing::info!(
                        "Fold {}: early stopping after epoch {} ({} stale epochs)",
                        fold_id + 1,
                        epoch + 1,
                        stopper.stale_count(),
                    );
                    FoldState::EarlyStopped
                }
                _ if epoch + 1 >= cfg.max_epochs => FoldState::MaxEpochsReached,
                verdict => {
                    if let Some(best) = stopper.best() {
                        match verdict {
                            EpochVerdict::Improved => {
                                tracing::debug!("Fold {}: new best val_acc={:.4}", fold_id + 1, best.score);
                            }
                            EpochVerdict::Stale { stale_count } => {
                                tracing::debug!(
                                    "Fold {}: no improvement ({}/{}), best val_acc={:.4} at epoch {}",
                                    fold_id + 1,
                                    stale_count,
                                    cfg.patience,
                                    best.score,
                                    best.epoch + 1,
                                );
                            }
                            EpochVerdict::Stop => {}
                        }
                    }
                    FoldState::Training(epoch + 1)
                }
            };
        }

        let stop_reason = match state {
            FoldState::EarlyStopped => StopReason::EarlyStopped,
            _                       => StopReason::MaxEpochsReached,
        };
        let epochs_trained = history.len();

        // At least one epoch ran, so a best checkpoint always exists.
        let best = stopper.into_best().ok_or_else(|| {
            IntentError::from(anyhow::anyhow!("fold {} finished without a checkpoint", fold_id))
        })?;
        model.restore(best.snapshot.clone());

        tracing::info!(
            "Fold {} done: best val_acc={:.2}% at epoch {} ({}, {} epochs)",
            fold_id + 1,
            best.score * 100.0,
            best.epoch + 1,
            stop_reason,
            epochs_trained,
        );

        Ok(FoldResult {
            fold_id,
            best_validation_accuracy: best.score,
            best_epoch: best.epoch,
            epochs_trained,
            stop_reason,
            history,
            model_snapshot: best.snapshot,
        })
    }

    /// (raw accuracy, accuracy after the confidence fallback)
    fn validate<P: Predictor>(&self, model: &P, validation: &[&Example]) -> Result<(f64, f64), IntentError> {
        let mut correct     = 0usize;
        let mut correct_adj = 0usize;

        for chunk in validation.chunks(self.config.batch_size) {
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
            for (ex, pred) in chunk.iter().zip(&preds) {
                if pred.predicted_label == ex.label {
                    correct += 1;
                }
                if self.policy.decide(pred) == ex.label {
                    correct_adj += 1;
                }
            }
        }

        let n = validation.len() as f64;
        Ok((correct as f64 / n, correct_adj as f64 / n))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::example::Corpus;
    use crate::ml::test_support::{labelled_corpus, ScriptedClassifier};

    fn refs(corpus: &Corpus) -> Vec<&Example> {
        corpus.examples().iter().collect()
    }

    fn trainer(max_epochs: usize, patience: usize, min_delta: f64) -> FoldTrainer {
        let cfg = FoldTrainerConfig { max_epochs, patience, min_delta, batch_size: 1000, seed: 7 };
        FoldTrainer::new(cfg, ConfidencePolicy::default()).unwrap()
    }

    #[test]
    fn test_early_stopping_counts_stale_epochs() {
        let mut es: EarlyStopping<usize> = EarlyStopping::new(2, 0.001);
        assert_eq!(es.observe(0, 0.5, || 0), EpochVerdict::Improved);
        assert_eq!(es.observe(1, 0.5, || 1), EpochVerdict::Stale { stale_count: 1 });
        assert_eq!(es.observe(2, 0.5, || 2), EpochVerdict::Stop);
        assert_eq!(es.best().unwrap().epoch, 0);
    }

    #[test]
    fn test_sub_delta_gain_updates_snapshot_but_stays_stale() {
        let mut es: EarlyStopping<usize> = EarlyStopping::new(3, 0.01);
        es.observe(0, 0.800, || 0);
        assert_eq!(es.observe(1, 0.805, || 1), EpochVerdict::Stale { stale_count: 1 });
        let best = es.best().unwrap();
        assert_eq!((best.epoch, best.snapshot), (1, 1));
        assert!((best.score - 0.805).abs() < 1e-12);
        // 0.810 >= 0.800 + 0.01: a real improvement resets patience
        assert_eq!(es.observe(2, 0.810, || 2), EpochVerdict::Improved);
        assert_eq!(es.stale_count(), 0);
    }

    #[test]
    fn test_flat_scores_stop_after_patience_plus_one_epochs() {
        let corpus = labelled_corpus(12);
        let data   = refs(&corpus);
        let mut m  = ScriptedClassifier::new(vec![0.5, 0.5, 0.5, 0.5], data.len(), 1000);

        let result = trainer(10, 2, 0.001).train(0, &mut m, &data, &data).unwrap();
        assert_eq!(result.epochs_trained, 3);
        assert_eq!(result.stop_reason, StopReason::EarlyStopped);
        assert_eq!(result.best_epoch, 0);
        assert_eq!(result.model_snapshot, 0);
        assert!((result.best_validation_accuracy - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_returned_snapshot_is_the_best_epoch() {
        let corpus = labelled_corpus(12);
        let data   = refs(&corpus);
        let scores = vec![0.25, 0.75, 0.5, 0.5, 0.5];
        let mut m  = ScriptedClassifier::new(scores, data.len(), 1000);

        let result = trainer(10, 3, 0.001).train(0, &mut m, &data, &data).unwrap();
        assert_eq!(result.epochs_trained, 5);
        assert_eq!(result.best_epoch, 1);
        assert_eq!(result.model_snapshot, 1);
        assert!((result.best_validation_accuracy - 0.75).abs() < 1e-12);

        let max = result.history.iter().map(|h| h.val_accuracy).fold(f64::MIN, f64::max);
        assert!((result.best_validation_accuracy - max).abs() < 1e-12);
        // the model itself is rolled back as well
        assert_eq!(m.restored(), Some(1));
    }

    #[test]
    fn test_max_epochs_reached_when_always_improving() {
        let corpus = labelled_corpus(12);
        let data   = refs(&corpus);
        let mut m  = ScriptedClassifier::new(vec![0.25, 0.5, 0.75], data.len(), 1000);

        let result = trainer(3, 2, 0.001).train(0, &mut m, &data, &data).unwrap();
        assert_eq!(result.epochs_trained, 3);
        assert_eq!(result.stop_reason, StopReason::MaxEpochsReached);
        assert_eq!(result.best_epoch, 2);
        assert_eq!(result.history.len(), 3);
        assert_eq!(result.history[2].epoch, 2);
    }

    #[test]
    fn test_nan_loss_is_reported_as_divergence() {
        let corpus = labelled_corpus(12);
        let data   = refs(&corpus);
        let mut m  = ScriptedClassifier::new(vec![0.5, 0.6, 0.7], data.len(), 1000)
            .with_nan_loss_at(1);

        let err = trainer(5, 2, 0.001).train(3, &mut m, &data, &data).unwrap_err();
        match err {
            IntentError::DivergedTraining { fold, epoch, metric, value } => {
                assert_eq!((fold, epoch, metric), (3, 1, "train_loss"));
                assert!(value.is_nan());
            }
            other => panic!("expected DivergedTraining, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_validation_subset_is_rejected() {
        let corpus = labelled_corpus(12);
        let data   = refs(&corpus);
        let mut m  = ScriptedClassifier::new(vec![0.5], data.len(), 1000);

        let err = trainer(5, 2, 0.001).train(0, &mut m, &data, &[]).unwrap_err();
        assert!(matches!(err, IntentError::EmptySplit { fold: 0, subset: "validation" }));
    }

    #[test]
    fn test_adjusted_accuracy_counts_fallbacks() {
        // Confidence 0.6 < 0.7: every prediction falls back to unclear.
        let corpus = labelled_corpus(12);
        let data   = refs(&corpus);
        let mut m  = ScriptedClassifier::new(vec![1.0], data.len(), 1000).with_confidence(0.6);

        let result = trainer(1, 1, 0.0).train(0, &mut m, &data, &data).unwrap();
        let h = &result.history[0];
        assert!((h.val_accuracy - 1.0).abs() < 1e-12);
        // only the two true `unclear` examples survive the fallback
        assert!((h.val_accuracy_adjusted - 2.0 / 12.0).abs() < 1e-12);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let cfg = FoldTrainerConfig { patience: 0, ..FoldTrainerConfig::default() };
        assert!(matches!(
            FoldTrainer::new(cfg, ConfidencePolicy::default()),
            Err(IntentError::InvalidConfig { field: "patience", .. })
        ));
    }
}
