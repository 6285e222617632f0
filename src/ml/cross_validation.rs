// ============================================================
// Layer 5 — Cross-Validation Orchestrator
// ============================================================
// Runs k folds sequentially and selects the overall winner.
//
//   StratifiedKFold::split(corpus)        (fails before training
//        │                                 if a label has < k rows)
//        ▼
//   for fold in 0..k:
//       factory.create(fold)  → fresh classifier
//       FoldTrainer::train    → FoldResult (best snapshot)
//       sink.persist_fold     → fold_{n}_best on disk
//       keep snapshot only if strictly better than the current best
//       classifier dropped    → its resources are released
//
// Selection: highest best_validation_accuracy wins; on a tie the
// earlier fold stays the winner. Only one snapshot (the current
// winner's) is held in memory at any time.
//
// Reference: Kohavi (1995) A Study of Cross-Validation
//            scikit-learn StratifiedKFold

use serde::{Deserialize, Serialize};

use crate::data::folds::StratifiedKFold;
use crate::domain::error::IntentError;
use crate::domain::example::Corpus;
use crate::domain::traits::{CheckpointSink, Classifier, ClassifierFactory};
use crate::infra::metrics::ScoreStats;
use crate::ml::trainer::{FoldSummary, FoldTrainer};

type SnapshotOf<F> = <<F as ClassifierFactory>::Model as Classifier>::Snapshot;

/// What happens when one fold fails during training.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldFailurePolicy {
    /// The first failing fold aborts the whole run.
    #[default]
    FailFast,
    /// Failing folds are recorded and skipped.
    SkipFailed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossValidationConfig {
    pub k:              usize,
    pub seed:           u64,
    pub failure_policy: FoldFailurePolicy,
}

impl Default for CrossValidationConfig {
    fn default() -> Self {
        Self { k: 5, seed: 42, failure_policy: FoldFailurePolicy::FailFast }
    }
}

/// A fold skipped under FoldFailurePolicy::SkipFailed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedFold {
    pub fold_id: usize,
    pub error:   String,
}

/// Winner of the run plus the per-fold results for reporting.
#[derive(Debug, Clone)]
pub struct CrossValidationOutcome<S> {
    pub best_fold_id:             usize,
    pub best_validation_accuracy: f64,
    pub best_snapshot:            S,
    /// Successful folds in fold order.
    pub folds:                    Vec<FoldSummary>,
    pub failed:                   Vec<FailedFold>,
}

impl<S> CrossValidationOutcome<S> {
    pub fn scores(&self) -> Vec<f64> {
        self.folds.iter().map(|f| f.best_validation_accuracy).collect()
    }

    /// Mean and population std of the successful folds' best accuracies.
    pub fn score_stats(&self) -> ScoreStats {
        ScoreStats::from_scores(&self.scores())
    }
}

pub struct CrossValidator {
    config:  CrossValidationConfig,
    folds:   StratifiedKFold,
    trainer: FoldTrainer,
}

impl CrossValidator {
    pub fn new(config: CrossValidationConfig, trainer: FoldTrainer) -> Result<Self, IntentError> {
        let folds = StratifiedKFold::new(config.k, config.seed)?;
        Ok(Self { config, folds, trainer })
    }

    /// Fails when some label has fewer examples than folds. `run`
    /// repeats the check; callers use this to fail before writing
    /// anything for the run.
    pub fn check_pool(&self, corpus: &Corpus) -> Result<(), IntentError> {
        self.folds.check_sufficient(corpus)
    }

    pub fn run<F, K>(
        &self,
        corpus:  &Corpus,
        factory: &F,
        sink:    &K,
    ) -> Result<CrossValidationOutcome<SnapshotOf<F>>, IntentError>
    where
        F: ClassifierFactory,
        K: CheckpointSink<SnapshotOf<F>> + ?Sized,
    {
        let splits = self.folds.split(corpus)?;
        let k      = splits.len();
        tracing::info!("Starting {}-fold cross-validation on {} examples", k, corpus.len());

        let mut best: Option<(usize, f64, SnapshotOf<F>)> = None;
        let mut folds  = Vec::with_capacity(k);
        let mut failed = Vec::new();

        for split in &splits {
            let fold_id = split.fold_id;
            tracing::info!(
                "Fold {}/{}: {} train / {} validation examples",
                fold_id + 1,
                k,
                split.train.len(),
                split.validation.len(),
            );

            let trained = factory
                .create(fold_id, split.train.len())
                .map_err(IntentError::from)
                .and_then(|mut model| {
                    self.trainer.train(fold_id, &mut model, &split.train, &split.validation)
                });

            let result = match trained {
                Ok(result) => result,
                Err(err) if self.config.failure_policy == FoldFailurePolicy::SkipFailed => {
                    tracing::warn!("Fold {} failed and is skipped: {}", fold_id + 1, err);
                    failed.push(FailedFold { fold_id, error: err.to_string() });
                    continue;
                }
                Err(err) => return Err(err),
            };

            sink.persist_fold(fold_id, &result.model_snapshot)?;
            tracing::info!("Fold {} checkpoint persisted", fold_id + 1);

            folds.push(result.summary());

            let is_better = best
                .as_ref()
                .map_or(true, |(_, acc, _)| result.best_validation_accuracy > *acc);
            if is_better {
                best = Some((fold_id, result.best_validation_accuracy, result.model_snapshot));
            }
        }

        let (best_fold_id, best_validation_accuracy, best_snapshot) =
            best.ok_or(IntentError::NoSuccessfulFolds { attempted: k })?;

        let outcome = CrossValidationOutcome {
            best_fold_id,
            best_validation_accuracy,
            best_snapshot,
            folds,
            failed,
        };

        let stats = outcome.score_stats();
        tracing::info!(
            "Cross-validation: {:.2}% ± {:.2}% over {} folds, best fold {} ({:.2}%)",
            stats.mean * 100.0,
            stats.std * 100.0,
            outcome.folds.len(),
            best_fold_id + 1,
            best_validation_accuracy * 100.0,
        );

        Ok(outcome)
    }
}
