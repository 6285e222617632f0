// ============================================================
// Layer 6 — Metrics Logger and Result Artifacts
// ============================================================
// Two kinds of output:
//
//   training_history.csv → one row per (fold, epoch)
//       fold,epoch,train_loss,val_accuracy,val_accuracy_adjusted
//       1,1,1.512300,0.611111,0.402778
//       ...
//
//   cv_results.json / combined_results.json → nested JSON with
//       cross-validation scores (mean, std, per fold), test
//       accuracy (raw / adjusted), per-label P/R/F1/support,
//       the confusion matrix and the label id map.
//
// Folds and epochs are 1-based in both files; they are 0-based
// inside the program.
//
// Reference: Rust Book §12 (I/O and File Handling)
//            serde_json crate documentation

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use crate::domain::label::Label;
use crate::ml::cross_validation::{CrossValidationOutcome, FailedFold};
use crate::ml::evaluator::{CombinedReport, EvaluationReport};
use crate::ml::trainer::FoldSummary;

/// One row of metrics for a single epoch of a single fold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// 0-based fold index
    pub fold: usize,
    /// 0-based epoch index within the fold
    pub epoch: usize,
    /// Mean training loss over the epoch's batches
    pub train_loss: f64,
    /// Validation accuracy of the raw argmax labels
    pub val_accuracy: f64,
    /// Validation accuracy after the confidence-threshold fallback
    pub val_accuracy_adjusted: f64,
}

/// Appends epoch metrics to a CSV file holding one run.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Starts a new history: truncates any previous run's file and
    /// writes the header.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("training_history.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "fold,epoch,train_loss,val_accuracy,val_accuracy_adjusted")?;
        tracing::debug!("Started metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{},{:.6},{:.6},{:.6}",
            m.fold + 1,
            m.epoch + 1,
            m.train_loss,
            m.val_accuracy,
            m.val_accuracy_adjusted,
        )?;
        Ok(())
    }

    pub fn log_all<'a>(&self, rows: impl IntoIterator<Item = &'a EpochMetrics>) -> Result<()> {
        for m in rows {
            self.log(m)?;
        }
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Result Artifacts ─────────────────────────────────────────────────────────

/// Mean and population standard deviation of the fold scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub mean: f64,
    pub std:  f64,
}

impl ScoreStats {
    pub fn from_scores(scores: &[f64]) -> Self {
        if scores.is_empty() {
            return Self { mean: 0.0, std: 0.0 };
        }
        let n    = scores.len() as f64;
        let mean = scores.iter().sum::<f64>() / n;
        let var  = scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self { mean, std: var.sqrt() }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FoldRecord {
    pub fold:              usize,
    pub best_val_accuracy: f64,
    pub best_epoch:        usize,
    pub epochs_trained:    usize,
    pub stop_reason:       String,
}

impl From<&FoldSummary> for FoldRecord {
    fn from(s: &FoldSummary) -> Self {
        Self {
            fold:              s.fold_id + 1,
            best_val_accuracy: s.best_validation_accuracy,
            best_epoch:        s.best_epoch + 1,
            epochs_trained:    s.epochs_trained,
            stop_reason:       s.stop_reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossValidationSection {
    pub fold_results:  Vec<FoldRecord>,
    pub failed_folds:  Vec<FailedFold>,
    pub mean_accuracy: f64,
    pub std_accuracy:  f64,
    pub best_fold:     usize,
}

impl CrossValidationSection {
    pub fn from_outcome<S>(outcome: &CrossValidationOutcome<S>) -> Self {
        let stats = outcome.score_stats();
        Self {
            fold_results:  outcome.folds.iter().map(FoldRecord::from).collect(),
            failed_folds:  outcome.failed.clone(),
            mean_accuracy: stats.mean,
            std_accuracy:  stats.std,
            best_fold:     outcome.best_fold_id + 1,
        }
    }
}

/// Everything written to `cv_results.json` after a training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingArtifact<C: Serialize> {
    pub config:           C,
    pub labels:           BTreeMap<usize, String>,
    pub cross_validation: CrossValidationSection,
    pub test_results:     EvaluationReport,
    pub timestamp:        String,
}

impl<C: Serialize> TrainingArtifact<C> {
    pub fn new(
        config:           C,
        cross_validation: CrossValidationSection,
        test_results:     EvaluationReport,
    ) -> Self {
        Self {
            config,
            labels: Label::id_map(),
            cross_validation,
            test_results,
            timestamp: now_rfc3339(),
        }
    }
}

/// Everything written to `combined_results.json`.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationArtifact {
    pub labels:    BTreeMap<usize, String>,
    pub threshold: f64,
    pub report:    CombinedReport,
    pub timestamp: String,
}

impl EvaluationArtifact {
    pub fn new(threshold: f64, report: CombinedReport) -> Self {
        Self { labels: Label::id_map(), threshold, report, timestamp: now_rfc3339() }
    }
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown".to_string())
}

/// Pretty-print any artifact as JSON into `dir/file_name`.
pub fn write_json_artifact<T: Serialize>(dir: impl AsRef<Path>, file_name: &str, value: &T) -> Result<PathBuf> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir).with_context(|| format!("Cannot create '{}'", dir.display()))?;

    let path = dir.join(file_name);
    let json = serde_json::to_string_pretty(value)?;
    fs::write(&path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;

    tracing::info!("Saved results to '{}'", path.display());
    Ok(path)
}
