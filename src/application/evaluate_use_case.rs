// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Combined evaluation of the saved best model:
//
//   Step 1: Load the model + tokenizer          (Layer 5 - ml)
//   Step 2: Load every named dataset that
//           exists; missing files are skipped   (Layer 4 - data)
//   Step 3: Score each dataset and the pooled
//           union                               (Layer 5 - ml)
//   Step 4: Write combined_results.json         (Layer 6 - infra)
//
// The threshold defaults to the one saved with the model.

use anyhow::Result;
use std::path::PathBuf;

use crate::data::loader::load_optional;
use crate::domain::policy::ConfidencePolicy;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{write_json_artifact, EvaluationArtifact},
};
use crate::ml::{
    evaluator::{CombinedReport, Evaluator},
    inferencer::Inferencer,
};

/// The three evaluation files produced by the data scripts.
pub fn default_datasets() -> Vec<(String, PathBuf)> {
    ["intent_test", "adversarial_test", "user_test"]
        .iter()
        .map(|name| (name.to_string(), PathBuf::from(format!("data/test/{name}.csv"))))
        .collect()
}

pub struct EvaluateUseCase {
    checkpoint_dir: PathBuf,
    results_dir:    PathBuf,
    datasets:       Vec<(String, PathBuf)>,
    threshold:      Option<f64>,
    batch_size:     usize,
}

impl EvaluateUseCase {
    pub fn new(
        checkpoint_dir: impl Into<PathBuf>,
        results_dir:    impl Into<PathBuf>,
        datasets:       Vec<(String, PathBuf)>,
        threshold:      Option<f64>,
        batch_size:     usize,
    ) -> Self {
        Self {
            checkpoint_dir: checkpoint_dir.into(),
            results_dir: results_dir.into(),
            datasets,
            threshold,
            batch_size,
        }
    }

    pub fn execute(&self) -> Result<CombinedReport> {
        // ── Step 1: Model ─────────────────────────────────────────────────────
        let ckpt       = CheckpointManager::new(&self.checkpoint_dir)?;
        let saved_cfg  = ckpt.load_config()?;
        let policy     = ConfidencePolicy::new(self.threshold.unwrap_or(saved_cfg.threshold))?;
        let inferencer = Inferencer::from_checkpoint(&ckpt)?;

        // ── Step 2: Datasets ──────────────────────────────────────────────────
        let mut loaded = Vec::with_capacity(self.datasets.len());
        for (name, path) in &self.datasets {
            if let Some(corpus) = load_optional(path)? {
                tracing::info!("Dataset '{}': {} examples", name, corpus.len());
                loaded.push((name.clone(), corpus));
            }
        }

        // ── Step 3: Score ─────────────────────────────────────────────────────
        let evaluator = Evaluator::new(policy, self.batch_size)?;
        let report    = evaluator.evaluate_combined(&inferencer, &loaded)?;

        // ── Step 4: Artifact ──────────────────────────────────────────────────
        let artifact = EvaluationArtifact::new(policy.threshold(), report.clone());
        write_json_artifact(&self.results_dir, "combined_results.json", &artifact)?;

        Ok(report)
    }
}
