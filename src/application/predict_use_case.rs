// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Live inference for a single utterance. Uses the same
// ConfidencePolicy as evaluation, so an utterance scored here
// gets the label it would get in the test report.

use anyhow::{anyhow, Result};
use std::path::PathBuf;

use crate::domain::policy::ConfidencePolicy;
use crate::domain::prediction::AdjustedPrediction;
use crate::domain::traits::Predictor;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::inferencer::Inferencer;

pub struct PredictUseCase {
    inferencer: Inferencer,
    policy:     ConfidencePolicy,
}

impl PredictUseCase {
    /// `threshold` overrides the one saved at training time.
    pub fn new(checkpoint_dir: impl Into<PathBuf>, threshold: Option<f64>) -> Result<Self> {
        let ckpt       = CheckpointManager::new(checkpoint_dir)?;
        let saved_cfg  = ckpt.load_config()?;
        let policy     = ConfidencePolicy::new(threshold.unwrap_or(saved_cfg.threshold))?;
        let inferencer = Inferencer::from_checkpoint(&ckpt)?;
        Ok(Self { inferencer, policy })
    }

    pub fn predict(&self, text: &str) -> Result<AdjustedPrediction> {
        let prediction = self
            .inferencer
            .predict(&[text])?
            .pop()
            .ok_or_else(|| anyhow!("classifier returned no prediction"))?;

        let adjusted = self.policy.adjust(prediction);
        tracing::debug!(
            "'{}' → {} (raw {}, confidence {:.4})",
            text,
            adjusted.final_label,
            adjusted.raw.predicted_label,
            adjusted.raw.confidence,
        );
        Ok(adjusted)
    }

    pub fn threshold(&self) -> f64 {
        self.policy.threshold()
    }
}
