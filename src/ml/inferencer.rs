// ============================================================
// Layer 5 — Inferencer
// ============================================================
// Loads the winning model for prediction only:
//
//   train_config.json → TransformerIntentConfig (dropout 0)
//   tokenizer.json    → TextEncoder (same max_seq_len)
//   best_model        → weights
//
// Runs on the plain Wgpu backend (no autodiff graph).

use anyhow::Result;

use crate::data::batcher::IntentBatcher;
use crate::data::encoder::TextEncoder;
use crate::domain::prediction::Prediction;
use crate::domain::traits::Predictor;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::tokenizer_store::TokenizerStore;
use crate::ml::classifier::predict_with;
use crate::ml::model::TransformerIntentModel;
use crate::ml::{InferBackend, InferDevice};

pub struct Inferencer {
    model:   TransformerIntentModel<InferBackend>,
    encoder: TextEncoder,
    batcher: IntentBatcher<InferBackend>,
}

impl Inferencer {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager) -> Result<Self> {
        let device = InferDevice::default();
        let cfg    = ckpt_manager.load_config()?;

        let tokenizer = TokenizerStore::new(ckpt_manager.dir()).load()?;
        let encoder   = TextEncoder::new(tokenizer, cfg.max_seq_len);

        let mut model_cfg = cfg.model_config();
        model_cfg.dropout = 0.0;
        let model: TransformerIntentModel<InferBackend> = model_cfg.init(&device);
        let model = ckpt_manager.load_best(model, &device)?;
        tracing::info!("Model loaded from '{}'", ckpt_manager.dir().display());

        Ok(Self::new(model, encoder, device))
    }

    /// Wrap an already loaded (or freshly trained) model.
    pub fn new(model: TransformerIntentModel<InferBackend>, encoder: TextEncoder, device: InferDevice) -> Self {
        Self { model, encoder, batcher: IntentBatcher::new(device) }
    }
}

impl Predictor for Inferencer {
    fn predict(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
        predict_with(&self.model, &self.batcher, &self.encoder, texts)
    }
}
