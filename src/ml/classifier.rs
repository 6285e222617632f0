// ============================================================
// Layer 5 — Burn Classifier
// ============================================================
// Wraps TransformerIntentModel behind the Classifier trait so
// the cross-validation core can drive it without knowing about
// tensors, devices or optimisers.
//
//   train_step: texts → TextEncoder → IntentBatcher
//               → forward_loss (label smoothing)
//               → backward → AdamW step (grad-norm clipping)
//               at the learning rate of LinearWarmupDecay
//
//   predict:    model.valid() (dropout off, no autodiff)
//               → softmax → Prediction per row
//
//   snapshot:   clone of the module. Burn parameters are
//               immutable tensors and an optimiser step
//               returns a new module, so a clone is never
//               affected by later steps.
//
// Reference: Loshchilov & Hutter (2019) Decoupled Weight Decay
//            Burn Book §5 (Custom Training Loop)

use anyhow::{anyhow, Result};
use burn::{
    data::dataloader::batcher::Batcher,
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{adaptor::OptimizerAdaptor, AdamW, AdamWConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::data::batcher::{IntentBatcher, IntentItem};
use crate::data::encoder::TextEncoder;
use crate::domain::example::Example;
use crate::domain::label::NUM_LABELS;
use crate::domain::prediction::Prediction;
use crate::domain::traits::{Classifier, ClassifierFactory, Predictor};
use crate::ml::model::{TransformerIntentConfig, TransformerIntentModel};

// ─── Optimiser Settings ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptimSettings {
    pub learning_rate:   f64,
    pub weight_decay:    f64,
    pub warmup_ratio:    f64,
    pub label_smoothing: f64,
    pub max_grad_norm:   f64,
}

impl Default for OptimSettings {
    fn default() -> Self {
        Self {
            learning_rate:   2e-5,
            weight_decay:    0.01,
            warmup_ratio:    0.1,
            label_smoothing: 0.1,
            max_grad_norm:   1.0,
        }
    }
}

// ─── Learning-Rate Schedule ───────────────────────────────────────────────────

/// Linear warmup from 0 to `peak`, then linear decay back to 0
/// at `total_steps`.
///
///   step < warmup : lr = peak * step / warmup
///   otherwise     : lr = peak * (total - step) / (total - warmup)
#[derive(Debug, Clone, PartialEq)]
pub struct LinearWarmupDecay {
    peak:         f64,
    warmup_steps: usize,
    total_steps:  usize,
    step:         usize,
}

impl LinearWarmupDecay {
    pub fn new(peak: f64, warmup_steps: usize, total_steps: usize) -> Self {
        Self { peak, warmup_steps, total_steps, step: 0 }
    }

    /// Rate for a given step, without advancing the schedule.
    pub fn lr_at(&self, step: usize) -> f64 {
        if step < self.warmup_steps {
            return self.peak * step as f64 / self.warmup_steps.max(1) as f64;
        }
        let remaining = self.total_steps.saturating_sub(step) as f64;
        let decay_len = self.total_steps.saturating_sub(self.warmup_steps).max(1) as f64;
        self.peak * (remaining / decay_len).max(0.0)
    }

    /// Rate for the current step, then advance.
    pub fn next_lr(&mut self) -> f64 {
        let lr = self.lr_at(self.step);
        self.step += 1;
        lr
    }
}

// ─── Classifier ───────────────────────────────────────────────────────────────

pub type AdamWOptimizer<B> = OptimizerAdaptor<AdamW, TransformerIntentModel<B>, B>;

pub struct BurnClassifier<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TransformerIntentModel<B>, B>,
{
    model:           TransformerIntentModel<B>,
    optim:           O,
    schedule:        LinearWarmupDecay,
    encoder:         TextEncoder,
    train_batcher:   IntentBatcher<B>,
    valid_batcher:   IntentBatcher<B::InnerBackend>,
    label_smoothing: f32,
}

impl<B, O> BurnClassifier<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TransformerIntentModel<B>, B>,
{
    pub fn new(
        model:           TransformerIntentModel<B>,
        optim:           O,
        schedule:        LinearWarmupDecay,
        encoder:         TextEncoder,
        label_smoothing: f32,
        device:          &B::Device,
    ) -> Self {
        Self {
            model,
            optim,
            schedule,
            encoder,
            train_batcher: IntentBatcher::new(device.clone()),
            valid_batcher: IntentBatcher::new(device.clone()),
            label_smoothing,
        }
    }
}

impl<B, O> Predictor for BurnClassifier<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TransformerIntentModel<B>, B>,
{
    fn predict(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
        predict_with(&self.model.valid(), &self.valid_batcher, &self.encoder, texts)
    }
}

impl<B, O> Classifier for BurnClassifier<B, O>
where
    B: AutodiffBackend,
    O: Optimizer<TransformerIntentModel<B>, B>,
{
    type Snapshot = TransformerIntentModel<B>;

    fn train_step(&mut self, batch: &[&Example]) -> Result<f64> {
        if batch.is_empty() {
            return Err(anyhow!("train_step called with an empty batch"));
        }

        let items = batch
            .iter()
            .map(|ex| {
                Ok(IntentItem { encoded: self.encoder.encode(&ex.text)?, label: ex.label.id() })
            })
            .collect::<Result<Vec<_>>>()?;
        let batch = self.train_batcher.batch(items);

        let loss = self.model.forward_loss(
            batch.input_ids,
            batch.attention_mask,
            batch.labels,
            self.label_smoothing,
        );
        let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();

        // A non-finite loss is reported to the caller without touching the weights.
        if !loss_val.is_finite() {
            return Ok(loss_val);
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &self.model);
        let lr    = self.schedule.next_lr();
        self.model = self.optim.step(lr, self.model.clone(), grads);

        Ok(loss_val)
    }

    fn snapshot(&self) -> Self::Snapshot {
        self.model.clone()
    }

    fn restore(&mut self, snapshot: Self::Snapshot) {
        self.model = snapshot;
    }
}

/// Shared by BurnClassifier and Inferencer: one forward pass over
/// `texts` with an inference-only model.
pub fn predict_with<B: Backend>(
    model:   &TransformerIntentModel<B>,
    batcher: &IntentBatcher<B>,
    encoder: &TextEncoder,
    texts:   &[&str],
) -> Result<Vec<Prediction>> {
    if texts.is_empty() {
        return Ok(Vec::new());
    }

    let items: Vec<IntentItem> = encoder
        .encode_batch(texts)?
        .into_iter()
        .map(|encoded| IntentItem { encoded, label: 0 })
        .collect();
    let batch = batcher.batch(items);

    let probs: Vec<f32> = model
        .probabilities(batch.input_ids, batch.attention_mask)
        .into_data()
        .to_vec::<f32>()
        .map_err(|e| anyhow!("Cannot read probabilities: {e:?}"))?;

    probs
        .chunks(NUM_LABELS)
        .map(|row| Prediction::from_probabilities(row).map_err(anyhow::Error::from))
        .collect()
}

// ─── Factory ──────────────────────────────────────────────────────────────────

/// Builds a freshly initialised BurnClassifier for every fold.
pub struct BurnClassifierFactory<B: AutodiffBackend> {
    model_cfg:  TransformerIntentConfig,
    optim:      OptimSettings,
    encoder:    TextEncoder,
    device:     B::Device,
    batch_size: usize,
    max_epochs: usize,
    seed:       u64,
}

impl<B: AutodiffBackend> BurnClassifierFactory<B> {
    pub fn new(
        model_cfg:  TransformerIntentConfig,
        optim:      OptimSettings,
        encoder:    TextEncoder,
        device:     B::Device,
        batch_size: usize,
        max_epochs: usize,
        seed:       u64,
    ) -> Self {
        Self { model_cfg, optim, encoder, device, batch_size, max_epochs, seed }
    }

    /// Schedule sized for `train_size` examples over `max_epochs`.
    pub fn schedule_for(&self, train_size: usize) -> LinearWarmupDecay {
        let steps_per_epoch = train_size.div_ceil(self.batch_size.max(1));
        let total_steps     = steps_per_epoch * self.max_epochs;
        let warmup_steps    = (total_steps as f64 * self.optim.warmup_ratio) as usize;
        LinearWarmupDecay::new(self.optim.learning_rate, warmup_steps, total_steps)
    }
}

impl<B: AutodiffBackend> ClassifierFactory for BurnClassifierFactory<B> {
    type Model = BurnClassifier<B, AdamWOptimizer<B>>;

    fn create(&self, fold_id: usize, train_size: usize) -> Result<Self::Model> {
        // Same seed + fold → same initial weights and dropout masks.
        B::seed(self.seed.wrapping_add(fold_id as u64));

        let model: TransformerIntentModel<B> = self.model_cfg.init(&self.device);
        let optim = AdamWConfig::new()
            .with_weight_decay(self.optim.weight_decay as f32)
            .with_grad_clipping(Some(GradientClippingConfig::Norm(self.optim.max_grad_norm as f32)))
            .init();

        let schedule = self.schedule_for(train_size);
        tracing::debug!(
            "Fold {}: {} train examples, {} total steps, {} warmup steps",
            fold_id + 1,
            train_size,
            schedule.total_steps,
            schedule.warmup_steps,
        );

        Ok(BurnClassifier::new(
            model,
            optim,
            schedule,
            self.encoder.clone(),
            self.optim.label_smoothing as f32,
            &self.device,
        ))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schedule_warms_up_then_decays_to_zero() {
        let mut s = LinearWarmupDecay::new(1.0, 2, 6);
        let lrs: Vec<f64> = (0..7).map(|_| s.next_lr()).collect();
        let expected = [0.0, 0.5, 1.0, 0.75, 0.5, 0.25, 0.0];
        for (got, want) in lrs.iter().zip(expected) {
            assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
        }
    }

    #[test]
    fn test_schedule_without_warmup_starts_at_peak() {
        let s = LinearWarmupDecay::new(2e-5, 0, 10);
        assert!((s.lr_at(0) - 2e-5).abs() < 1e-18);
        assert_eq!(s.lr_at(10), 0.0);
        assert_eq!(s.lr_at(50), 0.0);
    }
}
