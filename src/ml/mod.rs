// ============================================================
// Layer 5 — ML / Model Layer
// ============================================================
// Two halves:
//
//   Burn-specific (the only place that touches tensors/devices)
//     model.rs            — transformer encoder + [CLS] head
//     classifier.rs       — BurnClassifier / factory, AdamW,
//                           warmup + linear decay schedule
//     inferencer.rs       — loads best_model for prediction
//
//   Backend-agnostic (talks only to the domain traits)
//     trainer.rs          — one fold: epochs, early stopping,
//                           best-checkpoint return
//     cross_validation.rs — k folds, persistence, selection
//     evaluator.rs        — raw / adjusted accuracy, reports,
//                           combined (pooled) evaluation
//     metrics.rs          — confusion matrix, P / R / F1
//
// The backend is chosen here, once. Nothing in the
// backend-agnostic half branches on it.
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

pub type TrainBackend = burn::backend::Autodiff<burn::backend::Wgpu>;
pub type InferBackend = burn::backend::Wgpu;
pub type InferDevice  = burn::backend::wgpu::WgpuDevice;

/// Transformer encoder intent model
pub mod model;

/// Classifier trait implementation backed by Burn
pub mod classifier;

/// Inference engine — loads the best checkpoint and predicts
pub mod inferencer;

/// Per-fold training loop with early stopping
pub mod trainer;

/// Stratified k-fold orchestration and model selection
pub mod cross_validation;

/// Dataset scoring and reports
pub mod evaluator;

/// Confusion matrix and per-label metrics
pub mod metrics;

#[cfg(test)]
pub mod test_support;
