// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Validate the configuration          (Layer 2)
//   Step 2: Load CV pool + held-out test set    (Layer 4 - data)
//           and check every label fills every fold
//   Step 3: Build the tokenizer from the pool   (Layer 6 - infra)
//   Step 4: Save config for inference           (Layer 6 - infra)
//   Step 5: k-fold cross-validation             (Layer 5 - ml)
//   Step 6: Write per-epoch history             (Layer 6 - infra)
//   Step 7: Save the winning model              (Layer 6 - infra)
//   Step 8: Evaluate it on the test set         (Layer 5 - ml)
//   Step 9: Write cv_results.json               (Layer 6 - infra)
//
// Reference: Rust Book §13 (Iterators and Closures)
//            Burn Book §5 (Training)
//
// Nothing is written to disk before Step 2 has passed.

use anyhow::Result;
use burn::module::AutodiffModule;
use serde::{Deserialize, Serialize};

use crate::data::{
    encoder::TextEncoder,
    loader::{load_cv_pool, CsvCorpusLoader},
};
use crate::domain::{
    error::IntentError,
    label::NUM_LABELS,
    policy::{ConfidencePolicy, DEFAULT_THRESHOLD},
    traits::CorpusSource,
};
use crate::infra::{
    checkpoint::{BestModelInfo, CheckpointManager},
    metrics::{write_json_artifact, CrossValidationSection, MetricsLogger, TrainingArtifact},
    tokenizer_store::{TokenizerStore, FIRST_WORD_ID},
};
use crate::ml::{
    classifier::{BurnClassifierFactory, OptimSettings},
    cross_validation::{CrossValidationConfig, CrossValidator, FoldFailurePolicy},
    evaluator::Evaluator,
    inferencer::Inferencer,
    model::TransformerIntentConfig,
    trainer::{FoldTrainer, FoldTrainerConfig},
    InferDevice, TrainBackend,
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings for a training run. Saved next to the checkpoints
// so inference rebuilds the same architecture and encoding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    // ── Files ──
    pub train_file:      String,
    pub val_file:        String,
    pub test_file:       String,
    pub checkpoint_dir:  String,
    pub results_dir:     String,

    // ── Encoding ──
    pub max_seq_len:     usize,
    pub vocab_size:      usize,

    // ── Optimisation ──
    pub batch_size:      usize,
    pub max_epochs:      usize,
    pub lr:              f64,
    pub weight_decay:    f64,
    pub warmup_ratio:    f64,
    pub label_smoothing: f64,
    pub max_grad_norm:   f64,

    // ── Early stopping / CV ──
    pub patience:        usize,
    pub min_delta:       f64,
    pub folds:           usize,
    pub failure_policy:  FoldFailurePolicy,
    pub seed:            u64,

    // ── Decision policy ──
    pub threshold:       f64,

    // ── Architecture ──
    pub d_model:         usize,
    pub num_heads:       usize,
    pub num_layers:      usize,
    pub d_ff:            usize,
    pub dropout:         f64,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            train_file:      "data/intent_train.csv".to_string(),
            val_file:        "data/intent_val.csv".to_string(),
            test_file:       "data/intent_test.csv".to_string(),
            checkpoint_dir:  "checkpoints".to_string(),
            results_dir:     "results".to_string(),
            max_seq_len:     64,
            vocab_size:      8000,
            batch_size:      16,
            max_epochs:      15,
            lr:              2e-5,
            weight_decay:    0.01,
            warmup_ratio:    0.1,
            label_smoothing: 0.1,
            max_grad_norm:   1.0,
            patience:        3,
            min_delta:       0.001,
            folds:           5,
            failure_policy:  FoldFailurePolicy::FailFast,
            seed:            42,
            threshold:       DEFAULT_THRESHOLD,
            d_model:         128,
            num_heads:       4,
            num_layers:      2,
            d_ff:            512,
            dropout:         0.1,
        }
    }
}

impl TrainConfig {
    /// Checked before any file is read.
    pub fn validate(&self) -> Result<(), IntentError> {
        ConfidencePolicy::new(self.threshold)?;
        self.trainer_config().validate()?;

        if self.folds < 2 {
            return Err(IntentError::invalid_config("folds", format!("must be at least 2, got {}", self.folds)));
        }
        if self.vocab_size <= FIRST_WORD_ID {
            return Err(IntentError::invalid_config(
                "vocab_size",
                format!("must exceed {} to hold the special tokens, got {}", FIRST_WORD_ID, self.vocab_size),
            ));
        }
        if self.max_seq_len < 2 {
            return Err(IntentError::invalid_config("max_seq_len", "must leave room for [CLS] and [SEP]"));
        }
        if self.num_heads == 0 || self.d_model % self.num_heads != 0 {
            return Err(IntentError::invalid_config(
                "num_heads",
                format!("must divide d_model ({}), got {}", self.d_model, self.num_heads),
            ));
        }
        if !(0.0..=1.0).contains(&self.warmup_ratio) {
            return Err(IntentError::invalid_config("warmup_ratio", "must be within [0, 1]"));
        }
        if !(0.0..1.0).contains(&self.label_smoothing) {
            return Err(IntentError::invalid_config("label_smoothing", "must be within [0, 1)"));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(IntentError::invalid_config("dropout", "must be within [0, 1)"));
        }
        if self.lr.is_nan() || self.lr <= 0.0 {
            return Err(IntentError::invalid_config("lr", "must be positive"));
        }
        Ok(())
    }

    pub fn trainer_config(&self) -> FoldTrainerConfig {
        FoldTrainerConfig {
            max_epochs: self.max_epochs,
            patience:   self.patience,
            min_delta:  self.min_delta,
            batch_size: self.batch_size,
            seed:       self.seed,
        }
    }

    pub fn cv_config(&self) -> CrossValidationConfig {
        CrossValidationConfig { k: self.folds, seed: self.seed, failure_policy: self.failure_policy }
    }

    pub fn policy(&self) -> Result<ConfidencePolicy, IntentError> {
        ConfidencePolicy::new(self.threshold)
    }

    pub fn optim_settings(&self) -> OptimSettings {
        OptimSettings {
            learning_rate:   self.lr,
            weight_decay:    self.weight_decay,
            warmup_ratio:    self.warmup_ratio,
            label_smoothing: self.label_smoothing,
            max_grad_norm:   self.max_grad_norm,
        }
    }

    pub fn model_config(&self) -> TransformerIntentConfig {
        TransformerIntentConfig::new(
            self.vocab_size, self.max_seq_len, self.d_model,
            self.num_heads, self.num_layers, self.d_ff, self.dropout,
            NUM_LABELS,
        )
    }
}

/// Headline numbers handed back to the CLI.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub mean_accuracy:     f64,
    pub std_accuracy:      f64,
    /// 1-based
    pub best_fold:         usize,
    pub best_val_accuracy: f64,
    pub test_raw:          f64,
    pub test_adjusted:     f64,
    pub failed_folds:      usize,
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Validate ──────────────────────────────────────────────────
        cfg.validate()?;
        let policy = cfg.policy()?;

        // ── Step 2: Load data ─────────────────────────────────────────────────
        // Train + validation files form the CV pool; the test file is
        // only ever scored by the final model.
        let pool = load_cv_pool(&cfg.train_file, &cfg.val_file)?;
        let test = CsvCorpusLoader::new(&cfg.test_file).load_corpus()?;
        tracing::info!("CV pool: {} examples, test set: {} examples", pool.len(), test.len());

        let trainer   = FoldTrainer::new(cfg.trainer_config(), policy)?;
        let validator = CrossValidator::new(cfg.cv_config(), trainer)?;
        validator.check_pool(&pool)?;

        // ── Step 3: Tokenizer ─────────────────────────────────────────────────
        // Always rebuilt so ids match this pool and fit this vocab_size
        let tokenizer = TokenizerStore::new(&cfg.checkpoint_dir).build(&pool.texts(), cfg.vocab_size)?;
        let encoder   = TextEncoder::new(tokenizer, cfg.max_seq_len);

        // ── Step 4: Save config for inference ─────────────────────────────────
        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir)?;
        ckpt.save_config(cfg)?;

        // ── Step 5: Cross-validation ──────────────────────────────────────────
        let device = InferDevice::default();
        tracing::info!("Using WGPU device: {:?}", device);

        let factory = BurnClassifierFactory::<TrainBackend>::new(
            cfg.model_config(),
            cfg.optim_settings(),
            encoder.clone(),
            device.clone(),
            cfg.batch_size,
            cfg.max_epochs,
            cfg.seed,
        );
        let outcome = validator.run(&pool, &factory, &ckpt)?;

        // ── Step 6: Epoch history ─────────────────────────────────────────────
        let logger = MetricsLogger::new(&cfg.results_dir)?;
        logger.log_all(outcome.folds.iter().flat_map(|f| f.history.iter()))?;
        tracing::info!("Epoch history written to '{}'", logger.csv_path().display());

        // ── Step 7: Persist the winner ────────────────────────────────────────
        let info = BestModelInfo::new(outcome.best_fold_id, outcome.best_validation_accuracy);
        ckpt.save_best(&outcome.best_snapshot, &info)?;

        // ── Step 8: Held-out test evaluation ──────────────────────────────────
        // valid() drops the autodiff wrapper and disables dropout
        let predictor = Inferencer::new(outcome.best_snapshot.valid(), encoder, device);
        let evaluator = Evaluator::new(policy, cfg.batch_size)?;
        let test_report = evaluator.evaluate(&predictor, "intent_test", &test)?;

        // ── Step 9: Metrics artifact ──────────────────────────────────────────
        let cv_section = CrossValidationSection::from_outcome(&outcome);
        let summary = TrainSummary {
            mean_accuracy:     cv_section.mean_accuracy,
            std_accuracy:      cv_section.std_accuracy,
            best_fold:         cv_section.best_fold,
            best_val_accuracy: outcome.best_validation_accuracy,
            test_raw:          test_report.raw_accuracy,
            test_adjusted:     test_report.adjusted_accuracy,
            failed_folds:      outcome.failed.len(),
        };
        let artifact = TrainingArtifact::new(cfg.clone(), cv_section, test_report);
        write_json_artifact(&cfg.results_dir, "cv_results.json", &artifact)?;

        tracing::info!("Training complete!");
        Ok(summary)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        TrainConfig::default().validate().unwrap();
    }

    #[test]
    fn test_validation_names_the_bad_field() {
        let bad = TrainConfig { threshold: 1.5, ..TrainConfig::default() };
        assert!(matches!(bad.validate(), Err(IntentError::ThresholdRange { .. })));

        let bad = TrainConfig { folds: 1, ..TrainConfig::default() };
        assert!(matches!(bad.validate(), Err(IntentError::InvalidConfig { field: "folds", .. })));

        let bad = TrainConfig { d_model: 130, num_heads: 4, ..TrainConfig::default() };
        assert!(matches!(bad.validate(), Err(IntentError::InvalidConfig { field: "num_heads", .. })));

        let bad = TrainConfig { min_delta: -0.1, ..TrainConfig::default() };
        assert!(matches!(bad.validate(), Err(IntentError::InvalidConfig { field: "min_delta", .. })));

        let bad = TrainConfig { vocab_size: 100, ..TrainConfig::default() };
        assert!(matches!(bad.validate(), Err(IntentError::InvalidConfig { field: "vocab_size", .. })));

        let bad = TrainConfig { vocab_size: FIRST_WORD_ID, ..TrainConfig::default() };
        assert!(matches!(bad.validate(), Err(IntentError::InvalidConfig { field: "vocab_size", .. })));

        let ok = TrainConfig { vocab_size: FIRST_WORD_ID + 1, ..TrainConfig::default() };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_insufficient_pool_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut csv = String::from("text,label\n");
        for label in crate::domain::label::Label::ALL {
            csv.push_str(&format!("{0} one,{0}\n{0} two,{0}\n", label.as_str()));
        }
        let data = dir.path().join("pool.csv");
        std::fs::write(&data, csv).unwrap();

        let ckpt_dir = dir.path().join("ckpt");
        let cfg = TrainConfig {
            train_file:     data.display().to_string(),
            val_file:       data.display().to_string(),
            test_file:      data.display().to_string(),
            checkpoint_dir: ckpt_dir.display().to_string(),
            results_dir:    dir.path().join("results").display().to_string(),
            folds:          5,
            ..TrainConfig::default()
        };

        let err = TrainUseCase::new(cfg).execute().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<IntentError>(),
            Some(IntentError::InsufficientData { available: 4, required: 5, .. })
        ));
        assert!(!ckpt_dir.join("tokenizer.json").exists());
        assert!(!ckpt_dir.exists());
    }

    #[test]
    fn test_sub_configs_carry_the_settings() {
        let cfg = TrainConfig { folds: 3, patience: 2, seed: 7, ..TrainConfig::default() };
        assert_eq!(cfg.cv_config().k, 3);
        assert_eq!(cfg.cv_config().seed, 7);
        assert_eq!(cfg.trainer_config().patience, 2);
        assert_eq!(cfg.model_config().num_labels, NUM_LABELS);
        assert!((cfg.policy().unwrap().threshold() - DEFAULT_THRESHOLD).abs() < 1e-12);
    }
}
