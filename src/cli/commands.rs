// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `evaluate` and
// `predict`, and all their configurable flags.
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, f64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::train_use_case::TrainConfig;
use crate::ml::cross_validation::FoldFailurePolicy;

/// The three top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cross-validate, select the best fold and evaluate it on the test set
    Train(TrainArgs),

    /// Evaluate the saved best model on several named datasets
    Evaluate(EvaluateArgs),

    /// Classify a single utterance with the saved best model
    Predict(PredictArgs),
}

/// All arguments for the `train` command.
/// Each field becomes a --flag on the command line.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Training CSV (columns: text,label)
    #[arg(long, default_value = "data/intent_train.csv")]
    pub train_file: String,

    /// Validation CSV, merged with the training file into the CV pool
    #[arg(long, default_value = "data/intent_val.csv")]
    pub val_file: String,

    /// Held-out test CSV, only scored by the final model
    #[arg(long, default_value = "data/intent_test.csv")]
    pub test_file: String,

    /// Directory for checkpoints, tokenizer and config
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Directory for training_history.csv and cv_results.json
    #[arg(long, default_value = "results")]
    pub results_dir: String,

    /// Tokens per utterance including [CLS] and [SEP]
    #[arg(long, default_value_t = 64)]
    pub max_seq_len: usize,

    /// Upper bound on the tokenizer vocabulary
    #[arg(long, default_value_t = 8000)]
    pub vocab_size: usize,

    #[arg(long, default_value_t = 16)]
    pub batch_size: usize,

    /// Epoch limit per fold (early stopping may end a fold sooner)
    #[arg(long, default_value_t = 15)]
    pub max_epochs: usize,

    /// Peak learning rate reached after warmup
    #[arg(long, default_value_t = 2e-5)]
    pub lr: f64,

    /// AdamW decoupled weight decay
    #[arg(long, default_value_t = 0.01)]
    pub weight_decay: f64,

    /// Fraction of all steps spent warming up the learning rate
    #[arg(long, default_value_t = 0.1)]
    pub warmup_ratio: f64,

    #[arg(long, default_value_t = 0.1)]
    pub label_smoothing: f64,

    /// Gradient L2-norm clipping threshold
    #[arg(long, default_value_t = 1.0)]
    pub max_grad_norm: f64,

    /// Consecutive non-improving epochs before a fold stops
    #[arg(long, default_value_t = 3)]
    pub patience: usize,

    /// Minimum validation-accuracy gain that counts as improvement
    #[arg(long, default_value_t = 0.001)]
    pub min_delta: f64,

    /// Number of cross-validation folds
    #[arg(long, default_value_t = 5)]
    pub folds: usize,

    /// Skip diverged folds instead of aborting the run
    #[arg(long)]
    pub skip_failed_folds: bool,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Predictions below this confidence become `unclear`
    #[arg(long, default_value_t = 0.7)]
    pub threshold: f64,

    /// Hidden dimension of the transformer
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    /// Attention heads; must divide d_model
    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 2)]
    pub num_layers: usize,

    /// Inner dimension of the feed-forward network
    #[arg(long, default_value_t = 512)]
    pub d_ff: usize,

    #[arg(long, default_value_t = 0.1)]
    pub dropout: f64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// The application layer never sees clap types.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            train_file:      a.train_file,
            val_file:        a.val_file,
            test_file:       a.test_file,
            checkpoint_dir:  a.checkpoint_dir,
            results_dir:     a.results_dir,
            max_seq_len:     a.max_seq_len,
            vocab_size:      a.vocab_size,
            batch_size:      a.batch_size,
            max_epochs:      a.max_epochs,
            lr:              a.lr,
            weight_decay:    a.weight_decay,
            warmup_ratio:    a.warmup_ratio,
            label_smoothing: a.label_smoothing,
            max_grad_norm:   a.max_grad_norm,
            patience:        a.patience,
            min_delta:       a.min_delta,
            folds:           a.folds,
            failure_policy:  if a.skip_failed_folds {
                FoldFailurePolicy::SkipFailed
            } else {
                FoldFailurePolicy::FailFast
            },
            seed:            a.seed,
            threshold:       a.threshold,
            d_model:         a.d_model,
            num_heads:       a.num_heads,
            num_layers:      a.num_layers,
            d_ff:            a.d_ff,
            dropout:         a.dropout,
        }
    }
}

/// All arguments for the `evaluate` command
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    /// Named dataset as NAME=PATH; repeat for several.
    /// Defaults to intent_test, adversarial_test and user_test under data/test/
    #[arg(long = "dataset", value_parser = parse_named_path)]
    pub datasets: Vec<(String, PathBuf)>,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Directory for combined_results.json
    #[arg(long, default_value = "results")]
    pub results_dir: String,

    /// Override the threshold saved with the model
    #[arg(long)]
    pub threshold: Option<f64>,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,
}

/// All arguments for the `predict` command
#[derive(Args, Debug)]
pub struct PredictArgs {
    /// The utterance to classify
    #[arg(long)]
    pub text: String,

    /// Directory where checkpoints were saved during training
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Override the threshold saved with the model
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Print the result as one JSON object instead of a table
    #[arg(long)]
    pub json: bool,
}

/// `name=path` → (name, path)
fn parse_named_path(s: &str) -> Result<(String, PathBuf), String> {
    let (name, path) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=PATH, got '{s}'"))?;
    let (name, path) = (name.trim(), path.trim());
    if name.is_empty() || path.is_empty() {
        return Err(format!("expected NAME=PATH, got '{s}'"));
    }
    Ok((name.to_string(), PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_named_path_parsing() {
        assert_eq!(
            parse_named_path("adv=data/test/adversarial_test.csv").unwrap(),
            ("adv".to_string(), PathBuf::from("data/test/adversarial_test.csv"))
        );
        assert!(parse_named_path("no_separator").is_err());
        assert!(parse_named_path("=path.csv").is_err());
    }

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["intent-classifier", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(TrainConfig::from(args), TrainConfig::default());
    }

    #[test]
    fn test_evaluate_collects_repeated_datasets() {
        let cli = Cli::try_parse_from([
            "intent-classifier", "evaluate",
            "--dataset", "a=a.csv",
            "--dataset", "b=b.csv",
            "--threshold", "0.5",
        ])
        .unwrap();
        let Commands::Evaluate(args) = cli.command else { panic!("expected evaluate") };
        assert_eq!(args.datasets.len(), 2);
        assert_eq!(args.datasets[1].0, "b");
        assert_eq!(args.threshold, Some(0.5));
    }

    #[test]
    fn test_predict_json_flag() {
        let cli = Cli::try_parse_from(["intent-classifier", "predict", "--text", "save this", "--json"]).unwrap();
        let Commands::Predict(args) = cli.command else { panic!("expected predict") };
        assert!(args.json);
        assert_eq!(args.threshold, None);
    }
}
