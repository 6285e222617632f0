// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`    — cross-validated training + test evaluation
//   2. `evaluate` — combined evaluation on named datasets
//   3. `predict`  — classify one utterance
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, PredictArgs, TrainArgs};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::domain::label::Label;
use crate::domain::prediction::AdjustedPrediction;

/// The main CLI struct, parsed by clap's Parser derive.
#[derive(Parser, Debug)]
#[command(
    name = "intent-classifier",
    version = "0.1.0",
    about = "Train, evaluate and query a six-class intent classifier with a confidence fallback."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Match on the subcommand and dispatch to the correct use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Predict(args)  => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    tracing::info!("Starting training on '{}' + '{}'", args.train_file, args.val_file);
    let results_dir = args.results_dir.clone();

    let summary = TrainUseCase::new(args.into()).execute()?;

    println!("\nCross-validation: {:.2}% ± {:.2}%", summary.mean_accuracy * 100.0, summary.std_accuracy * 100.0);
    println!("Best fold:        {} ({:.2}%)", summary.best_fold, summary.best_val_accuracy * 100.0);
    if summary.failed_folds > 0 {
        println!("Skipped folds:    {}", summary.failed_folds);
    }
    println!("Test raw:         {:.2}%", summary.test_raw * 100.0);
    println!("Test adjusted:    {:.2}%", summary.test_adjusted * 100.0);
    println!("Results written to '{}'", results_dir);
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::{default_datasets, EvaluateUseCase};

    let datasets = if args.datasets.is_empty() { default_datasets() } else { args.datasets };
    let report = EvaluateUseCase::new(
        &args.checkpoint_dir,
        &args.results_dir,
        datasets,
        args.threshold,
        args.batch_size,
    )
    .execute()?;

    // ── Error breakdown over the pooled set ───────────────────────────────────
    println!("\nError breakdown ({} errors / {} examples):", report.pooled.misclassified.len(), report.pooled.total);
    for group in &report.pooled.error_breakdown {
        println!("\n  {}: {} errors", group.key(), group.count);
        for ex in &group.examples {
            println!("    [{:.3}] \"{}\"", ex.confidence, ex.text);
        }
    }

    // ── Summary table ─────────────────────────────────────────────────────────
    println!("\n{:<20} {:>8} {:>10} {:>10} {:>8}", "Dataset", "Samples", "Raw", "Adjusted", "LowConf");
    for r in report.datasets.iter().chain(std::iter::once(&report.pooled)) {
        println!(
            "{:<20} {:>8} {:>9.2}% {:>9.2}% {:>8}",
            r.dataset,
            r.total,
            r.raw_accuracy * 100.0,
            r.adjusted_accuracy * 100.0,
            r.low_confidence_count,
        );
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let use_case = PredictUseCase::new(&args.checkpoint_dir, args.threshold)?;
    let result   = use_case.predict(&args.text)?;

    if args.json {
        let output = PredictOutput::new(&args.text, &result, use_case.threshold());
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("\nIntent:     {}", result.final_label);
    if result.is_fallback() {
        println!(
            "            (raw {} below threshold {})",
            result.raw.predicted_label,
            use_case.threshold()
        );
    }
    println!("Confidence: {:.4}", result.raw.confidence);
    for label in Label::ALL {
        println!("  {:<16} {:.4}", label.as_str(), result.raw.probability(label));
    }
    Ok(())
}

/// `predict --json` payload.
#[derive(Debug, Serialize)]
struct PredictOutput<'a> {
    text:         &'a str,
    intent:       Label,
    raw_intent:   Label,
    confidence:   f64,
    threshold:    f64,
    fallback:     bool,
    distribution: BTreeMap<String, f64>,
}

impl<'a> PredictOutput<'a> {
    fn new(text: &'a str, result: &AdjustedPrediction, threshold: f64) -> Self {
        Self {
            text,
            intent:       result.final_label,
            raw_intent:   result.raw.predicted_label,
            confidence:   result.raw.confidence,
            threshold,
            fallback:     result.is_fallback(),
            distribution: result.raw.distribution_map(),
        }
    }
}
