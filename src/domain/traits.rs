// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The cross-validation core never touches Burn, tensors or the
// compute device. It only talks to these traits:
//
//   CorpusSource      → anything that yields a labelled corpus
//   Predictor         → text in, probability distribution out
//   Classifier        → a Predictor that can also train and
//                       hand out / take back parameter snapshots
//   ClassifierFactory → builds a fresh Classifier per fold
//   CheckpointSink    → persists a fold's best snapshot
//
// Implementations:
//   - CsvCorpusLoader       → CorpusSource
//   - BurnClassifier        → Classifier
//   - BurnClassifierFactory → ClassifierFactory
//   - Inferencer            → Predictor (inference only)
//   - CheckpointManager     → CheckpointSink
//
// Reference: Rust Book §10 (Traits: Defining Shared Behaviour)

use anyhow::Result;

use crate::domain::example::{Corpus, Example};
use crate::domain::prediction::Prediction;

// ─── CorpusSource ─────────────────────────────────────────────────────────────
/// Any component that can load a labelled corpus.
pub trait CorpusSource {
    fn load_corpus(&self) -> Result<Corpus>;
}

// ─── Predictor ────────────────────────────────────────────────────────────────
/// Inference-only view of a classifier. Must not update parameters.
pub trait Predictor {
    /// One prediction per input text, in input order.
    fn predict(&self, texts: &[&str]) -> Result<Vec<Prediction>>;
}

// ─── Classifier ───────────────────────────────────────────────────────────────
/// A trainable classifier. Owns its parameters; the core only asks it
/// to train on a batch, to predict, and to copy its parameters out or in.
pub trait Classifier: Predictor {
    /// Independently owned copy of the parameters. Later training
    /// steps must not be able to change a snapshot once taken.
    type Snapshot: Clone;

    /// One optimisation step on `batch`; returns the batch loss.
    fn train_step(&mut self, batch: &[&Example]) -> Result<f64>;

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: Self::Snapshot);
}

// ─── ClassifierFactory ────────────────────────────────────────────────────────
/// Builds a freshly initialised classifier for one fold.
pub trait ClassifierFactory {
    type Model: Classifier;

    /// `train_size` lets implementations size learning-rate schedules.
    fn create(&self, fold_id: usize, train_size: usize) -> Result<Self::Model>;
}

// ─── CheckpointSink ───────────────────────────────────────────────────────────
/// Persists the best snapshot of a finished fold.
pub trait CheckpointSink<S> {
    fn persist_fold(&self, fold_id: usize, snapshot: &S) -> Result<()>;
}
