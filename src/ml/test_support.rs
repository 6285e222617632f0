// ============================================================
// Layer 5 — Test Support
// ============================================================
// Test doubles for the cross-validation core.
//
// ScriptedClassifier reaches a scripted validation accuracy per
// epoch: of the texts passed to one predict call, the first
// round(score * n) get their true label (read from the first
// word of the text), the rest get the next label id.

use anyhow::Result;
use std::cell::RefCell;
use std::collections::HashMap;

use crate::domain::example::{Corpus, Example};
use crate::domain::label::{Label, NUM_LABELS};
use crate::domain::prediction::Prediction;
use crate::domain::traits::{CheckpointSink, Classifier, ClassifierFactory, Predictor};

/// `n` examples cycling through the labels: "save item 0", "search item 1", ...
pub fn labelled_corpus(n: usize) -> Corpus {
    (0..n)
        .map(|i| {
            let label = Label::ALL[i % NUM_LABELS];
            Example::new(format!("{} item {i}", label.as_str()), label)
        })
        .collect()
}

/// Prediction for `label` with `confidence` on it and the rest spread evenly.
pub fn prediction_for(label: Label, confidence: f64) -> Prediction {
    let rest = (1.0 - confidence) / (NUM_LABELS - 1) as f64;
    let probs: Vec<f32> = Label::ALL
        .iter()
        .map(|&l| if l == label { confidence as f32 } else { rest as f32 })
        .collect();
    Prediction::from_probabilities(&probs).unwrap()
}

fn true_label(text: &str) -> Label {
    text.split_whitespace().next().unwrap().parse().unwrap()
}

#[derive(Debug, Clone)]
pub struct ScriptedClassifier {
    scores:          Vec<f64>,
    steps_per_epoch: usize,
    steps:           usize,
    confidence:      f64,
    nan_loss_at:     Option<usize>,
    restored:        Option<usize>,
}

impl ScriptedClassifier {
    pub fn new(scores: Vec<f64>, train_size: usize, batch_size: usize) -> Self {
        Self {
            scores,
            steps_per_epoch: train_size.div_ceil(batch_size).max(1),
            steps:           0,
            confidence:      0.9,
            nan_loss_at:     None,
            restored:        None,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn with_nan_loss_at(mut self, epoch: usize) -> Self {
        self.nan_loss_at = Some(epoch);
        self
    }

    pub fn restored(&self) -> Option<usize> {
        self.restored
    }

    /// Epoch whose parameters the classifier currently holds.
    fn current_epoch(&self) -> usize {
        self.restored
            .unwrap_or_else(|| (self.steps / self.steps_per_epoch).saturating_sub(1))
    }

    fn score(&self) -> f64 {
        let e = self.current_epoch().min(self.scores.len().saturating_sub(1));
        self.scores.get(e).copied().unwrap_or(0.0)
    }
}

impl Predictor for ScriptedClassifier {
    fn predict(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
        let n_correct = (self.score() * texts.len() as f64).round() as usize;
        Ok(texts
            .iter()
            .enumerate()
            .map(|(i, text)| {
                let truth = true_label(text);
                let label = if i < n_correct {
                    truth
                } else {
                    Label::ALL[(truth.id() + 1) % NUM_LABELS]
                };
                prediction_for(label, self.confidence)
            })
            .collect())
    }
}

impl Classifier for ScriptedClassifier {
    type Snapshot = usize;

    fn train_step(&mut self, _batch: &[&Example]) -> Result<f64> {
        let epoch = self.steps / self.steps_per_epoch;
        self.steps += 1;
        if self.nan_loss_at == Some(epoch) {
            return Ok(f64::NAN);
        }
        Ok(1.0 / (epoch + 1) as f64)
    }

    fn snapshot(&self) -> usize {
        self.current_epoch()
    }

    fn restore(&mut self, snapshot: usize) {
        self.restored = Some(snapshot);
    }
}

/// Hands out a ScriptedClassifier per fold with that fold's scores.
pub struct ScriptedFactory {
    pub per_fold:    Vec<Vec<f64>>,
    pub batch_size:  usize,
    pub nan_fold:    Option<usize>,
}

impl ClassifierFactory for ScriptedFactory {
    type Model = ScriptedClassifier;

    fn create(&self, fold_id: usize, train_size: usize) -> Result<ScriptedClassifier> {
        let scores = self.per_fold[fold_id % self.per_fold.len()].clone();
        let model  = ScriptedClassifier::new(scores, train_size, self.batch_size);
        Ok(match self.nan_fold {
            Some(f) if f == fold_id => model.with_nan_loss_at(0),
            _                       => model,
        })
    }
}

/// Records (fold_id, snapshot) for every persisted fold.
#[derive(Default)]
pub struct RecordingSink {
    pub saved: RefCell<Vec<(usize, usize)>>,
}

impl CheckpointSink<usize> for RecordingSink {
    fn persist_fold(&self, fold_id: usize, snapshot: &usize) -> Result<()> {
        self.saved.borrow_mut().push((fold_id, *snapshot));
        Ok(())
    }
}

/// Predictor answering from a fixed text → prediction table.
pub struct TablePredictor {
    pub table: HashMap<String, Prediction>,
}

impl Predictor for TablePredictor {
    fn predict(&self, texts: &[&str]) -> Result<Vec<Prediction>> {
        texts
            .iter()
            .map(|t| {
                self.table
                    .get(*t)
                    .cloned()
                    .ok_or_else(|| anyhow::anyhow!("no scripted prediction for '{t}'"))
            })
            .collect()
    }
}
