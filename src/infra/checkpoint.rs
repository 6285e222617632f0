// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model weights using Burn's CompactRecorder.
//
// What gets saved:
//   1. fold_{n}_best.mpk.gz  — best weights of fold n (1-based),
//                              written as soon as the fold ends
//   2. best_model.mpk.gz     — weights of the winning fold
//   3. best_model.json       — which fold won, its validation
//                              accuracy and the label id map
//   4. train_config.json     — architecture + encoding settings
//
// The config is needed to rebuild the exact architecture (and
// the same max_seq_len) before the weights can be loaded.
// CompactRecorder fails loudly if the shapes do not match.
//
// File layout:
//   checkpoints/
//     fold_1_best.mpk.gz
//     ...
//     best_model.mpk.gz
//     best_model.json
//     train_config.json
//     tokenizer.json        ← written by TokenizerStore
//
// Reference: Burn Book §5 (Records and Checkpointing)
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use burn::{
    prelude::*,
    record::{CompactRecorder, Recorder},
};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use crate::application::train_use_case::TrainConfig;
use crate::domain::label::Label;
use crate::domain::traits::CheckpointSink;
use crate::ml::model::TransformerIntentModel;

const BEST_MODEL: &str = "best_model";

/// Metadata stored next to the winning model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestModelInfo {
    /// 1-based fold number
    pub fold:                usize,
    pub validation_accuracy: f64,
    pub labels:              BTreeMap<usize, String>,
}

impl BestModelInfo {
    pub fn new(fold_id: usize, validation_accuracy: f64) -> Self {
        Self { fold: fold_id + 1, validation_accuracy, labels: Label::id_map() }
    }
}

/// Manages saving and loading of model checkpoints.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    /// Creates the directory if it doesn't already exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Cannot create checkpoint directory '{}'", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `fold_{n}_best` with n 1-based. The recorder adds the extension.
    pub fn fold_path(&self, fold_id: usize) -> PathBuf {
        self.dir.join(format!("fold_{}_best", fold_id + 1))
    }

    fn save_model<B: Backend>(&self, model: &TransformerIntentModel<B>, path: PathBuf) -> Result<()> {
        CompactRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save checkpoint to '{}'", path.display()))?;
        Ok(())
    }

    fn load_model<B: Backend>(
        &self,
        model:  TransformerIntentModel<B>,
        path:   PathBuf,
        device: &B::Device,
    ) -> Result<TransformerIntentModel<B>> {
        let record = CompactRecorder::new()
            .load(path.clone(), device)
            .with_context(|| {
                format!("Cannot load checkpoint '{}'. Have you trained the model first?", path.display())
            })?;
        Ok(model.load_record(record))
    }

    pub fn save_fold<B: Backend>(&self, fold_id: usize, model: &TransformerIntentModel<B>) -> Result<()> {
        self.save_model(model, self.fold_path(fold_id))?;
        tracing::debug!("Saved fold {} checkpoint", fold_id + 1);
        Ok(())
    }

    /// Save the winning model and its metadata.
    pub fn save_best<B: Backend>(&self, model: &TransformerIntentModel<B>, info: &BestModelInfo) -> Result<()> {
        self.save_model(model, self.dir.join(BEST_MODEL))?;

        let path = self.dir.join(format!("{BEST_MODEL}.json"));
        fs::write(&path, serde_json::to_string_pretty(info)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;

        tracing::info!(
            "Saved best model (fold {}, val_acc={:.4}) to '{}'",
            info.fold,
            info.validation_accuracy,
            self.dir.display(),
        );
        Ok(())
    }

    /// Load the winning model's weights into `model`.
    pub fn load_best<B: Backend>(
        &self,
        model:  TransformerIntentModel<B>,
        device: &B::Device,
    ) -> Result<TransformerIntentModel<B>> {
        let info = self.load_best_info()?;
        tracing::info!("Loading best model from fold {}", info.fold);
        self.load_model(model, self.dir.join(BEST_MODEL), device)
    }

    pub fn load_best_info(&self) -> Result<BestModelInfo> {
        let path = self.dir.join(format!("{BEST_MODEL}.json"));
        let json = fs::read_to_string(&path)
            .with_context(|| format!("Cannot read '{}'. Have you run 'train' first?", path.display()))?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Must be called before training starts so inference can
    /// reconstruct the exact model architecture.
    pub fn save_config(&self, cfg: &TrainConfig) -> Result<()> {
        let path = self.dir.join("train_config.json");
        let json = serde_json::to_string_pretty(cfg)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write config to '{}'", path.display()))?;
        tracing::debug!("Saved training config to '{}'", path.display());
        Ok(())
    }

    pub fn load_config(&self) -> Result<TrainConfig> {
        let path = self.dir.join("train_config.json");
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read config from '{}'. Make sure you have run 'train' first.",
                path.display()
            )
        })?;
        Ok(serde_json::from_str(&json)?)
    }
}

impl<B: Backend> CheckpointSink<TransformerIntentModel<B>> for CheckpointManager {
    fn persist_fold(&self, fold_id: usize, snapshot: &TransformerIntentModel<B>) -> Result<()> {
        self.save_fold(fold_id, snapshot)
    }
}
