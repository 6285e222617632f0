// ============================================================
// Layer 6 — Tokenizer Store
// ============================================================
// Builds, saves and loads the word-level tokenizer shared by
// training and inference.
//
// The vocabulary is built from the cross-validation pool only
// (never from test files) and written as a HuggingFace
// tokenizer.json next to the checkpoints. Inference loads the
// same file, so both sides map words to identical ids.
//
// Special token ids follow the BERT convention; TextEncoder
// inserts [CLS] / [SEP] / [PAD] itself using these constants.
//
// Reference: tokenizers crate documentation

use anyhow::{Context, Result};
use std::{collections::HashMap, path::PathBuf};
use tokenizers::Tokenizer;

pub const PAD_ID:  u32 = 0;
pub const UNK_ID:  u32 = 1;
pub const CLS_ID:  u32 = 101;
pub const SEP_ID:  u32 = 102;
pub const MASK_ID: u32 = 103;

/// First id handed to a corpus word. A vocabulary must be larger
/// than this to hold the special tokens plus one word.
pub const FIRST_WORD_ID: usize = 104;

pub struct TokenizerStore {
    dir: PathBuf,
}

impl TokenizerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self) -> PathBuf {
        self.dir.join("tokenizer.json")
    }

    /// Build a fresh tokenizer from `texts` and overwrite any saved one.
    /// Every id it hands out is below `vocab_size`.
    pub fn build(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        if vocab_size <= FIRST_WORD_ID {
            anyhow::bail!("vocab_size must exceed {FIRST_WORD_ID}, got {vocab_size}");
        }
        if self.path().exists() {
            tracing::info!("Replacing tokenizer at '{}'", self.path().display());
        }
        tracing::info!("Building new tokenizer (vocab_size={})", vocab_size);
        self.build_and_save(texts, vocab_size)
    }

    /// Load the tokenizer saved by `build`. Used by inference only.
    pub fn load(&self) -> Result<Tokenizer> {
        let path = self.path();
        Tokenizer::from_file(&path).map_err(|e| {
            anyhow::anyhow!(
                "Cannot load tokenizer from '{}': {}. Have you run 'train' first?",
                path.display(),
                e
            )
        })
    }

    /// Write a WordLevel tokenizer JSON built from word frequencies.
    fn build_and_save(&self, texts: &[String], vocab_size: usize) -> Result<Tokenizer> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create '{}'", self.dir.display()))?;

        let words = top_words(texts, vocab_size.saturating_sub(FIRST_WORD_ID));

        // ── Vocabulary: special tokens first, then words by frequency ─────────
        let mut vocab = serde_json::json!({
            "[PAD]":  PAD_ID,
            "[UNK]":  UNK_ID,
            "[CLS]":  CLS_ID,
            "[SEP]":  SEP_ID,
            "[MASK]": MASK_ID,
        });

        let mut next_id = FIRST_WORD_ID;
        for word in &words {
            if vocab.get(word).is_none() {
                vocab[word] = serde_json::json!(next_id);
                next_id += 1;
            }
        }

        let special = |id: u32, content: &str| {
            serde_json::json!({
                "id": id, "content": content, "single_word": false, "lstrip": false,
                "rstrip": false, "normalized": false, "special": true
            })
        };

        let tokenizer_json = serde_json::json!({
            "version": "1.0",
            "truncation": null,
            "padding": null,
            "added_tokens": [
                special(PAD_ID, "[PAD]"),
                special(UNK_ID, "[UNK]"),
                special(CLS_ID, "[CLS]"),
                special(SEP_ID, "[SEP]"),
                special(MASK_ID, "[MASK]"),
            ],
            "normalizer": {
                "type": "BertNormalizer",
                "clean_text": true,
                "handle_chinese_chars": true,
                "strip_accents": null,
                "lowercase": true
            },
            "pre_tokenizer": { "type": "Whitespace" },
            "post_processor": null,
            "decoder": null,
            "model": {
                "type": "WordLevel",
                "vocab": vocab,
                "unk_token": "[UNK]"
            }
        });

        let path = self.path();
        std::fs::write(&path, serde_json::to_string_pretty(&tokenizer_json)?)
            .with_context(|| format!("Cannot write tokenizer to '{}'", path.display()))?;

        tracing::info!(
            "Tokenizer built with {} corpus words, saved to '{}'",
            next_id - FIRST_WORD_ID,
            path.display()
        );

        Tokenizer::from_file(&path).map_err(|e| anyhow::anyhow!("Cannot reload tokenizer: {e}"))
    }
}

/// Most frequent lowercase words, punctuation stripped from the edges.
/// Equal counts are ordered alphabetically so the vocabulary (and thus
/// every token id) is reproducible.
fn top_words(texts: &[String], limit: usize) -> Vec<String> {
    let mut freq: HashMap<String, usize> = HashMap::new();
    for text in texts {
        for word in text.split_whitespace() {
            let w = word.to_lowercase();
            let w = w.trim_matches(|c: char| !c.is_alphanumeric());
            if !w.is_empty() {
                *freq.entry(w.to_string()).or_insert(0) += 1;
            }
        }
    }

    let mut words: Vec<(String, usize)> = freq.into_iter().collect();
    words.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    words.truncate(limit);
    words.into_iter().map(|(w, _)| w).collect()
}
