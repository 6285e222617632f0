// ============================================================
// Layer 4 — Fixed-Length Text Encoder
// ============================================================
// Converts an utterance into exactly `max_len` token ids plus an
// attention mask of the same length:
//
//   [CLS] tok tok tok ... [SEP] [PAD] [PAD] ...
//     1    1   1   1  ...   1     0     0   ...
//
// Utterances longer than max_len - 2 tokens are truncated
// before the [SEP] marker, so the sequence is always closed.
//
// The classifier's confidence is only meaningful when training
// and inference encode text the same way. Both go through this
// one type, built from the same tokenizer.json and max_len.
//
// Reference: Devlin et al. (2019) BERT input format
//            tokenizers crate documentation

use anyhow::Result;
use std::sync::Arc;
use tokenizers::Tokenizer;

use crate::data::preprocessor::Preprocessor;
use crate::infra::tokenizer_store::{CLS_ID, PAD_ID, SEP_ID};

/// One encoded utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedText {
    pub input_ids:      Vec<u32>,
    pub attention_mask: Vec<u32>,
}

impl EncodedText {
    /// Build the padded sequence from raw token ids.
    pub fn from_token_ids(token_ids: &[u32], max_len: usize) -> Self {
        let body = max_len.saturating_sub(2);

        let mut input_ids = Vec::with_capacity(max_len);
        input_ids.push(CLS_ID);
        input_ids.extend(token_ids.iter().copied().take(body));
        input_ids.push(SEP_ID);

        let real_len           = input_ids.len();
        let mut attention_mask = vec![1u32; real_len];

        input_ids.resize(max_len, PAD_ID);
        attention_mask.resize(max_len, 0);

        Self { input_ids, attention_mask }
    }

    /// Number of non-padding positions.
    pub fn real_len(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m == 1).count()
    }
}

#[derive(Clone)]
pub struct TextEncoder {
    tokenizer:    Arc<Tokenizer>,
    max_len:      usize,
    preprocessor: Preprocessor,
}

impl TextEncoder {
    pub fn new(tokenizer: Tokenizer, max_len: usize) -> Self {
        Self {
            tokenizer: Arc::new(tokenizer),
            max_len,
            preprocessor: Preprocessor::new(),
        }
    }

    pub fn encode(&self, text: &str) -> Result<EncodedText> {
        let clean = self.preprocessor.clean(text);
        let enc   = self
            .tokenizer
            .encode(clean.as_str(), false)
            .map_err(|e| anyhow::anyhow!("Tokenisation error: {e}"))?;
        Ok(EncodedText::from_token_ids(enc.get_ids(), self.max_len))
    }

    pub fn encode_batch(&self, texts: &[&str]) -> Result<Vec<EncodedText>> {
        texts.iter().map(|t| self.encode(t)).collect()
    }
}
