// ============================================================
// Layer 4 — Intent Batcher
// ============================================================
// Implements Burn's Batcher trait to turn encoded utterances
// into tensors for one forward pass.
//
//   Input:  Vec of N IntentItems, each padded to length S
//   Output: IntentBatch with
//             input_ids      [N, S]  Int
//             attention_mask [N, S]  Int (1 = real, 0 = pad)
//             labels         [N]     Int (label ids)
//
// All sequences already have the same length (TextEncoder pads
// them), so batching is a flatten + reshape.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::data::encoder::EncodedText;

/// An encoded utterance plus its label id (0 at inference time,
/// where labels are ignored).
#[derive(Debug, Clone)]
pub struct IntentItem {
    pub encoded: EncodedText,
    pub label:   usize,
}

#[derive(Debug, Clone)]
pub struct IntentBatch<B: Backend> {
    pub input_ids:      Tensor<B, 2, Int>,
    pub attention_mask: Tensor<B, 2, Int>,
    pub labels:         Tensor<B, 1, Int>,
}

#[derive(Clone, Debug)]
pub struct IntentBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> IntentBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<IntentItem, IntentBatch<B>> for IntentBatcher<B> {
    fn batch(&self, items: Vec<IntentItem>) -> IntentBatch<B> {
        let batch_size = items.len();
        let seq_len    = items.first().map(|i| i.encoded.input_ids.len()).unwrap_or(0);

        // Burn Int tensors are built from i32 slices
        let input_flat: Vec<i32> = items
            .iter()
            .flat_map(|i| i.encoded.input_ids.iter().map(|&x| x as i32))
            .collect();

        let mask_flat: Vec<i32> = items
            .iter()
            .flat_map(|i| i.encoded.attention_mask.iter().map(|&x| x as i32))
            .collect();

        let labels: Vec<i32> = items.iter().map(|i| i.label as i32).collect();

        let input_ids = Tensor::<B, 1, Int>::from_ints(input_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        let attention_mask = Tensor::<B, 1, Int>::from_ints(mask_flat.as_slice(), &self.device)
            .reshape([batch_size, seq_len]);

        let labels = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        IntentBatch { input_ids, attention_mask, labels }
    }
}
