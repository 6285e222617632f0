// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File formats and persistence shared by the other layers:
//
//   checkpoint.rs      — fold / best model weights via Burn's
//                        CompactRecorder, best_model.json and
//                        train_config.json
//
//   tokenizer_store.rs — builds the word-level tokenizer from
//                        the training pool or loads the saved
//                        one, so training and inference share
//                        one vocabulary
//
//   metrics.rs         — training_history.csv and the JSON
//                        result artifacts (cv_results.json,
//                        combined_results.json)
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Epoch history CSV and result artifacts
pub mod metrics;
