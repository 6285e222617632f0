// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between a CSV file on disk and a tensor batch:
//
//   intent_train.csv / intent_val.csv / intent_test.csv
//       │
//       ▼
//   CsvCorpusLoader   → parses rows, drops blanks, maps labels
//       │
//       ▼
//   Preprocessor      → normalises whitespace / control chars
//       │
//       ▼
//   StratifiedKFold   → k disjoint, label-balanced folds
//       │
//       ▼
//   TextEncoder       → [CLS] tokens [SEP] + padding + mask
//       │
//       ▼
//   IntentBatcher     → stacks encoded items into tensors
//
// Reference: Burn Book §4 (Datasets and Dataloaders)
//            Rust Book §13 (Iterators and Closures)

/// Loads labelled CSV files into a Corpus
pub mod loader;

/// Cleans and normalises utterance text
pub mod preprocessor;

/// Seeded stratified k-fold partitioning
pub mod folds;

/// Fixed-length token id / attention mask encoding
pub mod encoder;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;
