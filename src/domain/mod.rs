// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Pure Rust types and traits that define the core concepts of
// the intent classifier.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, traits and pure functions
//
// Reference: Rust Book §5 (Structs), §10 (Traits)

// The six intents and their stable integer ids
pub mod label;

// (text, label) rows and the corpus that holds them
pub mod example;

// Raw and threshold-adjusted classifier outputs
pub mod prediction;

// The confidence-threshold fallback rule
pub mod policy;

// Error taxonomy shared by every layer
pub mod error;

// Core abstractions (traits) that other layers implement
pub mod traits;
