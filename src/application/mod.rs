// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates all the other layers to accomplish
// one user-facing goal (train, evaluate, predict).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No UI or printing here (that's Layer 1)
//   - No direct file parsing (that's Layer 4 and 6)
//   - Only workflow coordination
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// Cross-validated training workflow
pub mod train_use_case;

// Combined evaluation over named datasets
pub mod evaluate_use_case;

// Single-utterance inference
pub mod predict_use_case;
