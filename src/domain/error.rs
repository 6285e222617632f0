// ============================================================
// Layer 3 — Domain Errors
// ============================================================
// Every failure the core can raise. Each variant carries the
// fold, label and numeric condition involved so the message
// printed to the user is never a bare "training failed".
//
// Data-integrity errors (InsufficientData, LabelMapping,
// ThresholdRange, InvalidConfig) are raised before any
// training starts. DivergedTraining is raised inside a fold.
//
// Reference: Rust Book §9 (Error Handling)
//            thiserror crate documentation

use thiserror::Error;

use crate::domain::label::Label;

#[derive(Debug, Error)]
pub enum IntentError {
    #[error(
        "insufficient data: label '{label}' has {available} examples but {required} folds need at least {required}"
    )]
    InsufficientData {
        label:     Label,
        available: usize,
        required:  usize,
    },

    /// `fold` and `epoch` are 0-based; the message prints them 1-based.
    #[error("training diverged in fold {} at epoch {}: {metric} = {value}", .fold + 1, .epoch + 1)]
    DivergedTraining {
        fold:   usize,
        epoch:  usize,
        metric: &'static str,
        value:  f64,
    },

    #[error("unknown label '{value}'{}", .row.map(|r| format!(" at row {r}")).unwrap_or_default())]
    LabelMapping {
        value: String,
        row:   Option<usize>,
    },

    #[error("confidence threshold {value} is outside [0, 1]")]
    ThresholdRange { value: f64 },

    #[error("invalid configuration: {field} {reason}")]
    InvalidConfig {
        field:  &'static str,
        reason: String,
    },

    #[error("fold {} has an empty {subset} subset", .fold + 1)]
    EmptySplit {
        fold:   usize,
        subset: &'static str,
    },

    #[error("all {attempted} folds failed; no model to select")]
    NoSuccessfulFolds { attempted: usize },

    /// Failure raised by a classifier / checkpoint collaborator.
    #[error(transparent)]
    Classifier(#[from] anyhow::Error),
}

impl IntentError {
    pub fn invalid_config(field: &'static str, reason: impl Into<String>) -> Self {
        IntentError::InvalidConfig { field, reason: reason.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_condition() {
        let err = IntentError::InsufficientData {
            label:     Label::Reminder,
            available: 3,
            required:  5,
        };
        let msg = err.to_string();
        assert!(msg.contains("reminder"));
        assert!(msg.contains('3'));
        assert!(msg.contains('5'));

        let err = IntentError::DivergedTraining {
            fold:   2,
            epoch:  4,
            metric: "train_loss",
            value:  f64::NAN,
        };
        assert!(err.to_string().contains("fold 3 at epoch 5"));
    }

    #[test]
    fn test_fold_numbers_print_one_based() {
        let err = IntentError::EmptySplit { fold: 0, subset: "validation" };
        assert_eq!(err.to_string(), "fold 1 has an empty validation subset");

        let err = IntentError::DivergedTraining { fold: 1, epoch: 0, metric: "val_accuracy", value: f64::NAN };
        assert!(err.to_string().starts_with("training diverged in fold 2 at epoch 1:"));
    }

    #[test]
    fn test_label_mapping_mentions_row() {
        let err = IntentError::LabelMapping { value: "x".into(), row: Some(7) };
        assert_eq!(err.to_string(), "unknown label 'x' at row 7");
        let err = IntentError::LabelMapping { value: "x".into(), row: None };
        assert_eq!(err.to_string(), "unknown label 'x'");
    }
}
