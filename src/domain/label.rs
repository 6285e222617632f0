// ============================================================
// Layer 3 — Intent Label Set
// ============================================================
// The six intents the assistant understands. The order of the
// variants IS the integer id used by the model head, the
// confusion matrix rows/columns and every persisted artifact:
//
//   0 save   1 search   2 reminder
//   3 cancel_all   4 cancel_specific   5 unclear
//
// `Unclear` doubles as the fallback label emitted when the
// model is not confident enough to act.
//
// Reference: Rust Book §6 (Enums), §10 (Traits)

use std::{collections::BTreeMap, fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::domain::error::IntentError;

/// Number of labels in the set. The classifier head has exactly this many outputs.
pub const NUM_LABELS: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Save,
    Search,
    Reminder,
    CancelAll,
    CancelSpecific,
    Unclear,
}

/// The distinguished "no safe decision" label.
pub const UNCLEAR_LABEL: Label = Label::Unclear;

impl Label {
    /// All labels in id order.
    pub const ALL: [Label; NUM_LABELS] = [
        Label::Save,
        Label::Search,
        Label::Reminder,
        Label::CancelAll,
        Label::CancelSpecific,
        Label::Unclear,
    ];

    /// Stable integer id of this label.
    pub fn id(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Label::Save           => "save",
            Label::Search         => "search",
            Label::Reminder       => "reminder",
            Label::CancelAll      => "cancel_all",
            Label::CancelSpecific => "cancel_specific",
            Label::Unclear        => "unclear",
        }
    }

    /// id → name map, written next to models and metrics so the
    /// integer ids can always be decoded.
    pub fn id_map() -> BTreeMap<usize, String> {
        Self::ALL
            .iter()
            .map(|l| (l.id(), l.as_str().to_string()))
            .collect()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Label {
    type Err = IntentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|l| l.as_str() == wanted)
            .ok_or_else(|| IntentError::LabelMapping {
                value: s.to_string(),
                row:   None,
            })
    }
}
