// ============================================================
// Layer 3 — Labelled Examples and Corpus
// ============================================================
// An Example is one (text, label) row. A Corpus is an ordered,
// read-only sequence of them. Duplicates are legal: the data
// generators repeat some phrasings on purpose to weight classes.
//
// Reference: Rust Book §5 (Structs), §8 (Vectors)

use serde::{Deserialize, Serialize};

use crate::domain::label::{Label, NUM_LABELS};

/// One labelled utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub text:  String,
    pub label: Label,
}

impl Example {
    pub fn new(text: impl Into<String>, label: Label) -> Self {
        Self { text: text.into(), label }
    }
}

/// Ordered collection of examples. Labels are typed, so every
/// example is a member of the label set by construction.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    examples: Vec<Example>,
}

impl Corpus {
    pub fn new(examples: Vec<Example>) -> Self {
        Self { examples }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn examples(&self) -> &[Example] {
        &self.examples
    }

    pub fn texts(&self) -> Vec<String> {
        self.examples.iter().map(|e| e.text.clone()).collect()
    }

    /// Number of examples per label, indexed by label id.
    pub fn label_counts(&self) -> [usize; NUM_LABELS] {
        let mut counts = [0usize; NUM_LABELS];
        for e in &self.examples {
            counts[e.label.id()] += 1;
        }
        counts
    }

    /// Concatenate two corpora (used to merge train + validation
    /// files into the cross-validation pool).
    pub fn concat(mut self, other: Corpus) -> Corpus {
        self.examples.extend(other.examples);
        self
    }
}

impl FromIterator<Example> for Corpus {
    fn from_iter<I: IntoIterator<Item = Example>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_counts() {
        let corpus: Corpus = vec![
            Example::new("save this", Label::Save),
            Example::new("save that", Label::Save),
            Example::new("hmm", Label::Unclear),
        ]
        .into_iter()
        .collect();
        let counts = corpus.label_counts();
        assert_eq!(counts[Label::Save.id()], 2);
        assert_eq!(counts[Label::Unclear.id()], 1);
        assert_eq!(counts[Label::Search.id()], 0);
    }

    #[test]
    fn test_concat_keeps_order_and_duplicates() {
        let a = Corpus::new(vec![Example::new("x", Label::Save)]);
        let b = Corpus::new(vec![Example::new("x", Label::Save)]);
        let merged = a.concat(b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.examples()[0], merged.examples()[1]);
    }
}
