// ============================================================
// Layer 4 — Corpus Loader
// ============================================================
// Loads a labelled corpus from a two-column CSV file:
//
//   text,label
//   "save this article for later",save
//   "what did I save about rust",search
//
// Row handling:
//   - rows with an empty / missing text or label are dropped
//     (hand-collected user files contain blank lines)
//   - a label outside the label set aborts loading with a
//     LabelMapping error naming the value and the data row;
//     it is never deferred to training
//   - text goes through the Preprocessor so training and
//     prediction see identically cleaned strings
//
// Reference: csv crate documentation
//            Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::data::preprocessor::Preprocessor;
use crate::domain::error::IntentError;
use crate::domain::example::{Corpus, Example};
use crate::domain::label::Label;
use crate::domain::traits::CorpusSource;

/// Raw CSV row. Both columns are optional so blank cells can be
/// skipped instead of failing deserialisation.
#[derive(Debug, Deserialize)]
struct CorpusRow {
    text:  Option<String>,
    label: Option<String>,
}

/// Loads one CSV file. Implements CorpusSource.
pub struct CsvCorpusLoader {
    path:         PathBuf,
    preprocessor: Preprocessor,
}

impl CsvCorpusLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path:         path.into(),
            preprocessor: Preprocessor::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CorpusSource for CsvCorpusLoader {
    fn load_corpus(&self) -> Result<Corpus> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Fields)
            .from_path(&self.path)
            .with_context(|| format!("Cannot open corpus file '{}'", self.path.display()))?;

        let mut examples = Vec::new();
        let mut skipped  = 0usize;

        for (i, row) in reader.deserialize::<CorpusRow>().enumerate() {
            // 1-based data row (the header is not counted)
            let row_no = i + 1;
            let row = row.with_context(|| {
                format!("Malformed row {} in '{}'", row_no, self.path.display())
            })?;

            let text  = row.text.map(|t| self.preprocessor.clean(&t)).unwrap_or_default();
            let label = row.label.unwrap_or_default();

            if text.is_empty() || label.trim().is_empty() {
                skipped += 1;
                tracing::debug!("Skipping blank row {} in '{}'", row_no, self.path.display());
                continue;
            }

            let label: Label = label.parse().map_err(|_| IntentError::LabelMapping {
                value: label.clone(),
                row:   Some(row_no),
            })?;

            examples.push(Example { text, label });
        }

        tracing::info!(
            "Loaded {} examples from '{}' ({} blank rows skipped)",
            examples.len(),
            self.path.display(),
            skipped,
        );

        Ok(Corpus::new(examples))
    }
}

/// Merge the train and validation files into the cross-validation pool.
/// The held-out test file is loaded separately and never merged.
pub fn load_cv_pool(train: impl AsRef<Path>, validation: impl AsRef<Path>) -> Result<Corpus> {
    let train      = CsvCorpusLoader::new(train.as_ref()).load_corpus()?;
    let validation = CsvCorpusLoader::new(validation.as_ref()).load_corpus()?;
    Ok(train.concat(validation))
}

/// Load an optional evaluation file. A missing file is skipped with a
/// warning and yields `None`; any other problem is an error.
pub fn load_optional(path: impl AsRef<Path>) -> Result<Option<Corpus>> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!("Dataset file '{}' does not exist, skipping", path.display());
        return Ok(None);
    }
    let corpus = CsvCorpusLoader::new(path).load_corpus()?;
    if corpus.is_empty() {
        tracing::warn!("Dataset file '{}' has no usable rows, skipping", path.display());
        return Ok(None);
    }
    Ok(Some(corpus))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_csv(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_loads_and_cleans_rows() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "train.csv",
            "text,label\n\"save   this  link\",save\nfind my notes,search\n",
        );

        let corpus = CsvCorpusLoader::new(&path).load_corpus().unwrap();
        assert_eq!(corpus.len(), 2);
        assert_eq!(corpus.examples()[0], Example::new("save this link", Label::Save));
        assert_eq!(corpus.examples()[1].label, Label::Search);
    }

    #[test]
    fn test_blank_rows_are_dropped() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "user.csv",
            "text,label\n,save\n   ,search\nremind me at 5,\nremind me at 6,reminder\n",
        );

        let corpus = CsvCorpusLoader::new(&path).load_corpus().unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.examples()[0].label, Label::Reminder);
    }

    #[test]
    fn test_unknown_label_fails_at_load_time() {
        let dir  = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "bad.csv", "text,label\nok,save\nnope,delete\n");

        let err = CsvCorpusLoader::new(&path).load_corpus().unwrap_err();
        match err.downcast_ref::<IntentError>() {
            Some(IntentError::LabelMapping { value, row }) => {
                assert_eq!(value, "delete");
                assert_eq!(*row, Some(2));
            }
            other => panic!("expected LabelMapping, got {other:?}"),
        }
    }

    #[test]
    fn test_cv_pool_merges_train_and_validation() {
        let dir   = tempfile::tempdir().unwrap();
        let train = write_csv(&dir, "train.csv", "text,label\na,save\nb,search\n");
        let val   = write_csv(&dir, "val.csv", "text,label\nc,unclear\n");

        let pool = load_cv_pool(&train, &val).unwrap();
        assert_eq!(pool.len(), 3);
        assert_eq!(pool.examples()[2].label, Label::Unclear);
    }

    #[test]
    fn test_missing_optional_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_optional(dir.path().join("absent.csv")).unwrap().is_none());

        let empty = write_csv(&dir, "empty.csv", "text,label\n,\n");
        assert!(load_optional(&empty).unwrap().is_none());
    }
}
