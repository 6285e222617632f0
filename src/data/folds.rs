// ============================================================
// Layer 4 — Stratified K-Fold Partitioner
// ============================================================
// Splits the cross-validation pool into k disjoint folds so
// that every fold holds (almost) the same share of each label.
//
// Algorithm:
//   1. Group example indices by label
//   2. Shuffle each group with a seeded StdRng; the same seed
//      always yields the same partition
//   3. Deal each group round-robin over the k folds. The deal
//      for label L starts where the previous label stopped, so
//      leftover examples spread over different folds instead of
//      piling into fold 0
//
// Per fold, label L gets either floor(n_L / k) or ceil(n_L / k)
// examples. Fold i is the validation subset of split i; the
// other k-1 folds form its training subset.
//
// Every label must have at least k examples, otherwise some
// fold would have no validation example for it.
//
// Reference: rand crate documentation (SeedableRng, SliceRandom)
//            Kohavi (1995) cross-validation study

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::domain::error::IntentError;
use crate::domain::example::{Corpus, Example};
use crate::domain::label::{Label, NUM_LABELS};

/// One train/validation split. Borrows the examples from the
/// read-only corpus; nothing is copied.
#[derive(Debug, Clone)]
pub struct FoldSplit<'a> {
    pub fold_id:    usize,
    pub train:      Vec<&'a Example>,
    pub validation: Vec<&'a Example>,
}

#[derive(Debug, Clone, Copy)]
pub struct StratifiedKFold {
    k:    usize,
    seed: u64,
}

impl StratifiedKFold {
    pub fn new(k: usize, seed: u64) -> Result<Self, IntentError> {
        if k < 2 {
            return Err(IntentError::invalid_config("folds", format!("must be at least 2, got {k}")));
        }
        Ok(Self { k, seed })
    }

    /// Fail fast when a label is too rare to appear in every fold.
    /// Labels are checked in id order; the first offender is reported.
    pub fn check_sufficient(&self, corpus: &Corpus) -> Result<(), IntentError> {
        let counts = corpus.label_counts();
        for label in Label::ALL {
            let available = counts[label.id()];
            if available < self.k {
                return Err(IntentError::InsufficientData {
                    label,
                    available,
                    required: self.k,
                });
            }
        }
        Ok(())
    }

    /// Fold id of every example, indexed like the corpus.
    pub fn assign(&self, corpus: &Corpus) -> Result<Vec<usize>, IntentError> {
        self.check_sufficient(corpus)?;

        // ── Group indices by label ────────────────────────────────────────────
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); NUM_LABELS];
        for (i, e) in corpus.examples().iter().enumerate() {
            groups[e.label.id()].push(i);
        }

        // ── Shuffle and deal round-robin ──────────────────────────────────────
        let mut rng        = StdRng::seed_from_u64(self.seed);
        let mut assignment = vec![0usize; corpus.len()];
        let mut offset     = 0usize;

        for group in &mut groups {
            group.shuffle(&mut rng);
            for (j, &idx) in group.iter().enumerate() {
                assignment[idx] = (offset + j) % self.k;
            }
            offset = (offset + group.len()) % self.k;
        }

        Ok(assignment)
    }

    /// Build all k splits. Subsets keep corpus order.
    pub fn split<'a>(&self, corpus: &'a Corpus) -> Result<Vec<FoldSplit<'a>>, IntentError> {
        let assignment = self.assign(corpus)?;

        let mut splits: Vec<FoldSplit<'a>> = (0..self.k)
            .map(|fold_id| FoldSplit { fold_id, train: Vec::new(), validation: Vec::new() })
            .collect();

        for (example, &fold) in corpus.examples().iter().zip(&assignment) {
            for split in &mut splits {
                if split.fold_id == fold {
                    split.validation.push(example);
                } else {
                    split.train.push(example);
                }
            }
        }

        for split in &splits {
            tracing::debug!(
                "Fold {}: {} train, {} validation",
                split.fold_id,
                split.train.len(),
                split.validation.len(),
            );
        }

        Ok(splits)
    }
}
