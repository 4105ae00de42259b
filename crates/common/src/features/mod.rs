//! TF-IDF feature snapshot
//!
//! An immutable bundle of the sparse document-term matrix, the document
//! ids aligned to its rows, the vocabulary and the idf vector. The
//! id-to-row and column-to-term lookups are built once here and nowhere
//! else; every ranking function goes through them.

mod store;

pub use store::{FeatureFile, FileFeatureStore, StaticFeatureStore};

use crate::errors::{AppError, Result};
use sprs::{CsMat, CsVecView, TriMat};
use std::collections::HashMap;
use std::sync::Arc;

/// Source of feature snapshots
pub trait FeatureStore: Send + Sync {
    /// Current snapshot; callers must treat it as read-only
    fn load(&self) -> Result<Arc<FeatureSnapshot>>;
}

/// Immutable sparse feature matrix with its row and column keys
#[derive(Debug, Clone)]
pub struct FeatureSnapshot {
    /// Row-major, rows = documents, columns = terms
    x: CsMat<f64>,
    pids: Vec<String>,
    rows: HashMap<String, usize>,
    vocab: HashMap<String, usize>,
    terms: Vec<String>,
    idf: Vec<f64>,
}

impl FeatureSnapshot {
    /// Assemble a snapshot, checking every structural invariant
    pub fn new(
        x: CsMat<f64>,
        pids: Vec<String>,
        vocab: HashMap<String, usize>,
        idf: Vec<f64>,
    ) -> Result<Self> {
        if !x.is_csr() {
            return Err(invalid("feature matrix must be row-major"));
        }
        if x.rows() != pids.len() {
            return Err(invalid(format!(
                "matrix has {} rows but {} pids",
                x.rows(),
                pids.len()
            )));
        }
        if vocab.len() != x.cols() {
            return Err(invalid(format!(
                "matrix has {} columns but vocabulary has {} terms",
                x.cols(),
                vocab.len()
            )));
        }
        if idf.len() != vocab.len() {
            return Err(invalid(format!(
                "idf has {} entries but vocabulary has {} terms",
                idf.len(),
                vocab.len()
            )));
        }

        let mut rows = HashMap::with_capacity(pids.len());
        for (row, pid) in pids.iter().enumerate() {
            if rows.insert(pid.clone(), row).is_some() {
                return Err(invalid(format!("duplicate pid {} in snapshot", pid)));
            }
        }

        let mut terms: Vec<Option<String>> = vec![None; vocab.len()];
        for (term, &col) in &vocab {
            let slot = terms
                .get_mut(col)
                .ok_or_else(|| invalid(format!("term {} maps past column range", term)))?;
            if let Some(other) = slot {
                return Err(invalid(format!(
                    "terms {} and {} share column {}",
                    other, term, col
                )));
            }
            *slot = Some(term.clone());
        }
        // Every slot is filled: vocab.len() == terms.len() and no collisions
        let terms = terms.into_iter().flatten().collect();

        Ok(Self {
            x,
            pids,
            rows,
            vocab,
            terms,
            idf,
        })
    }

    /// Build from per-row `(column, weight)` lists; repeated columns are summed
    pub fn from_rows(
        pids: Vec<String>,
        vocab: HashMap<String, usize>,
        idf: Vec<f64>,
        rows: &[Vec<(usize, f64)>],
    ) -> Result<Self> {
        let n_cols = vocab.len();
        let mut tri = TriMat::new((rows.len(), n_cols));
        for (row, entries) in rows.iter().enumerate() {
            for &(col, weight) in entries {
                if col >= n_cols {
                    return Err(invalid(format!(
                        "row {} references column {} of {}",
                        row, col, n_cols
                    )));
                }
                if !weight.is_finite() {
                    return Err(invalid(format!("row {} has a non-finite weight", row)));
                }
                tri.add_triplet(row, col, weight);
            }
        }
        let x: CsMat<f64> = tri.to_csr();
        Self::new(x, pids, vocab, idf)
    }

    /// Number of documents (matrix rows)
    pub fn n_docs(&self) -> usize {
        self.pids.len()
    }

    /// Number of terms (matrix columns)
    pub fn n_terms(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pids.is_empty()
    }

    /// Document ids in row order
    pub fn pids(&self) -> &[String] {
        &self.pids
    }

    /// Row index of a document id
    pub fn row_of(&self, pid: &str) -> Option<usize> {
        self.rows.get(pid).copied()
    }

    /// Document id stored at a row
    pub fn pid_at(&self, row: usize) -> Option<&str> {
        self.pids.get(row).map(String::as_str)
    }

    /// Column index of a term
    pub fn column_of(&self, term: &str) -> Option<usize> {
        self.vocab.get(term).copied()
    }

    /// Term stored at a column
    pub fn term_at(&self, col: usize) -> Option<&str> {
        self.terms.get(col).map(String::as_str)
    }

    pub fn idf(&self) -> &[f64] {
        &self.idf
    }

    pub fn matrix(&self) -> &CsMat<f64> {
        &self.x
    }

    /// Sparse view of one document's row
    pub fn row(&self, row: usize) -> Option<CsVecView<'_, f64>> {
        self.x.outer_view(row)
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::FeaturesInvalid {
        message: message.into(),
    }
}
