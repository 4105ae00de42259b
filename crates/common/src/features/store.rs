//! Feature snapshot loading
//!
//! The offline featurizer writes one JSON file holding the matrix in
//! compressed-sparse-row form together with its keys. The file store
//! re-reads it only when its modification time changes.

use super::{invalid, FeatureSnapshot, FeatureStore};
use crate::errors::{AppError, Result};
use crate::metrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime};
use tracing::{debug, info};

/// On-disk layout of a snapshot (CSR arrays, as written by scipy)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureFile {
    pub pids: Vec<String>,
    pub vocab: HashMap<String, usize>,
    pub idf: Vec<f64>,
    pub indptr: Vec<usize>,
    pub indices: Vec<usize>,
    pub data: Vec<f64>,
}

impl FeatureFile {
    /// Validate the CSR arrays and assemble a snapshot
    pub fn into_snapshot(self) -> Result<FeatureSnapshot> {
        let n_rows = self.pids.len();
        if self.indptr.len() != n_rows + 1 {
            return Err(invalid(format!(
                "indptr has {} entries, expected {}",
                self.indptr.len(),
                n_rows + 1
            )));
        }
        if self.indices.len() != self.data.len() {
            return Err(invalid("indices and data lengths differ"));
        }
        if self.indptr.first() != Some(&0) || self.indptr.last() != Some(&self.indices.len()) {
            return Err(invalid("indptr does not span the stored entries"));
        }

        let mut rows = Vec::with_capacity(n_rows);
        for (row, bounds) in self.indptr.windows(2).enumerate() {
            let (start, end) = (bounds[0], bounds[1]);
            if start > end {
                return Err(invalid(format!("indptr decreases at row {}", row)));
            }
            rows.push(
                self.indices[start..end]
                    .iter()
                    .copied()
                    .zip(self.data[start..end].iter().copied())
                    .collect::<Vec<_>>(),
            );
        }

        FeatureSnapshot::from_rows(self.pids, self.vocab, self.idf, &rows)
    }

    /// Flatten a snapshot back into CSR arrays
    pub fn from_snapshot(snapshot: &FeatureSnapshot) -> Self {
        let mut indptr = Vec::with_capacity(snapshot.n_docs() + 1);
        let mut indices = Vec::new();
        let mut data = Vec::new();
        indptr.push(0);
        for row in snapshot.matrix().outer_iterator() {
            for (col, &weight) in row.iter() {
                indices.push(col);
                data.push(weight);
            }
            indptr.push(indices.len());
        }

        let vocab = (0..snapshot.n_terms())
            .filter_map(|col| snapshot.term_at(col).map(|t| (t.to_string(), col)))
            .collect();

        Self {
            pids: snapshot.pids().to_vec(),
            vocab,
            idf: snapshot.idf().to_vec(),
            indptr,
            indices,
            data,
        }
    }
}

/// Read a snapshot file from disk
pub fn read_snapshot(path: &Path) -> Result<FeatureSnapshot> {
    let start = Instant::now();
    let file = File::open(path).map_err(|e| {
        AppError::store("features", format!("failed to open {}: {}", path.display(), e))
    })?;
    let raw: FeatureFile = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
        AppError::store("features", format!("failed to parse {}: {}", path.display(), e))
    })?;
    let snapshot = raw.into_snapshot()?;

    info!(
        path = %path.display(),
        docs = snapshot.n_docs(),
        terms = snapshot.n_terms(),
        nnz = snapshot.matrix().nnz(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Feature snapshot loaded"
    );
    Ok(snapshot)
}

/// Snapshot store backed by a JSON file, cached by modification time
pub struct FileFeatureStore {
    path: PathBuf,
    cached: Mutex<Option<(SystemTime, Arc<FeatureSnapshot>)>>,
}

impl FileFeatureStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn modified(&self) -> Result<SystemTime> {
        std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .map_err(|e| {
                AppError::store(
                    "features",
                    format!("failed to stat {}: {}", self.path.display(), e),
                )
            })
    }
}

impl FeatureStore for FileFeatureStore {
    fn load(&self) -> Result<Arc<FeatureSnapshot>> {
        let modified = self.modified()?;

        let mut cached = self
            .cached
            .lock()
            .map_err(|_| AppError::Internal {
                message: "feature cache lock poisoned".to_string(),
            })?;

        if let Some((stamp, snapshot)) = cached.as_ref() {
            if *stamp == modified {
                metrics::record_cache(true, "features");
                return Ok(Arc::clone(snapshot));
            }
            debug!(path = %self.path.display(), "Feature file changed, reloading");
        }

        metrics::record_cache(false, "features");
        let snapshot = Arc::new(read_snapshot(&self.path)?);
        *cached = Some((modified, Arc::clone(&snapshot)));
        Ok(snapshot)
    }
}

/// Store that always hands out the same snapshot
#[derive(Debug, Clone)]
pub struct StaticFeatureStore {
    snapshot: Arc<FeatureSnapshot>,
}

impl StaticFeatureStore {
    pub fn new(snapshot: FeatureSnapshot) -> Self {
        Self {
            snapshot: Arc::new(snapshot),
        }
    }
}

impl FeatureStore for StaticFeatureStore {
    fn load(&self) -> Result<Arc<FeatureSnapshot>> {
        Ok(Arc::clone(&self.snapshot))
    }
}
