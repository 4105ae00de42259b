//! Per-paper feature inspection

use sanity_common::{AppError, FeatureSnapshot, Result};
use serde::Serialize;

/// One non-zero entry of a paper's TF-IDF vector
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InspectedTerm {
    pub word: String,
    pub weight: f64,
    pub idf: f64,
}

/// Non-zero terms of one paper, heaviest first
pub fn inspect(snapshot: &FeatureSnapshot, pid: &str) -> Result<Vec<InspectedTerm>> {
    let row = snapshot
        .row_of(pid)
        .and_then(|r| snapshot.row(r))
        .ok_or_else(|| AppError::PaperNotFound { id: pid.to_string() })?;

    let idf = snapshot.idf();
    let mut terms: Vec<InspectedTerm> = row
        .iter()
        .filter(|(_, &weight)| weight != 0.0)
        .filter_map(|(col, &weight)| {
            snapshot.term_at(col).map(|word| InspectedTerm {
                word: word.to_string(),
                weight,
                idf: idf[col],
            })
        })
        .collect();

    terms.sort_by(|a, b| b.weight.total_cmp(&a.weight));
    Ok(terms)
}
