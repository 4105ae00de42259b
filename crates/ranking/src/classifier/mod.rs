//! Personalized relevance ranking
//!
//! A fresh linear classifier is trained on every call: the positive set
//! is labelled 1, every other document in the snapshot 0, and the learned
//! decision function ranks the whole corpus. Nothing is cached between
//! calls, so concurrent callers can share one snapshot freely.

mod svm;

pub use svm::{LinearSvm, SvmParams};

use crate::{Scored, TermWeight};
use sanity_common::config::RankingConfig;
use sanity_common::metrics;
use sanity_common::FeatureSnapshot;
use sanity_common::Result;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, warn};

/// Scale applied to decision values for display
pub const SCORE_SCALE: f64 = 100.0;

/// Classifier settings for one ranking call
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifierParams {
    pub svm: SvmParams,
    /// Most positive terms reported
    pub positive_terms: usize,
    /// Most negative terms reported
    pub negative_terms: usize,
}

impl ClassifierParams {
    pub fn from_config(config: &RankingConfig) -> Self {
        Self {
            svm: SvmParams {
                c: config.default_svm_c,
                max_iter: config.max_iter,
                tolerance: config.tolerance,
                seed: 0,
            },
            positive_terms: config.positive_terms,
            negative_terms: config.negative_terms,
        }
    }

    /// Same settings with another regularization strength
    pub fn with_c(mut self, c: f64) -> Self {
        self.svm.c = c;
        self
    }
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self::from_config(&RankingConfig::default())
    }
}

/// The documents a classifier is trained to find
#[derive(Debug, Clone, PartialEq)]
pub enum PositiveSet {
    /// "More like this": exactly one positive row
    Single(String),
    /// Every document a user tagged
    Union(HashSet<String>),
}

impl PositiveSet {
    /// Snapshot rows labelled positive, ascending
    fn rows(&self, snapshot: &FeatureSnapshot) -> Vec<usize> {
        let mut rows: Vec<usize> = match self {
            PositiveSet::Single(pid) => snapshot.row_of(pid).into_iter().collect(),
            PositiveSet::Union(pids) => pids.iter().filter_map(|p| snapshot.row_of(p)).collect(),
        };
        rows.sort_unstable();
        rows
    }
}

impl From<HashSet<String>> for PositiveSet {
    fn from(pids: HashSet<String>) -> Self {
        PositiveSet::Union(pids)
    }
}

/// Output of one relevance ranking
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelevanceRanking {
    /// Every snapshot document, best first
    pub ranking: Vec<Scored>,
    /// Most positive terms (descending) followed by most negative terms
    pub words: Vec<TermWeight>,
    /// False when training hit the iteration bound
    pub converged: bool,
}

impl RelevanceRanking {
    pub fn is_empty(&self) -> bool {
        self.ranking.is_empty()
    }
}

/// Rank every snapshot document by similarity to `positives`.
///
/// Returns an empty ranking without training when no positive is present
/// in the snapshot, or when every document is positive.
pub fn rank_relevance(
    snapshot: &FeatureSnapshot,
    positives: &PositiveSet,
    params: &ClassifierParams,
) -> Result<RelevanceRanking> {
    let positive_rows = positives.rows(snapshot);
    if positive_rows.is_empty() || positive_rows.len() == snapshot.n_docs() {
        debug!(
            positives = positive_rows.len(),
            docs = snapshot.n_docs(),
            "No usable training split, skipping classifier"
        );
        return Ok(RelevanceRanking::default());
    }

    let mut labels = vec![false; snapshot.n_docs()];
    for row in &positive_rows {
        labels[*row] = true;
    }

    let start = Instant::now();
    let model = LinearSvm::fit(snapshot.matrix(), &labels, &params.svm)?;
    let elapsed = start.elapsed();
    metrics::record_training(elapsed.as_secs_f64(), model.converged());

    if model.converged() {
        debug!(
            positives = positive_rows.len(),
            docs = snapshot.n_docs(),
            iterations = model.iterations(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Classifier trained"
        );
    } else {
        warn!(
            positives = positive_rows.len(),
            docs = snapshot.n_docs(),
            max_iter = params.svm.max_iter,
            "Classifier did not converge, ranking with the last iterate"
        );
    }

    let scores = model.decision_function(snapshot.matrix());
    let mut ranking: Vec<Scored> = snapshot
        .pids()
        .iter()
        .zip(scores)
        .map(|(pid, s)| Scored::new(pid.clone(), s * SCORE_SCALE))
        .collect();
    // stable: equal scores keep snapshot row order
    ranking.sort_by(|a, b| b.score.total_cmp(&a.score));

    Ok(RelevanceRanking {
        ranking,
        words: term_weights(snapshot, model.weights(), params),
        converged: model.converged(),
    })
}

/// Top positive terms then bottom negative terms of a weight vector
fn term_weights(
    snapshot: &FeatureSnapshot,
    weights: &[f64],
    params: &ClassifierParams,
) -> Vec<TermWeight> {
    let mut order: Vec<usize> = (0..weights.len()).collect();
    order.sort_by(|&a, &b| weights[b].total_cmp(&weights[a]));

    let top = params.positive_terms.min(order.len());
    // small vocabularies: never report a column twice
    let bottom_start = order.len().saturating_sub(params.negative_terms).max(top);

    order[..top]
        .iter()
        .chain(order[bottom_start..].iter())
        .filter_map(|&col| {
            snapshot.term_at(col).map(|word| TermWeight {
                word: word.to_string(),
                weight: weights[col],
            })
        })
        .collect()
}
