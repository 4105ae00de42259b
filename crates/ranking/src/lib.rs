//! Paper ranking core
//!
//! Provides four ranking strategies and the pipeline they share:
//! - Lexical search (field-weighted term counting)
//! - Recency (publication time)
//! - Random (novelty browsing)
//! - Relevance (linear SVM trained per request against a positive set)
//!
//! The pipeline applies time-window filtering, already-seen exclusion and
//! pagination without ever re-sorting what a strategy produced.

pub mod classifier;
pub mod inspect;
pub mod lexical;
pub mod pipeline;
pub mod random;
pub mod recency;
pub mod render;
pub mod request;
pub mod stats;

pub use classifier::{rank_relevance, ClassifierParams, PositiveSet, RelevanceRanking};
pub use inspect::{inspect, InspectedTerm};
pub use lexical::search_rank;
pub use pipeline::{PipelineOptions, RankedPage, RankingPipeline, Strategy};
pub use random::random_rank;
pub use recency::time_rank;
pub use render::{render_ranking, RenderedPaper};
pub use request::{RankQuery, RankRequest, RankStrategy};
pub use stats::{corpus_stats, CorpusStats};

use serde::{Deserialize, Serialize};

/// A document id with the score one strategy gave it.
///
/// Scores from different strategies live on different scales (days ago,
/// weighted hit count, decision value x100) and are never compared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scored {
    pub pid: String,
    pub score: f64,
}

impl Scored {
    pub fn new(pid: impl Into<String>, score: f64) -> Self {
        Self {
            pid: pid.into(),
            score,
        }
    }
}

/// A vocabulary term with its learned classifier weight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermWeight {
    pub word: String,
    pub weight: f64,
}

/// Ids of a ranking, in order
pub fn pids_of(ranking: &[Scored]) -> Vec<&str> {
    ranking.iter().map(|s| s.pid.as_str()).collect()
}
