//! Strategy dispatch and post-ranking pipeline
//!
//! Every request runs the same fixed steps: rank, time-window filter,
//! already-seen exclusion, paginate. Filters only ever drop entries, so the
//! order a strategy produced survives to the returned page.

use crate::classifier::{rank_relevance, ClassifierParams, PositiveSet};
use crate::lexical::search_rank;
use crate::random::random_rank;
use crate::recency::time_rank;
use crate::{Scored, TermWeight};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sanity_common::metrics;
use sanity_common::models::PaperMeta;
use sanity_common::store::Catalog;
use sanity_common::{FeatureStore, Result, SECONDS_PER_DAY};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::debug;

/// A ranking strategy with its parameters
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    /// Lexical search
    Search { query: String },
    /// Newest first
    Time,
    /// Classifier trained on one paper
    Similar { pid: String, c: f64 },
    /// Shuffled; `None` draws a fresh seed
    Random { seed: Option<u64> },
    /// Classifier trained on a set of papers, e.g. a user's tags
    Positives { pids: HashSet<String>, c: f64 },
}

impl Strategy {
    /// Label used in logs and metrics
    pub fn name(&self) -> &'static str {
        match self {
            Strategy::Search { .. } => "search",
            Strategy::Time => "time",
            Strategy::Similar { .. } => "pid",
            Strategy::Random { .. } => "random",
            Strategy::Positives { .. } => "positives",
        }
    }
}

/// Post-ranking steps of one request
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Keep only documents younger than this many days
    pub time_window_days: Option<f64>,
    /// Documents the caller has already seen
    pub exclude: HashSet<String>,
    /// 1-based; 0 is treated as 1
    pub page: usize,
    pub page_size: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            time_window_days: None,
            exclude: HashSet::new(),
            page: 1,
            page_size: 25,
        }
    }
}

/// One page of a ranking
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPage {
    pub items: Vec<Scored>,
    /// Classifier term diagnostics, empty for non-classifier strategies
    pub words: Vec<TermWeight>,
    /// Length of the filtered ranking before pagination
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub strategy: &'static str,
}

/// Keep documents whose age at `now` is below the window.
///
/// Documents without metadata are dropped.
pub fn filter_time_window(
    ranking: Vec<Scored>,
    metas: &HashMap<String, PaperMeta>,
    now: i64,
    window_days: f64,
) -> Vec<Scored> {
    let window_secs = window_days * SECONDS_PER_DAY;
    ranking
        .into_iter()
        .filter(|s| {
            metas
                .get(&s.pid)
                .map(|m| ((now - m.time) as f64) < window_secs)
                .unwrap_or(false)
        })
        .collect()
}

/// Drop every document in `seen`
pub fn exclude_seen(ranking: Vec<Scored>, seen: &HashSet<String>) -> Vec<Scored> {
    if seen.is_empty() {
        return ranking;
    }
    ranking.into_iter().filter(|s| !seen.contains(&s.pid)).collect()
}

/// Slice out one 1-based page; pages past the end are empty
pub fn paginate(ranking: &[Scored], page: usize, page_size: usize) -> &[Scored] {
    let page = page.max(1);
    let start = (page - 1).saturating_mul(page_size).min(ranking.len());
    let end = start.saturating_add(page_size).min(ranking.len());
    &ranking[start..end]
}

/// Runs strategies against the collaborator stores
pub struct RankingPipeline<'a> {
    catalog: &'a dyn Catalog,
    features: &'a dyn FeatureStore,
    params: ClassifierParams,
    now: Option<i64>,
}

impl<'a> RankingPipeline<'a> {
    pub fn new(
        catalog: &'a dyn Catalog,
        features: &'a dyn FeatureStore,
        params: ClassifierParams,
    ) -> Self {
        Self {
            catalog,
            features,
            params,
            now: None,
        }
    }

    /// Pin the evaluation clock (seconds since epoch)
    pub fn with_now(mut self, now: i64) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> i64 {
        self.now.unwrap_or_else(|| chrono::Utc::now().timestamp())
    }

    /// Run a strategy and every post-ranking step
    pub fn run(&self, strategy: &Strategy, options: &PipelineOptions) -> Result<RankedPage> {
        let start = Instant::now();
        let now = self.now();

        let needs_metas = options.time_window_days.is_some()
            || matches!(strategy, Strategy::Time | Strategy::Random { .. });
        let metas = if needs_metas {
            self.catalog.metas()?
        } else {
            HashMap::new()
        };

        let (ranking, words) = self.rank(strategy, &metas, now)?;
        let ranked = ranking.len();

        let ranking = match options.time_window_days {
            Some(days) => filter_time_window(ranking, &metas, now, days),
            None => ranking,
        };
        let ranking = exclude_seen(ranking, &options.exclude);

        let total = ranking.len();
        let page = options.page.max(1);
        let items = paginate(&ranking, page, options.page_size).to_vec();

        let elapsed = start.elapsed();
        metrics::record_rank(elapsed.as_secs_f64(), strategy.name(), total);
        debug!(
            strategy = strategy.name(),
            ranked = ranked,
            total = total,
            page = page,
            returned = items.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Ranking complete"
        );

        Ok(RankedPage {
            items,
            words,
            total,
            page,
            page_size: options.page_size,
            strategy: strategy.name(),
        })
    }

    fn rank(
        &self,
        strategy: &Strategy,
        metas: &HashMap<String, PaperMeta>,
        now: i64,
    ) -> Result<(Vec<Scored>, Vec<TermWeight>)> {
        match strategy {
            Strategy::Search { query } => Ok((search_rank(query, self.catalog)?, Vec::new())),
            Strategy::Time => Ok((time_rank(metas, now), Vec::new())),
            Strategy::Random { seed } => {
                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(*seed),
                    None => StdRng::from_entropy(),
                };
                Ok((random_rank(metas, &mut rng), Vec::new()))
            }
            Strategy::Similar { pid, c } => {
                if pid.is_empty() {
                    return Ok((Vec::new(), Vec::new()));
                }
                self.relevance(PositiveSet::Single(pid.clone()), *c)
            }
            Strategy::Positives { pids, c } => {
                if pids.is_empty() {
                    return Ok((Vec::new(), Vec::new()));
                }
                self.relevance(PositiveSet::Union(pids.clone()), *c)
            }
        }
    }

    fn relevance(&self, positives: PositiveSet, c: f64) -> Result<(Vec<Scored>, Vec<TermWeight>)> {
        let snapshot = self.features.load()?;
        let params = self.params.clone().with_c(c);
        let result = rank_relevance(&snapshot, &positives, &params)?;
        Ok((result.ranking, result.words))
    }
}
