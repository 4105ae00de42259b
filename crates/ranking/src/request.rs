//! Lenient request parameter parsing
//!
//! Interactive parameters arrive as loose strings. Malformed values are
//! replaced by documented defaults here; parsing never fails.

use crate::lexical::sanitize;
use crate::pipeline::{PipelineOptions, Strategy};
use sanity_common::config::RankingConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Ranking strategy selectable from a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankStrategy {
    Search,
    /// Classifier trained on one paper
    Pid,
    #[default]
    Time,
    Random,
}

impl RankStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            RankStrategy::Search => "search",
            RankStrategy::Pid => "pid",
            RankStrategy::Time => "time",
            RankStrategy::Random => "random",
        }
    }
}

impl fmt::Display for RankStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RankStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "search" => Ok(RankStrategy::Search),
            "pid" => Ok(RankStrategy::Pid),
            "time" => Ok(RankStrategy::Time),
            "random" => Ok(RankStrategy::Random),
            other => Err(format!("unknown rank strategy: {}", other)),
        }
    }
}

/// Raw query string parameters of the ranking endpoint
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RankQuery {
    pub rank: Option<String>,
    pub q: Option<String>,
    pub pid: Option<String>,
    pub time_filter: Option<String>,
    pub svm_c: Option<String>,
    pub page_number: Option<String>,
}

/// Typed ranking request with every default applied
#[derive(Debug, Clone, PartialEq)]
pub struct RankRequest {
    pub strategy: RankStrategy,
    pub query: String,
    /// Sanitized target paper for [`RankStrategy::Pid`]
    pub pid: String,
    /// Time window in days, `None` when no filter was asked for
    pub time_filter_days: Option<i64>,
    /// The time filter exactly as supplied, echoed back to clients
    pub time_filter_raw: String,
    pub svm_c: f64,
    /// 1-based page number
    pub page: usize,
}

impl RankRequest {
    pub fn parse(query: &RankQuery, config: &RankingConfig) -> Self {
        let text = query.q.clone().unwrap_or_default();

        let mut strategy = query
            .rank
            .as_deref()
            .and_then(|r| r.parse().ok())
            .unwrap_or_default();
        // typing in the search box and hitting enter means search
        if !text.is_empty() {
            strategy = RankStrategy::Search;
        }

        let time_filter_raw = query.time_filter.clone().unwrap_or_default();
        let time_filter_days = (!time_filter_raw.is_empty())
            .then(|| parse_days(&time_filter_raw, config.fallback_time_filter_days));

        Self {
            strategy,
            query: text,
            pid: query.pid.as_deref().map(sanitize).unwrap_or_default(),
            time_filter_days,
            time_filter_raw,
            svm_c: parse_c(query.svm_c.as_deref(), config.default_svm_c),
            page: parse_page(query.page_number.as_deref()),
        }
    }

    /// The strategy with its parameters, ready for the pipeline
    pub fn to_strategy(&self) -> Strategy {
        match self.strategy {
            RankStrategy::Search => Strategy::Search {
                query: self.query.clone(),
            },
            RankStrategy::Pid => Strategy::Similar {
                pid: self.pid.clone(),
                c: self.svm_c,
            },
            RankStrategy::Time => Strategy::Time,
            RankStrategy::Random => Strategy::Random { seed: None },
        }
    }

    pub fn to_options(&self, page_size: usize) -> PipelineOptions {
        PipelineOptions {
            time_window_days: self.time_filter_days.map(|d| d as f64),
            page: self.page,
            page_size,
            ..PipelineOptions::default()
        }
    }
}

/// Whole days, then rounded fractional days, then the fallback
fn parse_days(raw: &str, fallback: i64) -> i64 {
    let raw = raw.trim();
    if let Ok(days) = raw.parse::<i64>() {
        return days;
    }
    match raw.parse::<f64>() {
        Ok(days) if days.is_finite() => days.round() as i64,
        _ => fallback,
    }
}

/// Positive finite regularization strength or the default
fn parse_c(raw: Option<&str>, default: f64) -> f64 {
    raw.and_then(|s| s.trim().parse::<f64>().ok())
        .filter(|c| c.is_finite() && *c > 0.0)
        .unwrap_or(default)
}

fn parse_page(raw: Option<&str>) -> usize {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .map(|p| p.max(1) as usize)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: RankQuery) -> RankRequest {
        RankRequest::parse(&query, &RankingConfig::default())
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_defaults() {
        let req = parse(RankQuery::default());
        assert_eq!(req.strategy, RankStrategy::Time);
        assert_eq!(req.page, 1);
        assert_eq!(req.svm_c, 0.01);
        assert_eq!(req.time_filter_days, None);
        assert!(req.pid.is_empty());
    }

    #[test]
    fn test_unknown_rank_falls_back_to_time() {
        let req = parse(RankQuery {
            rank: some("tags"),
            ..Default::default()
        });
        assert_eq!(req.strategy, RankStrategy::Time);
    }

    #[test]
    fn test_query_forces_search() {
        let req = parse(RankQuery {
            rank: some("random"),
            q: some("diffusion"),
            ..Default::default()
        });
        assert_eq!(req.strategy, RankStrategy::Search);
        assert_eq!(
            req.to_strategy(),
            Strategy::Search {
                query: "diffusion".to_string()
            }
        );
    }

    #[test]
    fn test_pid_is_sanitized() {
        let req = parse(RankQuery {
            rank: some("pid"),
            pid: some("2101.00001<script>"),
            svm_c: some("0.5"),
            ..Default::default()
        });
        assert_eq!(req.pid, "2101.00001script");
        assert_eq!(
            req.to_strategy(),
            Strategy::Similar {
                pid: "2101.00001script".to_string(),
                c: 0.5
            }
        );
    }

    #[test]
    fn test_time_filter_parsing() {
        assert_eq!(parse_days("7", 20_000), 7);
        assert_eq!(parse_days("2.6", 20_000), 3);
        assert_eq!(parse_days("week", 20_000), 20_000);
        assert_eq!(parse_days("NaN", 20_000), 20_000);

        let req = parse(RankQuery {
            time_filter: some("abc"),
            ..Default::default()
        });
        assert_eq!(req.time_filter_days, Some(20_000));
        assert_eq!(req.time_filter_raw, "abc");
    }

    #[test]
    fn test_svm_c_parsing() {
        assert_eq!(parse_c(Some("0.1"), 0.01), 0.1);
        assert_eq!(parse_c(Some(""), 0.01), 0.01);
        assert_eq!(parse_c(Some("-1"), 0.01), 0.01);
        assert_eq!(parse_c(Some("inf"), 0.01), 0.01);
        assert_eq!(parse_c(None, 0.01), 0.01);
    }

    #[test]
    fn test_page_parsing() {
        assert_eq!(parse_page(Some("3")), 3);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-4")), 1);
        assert_eq!(parse_page(Some("two")), 1);
        assert_eq!(parse_page(None), 1);
    }

    #[test]
    fn test_strategy_names() {
        for s in [
            RankStrategy::Search,
            RankStrategy::Pid,
            RankStrategy::Time,
            RankStrategy::Random,
        ] {
            assert_eq!(s.as_str().parse::<RankStrategy>(), Ok(s));
        }
        assert!("svm".parse::<RankStrategy>().is_err());
    }

    #[test]
    fn test_options_carry_window_and_page() {
        let req = parse(RankQuery {
            time_filter: some("3"),
            page_number: some("2"),
            ..Default::default()
        });
        let options = req.to_options(25);
        assert_eq!(options.time_window_days, Some(3.0));
        assert_eq!(options.page, 2);
        assert_eq!(options.page_size, 25);
        assert!(options.exclude.is_empty());
    }
}
