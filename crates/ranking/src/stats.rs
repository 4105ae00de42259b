//! Corpus statistics

use chrono::DateTime;
use sanity_common::models::PaperMeta;
use serde::Serialize;
use std::collections::HashMap;

/// Look-back windows reported by [`corpus_stats`], in hours
pub const RECENT_WINDOWS_HOURS: &[i64] = &[1, 6, 12, 24, 48, 72, 96];

const DATE_FORMAT: &str = "%b %d %Y";
const NOT_AVAILABLE: &str = "N/A";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecentCount {
    pub hours: i64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusStats {
    pub num_papers: usize,
    pub earliest_paper: String,
    pub latest_paper: String,
    /// Papers published strictly inside each look-back window
    pub recent: Vec<RecentCount>,
}

/// Size, date range and recent publication counts of the corpus (UTC)
pub fn corpus_stats(metas: &HashMap<String, PaperMeta>, now: i64) -> CorpusStats {
    let times: Vec<i64> = metas.values().map(|m| m.time).collect();

    let recent = RECENT_WINDOWS_HOURS
        .iter()
        .map(|&hours| RecentCount {
            hours,
            count: times.iter().filter(|&&t| t > now - hours * 3600).count(),
        })
        .collect();

    CorpusStats {
        num_papers: times.len(),
        earliest_paper: format_date(times.iter().min().copied()),
        latest_paper: format_date(times.iter().max().copied()),
        recent,
    }
}

fn format_date(time: Option<i64>) -> String {
    time.and_then(|t| DateTime::from_timestamp(t, 0))
        .map(|dt| dt.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_corpus() {
        let stats = corpus_stats(&HashMap::new(), 0);
        assert_eq!(stats.num_papers, 0);
        assert_eq!(stats.earliest_paper, "N/A");
        assert_eq!(stats.latest_paper, "N/A");
        assert!(stats.recent.iter().all(|r| r.count == 0));
        assert_eq!(stats.recent.len(), 7);
    }

    #[test]
    fn test_dates_and_windows() {
        // 2021-01-01T00:00:00Z
        let now = 1_609_459_200;
        let metas: HashMap<String, PaperMeta> = [
            ("a", now - 1800),
            ("b", now - 5 * 3600),
            ("c", now - 30 * 3600),
            ("d", now - 96 * 3600),
        ]
        .into_iter()
        .map(|(p, t)| (p.to_string(), PaperMeta { time: t }))
        .collect();

        let stats = corpus_stats(&metas, now);
        assert_eq!(stats.num_papers, 4);
        assert_eq!(stats.latest_paper, "Dec 31 2020");
        assert_eq!(stats.earliest_paper, "Dec 28 2020");

        let counts: Vec<usize> = stats.recent.iter().map(|r| r.count).collect();
        // d sits exactly on the 96h boundary and is not counted
        assert_eq!(counts, vec![1, 2, 2, 2, 3, 3, 3]);
    }
}
