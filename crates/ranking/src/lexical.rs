//! Lexical search over the paper store
//!
//! Field-weighted term counting: a query term found in the author list is
//! worth 10, in the title 20, and each summary occurrence 1 (capped at 3
//! per term). Matching is case-insensitive substring counting.

use crate::Scored;
use sanity_common::models::Document;
use sanity_common::store::PaperStore;
use sanity_common::Result;
use std::collections::HashSet;
use std::time::Instant;
use tracing::debug;

pub const AUTHOR_WEIGHT: f64 = 10.0;
pub const TITLE_WEIGHT: f64 = 20.0;
pub const SUMMARY_WEIGHT: f64 = 1.0;

/// Summary occurrences counted per term
pub const SUMMARY_CAP: usize = 3;

/// Punctuation kept by [`sanitize`] besides letters, digits and space
const ALLOWED_PUNCTUATION: &[char] = &['-', ':', '\'', '"', '.', '?', '!', '/'];

/// Delete every character outside the allowed set
pub fn sanitize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == ' ' || ALLOWED_PUNCTUATION.contains(c))
        .collect()
}

/// Sanitized, lower-cased, whitespace-split query terms, repeats kept
pub fn query_terms(query: &str) -> Vec<String> {
    sanitize(query)
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Score one document against already-normalized terms.
///
/// Author and title hits count distinct terms; the summary component sums
/// over every query term, so a repeated term counts once per repetition.
pub fn score_document(terms: &[String], doc: &Document) -> f64 {
    let authors = doc.authors_joined(" ").to_lowercase();
    let title = doc.title.to_lowercase();
    let summary = doc.summary.to_lowercase();

    let distinct: HashSet<&str> = terms.iter().map(String::as_str).collect();
    let author_hits = distinct.iter().filter(|t| authors.contains(**t)).count();
    let title_hits = distinct.iter().filter(|t| title.contains(**t)).count();
    let summary_hits: usize = terms
        .iter()
        .map(|t| summary.matches(t.as_str()).count().min(SUMMARY_CAP))
        .sum();

    AUTHOR_WEIGHT * author_hits as f64
        + TITLE_WEIGHT * title_hits as f64
        + SUMMARY_WEIGHT * summary_hits as f64
}

/// Rank documents by score, dropping zero scores.
///
/// Ties are broken by descending pid so the order is total.
pub fn rank_documents<'a>(
    terms: &[String],
    docs: impl IntoIterator<Item = &'a Document>,
) -> Vec<Scored> {
    if terms.is_empty() {
        return Vec::new();
    }

    let mut ranking: Vec<Scored> = docs
        .into_iter()
        .filter_map(|doc| {
            let score = score_document(terms, doc);
            (score > 0.0).then(|| Scored::new(doc.pid.clone(), score))
        })
        .collect();

    ranking.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| b.pid.cmp(&a.pid)));
    ranking
}

/// Run a free-text query against the whole paper store
pub fn search_rank<S: PaperStore + ?Sized>(query: &str, papers: &S) -> Result<Vec<Scored>> {
    let terms = query_terms(query);
    if terms.is_empty() {
        return Ok(Vec::new());
    }

    let start = Instant::now();
    let docs = papers.papers()?;
    let ranking = rank_documents(&terms, &docs);

    debug!(
        terms = terms.len(),
        scanned = docs.len(),
        matched = ranking.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Lexical scan complete"
    );
    Ok(ranking)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pids_of;
    use sanity_common::store::MemoryStore;

    fn doc(pid: &str, title: &str, authors: &[&str], summary: &str) -> Document {
        Document {
            pid: pid.to_string(),
            title: title.to_string(),
            authors: authors.iter().map(|a| a.to_string()).collect(),
            summary: summary.to_string(),
            link: String::new(),
            time: 0,
            time_str: None,
        }
    }

    #[test]
    fn test_sanitize_deletes_disallowed_characters() {
        assert_eq!(sanitize("graph (neural) nets; v2!"), "graph neural nets v2!");
        assert_eq!(sanitize("a:b'c\"d.e?f!g/h-i"), "a:b'c\"d.e?f!g/h-i");
        assert_eq!(sanitize("tab\tand\nnewline"), "tabandnewline");
        assert_eq!(sanitize("<script>"), "script");
    }

    #[test]
    fn test_query_terms_lowercase_and_split() {
        assert_eq!(
            query_terms("  Neural  GRAPH neural "),
            vec!["neural", "graph", "neural"]
        );
        assert!(query_terms("   ").is_empty());
        assert!(query_terms("(((").is_empty());
    }

    #[test]
    fn test_score_formula() {
        let d = doc(
            "1",
            "Neural Graph Models",
            &["Graham Neu"],
            "graph graph graph graph neural",
        );
        let terms = query_terms("graph neural");
        // authors: "graham neu" contains neither "graph" nor "neural"
        // title: both terms -> 40
        // summary: graph capped at 3, neural 1 -> 4
        assert_eq!(score_document(&terms, &d), 44.0);

        let terms = query_terms("neu");
        // substring match: author 10 + title 20 + summary 1
        assert_eq!(score_document(&terms, &d), 31.0);
    }

    #[test]
    fn test_repeated_term_counts_distinct_in_title_not_summary() {
        let d = doc("1", "Neural Codecs", &["Ada Neural"], "neural compression");
        // authors 10 + title 20 + summary 1
        assert_eq!(score_document(&query_terms("neural"), &d), 31.0);
        // title and authors unchanged, summary summed per repetition
        assert_eq!(score_document(&query_terms("neural neural"), &d), 32.0);
    }

    #[test]
    fn test_example_corpus() {
        let docs = vec![
            doc("doc1", "Graph Neural Networks", &[], ""),
            doc("doc2", "Neural Codecs", &[], ""),
            doc("doc3", "Unrelated Topic", &[], ""),
        ];
        let ranking = rank_documents(&query_terms("neural"), &docs);

        assert_eq!(ranking.len(), 2);
        assert!(ranking.iter().all(|s| s.score == 20.0));
        // equal scores fall back to descending pid
        assert_eq!(pids_of(&ranking), vec!["doc2", "doc1"]);
    }

    #[test]
    fn test_higher_score_ranks_first() {
        let docs = vec![
            doc("doc1", "Graph Neural Networks", &[], "a neural approach"),
            doc("doc2", "Neural Codecs", &[], ""),
            doc("doc3", "Unrelated Topic", &[], ""),
        ];
        let ranking = rank_documents(&query_terms("neural"), &docs);
        assert_eq!(pids_of(&ranking), vec!["doc1", "doc2"]);
        assert_eq!(ranking[0].score, 21.0);
    }

    #[test]
    fn test_no_match_is_empty() {
        let docs = vec![doc("a", "Transformers", &["Vaswani"], "attention")];
        assert!(rank_documents(&query_terms("diffusion"), &docs).is_empty());
        assert!(rank_documents(&[], &docs).is_empty());
    }

    #[test]
    fn test_search_rank_is_deterministic() {
        let store = MemoryStore::with_papers(vec![
            doc("b", "Neural Codecs", &["Ng"], "neural compression"),
            doc("a", "Neural Fields", &["Ng"], "neural rendering"),
            doc("c", "Codecs", &[], "neural"),
        ]);
        let first = search_rank("neural ng", &store).unwrap();
        let second = search_rank("neural ng", &store).unwrap();
        assert_eq!(first, second);
        // "rendering" contains "ng" once, lifting a above b
        assert_eq!(pids_of(&first), vec!["a", "b", "c"]);
        assert_eq!(first[0].score, 32.0);
        assert_eq!(first[1].score, 31.0);
    }

    #[test]
    fn test_empty_query_skips_store() {
        struct Broken;
        impl PaperStore for Broken {
            fn paper(&self, _: &str) -> Result<Option<Document>> {
                Err(sanity_common::AppError::store("papers", "down"))
            }
            fn papers(&self) -> Result<Vec<Document>> {
                Err(sanity_common::AppError::store("papers", "down"))
            }
        }
        assert!(search_rank("", &Broken).unwrap().is_empty());
        assert!(search_rank("neural", &Broken).is_err());
    }
}
