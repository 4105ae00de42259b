//! Display view of ranked papers

use crate::Scored;
use sanity_common::models::Document;
use sanity_common::store::PaperStore;
use sanity_common::Result;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What clients need to show one paper
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderedPaper {
    pub id: String,
    pub title: String,
    /// Author names joined by ", "
    pub authors: String,
    pub time: String,
    pub summary: String,
    pub link: String,
    /// Strategy score; 0 outside a ranking
    pub weight: f64,
}

impl RenderedPaper {
    pub fn new(doc: &Document, weight: f64) -> Self {
        Self {
            id: doc.pid.clone(),
            title: doc.title.clone(),
            authors: doc.authors_joined(", "),
            time: doc
                .time_str
                .clone()
                .unwrap_or_else(|| doc.time.to_string()),
            summary: doc.summary.clone(),
            link: doc.link.clone(),
            weight,
        }
    }
}

/// Render a ranked page, skipping ids the paper store no longer knows
pub fn render_ranking<S: PaperStore + ?Sized>(
    papers: &S,
    items: &[Scored],
) -> Result<Vec<RenderedPaper>> {
    let mut rendered = Vec::with_capacity(items.len());
    for item in items {
        match papers.paper(&item.pid)? {
            Some(doc) => rendered.push(RenderedPaper::new(&doc, item.score)),
            None => warn!(pid = %item.pid, "Ranked paper missing from paper store"),
        }
    }
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sanity_common::store::MemoryStore;

    fn doc(pid: &str, time_str: Option<&str>) -> Document {
        Document {
            pid: pid.to_string(),
            title: format!("Title {}", pid),
            authors: vec!["Ada Lovelace".into(), "Alan Turing".into()],
            summary: "summary".into(),
            link: format!("https://arxiv.org/abs/{}", pid),
            time: 1_600_000_000,
            time_str: time_str.map(str::to_string),
        }
    }

    #[test]
    fn test_render_fields() {
        let paper = RenderedPaper::new(&doc("p1", None), 1.5);
        assert_eq!(paper.authors, "Ada Lovelace, Alan Turing");
        assert_eq!(paper.time, "1600000000");
        assert_eq!(paper.weight, 1.5);

        let paper = RenderedPaper::new(&doc("p2", Some("Sep 13 2020")), 0.0);
        assert_eq!(paper.time, "Sep 13 2020");
    }

    #[test]
    fn test_render_ranking_skips_missing() {
        let store = MemoryStore::with_papers(vec![doc("a", None), doc("b", None)]);
        let items = vec![Scored::new("b", 2.0), Scored::new("gone", 1.5), Scored::new("a", 1.0)];
        let rendered = render_ranking(&store, &items).unwrap();

        let ids: Vec<&str> = rendered.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
        assert_eq!(rendered[0].weight, 2.0);
    }
}
