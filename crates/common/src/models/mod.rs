//! Data model shared by the stores and the ranking core

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// A paper as held by the paper store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Stable unique identifier
    #[serde(default)]
    pub pid: String,

    pub title: String,

    /// Author names in publication order
    #[serde(default, deserialize_with = "deserialize_authors")]
    pub authors: Vec<String>,

    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub link: String,

    /// Publication time, seconds since epoch
    pub time: i64,

    /// Human readable publication time, when the scraper recorded one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_str: Option<String>,
}

impl Document {
    /// Authors joined for display and for author-field matching
    pub fn authors_joined(&self, sep: &str) -> String {
        self.authors.join(sep)
    }

    /// Lightweight metadata view of this document
    pub fn meta(&self) -> PaperMeta {
        PaperMeta { time: self.time }
    }
}

/// Authors arrive either as plain names or as `{"name": ...}` records
#[derive(Deserialize)]
#[serde(untagged)]
enum AuthorEntry {
    Name(String),
    Record { name: String },
}

fn deserialize_authors<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries: Option<Vec<AuthorEntry>> = Option::deserialize(deserializer)?;
    Ok(entries
        .unwrap_or_default()
        .into_iter()
        .map(|entry| match entry {
            AuthorEntry::Name(name) | AuthorEntry::Record { name } => name,
        })
        .collect())
}

/// Metadata store record
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PaperMeta {
    /// Publication time, seconds since epoch
    pub time: i64,
}

impl PaperMeta {
    /// Age in days relative to `now` (seconds since epoch)
    pub fn age_days(&self, now: i64) -> f64 {
        (now - self.time) as f64 / crate::SECONDS_PER_DAY
    }
}

/// One user's tags: tag name to the set of tagged paper ids
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct TagSet {
    tags: BTreeMap<String, BTreeSet<String>>,
}

impl TagSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a paper, creating the tag if needed
    pub fn insert(&mut self, tag: impl Into<String>, pid: impl Into<String>) {
        self.tags.entry(tag.into()).or_default().insert(pid.into());
    }

    /// True when no tag holds any paper
    pub fn is_empty(&self) -> bool {
        self.tags.values().all(BTreeSet::is_empty)
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn papers(&self, tag: &str) -> Option<&BTreeSet<String>> {
        self.tags.get(tag)
    }

    /// Union of paper ids across all tags; the positive set for personalization
    pub fn union(&self) -> HashSet<String> {
        self.tags.values().flatten().cloned().collect()
    }
}

impl<T, P> FromIterator<(T, P)> for TagSet
where
    T: Into<String>,
    P: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (T, P)>>(iter: I) -> Self {
        let mut set = TagSet::new();
        for (tag, pid) in iter {
            set.insert(tag, pid);
        }
        set
    }
}
