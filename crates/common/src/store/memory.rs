//! In-memory store

use super::{Catalog, EmailStore, MetaStore, PaperStore, TagStore};
use crate::errors::Result;
use crate::models::{Document, PaperMeta, TagSet};
use std::collections::{BTreeMap, HashMap};

/// Store holding every collection in memory; metadata is derived from papers
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    papers: BTreeMap<String, Document>,
    tags: BTreeMap<String, TagSet>,
    emails: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_papers(papers: impl IntoIterator<Item = Document>) -> Self {
        let mut store = Self::new();
        for doc in papers {
            store.insert_paper(doc);
        }
        store
    }

    pub fn insert_paper(&mut self, doc: Document) {
        self.papers.insert(doc.pid.clone(), doc);
    }

    pub fn set_tags(&mut self, user: impl Into<String>, tags: TagSet) {
        self.tags.insert(user.into(), tags);
    }

    pub fn set_email(&mut self, user: impl Into<String>, email: impl Into<String>) {
        self.emails.insert(user.into(), email.into());
    }
}

impl PaperStore for MemoryStore {
    fn paper(&self, pid: &str) -> Result<Option<Document>> {
        Ok(self.papers.get(pid).cloned())
    }

    fn papers(&self) -> Result<Vec<Document>> {
        Ok(self.papers.values().cloned().collect())
    }
}

impl MetaStore for MemoryStore {
    fn meta(&self, pid: &str) -> Result<Option<PaperMeta>> {
        Ok(self.papers.get(pid).map(Document::meta))
    }

    fn metas(&self) -> Result<HashMap<String, PaperMeta>> {
        Ok(self
            .papers
            .iter()
            .map(|(pid, doc)| (pid.clone(), doc.meta()))
            .collect())
    }
}

impl TagStore for MemoryStore {
    fn tags(&self, user: &str) -> Result<TagSet> {
        Ok(self.tags.get(user).cloned().unwrap_or_default())
    }

    fn all_tags(&self) -> Result<BTreeMap<String, TagSet>> {
        Ok(self.tags.clone())
    }
}

impl EmailStore for MemoryStore {
    fn email(&self, user: &str) -> Result<Option<String>> {
        Ok(self.emails.get(user).filter(|e| !e.is_empty()).cloned())
    }
}

impl Catalog for MemoryStore {
    fn ping(&self) -> Result<()> {
        Ok(())
    }
}
