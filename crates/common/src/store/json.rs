//! JSON-directory store
//!
//! Layout of the data directory:
//! - `papers.json`: object of pid to paper record
//! - `metas.json`: object of pid to `{"time": ...}` (optional, derived from papers)
//! - `tags.json`: object of user to tag set (optional)
//! - `emails.json`: object of user to address (optional)
//!
//! Files are opened per call and closed on every exit path, so a store
//! rewritten by an external writer is picked up on the next read.

use super::{Catalog, EmailStore, MetaStore, PaperStore, TagStore};
use crate::errors::{AppError, Result};
use crate::models::{Document, PaperMeta, TagSet};
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, ErrorKind};
use std::path::{Path, PathBuf};
use tracing::debug;

const PAPERS_FILE: &str = "papers.json";
const METAS_FILE: &str = "metas.json";
const TAGS_FILE: &str = "tags.json";
const EMAILS_FILE: &str = "emails.json";

/// Store backed by a directory of JSON documents
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Open a data directory; fails when the directory does not exist
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if !dir.is_dir() {
            return Err(AppError::store(
                "data",
                format!("data directory {} does not exist", dir.display()),
            ));
        }
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read one store file; `Ok(None)` when the file is absent
    fn read_optional<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>> {
        let path = self.dir.join(name);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AppError::store(
                    name,
                    format!("failed to open {}: {}", path.display(), e),
                ))
            }
        };

        debug!(path = %path.display(), "Reading store file");
        let value = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            AppError::store(name, format!("failed to parse {}: {}", path.display(), e))
        })?;
        Ok(Some(value))
    }

    fn read_required<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        self.read_optional(name)?.ok_or_else(|| {
            AppError::store(
                name,
                format!("{} missing from {}", name, self.dir.display()),
            )
        })
    }

    fn load_papers(&self) -> Result<HashMap<String, Document>> {
        let mut papers: HashMap<String, Document> = self.read_required(PAPERS_FILE)?;
        // The key is authoritative; records may omit their own pid
        for (pid, doc) in papers.iter_mut() {
            if doc.pid != *pid {
                doc.pid = pid.clone();
            }
        }
        Ok(papers)
    }
}

impl PaperStore for JsonDirStore {
    fn paper(&self, pid: &str) -> Result<Option<Document>> {
        Ok(self.load_papers()?.remove(pid))
    }

    fn papers(&self) -> Result<Vec<Document>> {
        Ok(self.load_papers()?.into_values().collect())
    }
}

impl MetaStore for JsonDirStore {
    fn meta(&self, pid: &str) -> Result<Option<PaperMeta>> {
        Ok(self.metas()?.remove(pid))
    }

    fn metas(&self) -> Result<HashMap<String, PaperMeta>> {
        match self.read_optional(METAS_FILE)? {
            Some(metas) => Ok(metas),
            None => Ok(self
                .load_papers()?
                .into_iter()
                .map(|(pid, doc)| (pid, doc.meta()))
                .collect()),
        }
    }
}

impl TagStore for JsonDirStore {
    fn tags(&self, user: &str) -> Result<TagSet> {
        Ok(self.all_tags()?.remove(user).unwrap_or_default())
    }

    fn all_tags(&self) -> Result<BTreeMap<String, TagSet>> {
        Ok(self.read_optional(TAGS_FILE)?.unwrap_or_default())
    }
}

impl EmailStore for JsonDirStore {
    fn email(&self, user: &str) -> Result<Option<String>> {
        let emails: HashMap<String, String> =
            self.read_optional(EMAILS_FILE)?.unwrap_or_default();
        Ok(emails
            .get(user)
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty()))
    }
}

impl Catalog for JsonDirStore {
    fn ping(&self) -> Result<()> {
        let path = self.dir.join(PAPERS_FILE);
        if path.is_file() {
            Ok(())
        } else {
            Err(AppError::store(
                PAPERS_FILE,
                format!("{} is not readable", path.display()),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorCode;

    fn write(dir: &Path, name: &str, body: &str) {
        std::fs::write(dir.join(name), body).unwrap();
    }

    fn seeded() -> (tempfile::TempDir, JsonDirStore) {
        let dir = tempfile::tempdir().unwrap();
        write(
            dir.path(),
            PAPERS_FILE,
            r#"{
                "a": {"title": "Graph Neural Networks", "authors": [{"name": "Ada"}], "time": 100},
                "b": {"pid": "b", "title": "Neural Codecs", "authors": ["Bob"], "time": 200}
            }"#,
        );
        let store = JsonDirStore::open(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_missing_directory_is_unavailable() {
        let err = JsonDirStore::open("/definitely/not/here").unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);
    }

    #[test]
    fn test_papers_keyed_by_file_key() {
        let (_dir, store) = seeded();
        let a = store.paper("a").unwrap().unwrap();
        assert_eq!(a.pid, "a");
        assert_eq!(a.authors, vec!["Ada"]);
        assert_eq!(store.papers().unwrap().len(), 2);
        assert!(store.paper("zzz").unwrap().is_none());
        store.ping().unwrap();
    }

    #[test]
    fn test_metas_fall_back_to_papers() {
        let (dir, store) = seeded();
        assert_eq!(store.meta("b").unwrap(), Some(PaperMeta { time: 200 }));

        write(dir.path(), METAS_FILE, r#"{"a": {"time": 5}}"#);
        assert_eq!(store.metas().unwrap().len(), 1);
        assert_eq!(store.meta("a").unwrap(), Some(PaperMeta { time: 5 }));
    }

    #[test]
    fn test_optional_files() {
        let (dir, store) = seeded();
        assert!(store.all_tags().unwrap().is_empty());
        assert!(store.email("alice").unwrap().is_none());

        write(dir.path(), TAGS_FILE, r#"{"alice": {"gnn": ["a"]}}"#);
        write(dir.path(), EMAILS_FILE, r#"{"alice": " alice@example.com ", "bob": ""}"#);
        assert!(store.tags("alice").unwrap().union().contains("a"));
        assert!(store.tags("bob").unwrap().is_empty());
        assert_eq!(store.email("alice").unwrap().as_deref(), Some("alice@example.com"));
        assert!(store.email("bob").unwrap().is_none());
    }

    #[test]
    fn test_corrupt_file_is_unavailable() {
        let (dir, store) = seeded();
        write(dir.path(), PAPERS_FILE, "{ not json");
        let err = store.papers().unwrap_err();
        assert_eq!(err.code(), ErrorCode::StoreUnavailable);
    }
}
