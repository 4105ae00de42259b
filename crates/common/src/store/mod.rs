//! Collaborator stores
//!
//! The ranking core only ever reads from these. Provides:
//! - One trait per collaborator (papers, metadata, tags, email addresses)
//! - A JSON-directory backend used by the binaries
//! - An in-memory backend used by tests and embedders

mod json;
mod memory;

pub use json::JsonDirStore;
pub use memory::MemoryStore;

use crate::errors::Result;
use crate::models::{Document, PaperMeta, TagSet};
use std::collections::{BTreeMap, HashMap};

/// Keyed lookup and full iteration over papers
pub trait PaperStore: Send + Sync {
    fn paper(&self, pid: &str) -> Result<Option<Document>>;

    /// Every paper in the store, in no particular order
    fn papers(&self) -> Result<Vec<Document>>;
}

/// Keyed lookup and full iteration over paper metadata
pub trait MetaStore: Send + Sync {
    fn meta(&self, pid: &str) -> Result<Option<PaperMeta>>;

    fn metas(&self) -> Result<HashMap<String, PaperMeta>>;
}

/// Per-user tags
pub trait TagStore: Send + Sync {
    /// Tags of one user, empty when the user never tagged anything
    fn tags(&self, user: &str) -> Result<TagSet>;

    /// Tags of every user, ordered by user name
    fn all_tags(&self) -> Result<BTreeMap<String, TagSet>>;
}

/// Registered email addresses
pub trait EmailStore: Send + Sync {
    fn email(&self, user: &str) -> Result<Option<String>>;
}

/// Everything the ranking callers read, behind one handle
pub trait Catalog: PaperStore + MetaStore + TagStore + EmailStore {
    /// Cheap reachability probe used by readiness checks
    fn ping(&self) -> Result<()>;
}
