//! Sanity Ranker Common Library
//!
//! Shared code for the ranking core, the interactive API and the
//! recommendation mailer:
//! - Paper, metadata and tag data model
//! - Collaborator store traits with JSON-directory and in-memory backends
//! - Immutable TF-IDF feature snapshot
//! - Error types and handling
//! - Configuration management
//! - Metrics helpers

pub mod config;
pub mod errors;
pub mod features;
pub mod metrics;
pub mod models;
pub mod store;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::{AppError, Result};
pub use features::{FeatureSnapshot, FeatureStore};
pub use models::{Document, PaperMeta, TagSet};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Seconds in one day, used for every age computation
pub const SECONDS_PER_DAY: f64 = 86_400.0;
