//! Configuration management for Sanity Ranker
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default, config/{APP_ENV}, config/local)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Location of the collaborator stores
    #[serde(default)]
    pub data: DataConfig,

    /// Ranking parameters shared by every caller
    #[serde(default)]
    pub ranking: RankingConfig,

    /// Recommendation batch job
    #[serde(default)]
    pub recommend: RecommendConfig,

    /// Outbound mail transport
    #[serde(default)]
    pub mail: MailConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Upper bound on one ranking request, classifier training included
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DataConfig {
    /// Directory holding papers.json, metas.json, tags.json, emails.json
    #[serde(default = "default_data_dir")]
    pub dir: PathBuf,

    /// Feature snapshot file, relative to `dir` unless absolute
    #[serde(default = "default_features_file")]
    pub features_file: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RankingConfig {
    /// Results per page for interactive requests
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Regularization strength for "find similar" requests
    #[serde(default = "default_svm_c")]
    pub default_svm_c: f64,

    /// Maximum passes of the SVM solver
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,

    /// Projected-gradient stopping tolerance of the SVM solver
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    /// Number of most positive terms reported
    #[serde(default = "default_positive_terms")]
    pub positive_terms: usize,

    /// Number of most negative terms reported
    #[serde(default = "default_negative_terms")]
    pub negative_terms: usize,

    /// Window used when a time filter cannot be parsed
    #[serde(default = "default_fallback_time_filter")]
    pub fallback_time_filter_days: i64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RecommendConfig {
    /// Only papers newer than this many days are recommended
    #[serde(default = "default_time_delta")]
    pub time_delta_days: i64,

    /// Papers per digest
    #[serde(default = "default_num_recommendations")]
    pub num_recommendations: usize,

    /// Regularization strength for tag-union classifiers
    #[serde(default = "default_recommend_svm_c")]
    pub svm_c: f64,

    /// Abstracts are cropped to this many characters
    #[serde(default = "default_summary_chars")]
    pub summary_chars: usize,

    /// When set and present, every digest is also written here
    pub output_dir: Option<PathBuf>,

    /// Log instead of sending
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    /// Mail provider: sendgrid, dry-run
    #[serde(default = "default_mail_provider")]
    pub provider: String,

    /// API key for the mail provider
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_mail_api_base")]
    pub api_base: String,

    /// Sender address
    #[serde(default = "default_mail_from")]
    pub from: String,

    /// Public site URL linked from the digest
    #[serde(default = "default_site_url")]
    pub site_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_mail_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,
}

// Default value functions
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 5000 }
fn default_request_timeout() -> u64 { 60 }
fn default_data_dir() -> PathBuf { PathBuf::from("data") }
fn default_features_file() -> PathBuf { PathBuf::from("features.json") }
fn default_page_size() -> usize { 25 }
fn default_svm_c() -> f64 { 0.01 }
fn default_max_iter() -> usize { 10_000 }
fn default_tolerance() -> f64 { 1e-6 }
fn default_positive_terms() -> usize { 40 }
fn default_negative_terms() -> usize { 20 }
fn default_fallback_time_filter() -> i64 { 20_000 }
fn default_time_delta() -> i64 { 3 }
fn default_num_recommendations() -> usize { 20 }
fn default_recommend_svm_c() -> f64 { 0.1 }
fn default_summary_chars() -> usize { 500 }
fn default_mail_provider() -> String { "sendgrid".to_string() }
fn default_mail_api_base() -> String { "https://api.sendgrid.com".to_string() }
fn default_mail_from() -> String { "admin@arxiv-sanity-lite.com".to_string() }
fn default_site_url() -> String { "https://arxiv-sanity-lite.com".to_string() }
fn default_mail_timeout() -> u64 { 30 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: default_data_dir(),
            features_file: default_features_file(),
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            default_svm_c: default_svm_c(),
            max_iter: default_max_iter(),
            tolerance: default_tolerance(),
            positive_terms: default_positive_terms(),
            negative_terms: default_negative_terms(),
            fallback_time_filter_days: default_fallback_time_filter(),
        }
    }
}

impl Default for RecommendConfig {
    fn default() -> Self {
        Self {
            time_delta_days: default_time_delta(),
            num_recommendations: default_num_recommendations(),
            svm_c: default_recommend_svm_c(),
            summary_chars: default_summary_chars(),
            output_dir: None,
            dry_run: false,
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            provider: default_mail_provider(),
            api_key: None,
            api_base: default_mail_api_base(),
            from: default_mail_from(),
            site_url: default_site_url(),
            timeout_secs: default_mail_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: 0,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., APP__RANKING__PAGE_SIZE=50
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Get request timeout as Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }

    /// Resolve the feature snapshot path against the data directory
    pub fn features_path(&self) -> PathBuf {
        if self.data.features_file.is_absolute() {
            self.data.features_file.clone()
        } else {
            self.data.dir.join(&self.data.features_file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.ranking.page_size, 25);
        assert_eq!(config.ranking.max_iter, 10_000);
        assert_eq!(config.recommend.num_recommendations, 20);
        assert_eq!(config.recommend.time_delta_days, 3);
        assert!((config.ranking.default_svm_c - 0.01).abs() < f64::EPSILON);
    }

    #[test]
    fn test_features_path_resolution() {
        let mut config = AppConfig::default();
        assert_eq!(config.features_path(), PathBuf::from("data/features.json"));

        config.data.features_file = PathBuf::from("/srv/features.json");
        assert_eq!(config.features_path(), PathBuf::from("/srv/features.json"));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sanity.toml");
        std::fs::write(&path, "[ranking]\npage_size = 10\n").unwrap();

        let config = AppConfig::from_file(path.to_str().unwrap()).unwrap();
        assert_eq!(config.ranking.page_size, 10);
        assert_eq!(config.ranking.negative_terms, 20);
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_observability_section_fields() {
        let value = serde_json::to_value(AppConfig::default().observability).unwrap();
        let mut keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["json_logging", "log_level", "metrics_port"]);
    }
}
