//! Sanity Ranker Recommendation Mailer
//!
//! Runs the daily recommendation job once:
//! 1. Reads every user's tags and registered email address
//! 2. Trains a classifier per user on their tagged papers
//! 3. Ranks recent untagged papers and renders a digest
//! 4. Mails the digest (or only logs it with `--dry-run`)
//!
//! Usage: `recommender [--dry-run] [--user NAME]`

mod batcher;
mod digest;
mod mailer;

use crate::batcher::RecommendationBatcher;
use crate::mailer::create_mailer;
use sanity_common::{
    config::{AppConfig, ObservabilityConfig},
    features::FileFeatureStore,
    metrics,
    store::JsonDirStore,
    VERSION,
};
use sanity_ranking::ClassifierParams;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Command line switches
#[derive(Debug, Default, PartialEq)]
struct Args {
    dry_run: bool,
    user: Option<String>,
}

impl Args {
    fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, String> {
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--dry-run" | "-n" => parsed.dry_run = true,
                "--user" | "-u" => match args.next() {
                    Some(user) => parsed.user = Some(user),
                    None => return Err(format!("{} needs a user name", arg)),
                },
                other => return Err(format!("unknown argument: {}", other)),
            }
        }
        Ok(parsed)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse(std::env::args().skip(1))?;

    // Load configuration
    let config = AppConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        e
    })?;

    init_tracing(&config.observability);
    info!("Starting Sanity Ranker Recommendation Mailer v{}", VERSION);
    metrics::register_metrics();

    // Open the collaborator stores
    info!(dir = %config.data.dir.display(), "Opening data directory");
    let catalog = JsonDirStore::open(&config.data.dir)?;
    let features = FileFeatureStore::new(config.features_path());

    let dry_run = args.dry_run || config.recommend.dry_run;
    let mailer = create_mailer(&config.mail, dry_run)?;
    info!(mailer = mailer.name(), dry_run = dry_run, "Mailer initialized");

    let mut batcher = RecommendationBatcher::new(
        Arc::new(catalog),
        Arc::new(features),
        mailer,
        config.recommend.clone(),
        &config.mail,
        ClassifierParams::from_config(&config.ranking),
    );
    if let Some(user) = args.user {
        info!(user = %user, "Restricting run to one user");
        batcher = batcher.only_user(user);
    }

    match batcher.run().await {
        Ok(report) => {
            info!(users = report.users(), sent = report.sent, "Done");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Recommendation run aborted");
            Err(e.into())
        }
    }
}

/// Stdout subscriber; `RUST_LOG` overrides the configured level
fn init_tracing(config: &ObservabilityConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    if config.json_logging {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Result<Args, String> {
        Args::parse(raw.iter().map(|s| s.to_string()))
    }

    #[test]
    fn test_parse_args() {
        assert_eq!(args(&[]).unwrap(), Args::default());
        assert_eq!(
            args(&["--dry-run", "-u", "alice"]).unwrap(),
            Args {
                dry_run: true,
                user: Some("alice".to_string()),
            }
        );
        assert!(args(&["--user"]).is_err());
        assert!(args(&["--bogus"]).is_err());
    }
}
