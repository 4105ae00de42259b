//! Daily recommendation job
//!
//! For every user with tagged papers and a registered email address:
//! train a classifier on the union of their tags, keep recent untagged
//! papers, render the top of the ranking into a digest and mail it.
//! Users are processed one after another; one user's failure is logged
//! and counted, never propagated.

use crate::digest::{render_digest, subject_line, DigestOptions};
use crate::mailer::Mailer;
use chrono::{DateTime, Utc};
use sanity_common::config::{MailConfig, RecommendConfig};
use sanity_common::errors::{AppError, Result};
use sanity_common::metrics;
use sanity_common::store::Catalog;
use sanity_common::{FeatureStore, TagSet};
use sanity_ranking::{
    render_ranking, ClassifierParams, PipelineOptions, RankingPipeline, RenderedPaper, Strategy,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

/// Per-run counters, logged when the job ends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub sent: usize,
    pub skipped_no_tags: usize,
    pub skipped_no_email: usize,
    pub skipped_empty: usize,
    pub failed: usize,
}

impl BatchReport {
    /// Users looked at, whatever the outcome
    pub fn users(&self) -> usize {
        self.sent + self.skipped_no_tags + self.skipped_no_email + self.skipped_empty + self.failed
    }
}

enum Outcome {
    Sent,
    SkippedNoTags,
    SkippedNoEmail,
    SkippedEmpty,
}

impl Outcome {
    fn label(&self) -> &'static str {
        match self {
            Outcome::Sent => "sent",
            Outcome::SkippedNoTags => "skipped_no_tags",
            Outcome::SkippedNoEmail => "skipped_no_email",
            Outcome::SkippedEmpty => "skipped_empty",
        }
    }
}

pub struct RecommendationBatcher {
    catalog: Arc<dyn Catalog>,
    features: Arc<dyn FeatureStore>,
    mailer: Arc<dyn Mailer>,
    config: RecommendConfig,
    params: ClassifierParams,
    digest: DigestOptions,
    only_user: Option<String>,
    now: Option<i64>,
}

impl RecommendationBatcher {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        features: Arc<dyn FeatureStore>,
        mailer: Arc<dyn Mailer>,
        config: RecommendConfig,
        mail: &MailConfig,
        params: ClassifierParams,
    ) -> Self {
        let digest = DigestOptions {
            site_url: mail.site_url.clone(),
            summary_chars: config.summary_chars,
        };
        Self {
            catalog,
            features,
            mailer,
            config,
            params,
            digest,
            only_user: None,
            now: None,
        }
    }

    /// Restrict the run to a single user
    pub fn only_user(mut self, user: impl Into<String>) -> Self {
        self.only_user = Some(user.into());
        self
    }

    /// Pin the evaluation clock (seconds since epoch)
    pub fn with_now(mut self, now: i64) -> Self {
        self.now = Some(now);
        self
    }

    fn now(&self) -> i64 {
        self.now.unwrap_or_else(|| Utc::now().timestamp())
    }

    /// Process every user once.
    ///
    /// Only a failure to enumerate users is returned as an error.
    pub async fn run(&self) -> Result<BatchReport> {
        let all_tags = self.catalog.all_tags()?;
        let now = self.now();
        let subject = subject_line(
            DateTime::<Utc>::from_timestamp(now, 0).unwrap_or_else(Utc::now),
        );
        info!(
            users = all_tags.len(),
            mailer = self.mailer.name(),
            "Starting recommendation run"
        );

        let mut report = BatchReport::default();
        for (user, tags) in all_tags {
            if let Some(only) = &self.only_user {
                if *only != user {
                    continue;
                }
            }

            match self.process_user(&user, tags, now, &subject).await {
                Ok(outcome) => {
                    metrics::record_recommend_user(outcome.label());
                    match outcome {
                        Outcome::Sent => report.sent += 1,
                        Outcome::SkippedNoTags => report.skipped_no_tags += 1,
                        Outcome::SkippedNoEmail => report.skipped_no_email += 1,
                        Outcome::SkippedEmpty => report.skipped_empty += 1,
                    }
                }
                Err(e) => {
                    error!(user = %user, error = %e, "Recommendation failed, continuing");
                    metrics::record_recommend_user("failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            sent = report.sent,
            skipped_no_tags = report.skipped_no_tags,
            skipped_no_email = report.skipped_no_email,
            skipped_empty = report.skipped_empty,
            failed = report.failed,
            "Recommendation run complete"
        );
        Ok(report)
    }

    #[instrument(skip_all, fields(user = %user))]
    async fn process_user(
        &self,
        user: &str,
        tags: TagSet,
        now: i64,
        subject: &str,
    ) -> Result<Outcome> {
        if tags.is_empty() {
            debug!("No tagged papers, skipping");
            return Ok(Outcome::SkippedNoTags);
        }

        let email = match self.catalog.email(user)? {
            Some(email) if !email.trim().is_empty() => email,
            _ => {
                debug!("No registered email, skipping");
                return Ok(Outcome::SkippedNoEmail);
            }
        };

        let papers = self.recommend(tags, now).await?;
        if papers.is_empty() {
            info!("No recommendations, skipping");
            return Ok(Outcome::SkippedEmpty);
        }

        let html = render_digest(&papers, &self.digest);
        if let Some(dir) = &self.config.output_dir {
            if dir.is_dir() {
                let path = digest_path(dir, user);
                tokio::fs::write(&path, &html).await?;
                debug!(path = %path.display(), "Digest written");
            }
        }

        self.mailer.send(email.trim(), subject, &html).await?;
        info!(recommendations = papers.len(), "Digest sent");
        Ok(Outcome::Sent)
    }

    /// Rank recent untagged papers against the user's tag union
    async fn recommend(&self, tags: TagSet, now: i64) -> Result<Vec<RenderedPaper>> {
        let positives = tags.union();
        let options = PipelineOptions {
            time_window_days: Some(self.config.time_delta_days as f64),
            exclude: positives.clone(),
            page: 1,
            page_size: self.config.num_recommendations,
        };
        let strategy = Strategy::Positives {
            pids: positives,
            c: self.config.svm_c,
        };

        let catalog = self.catalog.clone();
        let features = self.features.clone();
        let params = self.params.clone();

        tokio::task::spawn_blocking(move || {
            let pipeline = RankingPipeline::new(catalog.as_ref(), features.as_ref(), params)
                .with_now(now);
            let page = pipeline.run(&strategy, &options)?;
            if page.items.len() < page.total {
                debug!(total = page.total, kept = page.items.len(), "Ranking truncated");
            }
            render_ranking(catalog.as_ref(), &page.items)
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "Ranking task failed");
            AppError::Internal {
                message: format!("ranking task failed: {}", e),
            }
        })?
    }
}

/// `{dir}/{user}.html`, with path separators and other unsafe characters replaced
fn digest_path(dir: &Path, user: &str) -> PathBuf {
    let name: String = user
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let name = name.trim_start_matches('.');
    let name = if name.is_empty() { "user" } else { name };
    dir.join(format!("{}.html", name))
}
