//! Outbound mail transport
//!
//! Provides a single interface for digest delivery:
//! - SendGrid v3 mail API
//! - Dry run (log only, keeps an in-memory outbox)

use async_trait::async_trait;
use sanity_common::config::MailConfig;
use sanity_common::errors::{AppError, Result};
use serde::Serialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::{info, warn};

/// Trait for delivering one HTML message
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()>;

    /// Provider name for logs
    fn name(&self) -> &str;
}

/// SendGrid v3 client
pub struct SendGridMailer {
    client: reqwest::Client,
    api_key: String,
    api_base: String,
    from: String,
}

/// One failed attempt
struct SendFailure {
    error: AppError,
    retryable: bool,
}

#[derive(Serialize)]
struct SendGridRequest<'a> {
    personalizations: Vec<Personalization<'a>>,
    from: Address<'a>,
    subject: &'a str,
    content: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Personalization<'a> {
    to: Vec<Address<'a>>,
}

#[derive(Serialize)]
struct Address<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    value: &'a str,
}

impl SendGridMailer {
    pub fn new(config: &MailConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("failed to build mail client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            from: config.from.clone(),
        })
    }

    /// Send with retry
    async fn send_with_retry(&self, request: &SendGridRequest<'_>) -> Result<()> {
        let max_retries = 3;
        let mut last_error = None;

        for attempt in 0..max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * (2_u64.pow(attempt as u32)));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(request).await {
                Ok(()) => return Ok(()),
                Err(failure) if !failure.retryable => return Err(failure.error),
                Err(failure) => {
                    warn!(
                        attempt = attempt + 1,
                        max_retries = max_retries,
                        error = %failure.error,
                        "Mail request failed, retrying"
                    );
                    last_error = Some(failure.error);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Mail {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(
        &self,
        request: &SendGridRequest<'_>,
    ) -> std::result::Result<(), SendFailure> {
        let url = format!("{}/v3/mail/send", self.api_base);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| SendFailure {
                error: AppError::Mail {
                    message: format!("Request failed: {}", e),
                },
                retryable: true,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SendFailure {
                error: AppError::Mail {
                    message: format!("API error {}: {}", status, body),
                },
                // client errors other than throttling will not change on retry
                retryable: !status.is_client_error()
                    || status == reqwest::StatusCode::TOO_MANY_REQUESTS,
            });
        }

        Ok(())
    }
}

#[async_trait]
impl Mailer for SendGridMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        let request = SendGridRequest {
            personalizations: vec![Personalization {
                to: vec![Address { email: to }],
            }],
            from: Address { email: &self.from },
            subject,
            content: vec![Content {
                kind: "text/html",
                value: html,
            }],
        };
        self.send_with_retry(&request).await
    }

    fn name(&self) -> &str {
        "sendgrid"
    }
}

/// A message accepted by [`DryRunMailer`]
#[derive(Debug, Clone, PartialEq)]
pub struct OutboxMessage {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Mailer that logs instead of sending
#[derive(Default)]
pub struct DryRunMailer {
    outbox: Mutex<Vec<OutboxMessage>>,
}

impl DryRunMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message accepted so far
    pub fn outbox(&self) -> Vec<OutboxMessage> {
        self.outbox
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for DryRunMailer {
    async fn send(&self, to: &str, subject: &str, html: &str) -> Result<()> {
        info!(to = %to, subject = %subject, bytes = html.len(), "Dry run, not sending");
        let mut outbox = self.outbox.lock().map_err(|_| AppError::Internal {
            message: "outbox lock poisoned".to_string(),
        })?;
        outbox.push(OutboxMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            html: html.to_string(),
        });
        Ok(())
    }

    fn name(&self) -> &str {
        "dry-run"
    }
}

/// Create a mailer based on configuration
pub fn create_mailer(config: &MailConfig, dry_run: bool) -> Result<Arc<dyn Mailer>> {
    if dry_run {
        return Ok(Arc::new(DryRunMailer::new()));
    }

    match config.provider.as_str() {
        "sendgrid" => {
            let key = config
                .api_key
                .clone()
                .filter(|k| !k.trim().is_empty())
                .ok_or_else(|| AppError::Configuration {
                    message: "mail.api_key is required for the sendgrid provider".to_string(),
                })?;
            Ok(Arc::new(SendGridMailer::new(config, key.trim().to_string())?))
        }
        "dry-run" => Ok(Arc::new(DryRunMailer::new())),
        other => {
            warn!(provider = other, "Unknown mail provider, using dry run");
            Ok(Arc::new(DryRunMailer::new()))
        }
    }
}
