//! Completion notifications for finished runs.
//!
//! [`Notifier`] fires a single webhook POST and/or email per finished run.
//! Delivery is one-shot: there is no retry, and a failure is logged without
//! ever touching the run's already-persisted status. Email requires SMTP to
//! be configured via [`EmailConfig::from_env`]; without it, email targets are
//! skipped with a warning.

use std::time::Duration;

use runforge_core::status::RunStatus;
use runforge_core::types::{DbId, Timestamp};
use serde::Serialize;

/// HTTP request timeout for the single webhook attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for notification delivery failures. These are logged by the
/// caller and never propagate into run handling.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The webhook HTTP request failed (network, DNS, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The webhook endpoint returned a non-2xx status code.
    #[error("Webhook returned HTTP {0}")]
    HttpStatus(u16),

    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@runforge.local";

/// Configuration for SMTP email delivery.
#[derive(Debug, Clone)]
pub struct EmailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that email
    /// delivery is not configured and should be skipped.
    ///
    /// | Variable        | Required | Default                   |
    /// |-----------------|----------|---------------------------|
    /// | `SMTP_HOST`     | yes      | —                         |
    /// | `SMTP_PORT`     | no       | `587`                     |
    /// | `SMTP_FROM`     | no       | `noreply@runforge.local`  |
    /// | `SMTP_USER`     | no       | —                         |
    /// | `SMTP_PASSWORD` | no       | —                         |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// Notification payload
// ---------------------------------------------------------------------------

/// Where a finished run should be announced. Empty strings mean the target
/// is not configured.
#[derive(Debug, Clone, Default)]
pub struct NotificationTargets {
    pub webhook_url: String,
    /// Comma-separated recipient list.
    pub email: String,
}

impl NotificationTargets {
    pub fn is_empty(&self) -> bool {
        self.webhook_url.is_empty() && self.email.is_empty()
    }
}

/// JSON body of the completion webhook, also the source for the email text.
#[derive(Debug, Clone, Serialize)]
pub struct RunNotification {
    pub run_id: DbId,
    pub job_name: String,
    pub status: RunStatus,
    pub finished_at: Timestamp,
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Fires completion notifications for finished runs.
pub struct Notifier {
    client: reqwest::Client,
    email: Option<EmailConfig>,
}

impl Notifier {
    /// Create a notifier with a pre-configured HTTP client. `email` is the
    /// SMTP configuration, or `None` when email delivery is unavailable.
    pub fn new(email: Option<EmailConfig>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self { client, email }
    }

    /// Deliver the notification to every configured target, exactly once
    /// each. Failures are logged and swallowed.
    pub async fn notify(&self, targets: &NotificationTargets, notification: &RunNotification) {
        if !targets.webhook_url.is_empty() {
            if let Err(e) = self.post_webhook(&targets.webhook_url, notification).await {
                tracing::warn!(
                    run_id = notification.run_id,
                    url = %targets.webhook_url,
                    error = %e,
                    "Completion webhook failed"
                );
            }
        }

        if !targets.email.is_empty() {
            match &self.email {
                Some(config) => {
                    if let Err(e) = self.send_email(config, &targets.email, notification).await {
                        tracing::warn!(
                            run_id = notification.run_id,
                            to = %targets.email,
                            error = %e,
                            "Completion email failed"
                        );
                    }
                }
                None => tracing::warn!(
                    run_id = notification.run_id,
                    "Completion email requested but SMTP is not configured"
                ),
            }
        }
    }

    /// Execute the single POST attempt and check the response status.
    async fn post_webhook(
        &self,
        url: &str,
        notification: &RunNotification,
    ) -> Result<(), NotifyError> {
        let response = self.client.post(url).json(notification).send().await?;
        if !response.status().is_success() {
            return Err(NotifyError::HttpStatus(response.status().as_u16()));
        }
        tracing::info!(run_id = notification.run_id, url, "Completion webhook delivered");
        Ok(())
    }

    /// Send the plain-text completion email via SMTP.
    async fn send_email(
        &self,
        config: &EmailConfig,
        to_email: &str,
        notification: &RunNotification,
    ) -> Result<(), NotifyError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let subject = format!(
            "[runforge] {}: {}",
            notification.job_name, notification.status
        );
        let body = format!(
            "Run #{} of \"{}\" finished with status {}.\nFinished at: {}\n",
            notification.run_id,
            notification.job_name,
            notification.status,
            notification.finished_at
        );

        let mut builder = Message::builder()
            .from(config.from_address.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN);
        for recipient in to_email.split(',') {
            let recipient = recipient.trim();
            if !recipient.is_empty() {
                builder = builder.to(recipient.parse()?);
            }
        }
        let email = builder
            .body(body)
            .map_err(|e| NotifyError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
                .port(config.smtp_port);

        if let (Some(user), Some(pass)) = (&config.smtp_user, &config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        transport_builder.build().send(email).await?;

        tracing::info!(run_id = notification.run_id, to = to_email, "Completion email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        // Ensure SMTP_HOST is not set in the test environment.
        std::env::remove_var("SMTP_HOST");
        assert!(EmailConfig::from_env().is_none());
    }

    #[test]
    fn empty_targets_are_detected() {
        assert!(NotificationTargets::default().is_empty());
        let targets = NotificationTargets {
            webhook_url: "https://example.com/hook".to_string(),
            email: String::new(),
        };
        assert!(!targets.is_empty());
    }

    #[test]
    fn notification_serializes_with_lowercase_status() {
        let notification = RunNotification {
            run_id: 12,
            job_name: "nightly deploy".to_string(),
            status: RunStatus::Success,
            finished_at: chrono::DateTime::from_timestamp(1_700_000_000, 0).unwrap(),
        };
        let json = serde_json::to_value(&notification).unwrap();
        assert_eq!(json["run_id"], 12);
        assert_eq!(json["status"], "success");
    }

    #[test]
    fn notify_error_display_http_status() {
        let err = NotifyError::HttpStatus(502);
        assert_eq!(err.to_string(), "Webhook returned HTTP 502");
    }

    #[test]
    fn notifier_construction_does_not_panic() {
        let _notifier = Notifier::new(None);
    }
}
