//! Outgoing email.
//!
//! Delivery is handled by an external service; this module defines the
//! message shape, the [`Mailer`] seam, and the templates the marketplace
//! sends.

use std::sync::Mutex;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub to: String,
    pub subject: String,
    pub html: String,
}

#[derive(Error, Debug)]
pub enum MailError {
    #[error("delivery failed: {0}")]
    Delivery(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Mailer that writes every message to the log.
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(
            from = %self.from,
            to = %email.to,
            subject = %email.subject,
            "Sending email"
        );
        tracing::debug!(body = %email.html, "Email body");
        Ok(())
    }
}

/// Mailer that keeps messages in memory. Used by tests.
#[derive(Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<Email>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Email> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn sent_to(&self, to: &str) -> Vec<Email> {
        self.sent().into_iter().filter(|e| e.to == to).collect()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        self.sent
            .lock()
            .map_err(|_| MailError::Delivery("mailbox poisoned".to_string()))?
            .push(email);
        Ok(())
    }
}

/// Send a notification; failures are logged, not propagated.
pub async fn notify(mailer: &dyn Mailer, email: Email) {
    let to = email.to.clone();
    let subject = email.subject.clone();
    if let Err(e) = mailer.send(email).await {
        tracing::warn!(to = %to, subject = %subject, "Failed to send notification: {}", e);
    }
}

pub fn verification_email(to: &str, token: &str, origin: Option<&str>) -> Email {
    let body = match origin {
        Some(origin) => {
            let url = format!("{}/account/verify-email?token={}", origin, token);
            format!(
                r#"<p>Please click the link below to verify your email address:</p>
<p><a href="{url}">{url}</a></p>"#
            )
        }
        None => format!(
            r#"<p>Please use the token below to verify your email address with the <code>/accounts/verify-email</code> route:</p>
<p><code>{token}</code></p>"#
        ),
    };

    Email {
        to: to.to_string(),
        subject: "Verify your email".to_string(),
        html: format!("<h4>Verify Email</h4>\n<p>Thanks for registering!</p>\n{body}"),
    }
}

pub fn already_registered_email(to: &str, origin: Option<&str>) -> Email {
    let body = match origin {
        Some(origin) => format!(
            r#"<p>If you don't know your password please visit the <a href="{origin}/account/forgot-password">forgot password</a> page.</p>"#
        ),
        None => "<p>If you don't know your password you can reset it with the <code>/accounts/forgot-password</code> route.</p>".to_string(),
    };

    Email {
        to: to.to_string(),
        subject: "Email already registered".to_string(),
        html: format!(
            "<h4>Email Already Registered</h4>\n<p>Your email <strong>{to}</strong> is already registered.</p>\n{body}"
        ),
    }
}

pub fn password_reset_email(to: &str, token: &str, origin: Option<&str>) -> Email {
    let body = match origin {
        Some(origin) => {
            let url = format!("{}/account/reset-password?token={}", origin, token);
            format!(
                r#"<p>Please click the link below to reset your password. The link is valid for 1 day:</p>
<p><a href="{url}">{url}</a></p>"#
            )
        }
        None => format!(
            r#"<p>Please use the token below to reset your password with the <code>/accounts/reset-password</code> route:</p>
<p><code>{token}</code></p>"#
        ),
    };

    Email {
        to: to.to_string(),
        subject: "Reset your password".to_string(),
        html: format!("<h4>Reset Password</h4>\n{body}"),
    }
}

/// Build a plain notification with a single-paragraph-per-line body.
pub fn notice(to: &str, subject: &str, lines: &[String]) -> Email {
    let html = lines
        .iter()
        .map(|l| format!("<p>{}</p>", l))
        .collect::<Vec<_>>()
        .join("\n");

    Email {
        to: to.to_string(),
        subject: subject.to_string(),
        html,
    }
}
