//! Outbound account email.
//!
//! Dispatch is fire-and-forget: callers enqueue a message after their
//! database work has committed and never wait on the SMTP conversation.
//! Delivery failures are logged, not surfaced.

use anyhow::Result;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::SmtpConfig;

/// Which account flow a message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailPurpose {
    Verification,
    PasswordReset,
}

/// A single outbound message carrying a purpose-tagged token link.
#[derive(Debug, Clone)]
pub struct AccountMail {
    pub to: String,
    pub user_id: i32,
    pub purpose: MailPurpose,
    pub token: String,
}

/// Queue-and-forget mail dispatch.
pub trait Mailer: Send + Sync {
    /// Hand a message off for delivery. Returns immediately.
    fn dispatch(&self, mail: AccountMail);
}

/// SMTP-backed mailer. The blocking SMTP send runs on the blocking thread
/// pool inside a spawned task.
pub struct SmtpMailer {
    config: SmtpConfig,
    public_url: String,
}

impl SmtpMailer {
    #[must_use]
    pub const fn new(config: SmtpConfig, public_url: String) -> Self {
        Self { config, public_url }
    }

    fn build_transport(config: &SmtpConfig) -> Result<SmtpTransport> {
        let mut builder = if config.use_tls {
            SmtpTransport::starttls_relay(&config.host)?
        } else {
            SmtpTransport::builder_dangerous(&config.host)
        }
        .port(config.port)
        .timeout(Some(Duration::from_secs(config.timeout_secs)));

        if !config.username.is_empty() {
            builder = builder.credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ));
        }

        Ok(builder.build())
    }

    fn build_message(config: &SmtpConfig, public_url: &str, mail: &AccountMail) -> Result<Message> {
        let from = format!("{} <{}>", config.from_name, config.from_email)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid from address: {e}"))?;

        let to = mail
            .to
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid to address: {e}"))?;

        let (subject, body) = match mail.purpose {
            MailPurpose::Verification => (
                "Verification URL from Askhub",
                format!(
                    "Welcome to Askhub!\n\nOpen the link below to activate your account:\n\n{}/api/auth/verify/{}\n\nIf you did not register, you can ignore this message.\n",
                    public_url, mail.token
                ),
            ),
            MailPurpose::PasswordReset => (
                "Reset Password Link",
                format!(
                    "A password reset was requested for your Askhub account.\n\nUse the token below with the set-password endpoint:\n\n{}/api/auth/set-password/{}\n\nIf you did not request a reset, you can ignore this message.\n",
                    public_url, mail.token
                ),
            ),
        };

        let message = Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        Ok(message)
    }
}

impl Mailer for SmtpMailer {
    fn dispatch(&self, mail: AccountMail) {
        let config = self.config.clone();
        let public_url = self.public_url.clone();

        tokio::task::spawn_blocking(move || {
            let send = || -> Result<()> {
                let transport = Self::build_transport(&config)?;
                let message = Self::build_message(&config, &public_url, &mail)?;
                transport.send(&message)?;
                Ok(())
            };

            match send() {
                Ok(()) => debug!(user_id = mail.user_id, "Account email sent"),
                Err(e) => warn!(
                    user_id = mail.user_id,
                    "Failed to send account email: {e}"
                ),
            }
        });
    }
}

/// Development mailer used when SMTP is disabled: the token link lands in
/// the log instead of a mailbox.
pub struct LogMailer {
    public_url: String,
}

impl LogMailer {
    #[must_use]
    pub const fn new(public_url: String) -> Self {
        Self { public_url }
    }
}

impl Mailer for LogMailer {
    fn dispatch(&self, mail: AccountMail) {
        let path = match mail.purpose {
            MailPurpose::Verification => "verify",
            MailPurpose::PasswordReset => "set-password",
        };
        tracing::info!(
            user_id = mail.user_id,
            to = %mail.to,
            "SMTP disabled, would have sent: {}/api/auth/{}/{}",
            self.public_url,
            path,
            mail.token
        );
    }
}
