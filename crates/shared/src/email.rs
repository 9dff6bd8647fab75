//! Outgoing mail.
//!
//! Task handlers only see the [`Mailer`] capability; [`SmtpMailer`] is the
//! `lettre` SMTP implementation wired in by the server.

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Mailbox, header::ContentType},
    transport::smtp::{self, authentication::Credentials},
};
use thiserror::Error;

use crate::config::EmailConfig;

/// Email service errors.
#[derive(Debug, Error)]
pub enum EmailError {
    /// Failed to build email message.
    #[error("Failed to build email: {0}")]
    BuildError(String),
    /// Failed to send email.
    #[error("Failed to send email: {0}")]
    SendError(String),
    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),
    /// The relay refused the message with a permanent (5xx) reply.
    #[error("Email rejected: {0}")]
    Rejected(String),
}

impl EmailError {
    /// Returns true if sending the same message again cannot succeed.
    #[must_use]
    pub const fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::BuildError(_) | Self::InvalidAddress(_) | Self::Rejected(_)
        )
    }
}

impl From<smtp::Error> for EmailError {
    fn from(err: smtp::Error) -> Self {
        if err.is_permanent() {
            Self::Rejected(err.to_string())
        } else {
            Self::SendError(err.to_string())
        }
    }
}

/// A plain-text message ready to be delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address.
    pub to: String,
    /// Recipient display name.
    pub to_name: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body: String,
}

/// Capability to deliver an [`EmailMessage`].
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers one message.
    async fn send_email(&self, message: &EmailMessage) -> Result<(), EmailError>;
}

/// SMTP mailer backed by `lettre`.
#[derive(Clone)]
pub struct SmtpMailer {
    config: EmailConfig,
}

impl SmtpMailer {
    /// Creates a new SMTP mailer.
    #[must_use]
    pub const fn new(config: EmailConfig) -> Self {
        Self { config }
    }

    /// Returns the mailer configuration.
    #[must_use]
    pub const fn config(&self) -> &EmailConfig {
        &self.config
    }

    /// Creates an SMTP transport.
    fn create_transport(&self) -> Result<AsyncSmtpTransport<Tokio1Executor>, EmailError> {
        let mut builder = if self.config.smtp_tls {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&self.config.smtp_host)
                .map_err(|e| EmailError::SendError(e.to_string()))?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&self.config.smtp_host)
        };

        builder = builder.port(self.config.smtp_port);
        if !self.config.smtp_username.is_empty() {
            builder = builder.credentials(Credentials::new(
                self.config.smtp_username.clone(),
                self.config.smtp_password.clone(),
            ));
        }

        Ok(builder.build())
    }

    /// Builds the MIME message for `message`.
    fn build_message(&self, message: &EmailMessage) -> Result<Message, EmailError> {
        let from: Mailbox = format!("{} <{}>", self.config.from_name, self.config.from_email)
            .parse()
            .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?;
        let to: Mailbox = format!("{} <{}>", message.to_name, message.to)
            .parse()
            .map_err(|e| EmailError::InvalidAddress(format!("{e}")))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(message.subject.clone())
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| EmailError::BuildError(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_email(&self, message: &EmailMessage) -> Result<(), EmailError> {
        let email = self.build_message(message)?;
        let transport = self.create_transport()?;
        transport.send(email).await?;

        tracing::debug!(to = %message.to, subject = %message.subject, "email sent");
        Ok(())
    }
}

#[cfg(test)]
#[path = "email_tests.rs"]
mod tests;
