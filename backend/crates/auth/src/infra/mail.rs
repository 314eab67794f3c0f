//! Mailer Implementations
//!
//! SMTP delivery and template rendering live outside this service.
//! `LogMailer` records each outgoing message as a structured log line. Links
//! carry live tokens, so they are only logged when enabled, for local runs
//! without a mail server.

use crate::domain::mailer::{MailError, MailMessage, Mailer};

/// Writes each message to the log instead of delivering it
#[derive(Debug, Clone, Default)]
pub struct LogMailer {
    log_links: bool,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also log the action link at debug level
    pub fn with_links(mut self, log_links: bool) -> Self {
        self.log_links = log_links;
        self
    }

    fn loggable_link(&self, message: &MailMessage) -> Option<String> {
        self.log_links.then(|| action_link(message)).flatten()
    }
}

/// Link the recipient follows for a token-carrying message
pub fn action_link(message: &MailMessage) -> Option<String> {
    match message {
        MailMessage::Verification { host, token, .. } => {
            Some(format!("{host}api/auth/verified_email/{token}"))
        }
        MailMessage::ResetNotice { host, token, .. } => {
            Some(format!("{host}api/auth/reset_password/{token}"))
        }
        MailMessage::PasswordChanged { .. } | MailMessage::GeneratedPassword { .. } => None,
    }
}

impl Mailer for LogMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError> {
        tracing::info!(
            kind = message.kind(),
            to = %message.recipient(),
            subject = message.subject(),
            has_link = action_link(&message).is_some(),
            "Outgoing mail"
        );
        if let Some(link) = self.loggable_link(&message) {
            tracing::debug!(to = %message.recipient(), link = %link, "Mail action link");
        }
        Ok(())
    }
}
