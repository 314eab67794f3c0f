//! Outgoing Mail
//!
//! The auth flows only decide *which* message goes out and with what
//! payload. Rendering and delivery belong to a [`Mailer`] implementation.

use std::fmt;

/// Every message the auth subsystem can send
#[derive(Clone, PartialEq, Eq)]
pub enum MailMessage {
    /// Link to confirm ownership of the address
    Verification {
        email: String,
        username: String,
        host: String,
        token: String,
    },
    /// Link to reset a forgotten password
    ResetNotice {
        email: String,
        username: String,
        host: String,
        token: String,
    },
    /// The password was changed
    PasswordChanged {
        email: String,
        username: String,
        host: String,
    },
    /// A generated password, in clear text
    GeneratedPassword {
        email: String,
        username: String,
        host: String,
        password: String,
    },
}

impl MailMessage {
    pub fn recipient(&self) -> &str {
        match self {
            MailMessage::Verification { email, .. }
            | MailMessage::ResetNotice { email, .. }
            | MailMessage::PasswordChanged { email, .. }
            | MailMessage::GeneratedPassword { email, .. } => email,
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            MailMessage::Verification { .. } => "Confirm your email",
            MailMessage::ResetNotice { .. } => "Reset password",
            MailMessage::PasswordChanged { .. } => "Your password has been changed",
            MailMessage::GeneratedPassword { .. } => "Your new password",
        }
    }

    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            MailMessage::Verification { .. } => "verification",
            MailMessage::ResetNotice { .. } => "reset_notice",
            MailMessage::PasswordChanged { .. } => "password_changed",
            MailMessage::GeneratedPassword { .. } => "generated_password",
        }
    }
}

// Tokens and passwords stay out of logs.
impl fmt::Debug for MailMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailMessage")
            .field("kind", &self.kind())
            .field("to", &self.recipient())
            .finish_non_exhaustive()
    }
}

/// Delivery failure reported by a [`Mailer`]
#[derive(Debug, thiserror::Error)]
#[error("Mail delivery failed: {0}")]
pub struct MailError(pub String);

/// Email-dispatch collaborator
#[trait_variant::make(Mailer: Send)]
pub trait LocalMailer {
    async fn send(&self, message: MailMessage) -> Result<(), MailError>;
}
