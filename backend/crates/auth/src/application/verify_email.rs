//! Email Verification Use Cases
//!
//! Redeeming the link from the verification mail, and asking for it again.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::mail_dispatch::MailDispatcher;
use crate::application::token_service::TokenService;
use crate::domain::mailer::MailMessage;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult, VERIFICATION_FAILED};

/// Result of redeeming a verification token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyEmailOutcome {
    Verified,
    AlreadyVerified,
}

impl VerifyEmailOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            VerifyEmailOutcome::Verified => "Email verified!",
            VerifyEmailOutcome::AlreadyVerified => "Your email is already verified!",
        }
    }
}

/// Result of asking for another verification mail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEmailOutcome {
    /// Sent if the account exists; the caller cannot tell
    CheckEmail,
    AlreadyConfirmed,
}

impl RequestEmailOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            RequestEmailOutcome::CheckEmail => "Check your email for confirmation.",
            RequestEmailOutcome::AlreadyConfirmed => "Your email is already confirmed!",
        }
    }
}

pub struct VerifyEmailUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    tokens: Arc<TokenService>,
    mail: MailDispatcher,
    config: Arc<AuthConfig>,
}

impl<U> VerifyEmailUseCase<U>
where
    U: UserRepository,
{
    pub fn new(
        user_repo: Arc<U>,
        tokens: Arc<TokenService>,
        mail: MailDispatcher,
        config: Arc<AuthConfig>,
    ) -> Self {
        Self {
            user_repo,
            tokens,
            mail,
            config,
        }
    }

    /// Redeem an email-verification token. Idempotent.
    pub async fn verify(&self, token: &str) -> AuthResult<VerifyEmailOutcome> {
        let subject = self.tokens.decode_email_token(token).map_err(|e| {
            tracing::debug!(error = %e, "Email token rejected");
            AuthError::VerificationError(VERIFICATION_FAILED)
        })?;

        let email =
            Email::new(&subject).map_err(|_| AuthError::VerificationError(VERIFICATION_FAILED))?;

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::VerificationError(VERIFICATION_FAILED))?;

        if user.is_verified() {
            return Ok(VerifyEmailOutcome::AlreadyVerified);
        }

        self.user_repo.set_verified(&email).await?;
        tracing::info!(user_id = %user.user_id, "Email verified");

        Ok(VerifyEmailOutcome::Verified)
    }

    /// Send the verification mail again if the account exists and is not
    /// yet verified.
    pub async fn request(&self, email: &str) -> AuthResult<RequestEmailOutcome> {
        let Ok(email) = Email::new(email) else {
            return Ok(RequestEmailOutcome::CheckEmail);
        };

        let Some(user) = self.user_repo.find_by_email(&email).await? else {
            return Ok(RequestEmailOutcome::CheckEmail);
        };

        if user.is_verified() {
            return Ok(RequestEmailOutcome::AlreadyConfirmed);
        }

        let token = self.tokens.issue_email_token(email.as_str())?;
        self.mail.dispatch(MailMessage::Verification {
            email: user.email.to_string(),
            username: user.username.to_string(),
            host: self.config.public_base_url.clone(),
            token,
        });

        Ok(RequestEmailOutcome::CheckEmail)
    }
}
