//! Password Reset Use Cases
//!
//! Forgotten-password flow: a reset-class token is mailed to the account,
//! and redeeming it either sets a password chosen by the user or mails a
//! generated one. Both paths revoke the stored refresh token.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::hashing::hash_password;
use crate::application::mail_dispatch::MailDispatcher;
use crate::application::token_service::TokenService;
use crate::domain::entity::user::User;
use crate::domain::mailer::MailMessage;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{email::Email, user_password::RawPassword};
use crate::error::{AuthError, AuthResult, RESET_FAILED};

/// Response to a reset request, whether or not the account exists
pub const RESET_REQUESTED_MESSAGE: &str = "Check your email for the password reset link.";

/// Response after a generated password was mailed
pub const NEW_PASSWORD_SENT_MESSAGE: &str = "New password sent by email!";

/// Confirm reset input
pub struct ConfirmResetInput {
    /// Reset-class bearer token from the reset mail
    pub token: String,
    pub password1: String,
    pub password2: String,
}

pub struct PasswordResetUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    tokens: Arc<TokenService>,
    mail: MailDispatcher,
    config: Arc<AuthConfig>,
}

impl<U> PasswordResetUseCase<U>
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

    /// Mail a reset link if the account exists. Silent otherwise.
    pub async fn request(&self, email: &str) -> AuthResult<&'static str> {
        let Ok(email) = Email::new(email) else {
            return Ok(RESET_REQUESTED_MESSAGE);
        };

        if let Some(user) = self.user_repo.find_by_email(&email).await? {
            let token = self.tokens.issue_reset_token(email.as_str())?;
            self.mail.dispatch(MailMessage::ResetNotice {
                email: user.email.to_string(),
                username: user.username.to_string(),
                host: self.config.public_base_url.clone(),
                token,
            });
            tracing::info!(user_id = %user.user_id, "Password reset requested");
        }

        Ok(RESET_REQUESTED_MESSAGE)
    }

    /// Set the password chosen by the user.
    pub async fn confirm(&self, input: ConfirmResetInput) -> AuthResult<User> {
        if input.password1 != input.password2 {
            return Err(AuthError::PasswordMismatch);
        }

        let subject = self.tokens.decode_reset_token(&input.token)?;
        let email = Email::new(&subject).map_err(|_| AuthError::InvalidCredentials)?;

        if self.user_repo.find_by_email(&email).await?.is_none() {
            return Err(AuthError::InvalidCredentials);
        }

        let raw_password = RawPassword::new(input.password1)?;
        let password_hash = hash_password(&self.config, raw_password).await?;

        let user = self
            .user_repo
            .set_password_hash(&email, &password_hash)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        tracing::info!(user_id = %user.user_id, "Password reset confirmed");

        self.mail.dispatch(MailMessage::PasswordChanged {
            email: user.email.to_string(),
            username: user.username.to_string(),
            host: self.config.public_base_url.clone(),
        });

        Ok(user)
    }

    /// Replace the password with a generated one and mail it.
    pub async fn auto_reset(&self, token: &str) -> AuthResult<&'static str> {
        let subject = self.tokens.decode_reset_token(token)?;
        let email = Email::new(&subject).map_err(|_| AuthError::VerificationError(RESET_FAILED))?;

        if self.user_repo.find_by_email(&email).await?.is_none() {
            return Err(AuthError::VerificationError(RESET_FAILED));
        }

        let generated = RawPassword::generate(self.config.generated_password_length);
        let password = generated.expose_secret().to_string();
        let password_hash = hash_password(&self.config, generated).await?;

        let user = self
            .user_repo
            .set_password_hash(&email, &password_hash)
            .await?
            .ok_or(AuthError::VerificationError(RESET_FAILED))?;

        tracing::info!(user_id = %user.user_id, "Password replaced with generated one");

        self.mail.dispatch(MailMessage::GeneratedPassword {
            email: user.email.to_string(),
            username: user.username.to_string(),
            host: self.config.public_base_url.clone(),
            password,
        });

        Ok(NEW_PASSWORD_SENT_MESSAGE)
    }
}
