//! Sign In Use Case
//!
//! Verifies email + password and issues a token pair.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::hashing::verify_password;
use crate::application::token_service::TokenService;
use crate::domain::repository::UserRepository;
use crate::domain::token::TokenPair;
use crate::domain::value_object::{email::Email, user_password::RawPassword};
use crate::error::{AuthError, AuthResult};

/// Sign in input
pub struct SignInInput {
    pub email: String,
    pub password: String,
}

/// Sign in use case
pub struct SignInUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    tokens: Arc<TokenService>,
    config: Arc<AuthConfig>,
}

impl<U> SignInUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, tokens: Arc<TokenService>, config: Arc<AuthConfig>) -> Self {
        Self {
            user_repo,
            tokens,
            config,
        }
    }

    /// Unknown account and wrong password fail the same way. Verification
    /// status is only revealed to someone who knows the password.
    pub async fn execute(&self, input: SignInInput) -> AuthResult<TokenPair> {
        let email = Email::new(&input.email).map_err(|_| AuthError::InvalidCredentials)?;

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        let password_valid = verify_password(
            &self.config,
            RawPassword::presented(input.password),
            user.password_hash.clone(),
        )
        .await?;

        if !password_valid {
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_verified() {
            return Err(AuthError::EmailNotVerified);
        }

        let pair = self.tokens.issue_pair(email.as_str())?;
        self.user_repo
            .set_refresh_token(&email, Some(&pair.refresh_token))
            .await?;

        tracing::info!(user_id = %user.user_id, "User signed in");

        Ok(pair)
    }
}
