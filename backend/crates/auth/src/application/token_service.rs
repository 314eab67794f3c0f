//! Token Service
//!
//! Issues tokens with per-class lifetimes and owns refresh-token rotation.
//! Only the refresh token is stateful: the user record keeps the single
//! refresh token currently allowed.

use std::sync::Arc;

use platform::crypto::constant_time_eq;

use crate::application::config::AuthConfig;
use crate::application::token_codec::TokenCodec;
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::token::{TokenClaims, TokenClass, TokenPair};
use crate::error::{AuthError, AuthResult};

pub struct TokenService {
    codec: TokenCodec,
    config: Arc<AuthConfig>,
}

impl TokenService {
    pub fn new(config: Arc<AuthConfig>) -> Self {
        Self {
            codec: TokenCodec::from_config(&config),
            config,
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    // ========================================================================
    // Issuing
    // ========================================================================

    pub fn issue(&self, subject: &str, class: TokenClass) -> AuthResult<String> {
        let claims = TokenClaims::new(subject, class, self.config.ttl(class));
        self.codec.encode(&claims)
    }

    pub fn issue_access_token(&self, subject: &str) -> AuthResult<String> {
        self.issue(subject, TokenClass::Access)
    }

    pub fn issue_refresh_token(&self, subject: &str) -> AuthResult<String> {
        self.issue(subject, TokenClass::Refresh)
    }

    pub fn issue_email_token(&self, subject: &str) -> AuthResult<String> {
        self.issue(subject, TokenClass::EmailVerify)
    }

    pub fn issue_reset_token(&self, subject: &str) -> AuthResult<String> {
        self.issue(subject, TokenClass::PasswordReset)
    }

    pub fn issue_pair(&self, subject: &str) -> AuthResult<TokenPair> {
        Ok(TokenPair::bearer(
            self.issue_access_token(subject)?,
            self.issue_refresh_token(subject)?,
        ))
    }

    // ========================================================================
    // Decoding
    // ========================================================================

    pub fn decode(&self, token: &str, class: TokenClass) -> AuthResult<TokenClaims> {
        self.codec.decode(token, class)
    }

    /// Subject of a valid access token
    pub fn decode_access_token(&self, token: &str) -> AuthResult<String> {
        self.decode(token, TokenClass::Access).map(|c| c.sub)
    }

    /// Subject of a valid refresh token
    pub fn decode_refresh_token(&self, token: &str) -> AuthResult<String> {
        self.decode(token, TokenClass::Refresh).map(|c| c.sub)
    }

    /// Subject of a valid email-verification token
    pub fn decode_email_token(&self, token: &str) -> AuthResult<String> {
        self.decode(token, TokenClass::EmailVerify).map(|c| c.sub)
    }

    /// Subject of a valid password-reset token
    pub fn decode_reset_token(&self, token: &str) -> AuthResult<String> {
        self.decode(token, TokenClass::PasswordReset).map(|c| c.sub)
    }

    // ========================================================================
    // Refresh rotation
    // ========================================================================

    /// Exchange `old_token` for a fresh pair.
    ///
    /// `old_token` must be the refresh token currently stored for `user`.
    /// Presenting any other token (typically one already rotated away) is
    /// treated as reuse: the stored token is cleared, which logs the user
    /// out everywhere, and the call fails.
    pub async fn rotate_refresh_token<U: UserRepository>(
        &self,
        repo: &U,
        user: &User,
        old_token: &str,
    ) -> AuthResult<TokenPair> {
        let claims = self
            .decode(old_token, TokenClass::Refresh)
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        if claims.sub != user.email.as_str() {
            return Err(AuthError::InvalidRefreshToken);
        }

        let matches_stored = user
            .refresh_token
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), old_token.as_bytes()));

        if !matches_stored {
            tracing::warn!(
                user_id = %user.user_id,
                "Refresh token reuse detected, revoking stored token"
            );
            repo.set_refresh_token(&user.email, None).await?;
            return Err(AuthError::InvalidRefreshToken);
        }

        let pair = self.issue_pair(user.email.as_str())?;

        let swapped = repo
            .replace_refresh_token(&user.email, old_token, &pair.refresh_token)
            .await?;

        if !swapped {
            // Another request rotated the same token first
            tracing::warn!(
                user_id = %user.user_id,
                "Concurrent refresh token rotation, revoking stored token"
            );
            repo.set_refresh_token(&user.email, None).await?;
            return Err(AuthError::InvalidRefreshToken);
        }

        tracing::debug!(user_id = %user.user_id, "Refresh token rotated");

        Ok(pair)
    }
}
