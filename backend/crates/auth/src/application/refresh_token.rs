//! Refresh Token Use Case

use std::sync::Arc;

use crate::application::token_service::TokenService;
use crate::domain::repository::UserRepository;
use crate::domain::token::TokenPair;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

pub struct RefreshTokenUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    tokens: Arc<TokenService>,
}

impl<U> RefreshTokenUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, tokens: Arc<TokenService>) -> Self {
        Self { user_repo, tokens }
    }

    /// Exchange a refresh token for a new pair. Every failure, including an
    /// expired or malformed token, is `InvalidRefreshToken`.
    pub async fn execute(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let subject = self
            .tokens
            .decode_refresh_token(refresh_token)
            .map_err(|_| AuthError::InvalidRefreshToken)?;

        let email = Email::new(&subject).map_err(|_| AuthError::InvalidRefreshToken)?;

        let user = self
            .user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        self.tokens
            .rotate_refresh_token(self.user_repo.as_ref(), &user, refresh_token)
            .await
    }
}
