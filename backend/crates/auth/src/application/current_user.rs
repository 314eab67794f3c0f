//! Current User Use Case
//!
//! Resolves a bearer access token to its user.

use std::sync::Arc;

use crate::application::token_service::TokenService;
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

pub struct CurrentUserUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    tokens: Arc<TokenService>,
}

impl<U> CurrentUserUseCase<U>
where
    U: UserRepository,
{
    pub fn new(user_repo: Arc<U>, tokens: Arc<TokenService>) -> Self {
        Self { user_repo, tokens }
    }

    pub async fn execute(&self, access_token: &str) -> AuthResult<User> {
        let subject = self.tokens.decode_access_token(access_token)?;
        let email = Email::new(&subject).map_err(|_| AuthError::InvalidCredentials)?;

        self.user_repo
            .find_by_email(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)
    }
}
