//! Sign Up Use Case
//!
//! Creates a new, unverified account and mails a verification link.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::hashing::hash_password;
use crate::application::mail_dispatch::MailDispatcher;
use crate::application::token_service::TokenService;
use crate::domain::entity::user::User;
use crate::domain::mailer::MailMessage;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    email::Email, user_password::RawPassword, username::Username,
};
use crate::error::{AuthError, AuthResult};

/// Sign up input
pub struct SignUpInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Sign up use case
pub struct SignUpUseCase<U>
where
    U: UserRepository,
{
    user_repo: Arc<U>,
    tokens: Arc<TokenService>,
    mail: MailDispatcher,
    config: Arc<AuthConfig>,
}

impl<U> SignUpUseCase<U>
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

    pub async fn execute(&self, input: SignUpInput) -> AuthResult<User> {
        let email = Email::new(&input.email)?;
        let username = Username::new(&input.username)?;
        let raw_password = RawPassword::new(input.password)?;

        if self.user_repo.find_by_email(&email).await?.is_some() {
            return Err(AuthError::AlreadyExists);
        }

        let password_hash = hash_password(&self.config, raw_password).await?;
        let user = User::new(email, username, password_hash);

        // Unique constraint still catches a concurrent signup
        self.user_repo.create(&user).await?;

        tracing::info!(user_id = %user.user_id, "User signed up");

        let token = self.tokens.issue_email_token(user.email.as_str())?;
        self.mail.dispatch(MailMessage::Verification {
            email: user.email.to_string(),
            username: user.username.to_string(),
            host: self.config.public_base_url.clone(),
            token,
        });

        Ok(user)
    }
}
