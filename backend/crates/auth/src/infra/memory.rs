//! In-memory User Repository
//!
//! DashMap keyed by normalized email. Used by tests and by the API in
//! `STORAGE=memory` mode; nothing survives a restart.

use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{email::Email, user_password::UserPassword};
use crate::error::{AuthError, AuthResult};

#[derive(Debug, Default)]
pub struct InMemoryUserRepository {
    users: DashMap<String, User>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        Ok(self.users.get(email.as_str()).map(|u| u.value().clone()))
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        match self.users.entry(user.email.as_str().to_string()) {
            Entry::Occupied(_) => Err(AuthError::AlreadyExists),
            Entry::Vacant(slot) => {
                slot.insert(user.clone());
                Ok(())
            }
        }
    }

    async fn set_refresh_token(&self, email: &Email, token: Option<&str>) -> AuthResult<()> {
        if let Some(mut user) = self.users.get_mut(email.as_str()) {
            user.refresh_token = token.map(str::to_string);
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn replace_refresh_token(
        &self,
        email: &Email,
        expected: &str,
        new: &str,
    ) -> AuthResult<bool> {
        // get_mut holds the shard write lock for the compare and the swap
        let Some(mut user) = self.users.get_mut(email.as_str()) else {
            return Ok(false);
        };
        if user.refresh_token.as_deref() != Some(expected) {
            return Ok(false);
        }
        user.refresh_token = Some(new.to_string());
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_verified(&self, email: &Email) -> AuthResult<()> {
        if let Some(mut user) = self.users.get_mut(email.as_str()) {
            user.verified = true;
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn set_password_hash(
        &self,
        email: &Email,
        hash: &UserPassword,
    ) -> AuthResult<Option<User>> {
        Ok(self.users.get_mut(email.as_str()).map(|mut user| {
            user.password_hash = hash.clone();
            user.refresh_token = None;
            user.updated_at = Utc::now();
            user.clone()
        }))
    }
}
