//! User Entity
//!
//! The user record owned by the auth subsystem: identity, credentials,
//! verification state and the one refresh token currently allowed.

use chrono::{DateTime, Utc};

use crate::domain::value_object::{
    email::Email, user_id::UserId, user_password::UserPassword, user_role::UserRole,
    username::Username,
};

#[derive(Debug, Clone)]
pub struct User {
    pub user_id: UserId,
    /// Unique, lowercased. Also the token subject.
    pub email: Email,
    pub username: Username,
    pub password_hash: UserPassword,
    /// Set once the email token is redeemed
    pub verified: bool,
    /// Last refresh token issued. `None` after logout-by-reuse or reset.
    pub refresh_token: Option<String>,
    pub role: UserRole,
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// New unverified account
    pub fn new(email: Email, username: Username, password_hash: UserPassword) -> Self {
        let now = Utc::now();
        Self {
            user_id: UserId::new(),
            email,
            username,
            password_hash,
            verified: false,
            refresh_token: None,
            role: UserRole::default(),
            avatar: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.is_some()
    }
}
