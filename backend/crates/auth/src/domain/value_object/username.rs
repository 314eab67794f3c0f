//! Username Value Object
//!
//! Display name chosen at signup. Not unique and not used to log in.

use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

pub const USERNAME_MIN_LENGTH: usize = 3;
pub const USERNAME_MAX_LENGTH: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    pub fn new(raw: impl AsRef<str>) -> AuthResult<Self> {
        let trimmed = raw.as_ref().trim();
        let len = trimmed.chars().count();

        if !(USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&len) {
            return Err(AuthError::Validation(format!(
                "Username must be between {USERNAME_MIN_LENGTH} and {USERNAME_MAX_LENGTH} characters"
            )));
        }

        if trimmed.chars().any(char::is_control) {
            return Err(AuthError::Validation(
                "Username contains invalid characters".into(),
            ));
        }

        Ok(Self(trimmed.to_string()))
    }

    pub fn from_db(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
