//! Email Value Object
//!
//! The account identifier. Stored lowercased; every lookup goes through
//! [`Email::new`] so "User@Example.com" and "user@example.com" are the same
//! account. Ownership is proven separately by the verification token.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{AuthError, AuthResult};

/// Maximum email length (RFC 5321 path limit)
const EMAIL_MAX_LENGTH: usize = 254;

/// Maximum local part length
const LOCAL_PART_MAX_LENGTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn new(email: impl AsRef<str>) -> AuthResult<Self> {
        let email = email.as_ref().trim().to_lowercase();

        if email.is_empty() {
            return Err(AuthError::Validation("Email cannot be empty".into()));
        }

        if email.len() > EMAIL_MAX_LENGTH {
            return Err(AuthError::Validation(format!(
                "Email must be at most {EMAIL_MAX_LENGTH} characters"
            )));
        }

        let Some((local, domain)) = email.split_once('@') else {
            return Err(AuthError::Validation("Invalid email format".into()));
        };

        if !Self::valid_local(local) || !Self::valid_domain(domain) {
            return Err(AuthError::Validation("Invalid email format".into()));
        }

        Ok(Self(email))
    }

    fn valid_local(local: &str) -> bool {
        !local.is_empty()
            && local.len() <= LOCAL_PART_MAX_LENGTH
            && !local.chars().any(|c| c.is_whitespace() || c.is_control())
    }

    fn valid_domain(domain: &str) -> bool {
        // Rejects a second '@' as well
        domain.contains('.')
            && domain
                .split('.')
                .all(|label| {
                    !label.is_empty()
                        && !label.starts_with('-')
                        && !label.ends_with('-')
                        && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
                })
    }

    /// Value read back from storage (validated on the way in)
    pub fn from_db(email: impl Into<String>) -> Self {
        Self(email.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl FromStr for Email {
    type Err = AuthError;

    fn from_str(s: &str) -> AuthResult<Self> {
        Email::new(s)
    }
}

impl TryFrom<String> for Email {
    type Error = AuthError;

    fn try_from(value: String) -> AuthResult<Self> {
        Email::new(value)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> Self {
        email.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
