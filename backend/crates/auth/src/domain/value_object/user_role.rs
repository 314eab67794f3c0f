use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::AuthError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    User,
    Moderator,
    Admin,
}

impl UserRole {
    #[inline]
    pub const fn code(&self) -> &'static str {
        use UserRole::*;
        match self {
            User => "user",
            Moderator => "moderator",
            Admin => "admin",
        }
    }

    #[inline]
    pub const fn is_moderator_or_higher(&self) -> bool {
        matches!(self, UserRole::Moderator | UserRole::Admin)
    }

    #[inline]
    pub const fn is_admin(&self) -> bool {
        matches!(self, UserRole::Admin)
    }
}

impl FromStr for UserRole {
    type Err = AuthError;

    fn from_str(code: &str) -> Result<Self, Self::Err> {
        use UserRole::*;
        match code {
            "user" => Ok(User),
            "moderator" => Ok(Moderator),
            "admin" => Ok(Admin),
            other => Err(AuthError::Internal(format!("Invalid user role: {other}"))),
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
