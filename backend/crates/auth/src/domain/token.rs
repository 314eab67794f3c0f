//! Token Types
//!
//! Claims carried by every signed token. The `scope` claim names the token
//! class; a token is only ever accepted for the class it was issued as.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Token class, serialized into the `scope` claim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenClass {
    #[serde(rename = "access_token")]
    Access,
    #[serde(rename = "refresh_token")]
    Refresh,
    #[serde(rename = "email_token")]
    EmailVerify,
    #[serde(rename = "reset_token")]
    PasswordReset,
}

impl TokenClass {
    pub const fn as_str(&self) -> &'static str {
        match self {
            TokenClass::Access => "access_token",
            TokenClass::Refresh => "refresh_token",
            TokenClass::EmailVerify => "email_token",
            TokenClass::PasswordReset => "reset_token",
        }
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Signed token payload
///
/// `jti` makes two tokens issued for the same subject in the same second
/// distinct, which refresh rotation relies on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Subject: the account email
    pub sub: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expires at (Unix seconds), always after `iat`
    pub exp: i64,
    pub scope: TokenClass,
    pub jti: String,
}

impl TokenClaims {
    pub fn new(subject: impl Into<String>, class: TokenClass, ttl: Duration) -> Self {
        Self::issued_at(subject, class, ttl, Utc::now())
    }

    pub fn issued_at(
        subject: impl Into<String>,
        class: TokenClass,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Self {
        let iat = now.timestamp();
        let ttl_secs = i64::try_from(ttl.as_secs()).unwrap_or(i64::MAX).max(1);
        Self {
            sub: subject.into(),
            iat,
            exp: iat.saturating_add(ttl_secs),
            scope: class,
            jti: Uuid::new_v4().simple().to_string(),
        }
    }
}

/// Access + refresh pair returned by login and refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
}

impl TokenPair {
    pub fn bearer(access_token: String, refresh_token: String) -> Self {
        Self {
            access_token,
            refresh_token,
            token_type: "bearer".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_wire_names() {
        let cases = [
            (TokenClass::Access, "\"access_token\""),
            (TokenClass::Refresh, "\"refresh_token\""),
            (TokenClass::EmailVerify, "\"email_token\""),
            (TokenClass::PasswordReset, "\"reset_token\""),
        ];
        for (class, wire) in cases {
            assert_eq!(serde_json::to_string(&class).unwrap(), wire);
            assert_eq!(format!("\"{class}\""), wire);
        }
    }

    #[test]
    fn test_claims_exp_after_iat() {
        let claims = TokenClaims::new("a@b.io", TokenClass::Access, Duration::from_secs(900));
        assert_eq!(claims.exp - claims.iat, 900);

        // zero TTL is clamped so exp > iat still holds
        let claims = TokenClaims::new("a@b.io", TokenClass::Access, Duration::ZERO);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_claims_unique_jti() {
        let ttl = Duration::from_secs(60);
        let now = Utc::now();
        let a = TokenClaims::issued_at("a@b.io", TokenClass::Refresh, ttl, now);
        let b = TokenClaims::issued_at("a@b.io", TokenClass::Refresh, ttl, now);
        assert_ne!(a, b);
    }

    #[test]
    fn test_claims_expiry() {
        let now = Utc::now();
        let claims = TokenClaims::issued_at("a@b.io", TokenClass::Access, Duration::from_secs(10), now);
        assert_eq!(claims.iat, now.timestamp());
        assert_eq!(claims.exp, now.timestamp() + 10);

        let instant = TokenClaims::issued_at("a@b.io", TokenClass::Access, Duration::ZERO, now);
        assert_eq!(instant.exp, now.timestamp() + 1);
    }

    #[test]
    fn test_token_pair_type() {
        let pair = TokenPair::bearer("a".into(), "r".into());
        let json = serde_json::to_value(&pair).unwrap();
        assert_eq!(json["token_type"], "bearer");
    }
}
