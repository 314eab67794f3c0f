//! Application Configuration
//!
//! Configuration for the Auth application layer. Built once at startup and
//! shared read-only behind an `Arc`.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use figment::Figment;
use jsonwebtoken::Algorithm;
use platform::config::{ConfigError, decode_secret, extract, non_empty, parse_list, positive_secs};
use platform::crypto::random_bytes;
use platform::rate_limit::RateLimitConfig;
use serde::Deserialize;

use crate::domain::token::TokenClass;

/// Length of passwords produced by the auto-reset flow
pub const GENERATED_PASSWORD_LENGTH: usize = 16;

/// Auth application configuration
#[derive(Clone)]
pub struct AuthConfig {
    /// Token signing secret
    pub jwt_secret: Vec<u8>,
    /// HMAC algorithm (HS256/HS384/HS512)
    pub jwt_algorithm: Algorithm,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub email_token_ttl: Duration,
    pub reset_token_ttl: Duration,
    /// Password pepper (optional, application-wide secret)
    pub password_pepper: Option<Vec<u8>>,
    /// Limit applied to the password-reset routes
    pub reset_rate_limit: RateLimitConfig,
    /// Base URL placed in outgoing emails
    pub public_base_url: String,
    /// Proxies whose forwarding headers identify the client
    pub trusted_proxies: Vec<IpAddr>,
    pub generated_password_length: usize,
}

/// Raw auth settings as read from the environment
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct AuthSettings {
    pub jwt_secret_key: Option<String>,
    pub jwt_algorithm: String,
    pub access_token_ttl_secs: u64,
    pub refresh_token_ttl_secs: u64,
    pub email_token_ttl_secs: u64,
    pub reset_token_ttl_secs: u64,
    pub password_pepper: Option<String>,
    pub reset_rate_limit_times: u32,
    pub reset_rate_limit_seconds: u64,
    pub public_base_url: String,
    /// Comma-separated IP addresses
    pub trusted_proxies: Option<String>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        let defaults = AuthConfig::default();
        Self {
            jwt_secret_key: None,
            jwt_algorithm: "HS256".to_string(),
            access_token_ttl_secs: defaults.access_token_ttl.as_secs(),
            refresh_token_ttl_secs: defaults.refresh_token_ttl.as_secs(),
            email_token_ttl_secs: defaults.email_token_ttl.as_secs(),
            reset_token_ttl_secs: defaults.reset_token_ttl.as_secs(),
            password_pepper: None,
            reset_rate_limit_times: defaults.reset_rate_limit.max_requests,
            reset_rate_limit_seconds: defaults.reset_rate_limit.window.as_secs(),
            public_base_url: defaults.public_base_url,
            trusted_proxies: None,
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Vec::new(),
            jwt_algorithm: Algorithm::HS256,
            access_token_ttl: Duration::from_secs(15 * 60), // 15 minutes
            refresh_token_ttl: Duration::from_secs(7 * 24 * 3600), // 7 days
            email_token_ttl: Duration::from_secs(7 * 24 * 3600), // 7 days
            reset_token_ttl: Duration::from_secs(24 * 3600), // 1 day
            password_pepper: None,
            reset_rate_limit: RateLimitConfig::default(),
            public_base_url: "http://localhost:8000/".to_string(),
            trusted_proxies: Vec::new(),
            generated_password_length: GENERATED_PASSWORD_LENGTH,
        }
    }
}

impl AuthConfig {
    pub fn with_secret(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            jwt_secret: secret.into(),
            ..Default::default()
        }
    }

    /// Create config with a random signing secret (for development and tests)
    pub fn with_random_secret() -> Self {
        Self::with_secret(random_bytes(32))
    }

    /// Load from a figment, usually [`platform::config::env_figment`].
    pub fn from_figment(figment: &Figment, allow_random_secret: bool) -> Result<Self, ConfigError> {
        Self::from_settings(extract(figment)?, allow_random_secret)
    }

    /// Validate raw settings.
    ///
    /// `JWT_SECRET_KEY` is required unless `allow_random_secret` is set, in
    /// which case a missing key yields a per-process random secret and every
    /// token dies with the process.
    pub fn from_settings(
        settings: AuthSettings,
        allow_random_secret: bool,
    ) -> Result<Self, ConfigError> {
        let jwt_secret = match non_empty(settings.jwt_secret_key) {
            Some(raw) => decode_secret(&raw),
            None if allow_random_secret => {
                tracing::warn!("JWT_SECRET_KEY not set, using a random signing secret");
                random_bytes(32)
            }
            None => return Err(ConfigError::Missing("JWT_SECRET_KEY".to_string())),
        };

        let jwt_algorithm = match settings.jwt_algorithm.trim() {
            "HS256" => Algorithm::HS256,
            "HS384" => Algorithm::HS384,
            "HS512" => Algorithm::HS512,
            other => {
                return Err(ConfigError::invalid(
                    "JWT_ALGORITHM",
                    format!("unsupported algorithm {other}, expected HS256, HS384 or HS512"),
                ));
            }
        };

        if settings.reset_rate_limit_times == 0 {
            return Err(ConfigError::invalid(
                "RESET_RATE_LIMIT_TIMES",
                "must be greater than zero",
            ));
        }
        let window = positive_secs("RESET_RATE_LIMIT_SECONDS", settings.reset_rate_limit_seconds)?;
        let reset_rate_limit = RateLimitConfig::new(settings.reset_rate_limit_times, window.as_secs());

        let mut public_base_url = settings.public_base_url.trim().to_string();
        if !public_base_url.ends_with('/') {
            public_base_url.push('/');
        }

        let trusted_proxies = match non_empty(settings.trusted_proxies) {
            Some(raw) => parse_list("TRUSTED_PROXIES", &raw)?,
            None => Vec::new(),
        };

        Ok(Self {
            jwt_secret,
            jwt_algorithm,
            access_token_ttl: positive_secs("ACCESS_TOKEN_TTL_SECS", settings.access_token_ttl_secs)?,
            refresh_token_ttl: positive_secs(
                "REFRESH_TOKEN_TTL_SECS",
                settings.refresh_token_ttl_secs,
            )?,
            email_token_ttl: positive_secs("EMAIL_TOKEN_TTL_SECS", settings.email_token_ttl_secs)?,
            reset_token_ttl: positive_secs("RESET_TOKEN_TTL_SECS", settings.reset_token_ttl_secs)?,
            password_pepper: non_empty(settings.password_pepper).map(String::into_bytes),
            reset_rate_limit,
            public_base_url,
            trusted_proxies,
            generated_password_length: GENERATED_PASSWORD_LENGTH,
        })
    }

    /// Lifetime of tokens of the given class
    pub fn ttl(&self, class: TokenClass) -> Duration {
        match class {
            TokenClass::Access => self.access_token_ttl,
            TokenClass::Refresh => self.refresh_token_ttl,
            TokenClass::EmailVerify => self.email_token_ttl,
            TokenClass::PasswordReset => self.reset_token_ttl,
        }
    }

    /// Get password pepper as slice
    pub fn pepper(&self) -> Option<&[u8]> {
        self.password_pepper.as_deref()
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_algorithm", &self.jwt_algorithm)
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("email_token_ttl", &self.email_token_ttl)
            .field("reset_token_ttl", &self.reset_token_ttl)
            .field(
                "password_pepper",
                &self.password_pepper.as_ref().map(|_| "[REDACTED]"),
            )
            .field("reset_rate_limit", &self.reset_rate_limit)
            .field("public_base_url", &self.public_base_url)
            .field("trusted_proxies", &self.trusted_proxies)
            .finish()
    }
}
