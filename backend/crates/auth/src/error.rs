//! Auth Error Types
//!
//! Auth-specific error variants that integrate with the unified
//! `kernel::error::AppError` system.

use axum::http::{HeaderValue, header};
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Message for an email link that cannot be redeemed
pub const VERIFICATION_FAILED: &str = "Verification error!";

/// Message for a reset link whose account no longer exists
pub const RESET_FAILED: &str = "Reset password error!";

/// Auth-specific result type alias
pub type AuthResult<T> = Result<T, AuthError>;

/// Auth-specific error variants
#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown user or wrong password
    #[error("Could not validate credentials")]
    InvalidCredentials,

    #[error("Email not verified!")]
    EmailNotVerified,

    #[error("Account already exists!")]
    AlreadyExists,

    /// Bad signature, malformed token or missing claims
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    /// Valid token of the wrong class
    #[error("Invalid token scope")]
    WrongTokenClass,

    #[error("Invalid refresh token!")]
    InvalidRefreshToken,

    /// Email verification or reset link could not be redeemed
    #[error("{0}")]
    VerificationError(&'static str),

    #[error("Password doesn't match")]
    PasswordMismatch,

    #[error("Too many requests")]
    RateLimited { retry_after_secs: u64 },

    /// Input rejected by a value object
    #[error("{0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::InvalidCredentials
            | AuthError::EmailNotVerified
            | AuthError::InvalidToken
            | AuthError::ExpiredToken
            | AuthError::WrongTokenClass
            | AuthError::InvalidRefreshToken
            | AuthError::PasswordMismatch => ErrorKind::Unauthorized,
            AuthError::AlreadyExists => ErrorKind::Conflict,
            AuthError::VerificationError(_) | AuthError::Validation(_) => ErrorKind::BadRequest,
            AuthError::RateLimited { .. } => ErrorKind::TooManyRequests,
            AuthError::Database(_) | AuthError::Internal(_) => ErrorKind::InternalServerError,
        }
    }

    /// HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Errors caused by a presented bearer credential
    pub fn is_token_error(&self) -> bool {
        matches!(
            self,
            AuthError::InvalidToken
                | AuthError::ExpiredToken
                | AuthError::WrongTokenClass
                | AuthError::InvalidRefreshToken
                | AuthError::InvalidCredentials
        )
    }

    /// Convert to AppError. Server-side details never reach the client.
    pub fn to_app_error(&self) -> AppError {
        match self {
            AuthError::Database(_) | AuthError::Internal(_) => {
                AppError::internal("Internal server error")
            }
            AuthError::RateLimited { retry_after_secs } => {
                AppError::too_many_requests(self.to_string())
                    .with_action(format!("Retry in {retry_after_secs} seconds"))
            }
            AuthError::EmailNotVerified => AppError::new(self.kind(), self.to_string())
                .with_action("Check your email for confirmation"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    /// Log the error with appropriate level
    fn log(&self) {
        match self {
            AuthError::Database(e) => {
                tracing::error!(error = %e, "Auth database error");
            }
            AuthError::Internal(msg) => {
                tracing::error!(message = %msg, "Auth internal error");
            }
            AuthError::InvalidCredentials => {
                tracing::warn!("Invalid credentials presented");
            }
            AuthError::InvalidRefreshToken => {
                tracing::warn!("Rejected refresh token");
            }
            AuthError::RateLimited { retry_after_secs } => {
                tracing::warn!(retry_after_secs, "Rate limit exceeded");
            }
            _ => {
                tracing::debug!(error = %self, "Auth error");
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        self.log();
        let mut response = self.to_app_error().into_response();

        if self.is_token_error() {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        if let AuthError::RateLimited { retry_after_secs } = &self {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(*retry_after_secs));
        }

        response
    }
}

impl From<AppError> for AuthError {
    fn from(err: AppError) -> Self {
        if err.is_server_error() {
            AuthError::Internal(err.to_string())
        } else {
            AuthError::Validation(err.message().to_string())
        }
    }
}

impl From<tokio::task::JoinError> for AuthError {
    fn from(err: tokio::task::JoinError) -> Self {
        AuthError::Internal(format!("Blocking task failed: {err}"))
    }
}
