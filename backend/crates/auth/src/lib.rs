//! Auth (Authentication) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, token claims, repository and mailer traits
//! - `application/` - Use cases, token service, mail dispatch, rate-limit gate
//! - `infra/` - PostgreSQL and in-memory stores, log mailer
//! - `presentation/` - HTTP handlers, DTOs, router, middleware
//!
//! ## Features
//! - Sign up with email verification
//! - Password login issuing an access/refresh bearer token pair
//! - Single-use refresh token rotation with reuse detection
//! - Password reset by link or by generated password
//!
//! ## Security Model
//! - Passwords hashed with Argon2id plus an optional server-side pepper
//! - HMAC-signed JWTs carrying a token class claim
//! - One stored refresh token per user; replaying a spent one revokes it
//! - Per-client fixed-window rate limit on the reset routes

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::{AuthConfig, AuthSettings};
pub use application::mail_dispatch::{DEFAULT_MAIL_QUEUE_CAPACITY, MailDispatcher};
pub use error::{AuthError, AuthResult};
pub use infra::{InMemoryUserRepository, LogMailer, PgRateLimitStore, PgUserRepository};
pub use presentation::handlers::AuthAppState;
pub use presentation::router::auth_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
