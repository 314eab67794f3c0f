//! Application Layer
//!
//! Use cases and application services.

pub mod config;
pub mod current_user;
pub mod hashing;
pub mod mail_dispatch;
pub mod password_reset;
pub mod rate_limit_gate;
pub mod refresh_token;
pub mod sign_in;
pub mod sign_up;
pub mod token_codec;
pub mod token_service;
pub mod verify_email;

// Re-exports
pub use config::{AuthConfig, AuthSettings};
pub use current_user::CurrentUserUseCase;
pub use mail_dispatch::MailDispatcher;
pub use password_reset::{ConfirmResetInput, PasswordResetUseCase};
pub use rate_limit_gate::RateLimitGate;
pub use refresh_token::RefreshTokenUseCase;
pub use sign_in::{SignInInput, SignInUseCase};
pub use sign_up::{SignUpInput, SignUpUseCase};
pub use token_codec::TokenCodec;
pub use token_service::TokenService;
pub use verify_email::{RequestEmailOutcome, VerifyEmailOutcome, VerifyEmailUseCase};
