//! Domain Layer
//!
//! Entities, value objects, token types and collaborator traits.

pub mod entity;
pub mod mailer;
pub mod repository;
pub mod token;
pub mod value_object;

// Re-exports
pub use entity::User;
pub use mailer::{MailMessage, Mailer};
pub use repository::UserRepository;
pub use token::{TokenClaims, TokenClass, TokenPair};
