//! Repository Traits
//!
//! Interfaces for data persistence. Implementations are in the
//! infrastructure layer.

use crate::domain::entity::user::User;
use crate::domain::value_object::{email::Email, user_password::UserPassword};
use crate::error::AuthResult;

/// User record collaborator
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    /// Find user by (normalized) email
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>>;

    /// Insert a new user. `AuthError::AlreadyExists` if the email is taken.
    async fn create(&self, user: &User) -> AuthResult<()>;

    /// Overwrite (or clear) the stored refresh token
    async fn set_refresh_token(&self, email: &Email, token: Option<&str>) -> AuthResult<()>;

    /// Compare-and-set on the stored refresh token.
    ///
    /// Stores `new` only if the current value equals `expected`. Returns
    /// whether the swap happened.
    async fn replace_refresh_token(
        &self,
        email: &Email,
        expected: &str,
        new: &str,
    ) -> AuthResult<bool>;

    /// Mark the email as verified
    async fn set_verified(&self, email: &Email) -> AuthResult<()>;

    /// Replace the password hash and drop the stored refresh token.
    /// Returns the updated user, or `None` if no such user.
    async fn set_password_hash(
        &self,
        email: &Email,
        hash: &UserPassword,
    ) -> AuthResult<Option<User>>;
}
