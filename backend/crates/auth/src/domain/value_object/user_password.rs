//! User Password Value Objects
//!
//! `RawPassword` is what the user typed (or what we generated for them);
//! `UserPassword` is the Argon2id hash we store. Cryptography lives in
//! `platform::password`; this module maps its errors into [`AuthError`].

use platform::password::{ClearTextPassword, HashedPassword, PasswordPolicyError};
use std::fmt;

use crate::error::{AuthError, AuthResult};

// ============================================================================
// Raw Password (User Input)
// ============================================================================

/// Clear text password, zeroized on drop
pub struct RawPassword(ClearTextPassword);

impl RawPassword {
    /// Validate a password that is about to be set (signup, reset).
    pub fn new(raw: String) -> AuthResult<Self> {
        ClearTextPassword::new(raw)
            .map(Self)
            .map_err(|e| AuthError::Validation(policy_message(&e)))
    }

    /// A password presented at login. The policy is not re-checked: a
    /// password that was valid when set stays usable.
    pub fn presented(raw: String) -> Self {
        Self(ClearTextPassword::unchecked(raw))
    }

    /// Random password for the "mail me a new password" flow
    pub fn generate(len: usize) -> Self {
        Self(ClearTextPassword::generate(len))
    }

    /// Clear text, for the outgoing email only
    pub fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

fn policy_message(err: &PasswordPolicyError) -> String {
    match err {
        PasswordPolicyError::TooShort { min, .. } => {
            format!("Password must be at least {min} characters")
        }
        PasswordPolicyError::TooLong { max, .. } => {
            format!("Password must be at most {max} characters")
        }
        other => other.to_string(),
    }
}

impl fmt::Debug for RawPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawPassword").field(&"[REDACTED]").finish()
    }
}

// ============================================================================
// User Password (Hashed, for storage)
// ============================================================================

/// Stored password hash (PHC string)
#[derive(Clone, PartialEq, Eq)]
pub struct UserPassword(HashedPassword);

impl UserPassword {
    /// Hash a raw password. CPU-heavy; call from a blocking thread.
    pub fn from_raw(raw: &RawPassword, pepper: Option<&[u8]>) -> AuthResult<Self> {
        raw.0
            .hash(pepper)
            .map(Self)
            .map_err(|e| AuthError::Internal(e.to_string()))
    }

    /// Hash read back from storage. Not parsed here: a corrupt value just
    /// fails verification.
    pub fn from_db(phc_string: impl Into<String>) -> Self {
        Self(HashedPassword::from_stored(phc_string))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_phc_string()
    }

    /// `false` for a wrong password, wrong pepper or corrupt hash
    pub fn verify(&self, raw: &RawPassword, pepper: Option<&[u8]>) -> bool {
        self.0.verify(&raw.0, pepper)
    }
}

impl fmt::Debug for UserPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserPassword").field(&"[HASH]").finish()
    }
}
