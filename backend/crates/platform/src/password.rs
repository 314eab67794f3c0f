//! Password Hashing and Verification
//!
//! - Argon2id hashing (memory-hard, random 128-bit salt per hash)
//! - Zeroization of clear text on drop
//! - Verification never errors: a malformed stored hash simply does not match
//! - Random password generation for the "mail me a new password" flow
//!
//! Hashing is CPU-bound. Async callers should run it on a
//! blocking thread (`tokio::task::spawn_blocking`).

use std::fmt;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand::Rng;
use rand::rngs::OsRng;
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ============================================================================
// Constants
// ============================================================================

/// Minimum password length accepted at signup / reset
pub const MIN_PASSWORD_LENGTH: usize = 5;

/// Maximum password length
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Alphabet for generated passwords: ASCII letters, digits and punctuation.
pub const GENERATED_PASSWORD_ALPHABET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!\"#$%&'()*+,-./:;<=>?@[\\]^_`{|}~";

// ============================================================================
// Error Types
// ============================================================================

/// Password policy violation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PasswordPolicyError {
    #[error("Password must be at least {min} characters (got {actual})")]
    TooShort { min: usize, actual: usize },

    #[error("Password must be at most {max} characters (got {actual})")]
    TooLong { max: usize, actual: usize },

    #[error("Password cannot be empty or contain only whitespace")]
    EmptyOrWhitespace,

    #[error("Password contains invalid control characters")]
    InvalidCharacter,

    #[error("Password is too common or follows a predictable pattern")]
    CommonPattern,
}

/// Password hashing errors
#[derive(Debug, Error)]
pub enum PasswordHashError {
    #[error("Password hashing failed: {0}")]
    HashingFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

// ============================================================================
// Clear Text Password (Zeroized on drop)
// ============================================================================

/// Clear text password with automatic memory zeroization
///
/// Not `Clone`; `Debug` output is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct ClearTextPassword(String);

impl ClearTextPassword {
    /// Create a new clear text password with validation
    ///
    /// Unicode is normalized (NFKC) before any check, then:
    /// - not empty / whitespace only
    /// - [`MIN_PASSWORD_LENGTH`]..=[`MAX_PASSWORD_LENGTH`] code points
    /// - no control characters other than space, tab, newline
    /// - not a well-known weak password or pattern
    pub fn new(raw: String) -> Result<Self, PasswordPolicyError> {
        let normalized: String = raw.nfkc().collect();

        if normalized.trim().is_empty() {
            return Err(PasswordPolicyError::EmptyOrWhitespace);
        }

        let char_count = normalized.chars().count();

        if char_count < MIN_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooShort {
                min: MIN_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if char_count > MAX_PASSWORD_LENGTH {
            return Err(PasswordPolicyError::TooLong {
                max: MAX_PASSWORD_LENGTH,
                actual: char_count,
            });
        }

        if normalized
            .chars()
            .any(|ch| ch.is_control() && ch != '\t' && ch != '\n')
        {
            return Err(PasswordPolicyError::InvalidCharacter);
        }

        if is_common_pattern(&normalized) {
            return Err(PasswordPolicyError::CommonPattern);
        }

        Ok(Self(normalized))
    }

    /// Accept a password without policy checks.
    ///
    /// Used on the login path: the policy applies when a password is set,
    /// not when an existing one is presented.
    pub fn unchecked(raw: String) -> Self {
        Self(raw.nfkc().collect())
    }

    /// Generate a random password of `len` characters from
    /// [`GENERATED_PASSWORD_ALPHABET`] using the OS CSPRNG.
    pub fn generate(len: usize) -> Self {
        let mut rng = OsRng;
        let password = (0..len)
            .map(|_| {
                let idx = rng.gen_range(0..GENERATED_PASSWORD_ALPHABET.len());
                GENERATED_PASSWORD_ALPHABET[idx] as char
            })
            .collect();
        Self(password)
    }

    /// The clear text itself. Only for handing a generated password to the
    /// mailer; never log it.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    fn peppered_bytes(&self, pepper: Option<&[u8]>) -> Vec<u8> {
        let mut bytes = self.0.as_bytes().to_vec();
        if let Some(p) = pepper {
            bytes.extend_from_slice(p);
        }
        bytes
    }

    /// Hash the password using Argon2id
    ///
    /// `pepper` is an optional application-wide secret appended before
    /// hashing; the same pepper must be supplied to [`HashedPassword::verify`].
    pub fn hash(&self, pepper: Option<&[u8]>) -> Result<HashedPassword, PasswordHashError> {
        let mut password_bytes = self.peppered_bytes(pepper);
        let salt = SaltString::generate(OsRng);

        // OWASP defaults: m=19456 (19 MiB), t=2, p=1
        let result = Argon2::default()
            .hash_password(&password_bytes, &salt)
            .map(|hash| HashedPassword {
                hash: hash.to_string(),
            })
            .map_err(|e| PasswordHashError::HashingFailed(e.to_string()));

        password_bytes.zeroize();
        result
    }
}

impl fmt::Debug for ClearTextPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ClearTextPassword")
            .field(&"[REDACTED]")
            .finish()
    }
}

// ============================================================================
// Hashed Password (Safe to store)
// ============================================================================

/// Hashed password in PHC string format
/// (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`)
#[derive(Clone, PartialEq, Eq)]
pub struct HashedPassword {
    hash: String,
}

impl HashedPassword {
    /// Create from a PHC string, rejecting anything that does not parse.
    pub fn from_phc_string(s: impl Into<String>) -> Result<Self, PasswordHashError> {
        let hash = s.into();
        PasswordHash::new(&hash).map_err(|_| PasswordHashError::InvalidHashFormat)?;
        Ok(Self { hash })
    }

    /// Wrap a stored value as-is. A malformed value never verifies.
    pub fn from_stored(s: impl Into<String>) -> Self {
        Self { hash: s.into() }
    }

    pub fn as_phc_string(&self) -> &str {
        &self.hash
    }

    pub fn into_phc_string(self) -> String {
        self.hash
    }

    /// Verify a password against this hash
    ///
    /// Returns `false` for a wrong password, a wrong pepper, or a hash that
    /// cannot be parsed. Comparison inside Argon2 is constant-time.
    pub fn verify(&self, password: &ClearTextPassword, pepper: Option<&[u8]>) -> bool {
        let parsed_hash = match PasswordHash::new(&self.hash) {
            Ok(h) => h,
            Err(_) => return false,
        };

        let mut password_bytes = password.peppered_bytes(pepper);
        let ok = Argon2::default()
            .verify_password(&password_bytes, &parsed_hash)
            .is_ok();
        password_bytes.zeroize();
        ok
    }
}

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashedPassword")
            .field("hash", &"[HASH]")
            .finish()
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

fn is_common_pattern(password: &str) -> bool {
    let lower = password.to_lowercase();

    // "aaaaaa"
    let mut chars = lower.chars();
    if let Some(first) = chars.next() {
        if chars.all(|c| c == first) {
            return true;
        }
    }

    if is_sequential_numbers(&lower) {
        return true;
    }

    const KEYBOARD_PATTERNS: &[&str] = &["qwerty", "asdfgh", "zxcvbn", "qazwsx", "1qaz2wsx"];
    if KEYBOARD_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }

    const COMMON_PASSWORDS: &[&str] = &[
        "password",
        "password1",
        "password123",
        "passw0rd",
        "abcdefgh",
        "letmein",
        "welcome",
        "admin",
        "admin123",
        "iloveyou",
        "sunshine",
        "princess",
        "football",
        "monkey",
        "dragon",
        "trustno1",
    ];

    COMMON_PASSWORDS.contains(&lower.as_str())
}

/// All-digit strings that count straight up or down ("12345", "98765").
fn is_sequential_numbers(s: &str) -> bool {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }
    let digits: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();

    if digits.len() < 4 {
        return false;
    }

    let is_ascending = digits
        .windows(2)
        .all(|w| w[1] == w[0] + 1 || (w[0] == 9 && w[1] == 0));

    let is_descending = digits
        .windows(2)
        .all(|w| w[0] == w[1] + 1 || (w[0] == 0 && w[1] == 9));

    is_ascending || is_descending
}

// ============================================================================
// Tests
// ============================================================================
