//! Platform Crate - Technical Infrastructure
//!
//! Shared technical foundations for the contacts backend:
//! - Password hashing (Argon2id) and random password generation
//! - Small cryptographic helpers (CSPRNG bytes, Base64, constant-time compare)
//! - Fixed-window rate limiting abstractions and an in-memory store
//! - Client identification behind trusted proxies
//! - Figment-based configuration loading

pub mod client;
pub mod config;
pub mod crypto;
pub mod password;
pub mod rate_limit;
