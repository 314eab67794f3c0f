//! Shared Kernel
//!
//! The smallest vocabulary shared by every crate in the contacts backend:
//! - Unified error type ([`error::app_error::AppError`]) and its HTTP classification
//! - Typed identifiers ([`id::Id`])
//!
//! Anything domain specific (tokens, users, mail) lives in the owning crate.

pub mod error {
    pub mod app_error;
    pub mod conversions;
    pub mod kind;
}
pub mod id;
