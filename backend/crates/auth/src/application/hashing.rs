//! Password hashing off the async executor
//!
//! Argon2 takes tens of milliseconds of CPU; run it on the blocking pool.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::domain::value_object::user_password::{RawPassword, UserPassword};
use crate::error::AuthResult;

pub async fn hash_password(config: &Arc<AuthConfig>, raw: RawPassword) -> AuthResult<UserPassword> {
    let config = Arc::clone(config);
    tokio::task::spawn_blocking(move || UserPassword::from_raw(&raw, config.pepper())).await?
}

pub async fn verify_password(
    config: &Arc<AuthConfig>,
    raw: RawPassword,
    hash: UserPassword,
) -> AuthResult<bool> {
    let config = Arc::clone(config);
    let valid = tokio::task::spawn_blocking(move || hash.verify(&raw, config.pepper())).await?;
    Ok(valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_then_verify() {
        let mut config = AuthConfig::with_random_secret();
        config.password_pepper = Some(b"pepper".to_vec());
        let config = Arc::new(config);

        let hash = hash_password(&config, RawPassword::new("secret123".into()).unwrap())
            .await
            .unwrap();

        assert!(verify_password(&config, RawPassword::presented("secret123".into()), hash.clone())
            .await
            .unwrap());
        assert!(!verify_password(&config, RawPassword::presented("secret12".into()), hash)
            .await
            .unwrap());
    }
}
