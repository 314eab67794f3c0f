//! Rate Limit Gate
//!
//! Allow/deny decision in front of the password-reset routes. A failing
//! store lets the request through.

use std::sync::Arc;

use platform::rate_limit::{RateLimitConfig, RateLimitStore, now_ms, rate_limit_key};

use crate::error::{AuthError, AuthResult};

pub struct RateLimitGate<S>
where
    S: RateLimitStore,
{
    store: Arc<S>,
}

impl<S> Clone for RateLimitGate<S>
where
    S: RateLimitStore,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S> RateLimitGate<S>
where
    S: RateLimitStore + Sync,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Count this call and fail with `RateLimited` once the window is used up.
    pub async fn check(&self, route: &str, client: &str, limit: &RateLimitConfig) -> AuthResult<()> {
        let key = rate_limit_key(route, client);

        match self.store.check_and_increment(&key, limit).await {
            Ok(result) if result.allowed => Ok(()),
            Ok(result) => {
                tracing::debug!(route, client, "Rate limited");
                Err(AuthError::RateLimited {
                    retry_after_secs: result.retry_after_secs(now_ms()).max(1),
                })
            }
            Err(e) => {
                tracing::warn!(route, error = %e, "Rate limit store failed, allowing request");
                Ok(())
            }
        }
    }

    pub async fn allow(&self, route: &str, client: &str, limit: &RateLimitConfig) -> bool {
        self.check(route, client, limit).await.is_ok()
    }
}
