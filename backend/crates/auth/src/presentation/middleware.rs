//! Auth Middleware
//!
//! Bearer access-token guard for protected routes and the per-client rate
//! limit in front of the password-reset routes.

use axum::extract::{ConnectInfo, MatchedPath, Request, State};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use platform::client::client_key;
use platform::rate_limit::RateLimitStore;
use std::net::SocketAddr;

use crate::application::CurrentUserUseCase;
use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::error::AuthError;
use crate::presentation::handlers::AuthAppState;

/// User resolved from the bearer access token, stored in request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub User);

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Middleware that requires a valid access token
pub async fn require_access_token<R, S>(
    State(state): State<AuthAppState<R, S>>,
    mut req: Request,
    next: Next,
) -> Response
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    let Some(token) = bearer_token(req.headers()).map(str::to_owned) else {
        return AuthError::InvalidToken.into_response();
    };

    let use_case = CurrentUserUseCase::new(state.repo.clone(), state.tokens.clone());

    match use_case.execute(&token).await {
        Ok(user) => {
            req.extensions_mut().insert(AuthenticatedUser(user));
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

/// Fixed-window limit per matched route and client IP
///
/// The client is the socket peer; forwarding headers count only when the peer
/// is one of `AuthConfig::trusted_proxies`.
pub async fn reset_rate_limit<R, S>(
    State(state): State<AuthAppState<R, S>>,
    req: Request,
    next: Next,
) -> Response
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    let direct_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let client = client_key(req.headers(), direct_ip, &state.config.trusted_proxies);

    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());

    if let Err(e) = state
        .rate_limit
        .check(&route, &client, &state.config.reset_rate_limit)
        .await
    {
        return e.into_response();
    }

    next.run(req).await
}
