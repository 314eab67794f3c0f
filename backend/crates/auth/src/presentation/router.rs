//! Auth Router

use axum::{
    Router, middleware,
    routing::{get, post},
};

use platform::rate_limit::RateLimitStore;

use crate::domain::repository::UserRepository;
use crate::presentation::handlers::{self, AuthAppState};
use crate::presentation::middleware::{require_access_token, reset_rate_limit};

/// Create the Auth router. Mount it under `/api/auth`.
pub fn auth_router<R, S>(state: AuthAppState<R, S>) -> Router
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    let rate_limited = Router::new()
        .route("/reset_password", post(handlers::reset_password::<R, S>))
        .route(
            "/reset_password/{token}",
            get(handlers::auto_reset_password::<R, S>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            reset_rate_limit::<R, S>,
        ));

    let protected = Router::new()
        .route("/me", get(handlers::me))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_access_token::<R, S>,
        ));

    Router::new()
        .route("/signup", post(handlers::sign_up::<R, S>))
        .route("/login", post(handlers::login::<R, S>))
        .route("/refresh_token", get(handlers::refresh_token::<R, S>))
        .route(
            "/verified_email/{token}",
            get(handlers::verified_email::<R, S>),
        )
        .route("/request_email", post(handlers::request_email::<R, S>))
        .route(
            "/send_reset_password",
            post(handlers::send_reset_password::<R, S>),
        )
        .merge(rate_limited)
        .merge(protected)
        .with_state(state)
}
