//! HTTP Handlers

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::{Extension, Form, Json};
use std::sync::Arc;

use platform::rate_limit::RateLimitStore;

use crate::application::config::AuthConfig;
use crate::application::{
    ConfirmResetInput, MailDispatcher, PasswordResetUseCase, RateLimitGate, RefreshTokenUseCase,
    SignInInput, SignInUseCase, SignUpInput, SignUpUseCase, TokenService, VerifyEmailUseCase,
};
use crate::domain::repository::UserRepository;
use crate::domain::token::TokenPair;
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    EmailRequest, LoginForm, MessageResponse, ResetPasswordRequest, SignUpRequest, UserResponse,
};
use crate::presentation::middleware::{AuthenticatedUser, bearer_token};

/// Shared state for auth handlers
pub struct AuthAppState<R, S>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    pub repo: Arc<R>,
    pub config: Arc<AuthConfig>,
    pub tokens: Arc<TokenService>,
    pub mail: MailDispatcher,
    pub rate_limit: RateLimitGate<S>,
}

impl<R, S> AuthAppState<R, S>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    pub fn new(repo: R, rate_limit_store: Arc<S>, config: AuthConfig, mail: MailDispatcher) -> Self {
        let config = Arc::new(config);
        Self {
            repo: Arc::new(repo),
            tokens: Arc::new(TokenService::new(config.clone())),
            config,
            mail,
            rate_limit: RateLimitGate::new(rate_limit_store),
        }
    }
}

// Manual impl: the repository and store only need to be shared, not cloned.
impl<R, S> Clone for AuthAppState<R, S>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            config: self.config.clone(),
            tokens: self.tokens.clone(),
            mail: self.mail.clone(),
            rate_limit: self.rate_limit.clone(),
        }
    }
}

// ============================================================================
// Sign Up / Login
// ============================================================================

/// POST /api/auth/signup
pub async fn sign_up<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Json(req): Json<SignUpRequest>,
) -> AuthResult<(StatusCode, Json<UserResponse>)>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    let use_case = SignUpUseCase::new(
        state.repo.clone(),
        state.tokens.clone(),
        state.mail.clone(),
        state.config.clone(),
    );

    let user = use_case
        .execute(SignUpInput {
            username: req.username,
            email: req.email,
            password: req.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(&user))))
}

/// POST /api/auth/login (form-encoded, `username` is the email)
pub async fn login<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Form(form): Form<LoginForm>,
) -> AuthResult<Json<TokenPair>>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    let use_case = SignInUseCase::new(state.repo.clone(), state.tokens.clone(), state.config.clone());

    let pair = use_case
        .execute(SignInInput {
            email: form.username,
            password: form.password,
        })
        .await?;

    Ok(Json(pair))
}

// ============================================================================
// Token Refresh
// ============================================================================

/// GET /api/auth/refresh_token (bearer refresh token)
pub async fn refresh_token<R, S>(
    State(state): State<AuthAppState<R, S>>,
    headers: HeaderMap,
) -> AuthResult<Json<TokenPair>>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    let token = bearer_token(&headers).ok_or(AuthError::InvalidRefreshToken)?;

    let use_case = RefreshTokenUseCase::new(state.repo.clone(), state.tokens.clone());
    let pair = use_case.execute(token).await?;

    Ok(Json(pair))
}

// ============================================================================
// Email Verification
// ============================================================================

/// GET /api/auth/verified_email/{token}
pub async fn verified_email<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Path(token): Path<String>,
) -> AuthResult<Json<MessageResponse>>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    let outcome = verify_email_use_case(&state).verify(&token).await?;
    Ok(Json(MessageResponse::new(outcome.message())))
}

/// POST /api/auth/request_email
pub async fn request_email<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Json(req): Json<EmailRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    let outcome = verify_email_use_case(&state).request(&req.email).await?;
    Ok(Json(MessageResponse::new(outcome.message())))
}

fn verify_email_use_case<R, S>(state: &AuthAppState<R, S>) -> VerifyEmailUseCase<R>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    VerifyEmailUseCase::new(
        state.repo.clone(),
        state.tokens.clone(),
        state.mail.clone(),
        state.config.clone(),
    )
}

// ============================================================================
// Password Reset
// ============================================================================

/// POST /api/auth/send_reset_password
pub async fn send_reset_password<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Json(req): Json<EmailRequest>,
) -> AuthResult<Json<MessageResponse>>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    let message = password_reset_use_case(&state).request(&req.email).await?;
    Ok(Json(MessageResponse::new(message)))
}

/// POST /api/auth/reset_password (bearer reset token)
pub async fn reset_password<R, S>(
    State(state): State<AuthAppState<R, S>>,
    headers: HeaderMap,
    Json(req): Json<ResetPasswordRequest>,
) -> AuthResult<Json<UserResponse>>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    let token = bearer_token(&headers).ok_or(AuthError::InvalidToken)?;

    let user = password_reset_use_case(&state)
        .confirm(ConfirmResetInput {
            token: token.to_owned(),
            password1: req.password1,
            password2: req.password2,
        })
        .await?;

    Ok(Json(UserResponse::from(&user)))
}

/// GET /api/auth/reset_password/{token}
pub async fn auto_reset_password<R, S>(
    State(state): State<AuthAppState<R, S>>,
    Path(token): Path<String>,
) -> AuthResult<Json<MessageResponse>>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    let message = password_reset_use_case(&state).auto_reset(&token).await?;
    Ok(Json(MessageResponse::new(message)))
}

fn password_reset_use_case<R, S>(state: &AuthAppState<R, S>) -> PasswordResetUseCase<R>
where
    R: UserRepository + Send + Sync + 'static,
    S: RateLimitStore + Send + Sync + 'static,
{
    PasswordResetUseCase::new(
        state.repo.clone(),
        state.tokens.clone(),
        state.mail.clone(),
        state.config.clone(),
    )
}

// ============================================================================
// Current User
// ============================================================================

/// GET /api/auth/me (behind `require_access_token`)
pub async fn me(Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
