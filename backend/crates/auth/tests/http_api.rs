//! Router-level tests: status codes, headers and JSON shapes.

mod common;

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use auth::domain::mailer::MailMessage;
use auth::{AuthAppState, AuthConfig, InMemoryUserRepository, MailDispatcher, auth_router};
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use common::RecordingMailer;
use platform::rate_limit::InMemoryRateLimitStore;
use serde_json::{Value, json};
use tower::ServiceExt;

fn app_with(config: AuthConfig) -> (Router, RecordingMailer) {
    let mailer = RecordingMailer::default();
    let (mail, _worker) = MailDispatcher::spawn(mailer.clone(), 16);
    let state = AuthAppState::new(
        InMemoryUserRepository::new(),
        Arc::new(InMemoryRateLimitStore::new()),
        config,
        mail,
    );
    (auth_router(state), mailer)
}

fn app() -> (Router, RecordingMailer) {
    app_with(AuthConfig::with_random_secret())
}

/// Attach the socket address the server would see for this request
fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    let ip: IpAddr = peer.parse().unwrap();
    request
        .extensions_mut()
        .insert(ConnectInfo(SocketAddr::new(ip, 40_000)));
    request
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_json(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn login_request(email: &str, password: &str) -> Request<Body> {
    let email = email.replace('@', "%40");
    Request::builder()
        .method("POST")
        .uri("/login")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={email}&password={password}")))
        .unwrap()
}

/// Sign up, follow the verification link and log in
async fn verified_session(app: &Router, mailer: &RecordingMailer, email: &str) -> Value {
    let response = send(
        app,
        json_request(
            "POST",
            "/signup",
            json!({"username": "tester", "email": email, "password": "tester-pass"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let mails = mailer.wait_for(1).await;
    let Some(MailMessage::Verification { token, .. }) = mails.last() else {
        panic!("expected a verification mail");
    };
    let response = send(app, get(&format!("/verified_email/{token}"))).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = send(app, login_request(email, "tester-pass")).await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn test_signup_returns_created_user() {
    let (app, _mailer) = app();

    let response = send(
        &app,
        json_request(
            "POST",
            "/signup",
            json!({"username": "alice", "email": "alice@example.com", "password": "alice-pass"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["username"], "alice");
    assert_eq!(body["email"], "alice@example.com");
    assert_eq!(body["role"], "user");
    assert!(body["avatar"].is_null());
    assert!(body["id"].as_str().is_some_and(|id| !id.is_empty()));
    assert!(body.get("password_hash").is_none());

    let response = send(
        &app,
        json_request(
            "POST",
            "/signup",
            json!({"username": "alice2", "email": "alice@example.com", "password": "alice-pass"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(body_json(response).await["detail"], "Account already exists!");
}

#[tokio::test]
async fn test_signup_rejects_invalid_input() {
    let (app, _mailer) = app();

    let response = send(
        &app,
        json_request(
            "POST",
            "/signup",
            json!({"username": "bob", "email": "not-an-email", "password": "bob-pass"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = send(
        &app,
        json_request(
            "POST",
            "/signup",
            json!({"username": "bob", "email": "bob@example.com", "password": "abc"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_login_before_verification() {
    let (app, mailer) = app();

    send(
        &app,
        json_request(
            "POST",
            "/signup",
            json!({"username": "carol", "email": "carol@example.com", "password": "carol-pass"}),
        ),
    )
    .await;
    mailer.wait_for(1).await;

    let response = send(&app, login_request("carol@example.com", "carol-pass")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Email not verified!");

    let response = send(&app, login_request("carol@example.com", "wrong-pass")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );
}

#[tokio::test]
async fn test_verification_link() {
    let (app, _mailer) = app();

    let response = send(&app, get("/verified_email/not-a-token")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["detail"], "Verification error!");
}

#[tokio::test]
async fn test_login_refresh_and_me() {
    let (app, mailer) = app();
    let session = verified_session(&app, &mailer, "dave@example.com").await;

    assert_eq!(session["token_type"], "bearer");
    let access = session["access_token"].as_str().unwrap().to_string();
    let refresh = session["refresh_token"].as_str().unwrap().to_string();

    let response = send(&app, get_with_bearer("/me", &access)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "dave@example.com");

    // Wrong class on a protected route
    let response = send(&app, get_with_bearer("/me", &refresh)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers().get(header::WWW_AUTHENTICATE).unwrap(),
        "Bearer"
    );

    let response = send(&app, get("/me")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, get_with_bearer("/refresh_token", &refresh)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let rotated = body_json(response).await;
    assert_ne!(rotated["refresh_token"].as_str().unwrap(), refresh);

    // Spent token
    let response = send(&app, get_with_bearer("/refresh_token", &refresh)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["detail"], "Invalid refresh token!");
}

#[tokio::test]
async fn test_request_email_and_reset_are_silent() {
    let (app, _mailer) = app();

    let response = send(
        &app,
        json_request("POST", "/request_email", json!({"email": "ghost@example.com"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Check your email for confirmation."
    );

    let response = send(
        &app,
        json_request(
            "POST",
            "/send_reset_password",
            json!({"email": "ghost@example.com"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["message"],
        "Check your email for the password reset link."
    );
}

#[tokio::test]
async fn test_reset_password_with_bearer_token() {
    let (app, mailer) = app();
    verified_session(&app, &mailer, "erin@example.com").await;

    send(
        &app,
        json_request(
            "POST",
            "/send_reset_password",
            json!({"email": "erin@example.com"}),
        ),
    )
    .await;
    let mails = mailer.wait_for(2).await;
    let Some(MailMessage::ResetNotice { token, .. }) = mails.last() else {
        panic!("expected a reset notice");
    };

    let mismatch = Request::builder()
        .method("POST")
        .uri("/reset_password")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(
            json!({"password1": "fresh-pass", "password2": "other-pass"}).to_string(),
        ))
        .unwrap();
    let response = send(&app, from_peer(mismatch, "203.0.113.1")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let confirm = Request::builder()
        .method("POST")
        .uri("/reset_password")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(
            json!({"password1": "fresh-pass", "password2": "fresh-pass"}).to_string(),
        ))
        .unwrap();
    let response = send(&app, from_peer(confirm, "203.0.113.2")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["email"], "erin@example.com");

    let response = send(&app, login_request("erin@example.com", "fresh-pass")).await;
    assert_eq!(response.status(), StatusCode::OK);
}

fn reset_link_request(forwarded_for: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/reset_password/not-a-token");
    if let Some(client) = forwarded_for {
        builder = builder.header("x-forwarded-for", client);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_reset_routes_are_rate_limited_per_client() {
    let (app, _mailer) = app();

    let first = send(&app, from_peer(reset_link_request(None), "198.51.100.7")).await;
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    let second = send(&app, from_peer(reset_link_request(None), "198.51.100.7")).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = second
        .headers()
        .get(header::RETRY_AFTER)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=20).contains(&retry_after));

    // Another client has its own window
    let other = send(&app, from_peer(reset_link_request(None), "198.51.100.8")).await;
    assert_eq!(other.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rotating_forwarded_for_does_not_bypass_limit() {
    let (app, _mailer) = app();

    let first = send(
        &app,
        from_peer(reset_link_request(Some("10.9.9.0")), "198.51.100.7"),
    )
    .await;
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    for i in 1..5 {
        let spoofed = reset_link_request(Some(&format!("10.9.9.{i}")));
        let response = send(&app, from_peer(spoofed, "198.51.100.7")).await;
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    }
}

#[tokio::test]
async fn test_requests_without_peer_share_one_window() {
    let (app, _mailer) = app();

    let first = send(&app, reset_link_request(Some("10.9.9.1"))).await;
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    let second = send(&app, reset_link_request(Some("10.9.9.2"))).await;
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_trusted_proxy_forwards_client_address() {
    let mut config = AuthConfig::with_random_secret();
    config.trusted_proxies = vec!["10.0.0.1".parse().unwrap()];
    let (app, _mailer) = app_with(config);

    let alice = send(
        &app,
        from_peer(reset_link_request(Some("203.0.113.10")), "10.0.0.1"),
    )
    .await;
    assert_eq!(alice.status(), StatusCode::UNAUTHORIZED);

    let bob = send(
        &app,
        from_peer(reset_link_request(Some("203.0.113.11")), "10.0.0.1"),
    )
    .await;
    assert_eq!(bob.status(), StatusCode::UNAUTHORIZED);

    let alice_again = send(
        &app,
        from_peer(reset_link_request(Some("203.0.113.10")), "10.0.0.1"),
    )
    .await;
    assert_eq!(alice_again.status(), StatusCode::TOO_MANY_REQUESTS);
}
