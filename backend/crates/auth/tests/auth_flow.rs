//! End-to-end flows through the use cases, backed by the in-memory
//! repository and a mailer that records what it was asked to send.

mod common;

use std::sync::Arc;
use std::time::Duration;

use auth::application::{
    ConfirmResetInput, PasswordResetUseCase, RefreshTokenUseCase, SignInInput, SignInUseCase,
    SignUpInput, SignUpUseCase, TokenService, VerifyEmailOutcome, VerifyEmailUseCase,
};
use auth::domain::mailer::MailMessage;
use auth::domain::repository::UserRepository;
use auth::domain::value_object::email::Email;
use auth::{AuthConfig, AuthError, InMemoryUserRepository, MailDispatcher};
use common::RecordingMailer;

struct Harness {
    repo: Arc<InMemoryUserRepository>,
    tokens: Arc<TokenService>,
    config: Arc<AuthConfig>,
    mail: MailDispatcher,
    mailer: RecordingMailer,
}

impl Harness {
    fn new() -> Self {
        let config = Arc::new(AuthConfig::with_random_secret());
        let mailer = RecordingMailer::default();
        let (mail, _worker) = MailDispatcher::spawn(mailer.clone(), 16);
        Self {
            repo: Arc::new(InMemoryUserRepository::new()),
            tokens: Arc::new(TokenService::new(config.clone())),
            config,
            mail,
            mailer,
        }
    }

    fn sign_up(&self) -> SignUpUseCase<InMemoryUserRepository> {
        SignUpUseCase::new(
            self.repo.clone(),
            self.tokens.clone(),
            self.mail.clone(),
            self.config.clone(),
        )
    }

    fn sign_in(&self) -> SignInUseCase<InMemoryUserRepository> {
        SignInUseCase::new(self.repo.clone(), self.tokens.clone(), self.config.clone())
    }

    fn refresh(&self) -> RefreshTokenUseCase<InMemoryUserRepository> {
        RefreshTokenUseCase::new(self.repo.clone(), self.tokens.clone())
    }

    fn verify_email(&self) -> VerifyEmailUseCase<InMemoryUserRepository> {
        VerifyEmailUseCase::new(
            self.repo.clone(),
            self.tokens.clone(),
            self.mail.clone(),
            self.config.clone(),
        )
    }

    fn password_reset(&self) -> PasswordResetUseCase<InMemoryUserRepository> {
        PasswordResetUseCase::new(
            self.repo.clone(),
            self.tokens.clone(),
            self.mail.clone(),
            self.config.clone(),
        )
    }

    async fn register(&self, email: &str, password: &str) {
        self.sign_up()
            .execute(SignUpInput {
                username: "alice".to_string(),
                email: email.to_string(),
                password: password.to_string(),
            })
            .await
            .unwrap();
    }

    async fn register_verified(&self, email: &str, password: &str) {
        self.register(email, password).await;
        self.repo
            .set_verified(&Email::new(email).unwrap())
            .await
            .unwrap();
    }

    async fn login(&self, email: &str, password: &str) -> Result<auth::domain::token::TokenPair, AuthError> {
        self.sign_in()
            .execute(SignInInput {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await
    }

    async fn stored_refresh_token(&self, email: &str) -> Option<String> {
        self.repo
            .find_by_email(&Email::new(email).unwrap())
            .await
            .unwrap()
            .unwrap()
            .refresh_token
    }
}

#[tokio::test]
async fn test_signup_verify_login() {
    let h = Harness::new();

    let user = h
        .sign_up()
        .execute(SignUpInput {
            username: "alice".to_string(),
            email: "Alice@Example.com".to_string(),
            password: "correct horse".to_string(),
        })
        .await
        .unwrap();
    assert!(!user.is_verified());
    assert_eq!(user.email.as_str(), "alice@example.com");

    let mails = h.mailer.wait_for(1).await;
    assert_eq!(mails.len(), 1);
    let MailMessage::Verification { email, token, .. } = &mails[0] else {
        panic!("expected a verification mail");
    };
    assert_eq!(email, "alice@example.com");

    let err = h.login("alice@example.com", "correct horse").await.unwrap_err();
    assert!(matches!(err, AuthError::EmailNotVerified));

    assert_eq!(
        h.verify_email().verify(token).await.unwrap(),
        VerifyEmailOutcome::Verified
    );
    assert_eq!(
        h.verify_email().verify(token).await.unwrap(),
        VerifyEmailOutcome::AlreadyVerified
    );

    let pair = h.login("alice@example.com", "correct horse").await.unwrap();
    assert!(!pair.access_token.is_empty());
    assert!(!pair.refresh_token.is_empty());
    assert_eq!(pair.token_type, "bearer");
    assert_eq!(
        h.stored_refresh_token("alice@example.com").await.as_deref(),
        Some(pair.refresh_token.as_str())
    );
}

#[tokio::test]
async fn test_signup_rejects_duplicate_email() {
    let h = Harness::new();
    h.register("dup@example.com", "first-pass").await;

    let err = h
        .sign_up()
        .execute(SignUpInput {
            username: "other".to_string(),
            email: "DUP@example.com".to_string(),
            password: "second-pass".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::AlreadyExists));
    assert_eq!(h.repo.len(), 1);
}

#[tokio::test]
async fn test_login_wrong_password_and_unknown_user_look_the_same() {
    let h = Harness::new();
    h.register_verified("bob@example.com", "s3cret-pass").await;

    let wrong = h.login("bob@example.com", "not-it").await.unwrap_err();
    let unknown = h.login("nobody@example.com", "s3cret-pass").await.unwrap_err();
    let malformed = h.login("not-an-email", "s3cret-pass").await.unwrap_err();

    assert!(matches!(wrong, AuthError::InvalidCredentials));
    assert!(matches!(unknown, AuthError::InvalidCredentials));
    assert!(matches!(malformed, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn test_refresh_token_is_single_use() {
    let h = Harness::new();
    h.register_verified("carol@example.com", "refresh-me").await;
    let pair = h.login("carol@example.com", "refresh-me").await.unwrap();

    let rotated = h.refresh().execute(&pair.refresh_token).await.unwrap();
    assert_ne!(rotated.refresh_token, pair.refresh_token);
    assert_eq!(
        h.stored_refresh_token("carol@example.com").await.as_deref(),
        Some(rotated.refresh_token.as_str())
    );

    // Replaying the spent token revokes the session
    let err = h.refresh().execute(&pair.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidRefreshToken));
    assert_eq!(h.stored_refresh_token("carol@example.com").await, None);

    let err = h.refresh().execute(&rotated.refresh_token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidRefreshToken));
}

#[tokio::test]
async fn test_access_token_cannot_refresh() {
    let h = Harness::new();
    h.register_verified("dave@example.com", "dave-pass").await;
    let pair = h.login("dave@example.com", "dave-pass").await.unwrap();

    let err = h.refresh().execute(&pair.access_token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidRefreshToken));
    assert!(h.stored_refresh_token("dave@example.com").await.is_some());
}

#[tokio::test]
async fn test_request_email_again() {
    let h = Harness::new();
    h.register("erin@example.com", "erin-pass").await;
    h.mailer.wait_for(1).await;

    let outcome = h.verify_email().request("erin@example.com").await.unwrap();
    assert_eq!(outcome.message(), "Check your email for confirmation.");
    let mails = h.mailer.wait_for(2).await;
    assert!(matches!(mails[1], MailMessage::Verification { .. }));

    h.repo
        .set_verified(&Email::new("erin@example.com").unwrap())
        .await
        .unwrap();
    let outcome = h.verify_email().request("erin@example.com").await.unwrap();
    assert_eq!(outcome.message(), "Your email is already confirmed!");
}

#[tokio::test]
async fn test_verify_email_rejects_other_token_classes() {
    let h = Harness::new();
    h.register("frank@example.com", "frank-pass").await;

    let reset = h.tokens.issue_reset_token("frank@example.com").unwrap();
    let err = h.verify_email().verify(&reset).await.unwrap_err();
    assert!(matches!(err, AuthError::VerificationError(_)));

    let err = h.verify_email().verify("garbage").await.unwrap_err();
    assert_eq!(err.to_string(), "Verification error!");
}

#[tokio::test]
async fn test_reset_request_is_silent_for_unknown_email() {
    let h = Harness::new();

    let message = h.password_reset().request("ghost@example.com").await.unwrap();
    assert_eq!(message, "Check your email for the password reset link.");

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(h.mailer.count(), 0);
}

#[tokio::test]
async fn test_confirm_reset_with_equal_passwords() {
    let h = Harness::new();
    h.register_verified("grace@example.com", "old-password").await;
    h.login("grace@example.com", "old-password").await.unwrap();

    h.password_reset().request("grace@example.com").await.unwrap();
    let mails = h.mailer.wait_for(2).await;
    let MailMessage::ResetNotice { token, .. } = &mails[1] else {
        panic!("expected a reset notice");
    };

    // Distinct allocations with the same contents
    let first = String::from("new-password");
    let second = ["new-", "password"].concat();

    let user = h
        .password_reset()
        .confirm(ConfirmResetInput {
            token: token.clone(),
            password1: first,
            password2: second,
        })
        .await
        .unwrap();
    assert!(!user.has_refresh_token());

    let mails = h.mailer.wait_for(3).await;
    assert!(matches!(mails[2], MailMessage::PasswordChanged { .. }));

    assert!(h.login("grace@example.com", "new-password").await.is_ok());
}

#[tokio::test]
async fn test_confirm_reset_rejects_mismatch() {
    let h = Harness::new();
    h.register_verified("heidi@example.com", "old-password").await;
    let token = h.tokens.issue_reset_token("heidi@example.com").unwrap();

    let err = h
        .password_reset()
        .confirm(ConfirmResetInput {
            token,
            password1: "new-password".to_string(),
            password2: "new-passw0rd".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, AuthError::PasswordMismatch));
}

#[tokio::test]
async fn test_auto_reset_checks_token_class() {
    let h = Harness::new();
    h.register_verified("ivan@example.com", "old-password").await;
    h.mailer.wait_for(1).await;

    let email_token = h.tokens.issue_email_token("ivan@example.com").unwrap();
    let err = h.password_reset().auto_reset(&email_token).await.unwrap_err();
    assert!(matches!(err, AuthError::WrongTokenClass));

    let reset_token = h.tokens.issue_reset_token("ivan@example.com").unwrap();
    let message = h.password_reset().auto_reset(&reset_token).await.unwrap();
    assert_eq!(message, "New password sent by email!");

    let mails = h.mailer.wait_for(2).await;
    let MailMessage::GeneratedPassword { password, .. } = &mails[1] else {
        panic!("expected a generated password mail");
    };
    assert_eq!(password.chars().count(), 16);

    assert!(h.login("ivan@example.com", password).await.is_ok());
    assert!(matches!(
        h.login("ivan@example.com", "old-password").await.unwrap_err(),
        AuthError::InvalidCredentials
    ));
}

#[tokio::test]
async fn test_auto_reset_for_deleted_account() {
    let h = Harness::new();
    let token = h.tokens.issue_reset_token("gone@example.com").unwrap();

    let err = h.password_reset().auto_reset(&token).await.unwrap_err();
    assert_eq!(err.to_string(), "Reset password error!");
}
