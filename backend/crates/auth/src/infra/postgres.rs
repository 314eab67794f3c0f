//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use platform::rate_limit::{BoxError, RateLimitConfig, RateLimitResult, RateLimitStore};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::entity::user::User;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{
    email::Email, user_id::UserId, user_password::UserPassword, user_role::UserRole,
    username::Username,
};
use crate::error::{AuthError, AuthResult};

const USER_COLUMNS: &str = r#"
    user_id,
    email,
    username,
    password_hash,
    verified,
    refresh_token,
    role,
    avatar,
    created_at,
    updated_at
"#;

/// PostgreSQL-backed user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// User Repository Implementation
// ============================================================================

impl UserRepository for PgUserRepository {
    async fn find_by_email(&self, email: &Email) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }

    async fn create(&self, user: &User) -> AuthResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (
                user_id,
                email,
                username,
                password_hash,
                verified,
                refresh_token,
                role,
                avatar,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(user.user_id.as_uuid())
        .bind(user.email.as_str())
        .bind(user.username.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.verified)
        .bind(user.refresh_token.as_deref())
        .bind(user.role.code())
        .bind(user.avatar.as_deref())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(AuthError::AlreadyExists)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn set_refresh_token(&self, email: &Email, token: Option<&str>) -> AuthResult<()> {
        sqlx::query(
            "UPDATE users SET refresh_token = $2, updated_at = now() WHERE email = $1",
        )
        .bind(email.as_str())
        .bind(token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn replace_refresh_token(
        &self,
        email: &Email,
        expected: &str,
        new: &str,
    ) -> AuthResult<bool> {
        let rows = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $3, updated_at = now()
            WHERE email = $1 AND refresh_token = $2
            "#,
        )
        .bind(email.as_str())
        .bind(expected)
        .bind(new)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rows == 1)
    }

    async fn set_verified(&self, email: &Email) -> AuthResult<()> {
        sqlx::query("UPDATE users SET verified = TRUE, updated_at = now() WHERE email = $1")
            .bind(email.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn set_password_hash(
        &self,
        email: &Email,
        hash: &UserPassword,
    ) -> AuthResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            UPDATE users
            SET password_hash = $2, refresh_token = NULL, updated_at = now()
            WHERE email = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(email.as_str())
        .bind(hash.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_user).transpose()
    }
}

// ============================================================================
// Rate Limit Store Implementation
// ============================================================================

/// Fixed-window counters in the `rate_limits` table, shared by every API
/// instance on the same database.
#[derive(Clone)]
pub struct PgRateLimitStore {
    pool: PgPool,
}

impl PgRateLimitStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete windows that closed more than `older_than_ms` ago
    pub async fn cleanup_expired(&self, older_than_ms: i64) -> AuthResult<u64> {
        let cutoff = Utc::now().timestamp_millis() - older_than_ms;

        let deleted = sqlx::query("DELETE FROM rate_limits WHERE window_started_at_ms < $1")
            .bind(cutoff)
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::debug!(windows_deleted = deleted, "Cleaned up rate limit windows");

        Ok(deleted)
    }
}

impl RateLimitStore for PgRateLimitStore {
    async fn check_and_increment(
        &self,
        key: &str,
        config: &RateLimitConfig,
    ) -> Result<RateLimitResult, BoxError> {
        let now_ms = Utc::now().timestamp_millis();
        let window_ms = config.window_ms();

        // One statement: open a window, count into it, or restart an
        // elapsed one. Row lock on conflict keeps it atomic per key.
        let (count, started_at_ms) = sqlx::query_as::<_, (i32, i64)>(
            r#"
            INSERT INTO rate_limits (rate_key, request_count, window_started_at_ms)
            VALUES ($1, 1, $2)
            ON CONFLICT (rate_key) DO UPDATE SET
                request_count = CASE
                    WHEN rate_limits.window_started_at_ms + $3 <= $2 THEN 1
                    ELSE rate_limits.request_count + 1
                END,
                window_started_at_ms = CASE
                    WHEN rate_limits.window_started_at_ms + $3 <= $2 THEN $2
                    ELSE rate_limits.window_started_at_ms
                END
            RETURNING request_count, window_started_at_ms
            "#,
        )
        .bind(key)
        .bind(now_ms)
        .bind(window_ms)
        .fetch_one(&self.pool)
        .await?;

        let count = u32::try_from(count).unwrap_or(u32::MAX);

        Ok(RateLimitResult {
            allowed: count <= config.max_requests,
            remaining: config.max_requests.saturating_sub(count),
            reset_at_ms: started_at_ms.saturating_add(window_ms),
        })
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(sqlx::FromRow)]
struct UserRow {
    user_id: Uuid,
    email: String,
    username: String,
    password_hash: String,
    verified: bool,
    refresh_token: Option<String>,
    role: String,
    avatar: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl UserRow {
    fn into_user(self) -> AuthResult<User> {
        Ok(User {
            user_id: UserId::from_uuid(self.user_id),
            email: Email::from_db(self.email),
            username: Username::from_db(self.username),
            password_hash: UserPassword::from_db(self.password_hash),
            verified: self.verified,
            refresh_token: self.refresh_token,
            role: self.role.parse::<UserRole>()?,
            avatar: self.avatar,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
