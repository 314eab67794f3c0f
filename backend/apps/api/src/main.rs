//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use auth::{
    AuthAppState, AuthConfig, DEFAULT_MAIL_QUEUE_CAPACITY, InMemoryUserRepository, LogMailer,
    MailDispatcher, PgRateLimitStore, PgUserRepository, auth_router,
};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, header},
    routing::get,
};
use kernel::error::app_error::{AppResult, ResultExt};
use kernel::error::kind::ErrorKind;
use platform::config::{ConfigError, env_figment, extract, non_empty};
use platform::rate_limit::InMemoryRateLimitStore;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Backing store for users and rate-limit windows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Storage {
    Postgres,
    Memory,
}

impl Storage {
    fn parse(raw: &str) -> Result<Self, ConfigError> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(Storage::Postgres),
            "memory" => Ok(Storage::Memory),
            other => Err(ConfigError::invalid(
                "STORAGE",
                format!("expected postgres or memory, got {other}"),
            )),
        }
    }
}

/// Server settings read from the environment
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ApiSettings {
    storage: String,
    database_url: Option<String>,
    bind_addr: SocketAddr,
    mail_queue_capacity: usize,
    run_migrations: bool,
    frontend_origins: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            storage: "postgres".to_string(),
            database_url: None,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            mail_queue_capacity: DEFAULT_MAIL_QUEUE_CAPACITY,
            run_migrations: true,
            frontend_origins: "http://localhost:3000,http://127.0.0.1:3000".to_string(),
        }
    }
}

/// Run `sweep` every `period`, starting immediately
fn spawn_sweeper<F, Fut>(period: Duration, mut sweep: F) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            sweep().await;
        }
    })
}

#[derive(Clone)]
struct HealthState {
    pool: Option<PgPool>,
}

#[derive(Serialize)]
struct HealthResponse {
    message: &'static str,
}

/// GET /api/healthchecker
async fn healthchecker(State(state): State<HealthState>) -> AppResult<Json<HealthResponse>> {
    if let Some(pool) = &state.pool {
        sqlx::query("SELECT 1")
            .execute(pool)
            .await
            .map_app_err(ErrorKind::InternalServerError, "Error connecting to the database")?;
    }

    Ok(Json(HealthResponse {
        message: "Contacts API is up",
    }))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "contacts_api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let figment = env_figment();
    let settings: ApiSettings = extract(&figment)?;

    // Debug builds fall back to a random signing key
    let auth_config = AuthConfig::from_figment(&figment, cfg!(debug_assertions))?;
    let storage = Storage::parse(&settings.storage)?;

    let (mail, _mail_worker) = MailDispatcher::spawn(
        LogMailer::new().with_links(cfg!(debug_assertions)),
        settings.mail_queue_capacity,
    );

    let window = auth_config.reset_rate_limit.window;
    let sweep_period = window.max(Duration::from_secs(60));

    let (auth_routes, pool) = match storage {
        Storage::Postgres => {
            let database_url = non_empty(settings.database_url.clone())
                .ok_or_else(|| ConfigError::Missing("DATABASE_URL".to_string()))?;

            let pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&database_url)
                .await?;

            tracing::info!("Connected to database");

            if settings.run_migrations {
                sqlx::migrate!("../../database/migrations").run(&pool).await?;
                tracing::info!("Migrations completed");
            }

            // Failures are logged and retried on the next tick
            let rate_limits = PgRateLimitStore::new(pool.clone());
            let cleaner = rate_limits.clone();
            let stale_after_ms = auth_config.reset_rate_limit.window_ms();
            spawn_sweeper(sweep_period, move || {
                let cleaner = cleaner.clone();
                async move {
                    match cleaner.cleanup_expired(stale_after_ms).await {
                        Ok(deleted) => {
                            tracing::debug!(windows_deleted = deleted, "Rate limit cleanup completed");
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "Rate limit cleanup failed");
                        }
                    }
                }
            });

            let state = AuthAppState::new(
                PgUserRepository::new(pool.clone()),
                Arc::new(rate_limits),
                auth_config,
                mail,
            );
            (auth_router(state), Some(pool))
        }
        Storage::Memory => {
            tracing::warn!("STORAGE=memory: accounts are lost on restart");

            let rate_limits = Arc::new(InMemoryRateLimitStore::new());
            let sweeper = Arc::clone(&rate_limits);
            spawn_sweeper(sweep_period, move || {
                sweeper.purge_expired(window);
                std::future::ready(())
            });

            let state = AuthAppState::new(
                InMemoryUserRepository::new(),
                rate_limits,
                auth_config,
                mail,
            );
            (auth_router(state), None)
        }
    };

    // CORS configuration
    let allowed_origins: Vec<HeaderValue> = settings
        .frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .route(
            "/api/healthchecker",
            get(healthchecker).with_state(HealthState { pool }),
        )
        .nest("/api/auth", auth_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    tracing::info!(?storage, "Listening on {}", settings.bind_addr);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
