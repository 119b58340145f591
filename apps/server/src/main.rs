mod auth;
mod db;
mod discord_layer;
mod error;
mod handlers;
mod models;
mod notify;
mod rate_limit;
mod slots;
mod store;
mod validate;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};
use sqlx::sqlite::SqlitePoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use rate_limit::{
    rate_limit_admin, rate_limit_auth, rate_limit_booking, rate_limit_public, RateLimiter,
};

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub db: sqlx::SqlitePool,
    /// Shared HTTP client for webhook calls, built with a request timeout.
    pub http: reqwest::Client,
    pub webhook_url: String,
    pub admin_username: String,
    pub admin_password: String,
    pub session_secret: String,
    pub started_at: Instant,
}

/// Rate limit cleanup interval (seconds).
const RATE_LIMIT_CLEANUP_SECS: u64 = 300;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // ── Required env vars ──
    let database_url =
        std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite:visionary.db?mode=rwc".into());
    let admin_username = std::env::var("ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
    let admin_password = std::env::var("ADMIN_PASSWORD").expect("ADMIN_PASSWORD must be set");
    let session_secret = std::env::var("SESSION_SECRET").expect("SESSION_SECRET must be set");

    // ── Optional env vars (webhook read before tracing so DiscordLayer can use it) ──
    let webhook_url = std::env::var("DISCORD_WEBHOOK_URL").unwrap_or_default();

    let http = reqwest::Client::builder()
        .timeout(notify::WEBHOOK_TIMEOUT)
        .build()?;

    // ── Tracing: console + optional Discord error notifications ──
    let env_filter = EnvFilter::from_default_env().add_directive("info".parse()?);
    let fmt_layer = tracing_subscriber::fmt::layer();
    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer);

    if !webhook_url.is_empty() {
        let layer = discord_layer::DiscordLayer::new(webhook_url.clone(), http.clone());
        registry.with(layer).init();
    } else {
        registry.init();
    }

    if webhook_url.is_empty() {
        tracing::warn!("DISCORD_WEBHOOK_URL not set, booking notifications disabled");
    }

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".into());
    let webapp_url = std::env::var("WEBAPP_URL").unwrap_or_default();

    // ── Database ──
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    db::run_migrations(&pool).await?;

    let state = Arc::new(AppState {
        db: pool,
        http,
        webhook_url,
        admin_username,
        admin_password,
        session_secret,
        started_at: Instant::now(),
    });

    // ── Rate limiter + background cleanup ──
    let rate_limiter = RateLimiter::new();

    let cleanup_limiter = rate_limiter.clone();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(tokio::time::Duration::from_secs(RATE_LIMIT_CLEANUP_SECS));
        loop {
            interval.tick().await;
            cleanup_limiter.cleanup();
        }
    });

    // ── CORS: whitelist WEBAPP_URL when configured, otherwise allow any ──
    let cors = if !webapp_url.is_empty() {
        let origins: Vec<axum::http::HeaderValue> = vec![
            webapp_url.parse().expect("WEBAPP_URL must be a valid URL"),
            "http://localhost:5173".parse().unwrap(), // Vite dev server
        ];
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    // ── Router (5 groups with per-group rate limits) ──

    // 1. No-limit: health checks
    let no_limit_routes = Router::new().route("/api/health", get(handlers::health::health));

    // 2. Public: read-only endpoints (no auth, 60 req/min)
    let public_routes = Router::new()
        .route("/api/settings", get(handlers::client::get_settings))
        .route("/api/availability", get(handlers::client::availability))
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_public));

    // 3. Booking creation: strictest limit (5 req/5min)
    let booking_routes = Router::new()
        .route(
            "/api/appointments",
            post(handlers::client::create_appointment),
        )
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_booking));

    // 4. Auth: login/logout (30 req/min)
    let auth_routes = Router::new()
        .route("/api/auth/login", post(handlers::admin::login))
        .route("/api/auth/logout", post(handlers::admin::logout))
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_auth));

    // 5. Admin: all admin endpoints (120 req/min)
    let admin_routes = Router::new()
        .route(
            "/api/admin/appointments",
            get(handlers::admin::list_appointments),
        )
        .route(
            "/api/admin/appointments/{id}",
            get(handlers::admin::get_appointment),
        )
        .route(
            "/api/admin/appointments/{id}/status",
            put(handlers::admin::update_status),
        )
        .route("/api/admin/settings", get(handlers::admin::get_settings))
        .route("/api/admin/settings", put(handlers::admin::update_settings))
        .route(
            "/api/admin/notifications/test",
            post(handlers::admin::test_notification),
        )
        .layer(from_fn_with_state(rate_limiter.clone(), rate_limit_admin));

    let app = Router::new()
        .merge(no_limit_routes)
        .merge(public_routes)
        .merge(booking_routes)
        .merge(auth_routes)
        .merge(admin_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", host, port);
    tracing::info!("Visionary booking server starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
