use axum::{
    extract::{ConnectInfo, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use dashmap::DashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::models::ApiResponse;

// ── Tiers ──

/// The fixed set of rate-limit tiers. Every route group belongs to one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Read-only public endpoints.
    Public,
    /// Login attempts.
    Auth,
    /// Booking creation — the strictest.
    Booking,
    /// Authenticated admin endpoints.
    Admin,
}

impl Tier {
    /// `(max_requests, window)` for the sliding window.
    fn limit(self) -> (u32, Duration) {
        match self {
            Tier::Public => (60, Duration::from_secs(60)),
            Tier::Auth => (30, Duration::from_secs(60)),
            Tier::Booking => (5, Duration::from_secs(300)),
            Tier::Admin => (120, Duration::from_secs(60)),
        }
    }
}

// ── Core rate limiter ──

/// In-memory per-IP sliding-window limiter, keyed by `(tier, ip)`.
#[derive(Debug, Clone, Default)]
pub struct RateLimiter {
    hits: Arc<DashMap<(Tier, IpAddr), Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a request from `ip` is allowed under `tier`.
    ///
    /// Returns `Ok(())` if allowed, `Err(retry_after_secs)` if rate limited.
    pub fn check(&self, tier: Tier, ip: IpAddr) -> Result<(), u64> {
        let (max_requests, window) = tier.limit();
        let now = Instant::now();
        let window_start = now - window;

        let mut entry = self.hits.entry((tier, ip)).or_default();

        // Evict expired timestamps
        entry.retain(|t| *t > window_start);

        if entry.len() >= max_requests as usize {
            // Time until the oldest request expires from the window
            let oldest = entry[0];
            let retry_after = (oldest + window)
                .saturating_duration_since(now)
                .as_secs()
                .max(1);
            return Err(retry_after);
        }

        entry.push(now);
        Ok(())
    }

    /// Drop entries idle for longer than 2× their tier's window.
    /// Call periodically from a background task.
    pub fn cleanup(&self) {
        let now = Instant::now();
        self.hits.retain(|(tier, _), timestamps| {
            let cutoff = tier.limit().1 * 2;
            timestamps.retain(|t| now.duration_since(*t) < cutoff);
            !timestamps.is_empty()
        });
    }
}

// ── IP extraction ──

/// Client IP from X-Forwarded-For (reverse proxy) or ConnectInfo.
fn extract_client_ip(req: &Request) -> IpAddr {
    if let Some(forwarded) = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
    {
        if let Some(first_ip) = forwarded.split(',').next() {
            if let Ok(ip) = first_ip.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip())
        .unwrap_or_else(|| IpAddr::from([127, 0, 0, 1]))
}

// ── Middleware ──

fn too_many_requests(retry_after: u64) -> Response {
    let body = ApiResponse::<()>::error(format!(
        "請求過於頻繁，請在 {} 秒後再試。",
        retry_after
    ));
    (
        StatusCode::TOO_MANY_REQUESTS,
        [("Retry-After", retry_after.to_string())],
        Json(body),
    )
        .into_response()
}

async fn enforce(
    limiter: RateLimiter,
    tier: Tier,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let ip = extract_client_ip(&req);
    limiter.check(tier, ip).map_err(too_many_requests)?;
    Ok(next.run(req).await)
}

pub async fn rate_limit_public(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    enforce(limiter, Tier::Public, req, next).await
}

pub async fn rate_limit_auth(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    enforce(limiter, Tier::Auth, req, next).await
}

pub async fn rate_limit_booking(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    enforce(limiter, Tier::Booking, req, next).await
}

pub async fn rate_limit_admin(
    State(limiter): State<RateLimiter>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    enforce(limiter, Tier::Admin, req, next).await
}

// ── Tests ──
