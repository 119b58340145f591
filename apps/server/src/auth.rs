//! Admin session handling: a single credential pair and an HMAC-signed
//! session cookie with a fixed expiry.

use axum::http::{header, HeaderMap};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::AppError;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE: &str = "session";

/// Session lifetime (24 hours).
const SESSION_TTL_SECS: i64 = 86400;

fn sign(secret: &str, expires: i64) -> String {
    let mut mac =
        HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size");
    mac.update(expires.to_string().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Mint an opaque session token: `"{expiry_unix}.{hex(hmac)}"`.
pub fn issue_token(secret: &str) -> String {
    let expires = chrono::Utc::now().timestamp() + SESSION_TTL_SECS;
    format!("{}.{}", expires, sign(secret, expires))
}

/// Check a token's signature and expiry.
pub fn verify_token(token: &str, secret: &str) -> bool {
    let Some((expires_raw, mac_hex)) = token.split_once('.') else {
        return false;
    };
    let Ok(expires) = expires_raw.parse::<i64>() else {
        return false;
    };
    if expires <= chrono::Utc::now().timestamp() {
        tracing::warn!("session token expired: expiry={}", expires);
        return false;
    }
    sign(secret, expires) == mac_hex
}

/// Set-Cookie value for a fresh session.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; Max-Age={}; SameSite=Lax",
        SESSION_COOKIE, token, SESSION_TTL_SECS
    )
}

/// Set-Cookie value that clears the session.
pub fn clear_session_cookie() -> String {
    format!("{}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax", SESSION_COOKIE)
}

fn cookie_value<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix(name)?.strip_prefix('='))
}

/// Extract the session token from the Cookie header.
pub fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookie_value(cookies, SESSION_COOKIE)
}

/// Guard for admin handlers: a valid, unexpired session cookie or 401.
pub fn require_admin(headers: &HeaderMap, secret: &str) -> Result<(), AppError> {
    let token = token_from_headers(headers).ok_or(AppError::Unauthorized)?;
    if verify_token(token, secret) {
        Ok(())
    } else {
        Err(AppError::Unauthorized)
    }
}

// ── Tests ──
