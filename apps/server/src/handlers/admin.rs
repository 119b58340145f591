//! Admin endpoints: login/logout, the appointments dashboard, settings
//! management and the webhook connectivity test.
//!
//! Every handler past login re-checks the session cookie itself; the rate
//! limiter is the only middleware in front of these routes.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap},
    response::AppendHeaders,
    Json,
};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{
    ApiResponse, Appointment, AppointmentStatus, AppointmentsQuery, LoginRequest, MessageResponse,
    Settings, UpdateSettingsRequest, UpdateSettingsResponse, UpdateStatusRequest,
};
use crate::{auth, notify, store, validate, AppState};

type SetCookie = AppendHeaders<[(header::HeaderName, String); 1]>;

// ── Session ──

/// POST /api/auth/login — check credentials, set the session cookie.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<(SetCookie, Json<ApiResponse<MessageResponse>>), AppError> {
    let (Some(username), Some(password)) = (body.username.as_deref(), body.password.as_deref())
    else {
        return Err(AppError::validation("請輸入帳號和密碼。"));
    };
    if username.is_empty() || password.is_empty() {
        return Err(AppError::validation("請輸入帳號和密碼。"));
    }

    if username != state.admin_username || password != state.admin_password {
        tracing::warn!("failed admin login attempt: username={}", username);
        return Err(AppError::validation("帳號或密碼錯誤。"));
    }

    let token = auth::issue_token(&state.session_secret);
    Ok((
        AppendHeaders([(header::SET_COOKIE, auth::session_cookie(&token))]),
        Json(ApiResponse::success(MessageResponse {
            message: "登入成功！".into(),
        })),
    ))
}

/// POST /api/auth/logout — clear the session cookie.
pub async fn logout() -> (SetCookie, Json<ApiResponse<MessageResponse>>) {
    (
        AppendHeaders([(header::SET_COOKIE, auth::clear_session_cookie())]),
        Json(ApiResponse::success(MessageResponse {
            message: "已登出。".into(),
        })),
    )
}

// ── Appointments ──

/// Interpret the dashboard's status filter: absent, empty and "all" mean no
/// filter; anything else must be a known status.
fn parse_status_filter(raw: Option<&str>) -> Result<Option<AppointmentStatus>, AppError> {
    match raw {
        None | Some("") | Some("all") => Ok(None),
        Some(value) => AppointmentStatus::parse(value)
            .map(Some)
            .ok_or_else(|| AppError::validation("無效的狀態。")),
    }
}

/// GET /api/admin/appointments — list with optional status/date-range filters.
pub async fn list_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<ApiResponse<Vec<Appointment>>>, AppError> {
    auth::require_admin(&headers, &state.session_secret)?;

    let status = parse_status_filter(query.status.as_deref())?;
    let appointments = store::list_appointments(
        &state.db,
        status,
        query.from.as_deref(),
        query.to.as_deref(),
    )
    .await?;

    Ok(Json(ApiResponse::success(appointments)))
}

/// GET /api/admin/appointments/{id}
pub async fn get_appointment(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Appointment>>, AppError> {
    auth::require_admin(&headers, &state.session_secret)?;

    let appointment = store::get_appointment(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(ApiResponse::success(appointment)))
}

/// PUT /api/admin/appointments/{id}/status — advance the lifecycle.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    auth::require_admin(&headers, &state.session_secret)?;

    let requested = AppointmentStatus::parse(&body.status)
        .ok_or_else(|| AppError::validation("無效的狀態。"))?;

    let appointment = store::get_appointment(&state.db, &id)
        .await?
        .ok_or(AppError::NotFound)?;

    if !appointment.status.can_transition_to(requested) {
        return Err(AppError::validation(format!(
            "無法將狀態從「{}」變更為「{}」。",
            appointment.status.label(),
            requested.label()
        )));
    }

    store::update_appointment_status(&state.db, &id, requested)
        .await
        .map_err(AppError::persistence("狀態更新失敗。"))?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "狀態更新成功！".into(),
    })))
}

// ── Settings ──

/// GET /api/admin/settings
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Settings>>, AppError> {
    auth::require_admin(&headers, &state.session_secret)?;

    let settings = store::read_settings(&state.db).await?;
    Ok(Json(ApiResponse::success(settings)))
}

/// PUT /api/admin/settings — validate and fully replace the settings document.
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<UpdateSettingsRequest>,
) -> Result<Json<ApiResponse<UpdateSettingsResponse>>, AppError> {
    auth::require_admin(&headers, &state.session_secret)?;

    let settings = validate::validate_settings(&body)?;
    store::write_settings(&state.db, &settings)
        .await
        .map_err(AppError::persistence("設定更新失敗，請稍後再試。"))?;

    Ok(Json(ApiResponse::success(UpdateSettingsResponse {
        message: "設定已成功更新！".into(),
        settings,
    })))
}

// ── Notifications ──

/// POST /api/admin/notifications/test — fire a test message at the webhook.
///
/// Failures come back as a 200 with `ok: false` so the dashboard can show the
/// diagnostic text as-is.
pub async fn test_notification(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<MessageResponse>>, AppError> {
    auth::require_admin(&headers, &state.session_secret)?;

    match notify::send_test_notification(&state.http, &state.webhook_url).await {
        Ok(message) => Ok(Json(ApiResponse::success(MessageResponse { message }))),
        Err(e) => Ok(Json(ApiResponse::error(e.to_string()))),
    }
}

// ── Tests ──
