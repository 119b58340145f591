//! Public, unauthenticated endpoints: store settings, day availability and
//! booking creation.

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::error::AppError;
use crate::models::{
    ApiResponse, AvailabilityQuery, AvailabilityResponse, CreateAppointmentRequest,
    CreateAppointmentResponse, Settings,
};
use crate::{notify, slots, store, validate, AppState};

/// GET /api/settings — public view of the store configuration.
pub async fn get_settings(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ApiResponse<Settings>>, AppError> {
    let settings = store::read_settings(&state.db).await?;
    Ok(Json(ApiResponse::success(settings)))
}

/// GET /api/availability?date=YYYY-MM-DD — slot labels for one day, split into
/// available and booked.
pub async fn availability(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<ApiResponse<AvailabilityResponse>>, AppError> {
    let date = query.date.trim();
    if NaiveDate::parse_from_str(date, "%Y-%m-%d").is_err() {
        return Err(AppError::validation("日期格式不正確。"));
    }

    let settings = store::read_settings(&state.db).await?;
    let all_slots = slots::generate_slots(
        &settings.time_slots.start_time,
        &settings.time_slots.end_time,
        settings.time_slots.interval,
    );

    let booked_times: Vec<String> = store::list_appointments_for_date(&state.db, date)
        .await?
        .into_iter()
        .map(|apt| apt.time)
        .collect();

    let partition = slots::partition_slots(&all_slots, &booked_times);

    Ok(Json(ApiResponse::success(AvailabilityResponse {
        date: date.to_string(),
        available: partition.available,
        booked: partition.booked,
    })))
}

/// POST /api/appointments — create a booking.
///
/// Validation runs against the currently configured service list. The Discord
/// notification fires only after the row is persisted and never affects the
/// response.
pub async fn create_appointment(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAppointmentRequest>,
) -> Result<Json<ApiResponse<CreateAppointmentResponse>>, AppError> {
    let settings = store::read_settings(&state.db).await?;
    let booking = validate::validate_booking(&body, &settings.services)?;

    let appointment = store::insert_appointment(&state.db, &booking)
        .await
        .map_err(AppError::persistence("預約失敗，請稍後再試。"))?;

    notify::notify_new_appointment(
        &state.http,
        &state.webhook_url,
        &booking,
        &settings.store_name,
    )
    .await;

    Ok(Json(ApiResponse::success(CreateAppointmentResponse {
        message: "預約成功！".into(),
        appointment,
    })))
}
