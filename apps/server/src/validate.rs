use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

use crate::models::{CreateAppointmentRequest, Settings, TimeSlotSettings, UpdateSettingsRequest};

/// A user-correctable input failure. Carries the first failing field's
/// localized message; callers surface it verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

static TIME_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([0-1]?[0-9]|2[0-3]):[0-5][0-9]$").unwrap());

static EMAIL_FORMAT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

fn fail(msg: &str) -> ValidationError {
    ValidationError(msg.to_string())
}

fn trimmed(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Zero-pad a single-digit hour ("9:30" → "09:30") so HH:MM strings compare
/// chronologically. Input has already passed `TIME_FORMAT`.
fn normalize_time(time: &str) -> String {
    match time.split_once(':') {
        Some((h, m)) if h.len() == 1 => format!("0{h}:{m}"),
        _ => time.to_string(),
    }
}

// ── Appointment Validator ──

/// A booking submission that passed validation, fields normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct BookingData {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub service: String,
}

/// Validate a raw booking submission against the configured service list.
///
/// All-or-nothing: the first failing field wins, checked in the fixed order
/// date, time, service, name, email, phone.
pub fn validate_booking(
    req: &CreateAppointmentRequest,
    services: &[String],
) -> Result<BookingData, ValidationError> {
    let date = trimmed(&req.date).ok_or_else(|| fail("請選擇日期。"))?;
    let time = trimmed(&req.time).ok_or_else(|| fail("請選擇時間。"))?;

    let service = trimmed(&req.service).ok_or_else(|| fail("請選擇服務項目。"))?;
    if !services.iter().any(|s| s == service) {
        return Err(fail("請選擇有效的服務項目。"));
    }

    let name = trimmed(&req.name).ok_or_else(|| fail("姓名至少需要2個字元。"))?;
    if name.chars().count() < 2 {
        return Err(fail("姓名至少需要2個字元。"));
    }

    let email = trimmed(&req.email).ok_or_else(|| fail("請輸入有效的電子郵件。"))?;
    if !EMAIL_FORMAT.is_match(email) {
        return Err(fail("請輸入有效的電子郵件。"));
    }

    let phone = trimmed(&req.phone).ok_or_else(|| fail("請輸入有效的電話號碼。"))?;
    if phone.chars().count() < 8 {
        return Err(fail("請輸入有效的電話號碼。"));
    }

    Ok(BookingData {
        name: name.to_string(),
        email: email.to_string(),
        phone: phone.to_string(),
        date: date.to_string(),
        time: time.to_string(),
        service: service.to_string(),
    })
}

// ── Settings Validator ──

/// Validate a settings edit and build the fully-replacing `Settings` value.
///
/// Field order: store_name, start_time, end_time, interval, services; then the
/// start-before-end cross check; then the non-empty-after-filtering check on
/// the newline-split service list. Times are normalized to zero-padded HH:MM
/// before the cross check and in the returned value.
pub fn validate_settings(req: &UpdateSettingsRequest) -> Result<Settings, ValidationError> {
    let store_name = trimmed(&req.store_name).ok_or_else(|| fail("店家名稱不能為空。"))?;

    let start_time = trimmed(&req.start_time)
        .filter(|t| TIME_FORMAT.is_match(t))
        .map(normalize_time)
        .ok_or_else(|| fail("請輸入有效的開始時間 (HH:MM)。"))?;
    let end_time = trimmed(&req.end_time)
        .filter(|t| TIME_FORMAT.is_match(t))
        .map(normalize_time)
        .ok_or_else(|| fail("請輸入有效的結束時間 (HH:MM)。"))?;

    let interval: i64 = trimmed(&req.interval)
        .and_then(|raw| raw.parse().ok())
        .filter(|n| *n >= 5)
        .ok_or_else(|| fail("時間間隔至少為5分鐘。"))?;

    let services_raw = req
        .services
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| fail("請至少設定一個服務項目。"))?;

    // Both times are zero-padded HH:MM here, so lexicographic comparison is
    // chronological.
    if start_time >= end_time {
        return Err(fail("結束時間必須晚於開始時間。"));
    }

    let services: Vec<String> = services_raw
        .lines()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if services.is_empty() {
        return Err(fail("請至少提供一個有效的服務項目。"));
    }

    Ok(Settings {
        store_name: store_name.to_string(),
        time_slots: TimeSlotSettings {
            start_time,
            end_time,
            interval,
        },
        services,
    })
}

// ── Tests ──
