use serde::{Deserialize, Serialize};

// ── Appointment lifecycle ──

/// Appointment status. Transitions go through `can_transition_to`; everything
/// else in the codebase treats the status as read-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Canceled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Canceled => "canceled",
        }
    }

    /// Display label used in admin-facing messages.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Pending => "待處理",
            Self::Confirmed => "已確認",
            Self::Completed => "已完成",
            Self::Canceled => "已取消",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "completed" => Some(Self::Completed),
            "canceled" => Some(Self::Canceled),
            _ => None,
        }
    }

    /// The legal lifecycle: pending → confirmed/canceled,
    /// confirmed → completed/canceled; completed and canceled are terminal.
    pub fn can_transition_to(self, next: AppointmentStatus) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Confirmed)
                | (Pending, Canceled)
                | (Confirmed, Completed)
                | (Confirmed, Canceled)
        )
    }
}

// ── Database models ──

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub date: String,
    pub time: String,
    pub service: String,
    pub status: AppointmentStatus,
    pub created_at: String,
}

// ── Settings ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSlotSettings {
    pub start_time: String,
    pub end_time: String,
    pub interval: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    pub store_name: String,
    pub time_slots: TimeSlotSettings,
    pub services: Vec<String>,
}

pub fn default_services() -> Vec<String> {
    vec![
        "配鏡服務 (新配眼鏡、度數調整)".into(),
        "隱形眼鏡諮詢/驗配".into(),
        "視力專業諮詢".into(),
        "眼鏡維修/調整".into(),
        "兒童視力檢查".into(),
    ]
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_name: "視光預約系統".into(),
            time_slots: TimeSlotSettings {
                start_time: "10:00".into(),
                end_time: "22:00".into(),
                interval: 30,
            },
            services: default_services(),
        }
    }
}

// ── API request/response types ──

/// Raw booking submission. Everything is optional so the validator can report
/// missing fields with its own messages instead of a deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct CreateAppointmentRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub service: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub date: String,
    pub available: Vec<String>,
    pub booked: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// Raw settings form. `interval` arrives as text and is coerced by the
/// validator; `services` is one service per line.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateSettingsRequest {
    #[serde(default)]
    pub store_name: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub interval: Option<String>,
    #[serde(default)]
    pub services: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct CreateAppointmentResponse {
    pub message: String,
    pub appointment: Appointment,
}

#[derive(Debug, Serialize)]
pub struct UpdateSettingsResponse {
    pub message: String,
    pub settings: Settings,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

// ── Tests ──
