//! Narrow persistence interface over SQLite.
//!
//! Appointments live in a plain table; settings live as a single JSON document
//! row that is fully replaced on write and merged with defaults on read.

use chrono::{FixedOffset, Utc};
use serde::Deserialize;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::models::{Appointment, AppointmentStatus, Settings, TimeSlotSettings};
use crate::validate::BookingData;

/// Taipei timezone offset (UTC+8).
const TAIPEI_OFFSET_SECS: i32 = 8 * 3600;

fn taipei_now() -> chrono::DateTime<FixedOffset> {
    let tz = FixedOffset::east_opt(TAIPEI_OFFSET_SECS).unwrap();
    Utc::now().with_timezone(&tz)
}

const APPOINTMENT_SELECT: &str =
    "SELECT id, name, email, phone, date, time, service, status, created_at FROM appointments";

// ── Appointments ──

/// All appointments, newest first (date desc, time desc), with optional
/// status and date-range filters for the admin dashboard.
pub async fn list_appointments(
    pool: &SqlitePool,
    status: Option<AppointmentStatus>,
    from: Option<&str>,
    to: Option<&str>,
) -> sqlx::Result<Vec<Appointment>> {
    let mut sql = format!("{} WHERE 1=1", APPOINTMENT_SELECT);
    if status.is_some() {
        sql.push_str(" AND status = ?");
    }
    if from.is_some() {
        sql.push_str(" AND date >= ?");
    }
    if to.is_some() {
        sql.push_str(" AND date <= ?");
    }
    sql.push_str(" ORDER BY date DESC, time DESC");

    let mut query = sqlx::query_as::<_, Appointment>(&sql);
    if let Some(status) = status {
        query = query.bind(status);
    }
    if let Some(from) = from {
        query = query.bind(from.to_string());
    }
    if let Some(to) = to {
        query = query.bind(to.to_string());
    }
    query.fetch_all(pool).await
}

/// Appointments for one calendar date, in slot order. No status filter: a
/// canceled appointment still occupies its time label, matching how the
/// booking page has always displayed that day.
pub async fn list_appointments_for_date(
    pool: &SqlitePool,
    date: &str,
) -> sqlx::Result<Vec<Appointment>> {
    let sql = format!("{} WHERE date = ? ORDER BY time ASC", APPOINTMENT_SELECT);
    sqlx::query_as::<_, Appointment>(&sql)
        .bind(date)
        .fetch_all(pool)
        .await
}

pub async fn get_appointment(pool: &SqlitePool, id: &str) -> sqlx::Result<Option<Appointment>> {
    let sql = format!("{} WHERE id = ?", APPOINTMENT_SELECT);
    sqlx::query_as::<_, Appointment>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Insert a validated booking. The store assigns the id, the pending status
/// and the creation timestamp; the id never changes afterwards.
pub async fn insert_appointment(
    pool: &SqlitePool,
    data: &BookingData,
) -> sqlx::Result<Appointment> {
    let id = Uuid::new_v4().to_string();
    let created_at = taipei_now().format("%Y-%m-%d %H:%M:%S").to_string();

    sqlx::query(
        "INSERT INTO appointments (id, name, email, phone, date, time, service, status, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&data.name)
    .bind(&data.email)
    .bind(&data.phone)
    .bind(&data.date)
    .bind(&data.time)
    .bind(&data.service)
    .bind(AppointmentStatus::Pending)
    .bind(&created_at)
    .execute(pool)
    .await?;

    Ok(Appointment {
        id,
        name: data.name.clone(),
        email: data.email.clone(),
        phone: data.phone.clone(),
        date: data.date.clone(),
        time: data.time.clone(),
        service: data.service.clone(),
        status: AppointmentStatus::Pending,
        created_at,
    })
}

/// Persist a status change. A missing row and a transient failure surface as
/// the same error; callers report one generic update-failed condition.
pub async fn update_appointment_status(
    pool: &SqlitePool,
    id: &str,
    status: AppointmentStatus,
) -> sqlx::Result<()> {
    let result = sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
        .bind(status)
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() == 0 {
        return Err(sqlx::Error::RowNotFound);
    }
    Ok(())
}

// ── Settings document ──

/// Loose mirror of the stored settings document. Every field is optional so a
/// partial or older document still reads cleanly.
#[derive(Debug, Default, Deserialize)]
struct StoredSettings {
    #[serde(default)]
    store_name: Option<String>,
    #[serde(default)]
    time_slots: Option<StoredTimeSlots>,
    #[serde(default)]
    services: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct StoredTimeSlots {
    #[serde(default)]
    start_time: Option<String>,
    #[serde(default)]
    end_time: Option<String>,
    #[serde(default)]
    interval: Option<i64>,
}

/// The single place defaults are substituted: missing, empty or zero fields
/// fall back per-field so consumers always see a complete value.
fn merge_with_defaults(stored: StoredSettings) -> Settings {
    let defaults = Settings::default();
    let time_slots = stored.time_slots.unwrap_or_default();
    Settings {
        store_name: stored
            .store_name
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.store_name),
        time_slots: TimeSlotSettings {
            start_time: time_slots
                .start_time
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.time_slots.start_time),
            end_time: time_slots
                .end_time
                .filter(|s| !s.is_empty())
                .unwrap_or(defaults.time_slots.end_time),
            interval: time_slots
                .interval
                .filter(|n| *n > 0)
                .unwrap_or(defaults.time_slots.interval),
        },
        services: stored
            .services
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.services),
    }
}

/// Current settings, with defaults for anything absent. Never fails the
/// caller over a malformed document.
pub async fn read_settings(pool: &SqlitePool) -> sqlx::Result<Settings> {
    let doc: Option<String> = sqlx::query_scalar("SELECT doc FROM settings WHERE id = 1")
        .fetch_optional(pool)
        .await?;

    Ok(match doc {
        Some(raw) => match serde_json::from_str::<StoredSettings>(&raw) {
            Ok(stored) => merge_with_defaults(stored),
            Err(e) => {
                tracing::warn!("settings document unreadable, serving defaults: {}", e);
                Settings::default()
            }
        },
        None => Settings::default(),
    })
}

/// Replace the settings document wholesale. Partial patches do not exist.
pub async fn write_settings(pool: &SqlitePool, settings: &Settings) -> sqlx::Result<()> {
    let doc = serde_json::to_string(settings).map_err(|e| sqlx::Error::Encode(e.into()))?;
    sqlx::query(
        "INSERT INTO settings (id, doc) VALUES (1, ?)
         ON CONFLICT(id) DO UPDATE SET doc = excluded.doc",
    )
    .bind(doc)
    .execute(pool)
    .await?;
    Ok(())
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    /// In-memory pool capped at one connection so every query sees the same db.
    async fn test_pool() -> SqlitePool {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::run_migrations(&pool).await.unwrap();
        pool
    }

    fn booking(date: &str, time: &str) -> BookingData {
        BookingData {
            name: "王小明".into(),
            email: "a@b.com".into(),
            phone: "0912345678".into(),
            date: date.into(),
            time: time.into(),
            service: "視力專業諮詢".into(),
        }
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_pending_status() {
        let pool = test_pool().await;
        let apt = insert_appointment(&pool, &booking("2025-03-01", "10:00"))
            .await
            .unwrap();

        assert!(!apt.id.is_empty());
        assert_eq!(apt.status, AppointmentStatus::Pending);
        assert!(!apt.created_at.is_empty());

        let fetched = get_appointment(&pool, &apt.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "王小明");
        assert_eq!(fetched.status, AppointmentStatus::Pending);
        assert_eq!(fetched.date, "2025-03-01");
        assert_eq!(fetched.time, "10:00");
    }

    #[tokio::test]
    async fn test_get_missing_appointment_is_absent() {
        let pool = test_pool().await;
        assert!(get_appointment(&pool, "no-such-id").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_status_update_visible_via_get() {
        let pool = test_pool().await;
        let apt = insert_appointment(&pool, &booking("2025-03-01", "10:00"))
            .await
            .unwrap();

        update_appointment_status(&pool, &apt.id, AppointmentStatus::Canceled)
            .await
            .unwrap();

        let fetched = get_appointment(&pool, &apt.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, AppointmentStatus::Canceled);
    }

    #[tokio::test]
    async fn test_status_update_missing_row_fails() {
        let pool = test_pool().await;
        let err = update_appointment_status(&pool, "ghost", AppointmentStatus::Confirmed).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn test_list_sorted_date_desc_time_desc() {
        let pool = test_pool().await;
        insert_appointment(&pool, &booking("2025-03-01", "10:00")).await.unwrap();
        insert_appointment(&pool, &booking("2025-03-02", "09:00")).await.unwrap();
        insert_appointment(&pool, &booking("2025-03-02", "15:30")).await.unwrap();

        let all = list_appointments(&pool, None, None, None).await.unwrap();
        let keys: Vec<(String, String)> =
            all.iter().map(|a| (a.date.clone(), a.time.clone())).collect();
        assert_eq!(
            keys,
            vec![
                ("2025-03-02".into(), "15:30".into()),
                ("2025-03-02".into(), "09:00".into()),
                ("2025-03-01".into(), "10:00".into()),
            ]
        );
    }

    #[tokio::test]
    async fn test_list_status_and_range_filters() {
        let pool = test_pool().await;
        let a = insert_appointment(&pool, &booking("2025-03-01", "10:00")).await.unwrap();
        insert_appointment(&pool, &booking("2025-03-05", "11:00")).await.unwrap();
        insert_appointment(&pool, &booking("2025-03-10", "12:00")).await.unwrap();

        update_appointment_status(&pool, &a.id, AppointmentStatus::Confirmed)
            .await
            .unwrap();

        let confirmed = list_appointments(&pool, Some(AppointmentStatus::Confirmed), None, None)
            .await
            .unwrap();
        assert_eq!(confirmed.len(), 1);
        assert_eq!(confirmed[0].id, a.id);

        let ranged = list_appointments(&pool, None, Some("2025-03-02"), Some("2025-03-09"))
            .await
            .unwrap();
        assert_eq!(ranged.len(), 1);
        assert_eq!(ranged[0].date, "2025-03-05");
    }

    #[tokio::test]
    async fn test_list_for_date_includes_canceled() {
        let pool = test_pool().await;
        let a = insert_appointment(&pool, &booking("2025-03-01", "10:00")).await.unwrap();
        insert_appointment(&pool, &booking("2025-03-01", "11:00")).await.unwrap();
        insert_appointment(&pool, &booking("2025-03-02", "10:00")).await.unwrap();

        update_appointment_status(&pool, &a.id, AppointmentStatus::Canceled)
            .await
            .unwrap();

        let day = list_appointments_for_date(&pool, "2025-03-01").await.unwrap();
        let times: Vec<&str> = day.iter().map(|a| a.time.as_str()).collect();
        assert_eq!(times, vec!["10:00", "11:00"]);
    }

    #[tokio::test]
    async fn test_settings_default_when_absent() {
        let pool = test_pool().await;
        let settings = read_settings(&pool).await.unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[tokio::test]
    async fn test_settings_round_trip_preserves_service_order() {
        let pool = test_pool().await;
        let custom = Settings {
            store_name: "視光中心".into(),
            time_slots: TimeSlotSettings {
                start_time: "09:00".into(),
                end_time: "18:00".into(),
                interval: 15,
            },
            services: vec!["Z 服務".into(), "A 服務".into(), "M 服務".into()],
        };

        write_settings(&pool, &custom).await.unwrap();
        let read_back = read_settings(&pool).await.unwrap();
        assert_eq!(read_back, custom);

        // Second write fully replaces the first
        let replacement = Settings {
            services: vec!["唯一服務".into()],
            ..custom
        };
        write_settings(&pool, &replacement).await.unwrap();
        assert_eq!(read_settings(&pool).await.unwrap(), replacement);
    }

    #[tokio::test]
    async fn test_settings_malformed_document_serves_defaults() {
        let pool = test_pool().await;
        sqlx::query("INSERT INTO settings (id, doc) VALUES (1, 'not json')")
            .execute(&pool)
            .await
            .unwrap();
        assert_eq!(read_settings(&pool).await.unwrap(), Settings::default());
    }

    // ── merge_with_defaults ──

    #[test]
    fn test_merge_empty_document() {
        assert_eq!(merge_with_defaults(StoredSettings::default()), Settings::default());
    }

    #[test]
    fn test_merge_keeps_present_fields() {
        let stored = StoredSettings {
            store_name: Some("新視界".into()),
            time_slots: Some(StoredTimeSlots {
                start_time: Some("08:00".into()),
                end_time: None,
                interval: Some(20),
            }),
            services: None,
        };
        let merged = merge_with_defaults(stored);
        assert_eq!(merged.store_name, "新視界");
        assert_eq!(merged.time_slots.start_time, "08:00");
        assert_eq!(merged.time_slots.end_time, "22:00");
        assert_eq!(merged.time_slots.interval, 20);
        assert_eq!(merged.services, crate::models::default_services());
    }

    #[test]
    fn test_merge_empty_and_zero_fields_fall_back() {
        let stored = StoredSettings {
            store_name: Some(String::new()),
            time_slots: Some(StoredTimeSlots {
                start_time: Some(String::new()),
                end_time: Some("20:00".into()),
                interval: Some(0),
            }),
            services: Some(vec![]),
        };
        let merged = merge_with_defaults(stored);
        assert_eq!(merged.store_name, "視光預約系統");
        assert_eq!(merged.time_slots.start_time, "10:00");
        assert_eq!(merged.time_slots.end_time, "20:00");
        assert_eq!(merged.time_slots.interval, 30);
        assert_eq!(merged.services, crate::models::default_services());
    }
}
