//! Discord webhook notifications.
//!
//! The new-appointment notification is strictly best-effort: it runs after the
//! booking has been persisted and any failure is logged, never surfaced to the
//! customer. Only the admin-triggered test notification reports failures, and
//! it distinguishes not-configured / network / rejected.

use std::time::Duration;
use thiserror::Error;

use crate::validate::BookingData;

/// Bound on every webhook call so a slow Discord endpoint cannot stall the
/// booking response. Applied to the shared client at construction.
pub const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("錯誤：在伺服器上找不到 DISCORD_WEBHOOK_URL。請確認 .env 檔案已設定且伺服器已重啟。")]
    NotConfigured,
    #[error("傳送失敗，發生網路錯誤: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Discord 伺服器錯誤 (狀態碼 {status}): {body}")]
    Rejected { status: u16, body: String },
}

/// Notify the Discord channel about a freshly created appointment.
///
/// Skips silently when no webhook is configured; logs and returns on failure.
pub async fn notify_new_appointment(
    client: &reqwest::Client,
    webhook_url: &str,
    details: &BookingData,
    store_name: &str,
) {
    if webhook_url.is_empty() {
        tracing::info!("Discord notification skipped: webhook URL not configured");
        return;
    }

    let embed = serde_json::json!({
        "color": 0x5865F2,
        "title": "🎉 新預約通知！",
        "description": "後台系統收到一筆新的預約，請儘速登入確認。",
        "fields": [
            { "name": "👤 顧客姓名", "value": details.name, "inline": true },
            { "name": "📅 預約日期", "value": details.date, "inline": true },
            { "name": "⏰ 預約時間", "value": details.time, "inline": true },
            { "name": "📞 聯絡電話", "value": details.phone, "inline": true },
            { "name": "🛠️ 服務項目", "value": details.service, "inline": false },
        ],
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "footer": { "text": store_name },
    });

    let result = client
        .post(webhook_url)
        .json(&serde_json::json!({
            "username": "預約通知機器人",
            "embeds": [embed],
        }))
        .send()
        .await;

    match result {
        Ok(resp) if !resp.status().is_success() => {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            tracing::error!(
                "Discord notification rejected: status={} body={}",
                status,
                body
            );
        }
        Err(e) => tracing::error!("Failed to send Discord notification: {}", e),
        Ok(_) => {}
    }
}

/// Admin connectivity check. Unlike the booking notification this reports
/// exactly what went wrong.
pub async fn send_test_notification(
    client: &reqwest::Client,
    webhook_url: &str,
) -> Result<String, NotifyError> {
    if webhook_url.is_empty() {
        return Err(NotifyError::NotConfigured);
    }

    let embed = serde_json::json!({
        "color": 0x3498DB,
        "title": "✅ 測試通知",
        "description": "這是一則從您的預約系統發送的測試訊息。如果您能看到這個，表示您的 Discord Webhook 設定正確！",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "footer": { "text": "視光預約系統 - 測試模式" },
    });

    let resp = client
        .post(webhook_url)
        .json(&serde_json::json!({
            "username": "測試機器人",
            "embeds": [embed],
        }))
        .send()
        .await?;

    if resp.status().is_success() {
        Ok("測試通知已成功發送！請檢查您的 Discord 頻道。".into())
    } else {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(NotifyError::Rejected { status, body })
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_webhook_is_not_configured_error() {
        let client = reqwest::Client::new();
        let err = send_test_notification(&client, "").await.unwrap_err();
        assert!(matches!(err, NotifyError::NotConfigured));
        assert!(err.to_string().contains("DISCORD_WEBHOOK_URL"));
    }

    #[test]
    fn test_rejected_message_carries_status_and_body() {
        let err = NotifyError::Rejected {
            status: 400,
            body: "{\"message\": \"Invalid Webhook Token\"}".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("狀態碼 400"));
        assert!(msg.contains("Invalid Webhook Token"));
    }
}
