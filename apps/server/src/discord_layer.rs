//! Custom tracing layer that forwards ERROR-level events to the Discord
//! webhook, so the administrator hears about server-side failures without
//! watching the logs.
//!
//! - Rate limiting: at most one message per `MIN_INTERVAL`
//! - Deduplication: identical messages suppressed for `DEDUP_WINDOW`
//! - Non-blocking: webhook calls are spawned onto the Tokio runtime

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Minimum interval between webhook messages (prevents spam on cascading errors).
const MIN_INTERVAL: Duration = Duration::from_secs(10);
/// Window during which identical error hashes are suppressed.
const DEDUP_WINDOW: Duration = Duration::from_secs(60);

// ── Layer ──

pub struct DiscordLayer {
    webhook_url: String,
    http: reqwest::Client,
    state: Mutex<LayerState>,
}

struct LayerState {
    last_sent: Instant,
    /// (hash, inserted_at) of recently sent error messages.
    recent: Vec<(u64, Instant)>,
}

impl DiscordLayer {
    pub fn new(webhook_url: String, http: reqwest::Client) -> Self {
        Self {
            webhook_url,
            http,
            state: Mutex::new(LayerState {
                last_sent: Instant::now() - MIN_INTERVAL, // allow first message immediately
                recent: Vec::new(),
            }),
        }
    }

    /// Rate-limit + dedup gate. Updates internal state when it says yes.
    fn should_send(&self, hash: u64) -> bool {
        let mut state = self.state.lock().unwrap();
        let now = Instant::now();

        state
            .recent
            .retain(|(_, ts)| now.duration_since(*ts) < DEDUP_WINDOW);

        let is_dup = state.recent.iter().any(|(h, _)| *h == hash);
        let too_soon = now.duration_since(state.last_sent) < MIN_INTERVAL;
        if is_dup || too_soon {
            return false;
        }

        state.last_sent = now;
        state.recent.push((hash, now));
        true
    }
}

impl<S: Subscriber> Layer<S> for DiscordLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != Level::ERROR {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let message = visitor.message();

        let hash = {
            let mut h = DefaultHasher::new();
            message.hash(&mut h);
            h.finish()
        };
        if !self.should_send(hash) {
            return;
        }

        let target = event.metadata().target();
        let file = event.metadata().file().unwrap_or("?");
        let line = event
            .metadata()
            .line()
            .map(|l| l.to_string())
            .unwrap_or_else(|| "?".into());

        let payload = serde_json::json!({
            "username": "伺服器監控",
            "embeds": [{
                "color": 0xE74C3C,
                "title": "🚨 伺服器錯誤",
                "description": format!("```{}```", message),
                "fields": [
                    { "name": "位置", "value": format!("{} ({}:{})", target, file, line), "inline": false },
                ],
                "timestamp": chrono::Utc::now().to_rfc3339(),
            }],
        });

        let url = self.webhook_url.clone();
        let client = self.http.clone();
        tokio::spawn(async move {
            let _ = client.post(&url).json(&payload).send().await;
        });
    }
}

// ── Field visitor ──

/// Collects the `message` field plus any structured fields from an event.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<(String, String)>,
}

impl MessageVisitor {
    fn message(&self) -> String {
        if self.fields.is_empty() {
            return self.message.clone();
        }
        let extras: Vec<String> = self
            .fields
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect();
        if self.message.is_empty() {
            extras.join(", ")
        } else {
            format!("{} ({})", self.message, extras.join(", "))
        }
    }

    fn record(&mut self, field: &Field, value: String) {
        if field.name() == "message" {
            self.message = value;
        } else {
            self.fields.push((field.name().to_string(), value));
        }
    }
}

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field, value.to_string());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.record(field, value.to_string());
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.record(field, value.to_string());
    }
}

// ── Tests ──
