use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{post_json_with_retry, AlertEvent, Notifier};

const API_BASE: &str = "https://api.telegram.org";

#[derive(Clone)]
pub struct TelegramNotifier {
    token: String,
    chat_id: String,
    api_base: String,
    client: Client,
    timeout: Duration,
    attempts: u8,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: String) -> Self {
        Self {
            token,
            chat_id,
            api_base: API_BASE.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(5),
            attempts: 3,
        }
    }

    /// `None` unless both TELEGRAM_BOT_TOKEN and TELEGRAM_CHAT_ID are set.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok()?;
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok()?;
        if token.trim().is_empty() || chat_id.trim().is_empty() {
            return None;
        }
        Some(Self::new(token, chat_id))
    }

    /// Point at another Bot API host (tests, self-hosted bot API).
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.api_base.trim_end_matches('/'),
            self.token
        )
    }
}

/// Markdown body of a full-bin alert.
pub fn format_message(ev: &AlertEvent) -> String {
    format!(
        "🚨 *BIN FULL ALERT* 🚨\n\n\
         🗑 Bin ID: `{}`\n\
         📊 Fill Level: {}%\n\
         📍 Location: {}\n\n\
         Please schedule collection.",
        ev.device_id,
        ev.fill_percentage,
        ev.maps_url()
    )
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, ev: &AlertEvent) -> Result<()> {
        let payload = SendMessage {
            chat_id: &self.chat_id,
            text: format_message(ev),
            parse_mode: "Markdown",
        };
        post_json_with_retry(
            &self.client,
            &self.endpoint(),
            &payload,
            self.timeout,
            self.attempts,
            self.name(),
        )
        .await
    }

    fn name(&self) -> &'static str {
        "telegram"
    }
}
