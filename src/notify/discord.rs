use anyhow::Result;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use super::{post_json_with_retry, AlertEvent, Notifier};

/// Embed side bar colour (red).
const ALERT_COLOR: u32 = 0xE7_4C_3C;

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
    timeout: Duration,
    attempts: u8,
}

impl DiscordNotifier {
    pub fn new(webhook: String) -> Self {
        Self {
            webhook,
            client: Client::new(),
            timeout: Duration::from_secs(5),
            attempts: 3,
        }
    }

    /// `None` unless DISCORD_WEBHOOK_URL is set and non-empty.
    pub fn from_env() -> Option<Self> {
        std::env::var("DISCORD_WEBHOOK_URL")
            .ok()
            .filter(|u| !u.trim().is_empty())
            .map(Self::new)
    }

    pub fn with_attempts(mut self, attempts: u8) -> Self {
        self.attempts = attempts.max(1);
        self
    }
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: &'static str,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    url: String,
    color: u32,
    timestamp: String,
    fields: Vec<EmbedField>,
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    embeds: Vec<Embed>,
}

fn payload(ev: &AlertEvent) -> WebhookPayload {
    let field = |name: &'static str, value: String| EmbedField {
        name,
        value,
        inline: true,
    };
    WebhookPayload {
        embeds: vec![Embed {
            title: format!("Bin full: {}", ev.device_id),
            url: ev.maps_url(),
            color: ALERT_COLOR,
            timestamp: ev.ts.to_rfc3339(),
            fields: vec![
                field("Fill level", format!("{}%", ev.fill_percentage)),
                field("Location", format!("{:.5}, {:.5}", ev.latitude, ev.longitude)),
            ],
        }],
    }
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, ev: &AlertEvent) -> Result<()> {
        post_json_with_retry(
            &self.client,
            &self.webhook,
            &payload(ev),
            self.timeout,
            self.attempts,
            self.name(),
        )
        .await
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}
