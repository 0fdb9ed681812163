// src/notify/mod.rs
//! Full-bin alert fan-out. Each channel is enabled by its env vars; a missing
//! channel is skipped, a failing channel is logged and never blocks the others.

pub mod antiflutter;
pub mod discord;
pub mod email;
pub mod telegram;

use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use metrics::counter;
use reqwest::Client;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

use self::discord::DiscordNotifier;
use self::email::EmailSender;
use self::telegram::TelegramNotifier;

/// A bin crossed from not-full to full.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub device_id: String,
    pub fill_percentage: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub ts: DateTime<Utc>,
}

impl AlertEvent {
    pub fn maps_url(&self) -> String {
        format!(
            "https://maps.google.com/?q={},{}",
            self.latitude, self.longitude
        )
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, ev: &AlertEvent) -> Result<()>;
    fn name(&self) -> &'static str;
}

#[derive(Clone, Default)]
pub struct NotifierMux {
    channels: Vec<Arc<dyn Notifier>>,
}

impl NotifierMux {
    /// Mux with every channel whose configuration is present in the env.
    pub fn from_env() -> Self {
        let mut mux = Self::default();
        if let Some(t) = TelegramNotifier::from_env() {
            mux = mux.with(t);
        } else {
            tracing::debug!(target: "alerts", "Telegram disabled (no TELEGRAM_BOT_TOKEN/TELEGRAM_CHAT_ID)");
        }
        if let Some(d) = DiscordNotifier::from_env() {
            mux = mux.with(d);
        } else {
            tracing::debug!(target: "alerts", "Discord disabled (no DISCORD_WEBHOOK_URL)");
        }
        match EmailSender::from_env() {
            Ok(Some(e)) => mux = mux.with(e),
            Ok(None) => tracing::debug!(target: "alerts", "email disabled (no SMTP_HOST)"),
            Err(e) => tracing::warn!(target: "alerts", "email disabled: {e:#}"),
        }
        mux
    }

    pub fn with<N: Notifier + 'static>(mut self, n: N) -> Self {
        self.channels.push(Arc::new(n));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Send to every channel; returns how many succeeded.
    pub async fn notify(&self, ev: &AlertEvent) -> usize {
        let mut ok = 0usize;
        for ch in &self.channels {
            match ch.send(ev).await {
                Ok(()) => {
                    ok += 1;
                    counter!("bin_alerts_sent_total", "channel" => ch.name()).increment(1);
                }
                Err(e) => {
                    tracing::warn!(
                        target: "alerts",
                        channel = ch.name(),
                        device = %ev.device_id,
                        "alert send failed: {e:#}"
                    );
                    counter!("bin_alert_errors_total", "channel" => ch.name()).increment(1);
                }
            }
        }
        ok
    }
}

/// POST a JSON body, retrying with exponential backoff (500 ms, 1 s, 2 s, ...)
/// on transport errors and non-2xx replies. `attempts` is at least 1.
pub(crate) async fn post_json_with_retry<T: Serialize + ?Sized>(
    client: &Client,
    url: &str,
    body: &T,
    timeout: Duration,
    attempts: u8,
    channel: &'static str,
) -> Result<()> {
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        let err = match client.post(url).timeout(timeout).json(body).send().await {
            Ok(rsp) => match rsp.error_for_status() {
                Ok(_) => return Ok(()),
                Err(e) => anyhow!("{channel} HTTP error: {e}"),
            },
            Err(e) => anyhow!("{channel} request failed: {e}"),
        };
        tracing::debug!(target: "alerts", channel, attempt, "send attempt failed: {err}");
        last_err = Some(err);
        if attempt < attempts {
            tokio::time::sleep(Duration::from_millis(500u64 << (attempt - 1))).await;
        }
    }
    Err(last_err.unwrap_or_else(|| anyhow!("{channel}: no attempt made")))
}
