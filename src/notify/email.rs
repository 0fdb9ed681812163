use anyhow::{Context, Result};
use lettre::message::{header, Mailbox, Message};
use lettre::transport::smtp::{authentication::Credentials, AsyncSmtpTransport};
use lettre::{AsyncTransport, Tokio1Executor};

use super::{AlertEvent, Notifier};

fn env_required(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} missing"))
}

/// SMTP channel. Enabled by SMTP_HOST; then SMTP_USER, SMTP_PASS,
/// NOTIFY_EMAIL_FROM and NOTIFY_EMAIL_TO are required, SMTP_PORT is optional.
pub struct EmailSender {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailSender {
    /// `Ok(None)` when SMTP_HOST is unset; an error when it is set but the
    /// rest of the settings are missing or invalid.
    pub fn from_env() -> Result<Option<Self>> {
        let Ok(host) = std::env::var("SMTP_HOST") else {
            return Ok(None);
        };
        let creds = Credentials::new(env_required("SMTP_USER")?, env_required("SMTP_PASS")?);

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(host.trim())
            .context("invalid SMTP_HOST")?
            .credentials(creds);
        if let Ok(port) = std::env::var("SMTP_PORT") {
            builder = builder.port(port.trim().parse().context("invalid SMTP_PORT")?);
        }

        let from = env_required("NOTIFY_EMAIL_FROM")?
            .parse::<Mailbox>()
            .context("invalid NOTIFY_EMAIL_FROM")?;
        let to = env_required("NOTIFY_EMAIL_TO")?
            .parse::<Mailbox>()
            .context("invalid NOTIFY_EMAIL_TO")?;

        Ok(Some(Self {
            mailer: builder.build(),
            from,
            to,
        }))
    }
}

fn subject(ev: &AlertEvent) -> String {
    format!("[Smart Bin] {} is full ({}%)", ev.device_id, ev.fill_percentage)
}

fn body(ev: &AlertEvent) -> String {
    format!(
        "Bin {} reached {}% at {} UTC.\n\
         Map: {}\n\n\
         Please schedule collection.\n",
        ev.device_id,
        ev.fill_percentage,
        ev.ts.format("%Y-%m-%d %H:%M"),
        ev.maps_url()
    )
}

#[async_trait::async_trait]
impl Notifier for EmailSender {
    async fn send(&self, ev: &AlertEvent) -> Result<()> {
        let msg = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject(ev))
            .header(header::ContentType::TEXT_PLAIN)
            .body(body(ev))
            .context("build email")?;

        self.mailer.send(msg).await.context("send email")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
