// src/ingest.rs
//! Device-facing ingest: command polling and telemetry uploads.
//!
//! An upload is stamped with server time, appended to history, and replaces
//! the device's current status. A not-full -> full transition raises an alert.
//! Uploads from devices outside the configured fleet are dropped unstored.

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

use crate::alerts::AlertDispatcher;
use crate::dashboard::Dashboard;
use crate::notify::AlertEvent;
use crate::telemetry::{DeviceStatusSnapshot, DeviceUpload, HistorySample};

/// Reply text when no command is pending.
pub const NO_COMMAND: &str = "NONE";
pub const UPLOAD_OK: &str = "Success: Data logged";
pub const UNKNOWN_DEVICE: &str = "Unknown device";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("bin_ingest_uploads_total", "Telemetry uploads accepted.");
        describe_counter!("bin_command_polls_total", "Command polls received from bins.");
        describe_counter!(
            "bin_commands_delivered_total",
            "Pending commands handed to a polling bin."
        );
        describe_counter!("bin_commands_issued_total", "Reset commands queued.");
        describe_counter!(
            "bin_ingest_rejected_total",
            "Uploads dropped because the device is not in the fleet."
        );
        describe_counter!("bin_alerts_sent_total", "Full-bin alerts delivered per channel.");
        describe_counter!(
            "bin_alerts_suppressed_total",
            "Full-bin alerts suppressed by the cooldown gate."
        );
        describe_gauge!("fleet_active_bins", "Bins reporting within the offline threshold.");
        describe_gauge!("fleet_alert_bins", "Bins whose current state is full.");
        describe_gauge!("fleet_health_percent", "Share of active bins, 0..100.");
    });
}

#[derive(Debug, Clone, PartialEq)]
pub enum IngestOutcome {
    /// Reply to a command poll: the pending action, or `NONE`.
    Command(String),
    Logged {
        device_id: String,
        became_full: bool,
    },
    /// Upload from a device outside the fleet; nothing was stored.
    UnknownDevice(String),
}

impl IngestOutcome {
    pub fn reply_text(&self) -> &str {
        match self {
            IngestOutcome::Command(action) => action,
            IngestOutcome::Logged { .. } => UPLOAD_OK,
            IngestOutcome::UnknownDevice(_) => UNKNOWN_DEVICE,
        }
    }
}

pub fn handle(
    dash: &Dashboard,
    alerts: &AlertDispatcher,
    upload: DeviceUpload,
    now: DateTime<Utc>,
) -> IngestOutcome {
    ensure_metrics_described();
    let device_id = upload.device_id().to_string();

    if upload.is_command_check() {
        counter!("bin_command_polls_total").increment(1);
        return match dash.store().take_command(&device_id) {
            Some(cmd) => {
                counter!("bin_commands_delivered_total").increment(1);
                tracing::info!(target: "ingest", device = %device_id, action = cmd.action.as_str(), "command delivered");
                IngestOutcome::Command(cmd.action.as_str().to_string())
            }
            None => IngestOutcome::Command(NO_COMMAND.to_string()),
        };
    }

    let cfg = dash.config();
    if !cfg.is_known_device(&device_id) {
        counter!("bin_ingest_rejected_total").increment(1);
        tracing::debug!(target: "ingest", device = %device_id, "upload from unknown device dropped");
        return IngestOutcome::UnknownDevice(device_id);
    }

    let fill = upload.fill_percentage.unwrap_or(0.0);
    let lat = upload.lat.unwrap_or(0.0);
    let lon = upload.lon.unwrap_or(0.0);
    let is_full = fill >= cfg.full_fill_percentage;

    dash.store().append_history(HistorySample {
        device_id: device_id.clone(),
        timestamp_seconds: now.timestamp(),
        fill_percentage: fill,
        trash_level_cm: upload.trash_level_cm,
        temperature_c: upload.temp_c,
        humidity_pct: upload.humidity_pct,
        latitude: upload.lat,
        longitude: upload.lon,
    });

    let previous = dash.store().replace_status(DeviceStatusSnapshot {
        device_id: device_id.clone(),
        last_updated_at: Some(now),
        fill_percentage: fill,
        is_full,
        latitude: Some(lat),
        longitude: Some(lon),
        temperature_c: upload.temp_c,
        humidity_pct: upload.humidity_pct,
    });
    let was_full = previous.is_some_and(|p| p.is_full);
    let became_full = is_full && !was_full;

    counter!("bin_ingest_uploads_total").increment(1);
    tracing::debug!(target: "ingest", device = %device_id, fill, is_full, "upload logged");

    if became_full {
        alerts.dispatch(AlertEvent {
            device_id: device_id.clone(),
            fill_percentage: fill,
            latitude: lat,
            longitude: lon,
            ts: now,
        });
    }

    dash.refresh(now);
    IngestOutcome::Logged {
        device_id,
        became_full,
    }
}
