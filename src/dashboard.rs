//! # Dashboard engine
//! Owns the store and the published view. Every trigger (upload, command,
//! freshness tick) ends in [`Dashboard::refresh`], which takes one consistent
//! copy of all statuses, recomputes the whole view, and publishes it on a
//! `watch` channel. Subscribers always see a complete view.
//!
//! Refreshes are serialized from the store read to the publish, so a view
//! computed from an older snapshot never replaces a newer one.

use chrono::{DateTime, Duration, Utc};
use metrics::gauge;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use crate::config::FleetConfig;
use crate::fleet::{FleetSnapshot, FleetState};
use crate::store::TelemetryStore;
use crate::telemetry::{CommandAction, DeviceCommand, DeviceStatusSnapshot, HistorySample};
use crate::view::{self, DashboardView, FleetAverages};

/// Pure evaluation: statuses + the focal device's window (newest first).
pub fn evaluate(
    cfg: &FleetConfig,
    statuses: HashMap<String, DeviceStatusSnapshot>,
    focal_newest_first: &[HistorySample],
    now: DateTime<Utc>,
) -> DashboardView {
    let snapshot = evaluate_fleet(cfg, statuses, now);
    let focal = snapshot
        .device(&cfg.focal_device)
        .map(|d| view::focal_detail(d, focal_newest_first, cfg, now));
    DashboardView {
        overview: view::fleet_overview(&snapshot),
        focal,
    }
}

pub fn evaluate_fleet(
    cfg: &FleetConfig,
    statuses: HashMap<String, DeviceStatusSnapshot>,
    now: DateTime<Utc>,
) -> FleetSnapshot {
    FleetState::from_statuses(&cfg.devices, statuses).evaluate(now, cfg.offline_threshold())
}

/// Acknowledgement returned to whoever asked for a reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandAck {
    pub ok: bool,
    pub message: String,
}

impl CommandAck {
    pub fn sent() -> Self {
        Self {
            ok: true,
            message: "Reset command sent.".to_string(),
        }
    }

    pub fn failed() -> Self {
        Self {
            ok: false,
            message: "Failed to send command.".to_string(),
        }
    }
}

#[derive(Clone)]
pub struct Dashboard {
    cfg: Arc<FleetConfig>,
    store: Arc<TelemetryStore>,
    tx: Arc<watch::Sender<Arc<DashboardView>>>,
    publish: Arc<Mutex<()>>,
}

impl Dashboard {
    pub fn new(cfg: FleetConfig) -> Self {
        let store = Arc::new(TelemetryStore::with_history_cap(cfg.max_history_per_device));
        Self::with_store(cfg, store)
    }

    pub fn with_store(cfg: FleetConfig, store: Arc<TelemetryStore>) -> Self {
        let initial = evaluate(&cfg, store.statuses(), &[], Utc::now());
        let (tx, _rx) = watch::channel(Arc::new(initial));
        let dash = Self {
            cfg: Arc::new(cfg),
            store,
            tx: Arc::new(tx),
            publish: Arc::new(Mutex::new(())),
        };
        dash.refresh(Utc::now());
        dash
    }

    pub fn config(&self) -> &FleetConfig {
        &self.cfg
    }

    pub fn store(&self) -> &TelemetryStore {
        &self.store
    }

    /// Recompute the whole view at `now` and publish it.
    pub fn refresh(&self, now: DateTime<Utc>) -> Arc<DashboardView> {
        let _publish = self.publish.lock().expect("publish mutex poisoned");
        let (statuses, window) = self
            .store
            .snapshot(&self.cfg.focal_device, self.cfg.history_window);
        let view = Arc::new(evaluate(&self.cfg, statuses, &window, now));

        let s = view.overview.summary;
        gauge!("fleet_active_bins").set(s.active_count as f64);
        gauge!("fleet_alert_bins").set(s.alert_count as f64);
        gauge!("fleet_health_percent").set(f64::from(s.health_percent));

        tracing::debug!(
            target: "dashboard",
            active = s.active_count,
            alerts = s.alert_count,
            health = s.health_percent,
            "view recomputed"
        );

        self.tx.send_replace(view.clone());
        view
    }

    /// Last published view.
    pub fn current(&self) -> Arc<DashboardView> {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardView>> {
        self.tx.subscribe()
    }

    /// Mean fill per device over the last `days` days.
    pub fn fleet_averages(&self, days: u32, now: DateTime<Utc>) -> FleetAverages {
        let cutoff = (now - Duration::days(i64::from(days))).timestamp();
        let samples = self.store.history_since(cutoff);
        view::fleet_averages(&self.cfg.devices, &samples, days)
    }

    /// Queue a reset for the device; it is delivered on its next command poll.
    /// A newer reset replaces a pending one.
    pub fn issue_reset(&self, device_id: &str, now: DateTime<Utc>) -> CommandAck {
        if !self.cfg.is_known_device(device_id) {
            return CommandAck::failed();
        }
        self.store.set_command(
            device_id,
            DeviceCommand {
                action: CommandAction::Reset,
                issued_at: now,
            },
        );
        metrics::counter!("bin_commands_issued_total").increment(1);
        tracing::info!(target: "dashboard", device = device_id, "reset command queued");
        self.refresh(now);
        CommandAck::sent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(id: &str, now: DateTime<Utc>, full: bool) -> DeviceStatusSnapshot {
        DeviceStatusSnapshot {
            last_updated_at: Some(now),
            fill_percentage: if full { 99.0 } else { 10.0 },
            is_full: full,
            ..DeviceStatusSnapshot::never_seen(id)
        }
    }

    #[test]
    fn evaluate_builds_overview_and_focal() {
        let cfg = FleetConfig::default();
        let now = Utc::now();
        let mut statuses = HashMap::new();
        statuses.insert("ESP32_BIN_01".to_string(), status("ESP32_BIN_01", now, false));
        statuses.insert("ESP32_BIN_03".to_string(), status("ESP32_BIN_03", now, true));
        statuses.insert("STRAY".to_string(), status("STRAY", now, true));

        let v = evaluate(&cfg, statuses, &[], now);
        assert_eq!(v.overview.cards.len(), 3);
        assert_eq!(v.overview.summary.active_count, 2);
        assert_eq!(v.overview.summary.alert_count, 1);
        assert_eq!(v.overview.summary.health_percent, 67);
        let focal = v.focal.unwrap();
        assert_eq!(focal.device_id, "ESP32_BIN_01");
        assert!(focal.eta_text.is_none());
    }

    #[tokio::test]
    async fn refresh_publishes_to_subscribers() {
        let dash = Dashboard::new(FleetConfig::default());
        let mut rx = dash.subscribe();
        assert_eq!(dash.current().overview.summary.active_count, 0);

        let now = Utc::now();
        dash.store().replace_status(status("ESP32_BIN_02", now, false));
        dash.refresh(now);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().overview.summary.active_count, 1);
    }

    #[test]
    fn concurrent_uploads_leave_latest_view_published() {
        use crate::alerts::AlertDispatcher;
        use crate::telemetry::DeviceUpload;

        for _ in 0..50 {
            let dash = Dashboard::new(FleetConfig::default());
            let now = Utc::now();
            let workers: Vec<_> = ["ESP32_BIN_01", "ESP32_BIN_02", "ESP32_BIN_03"]
                .into_iter()
                .map(|id| {
                    let dash = dash.clone();
                    std::thread::spawn(move || {
                        let upload = DeviceUpload {
                            device_id: Some(id.to_string()),
                            fill_percentage: Some(30.0),
                            ..DeviceUpload::default()
                        };
                        crate::ingest::handle(&dash, &AlertDispatcher::disabled(), upload, now);
                    })
                })
                .collect();
            for w in workers {
                w.join().unwrap();
            }
            assert_eq!(dash.current().overview.summary.active_count, 3);
        }
    }

    #[test]
    fn reset_only_for_known_devices() {
        let dash = Dashboard::new(FleetConfig::default());
        let now = Utc::now();
        assert!(dash.issue_reset("ESP32_BIN_01", now).ok);
        assert!(!dash.issue_reset("ESP32_BIN_42", now).ok);
        assert!(dash.store().pending_command("ESP32_BIN_01").is_some());
        assert!(dash.store().pending_command("ESP32_BIN_42").is_none());
    }
}
