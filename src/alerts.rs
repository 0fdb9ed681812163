//! Full-bin alert dispatch: cooldown gate in front of the notifier mux.
//! Sends run on a spawned task so an upload never waits on a webhook.

use chrono::{DateTime, Utc};
use metrics::counter;
use std::sync::{Arc, Mutex};

use crate::notify::antiflutter::AntiFlutter;
use crate::notify::{AlertEvent, NotifierMux};

#[derive(Clone)]
pub struct AlertDispatcher {
    mux: NotifierMux,
    gate: Arc<Mutex<AntiFlutter>>,
}

impl AlertDispatcher {
    pub fn new(mux: NotifierMux, cooldown_secs: i64) -> Self {
        Self {
            mux,
            gate: Arc::new(Mutex::new(AntiFlutter::new(cooldown_secs))),
        }
    }

    /// Dispatcher with no channels (tests, local runs).
    pub fn disabled() -> Self {
        Self::new(NotifierMux::default(), 0)
    }

    /// Pass the gate and record the alert. Returns false when suppressed.
    pub fn admit(&self, device_id: &str, now: DateTime<Utc>) -> bool {
        let mut gate = self.gate.lock().expect("antiflutter mutex poisoned");
        if !gate.should_alert(device_id, now) {
            counter!("bin_alerts_suppressed_total").increment(1);
            tracing::debug!(target: "alerts", device = device_id, "suppressed by cooldown");
            return false;
        }
        gate.record_alert(device_id, now);
        true
    }

    /// Gate the event and, when admitted, send it in the background.
    pub fn dispatch(&self, ev: AlertEvent) -> bool {
        if !self.admit(&ev.device_id, ev.ts) {
            return false;
        }
        tracing::info!(
            target: "alerts",
            device = %ev.device_id,
            fill = ev.fill_percentage,
            "bin became full"
        );
        if self.mux.is_empty() {
            return true;
        }
        let mux = self.mux.clone();
        tokio::spawn(async move {
            let delivered = mux.notify(&ev).await;
            tracing::debug!(target: "alerts", device = %ev.device_id, delivered, "alert fan-out done");
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn cooldown_applies_per_device() {
        let d = AlertDispatcher::new(NotifierMux::default(), 600);
        let t0 = Utc::now();
        assert!(d.admit("A", t0));
        assert!(!d.admit("A", t0 + Duration::seconds(10)));
        assert!(d.admit("B", t0 + Duration::seconds(10)));
        assert!(d.admit("A", t0 + Duration::seconds(601)));
    }
}
