// src/notify/antiflutter.rs
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::collections::HashMap;

/// Per-device cooldown gate for full-bin alerts.
/// - First alert for a device always allowed.
/// - Inside that device's cooldown, alerts are suppressed.
/// - State is updated explicitly via `record_alert` after a send.
#[derive(Debug, Clone, Default)]
pub struct AntiFlutter {
    cooldown: ChronoDuration,
    last_alert: HashMap<String, DateTime<Utc>>,
}

impl AntiFlutter {
    /// `cooldown_secs` < 0 is treated as 0 (no cooldown).
    pub fn new(cooldown_secs: i64) -> Self {
        Self {
            cooldown: ChronoDuration::seconds(cooldown_secs.max(0)),
            last_alert: HashMap::new(),
        }
    }

    /// Check if we may alert for `device_id` at `now`. Does NOT mutate state.
    pub fn should_alert(&self, device_id: &str, now: DateTime<Utc>) -> bool {
        match self.last_alert.get(device_id) {
            None => true,
            Some(ts) => now.signed_duration_since(*ts) >= self.cooldown,
        }
    }

    pub fn record_alert(&mut self, device_id: &str, now: DateTime<Utc>) {
        self.last_alert.insert(device_id.to_string(), now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn first_alert_passes() {
        let af = AntiFlutter::new(3_600);
        let now = Utc.with_ymd_and_hms(2025, 12, 20, 9, 0, 0).unwrap();
        assert!(af.should_alert("ESP32_BIN_01", now));
    }

    #[test]
    fn inside_cooldown_blocked_per_device() {
        let mut af = AntiFlutter::new(3_600);
        let t0 = Utc.with_ymd_and_hms(2025, 12, 20, 9, 0, 0).unwrap();
        af.record_alert("ESP32_BIN_01", t0);
        let t1 = t0 + ChronoDuration::seconds(120);
        assert!(!af.should_alert("ESP32_BIN_01", t1));
        assert!(af.should_alert("ESP32_BIN_02", t1));
    }

    #[test]
    fn after_cooldown_passes() {
        let mut af = AntiFlutter::new(3_600);
        let t0 = Utc.with_ymd_and_hms(2025, 12, 20, 9, 0, 0).unwrap();
        af.record_alert("ESP32_BIN_01", t0);
        assert!(af.should_alert("ESP32_BIN_01", t0 + ChronoDuration::seconds(3_605)));
    }

    #[test]
    fn zero_cooldown_never_blocks() {
        let mut af = AntiFlutter::new(-5);
        let t0 = Utc.with_ymd_and_hms(2025, 12, 20, 9, 0, 0).unwrap();
        af.record_alert("ESP32_BIN_01", t0);
        assert!(af.should_alert("ESP32_BIN_01", t0));
    }
}
