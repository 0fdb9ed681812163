//! # Demo seed
//! Synthetic fleet history for demos and local runs: a month of readings per
//! bin with a steadily rising fill level, plus a live status stamped "now".
//!
//! The seed is plain JSON so it can be produced by the `seed_history` binary
//! and loaded by the service at startup.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::store::TelemetryStore;
use crate::telemetry::{DeviceStatusSnapshot, HistorySample};

#[derive(Debug, Clone)]
pub struct SeedPlan {
    /// `(device_id, lat, lon)` per bin.
    pub devices: Vec<(String, f64, f64)>,
    pub days: u32,
    pub entries_per_day: u32,
    pub bin_height_cm: f64,
    pub full_fill_percentage: f64,
    pub min_fill_step: u32,
    pub max_fill_step: u32,
}

impl Default for SeedPlan {
    fn default() -> Self {
        Self {
            devices: vec![
                ("ESP32_BIN_01".to_string(), 5.314, 100.312),
                ("ESP32_BIN_02".to_string(), 5.316, 100.315),
                ("ESP32_BIN_03".to_string(), 5.318, 100.310),
            ],
            days: 30,
            entries_per_day: 4,
            bin_height_cm: 25.0,
            full_fill_percentage: 95.0,
            min_fill_step: 1,
            max_fill_step: 8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Seed {
    pub history: Vec<HistorySample>,
    pub statuses: Vec<DeviceStatusSnapshot>,
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Generate a seed ending at `now`.
pub fn generate<R: Rng>(plan: &SeedPlan, now: DateTime<Utc>, rng: &mut R) -> Seed {
    let mut seed = Seed::default();
    let entries = plan.entries_per_day.max(1);
    let step_hours = i64::from(24 / entries);
    let (lo, hi) = (
        plan.min_fill_step.min(plan.max_fill_step),
        plan.max_fill_step.max(plan.min_fill_step),
    );

    for (device_id, lat, lon) in &plan.devices {
        let mut fill: f64 = f64::from(rng.random_range(5u32..=20));
        let mut last: Option<(f64, f64)> = None;

        for day_offset in (1..=i64::from(plan.days)).rev() {
            for entry in 0..i64::from(entries) {
                let ts = now - Duration::days(day_offset) - Duration::hours(entry * step_hours);
                fill = (fill + f64::from(rng.random_range(lo..=hi))).min(100.0);
                let temp = round1(rng.random_range(24.0..=32.0));
                let hum = round1(rng.random_range(40.0..=70.0));

                seed.history.push(HistorySample {
                    device_id: device_id.clone(),
                    timestamp_seconds: ts.timestamp(),
                    fill_percentage: fill,
                    trash_level_cm: Some(round1(plan.bin_height_cm * (1.0 - fill / 100.0))),
                    temperature_c: Some(temp),
                    humidity_pct: Some(hum),
                    latitude: Some(*lat),
                    longitude: Some(*lon),
                });
                last = Some((temp, hum));
            }
        }

        seed.statuses.push(DeviceStatusSnapshot {
            device_id: device_id.clone(),
            last_updated_at: Some(now),
            fill_percentage: fill,
            is_full: fill >= plan.full_fill_percentage,
            latitude: Some(*lat),
            longitude: Some(*lon),
            temperature_c: last.map(|(t, _)| t),
            humidity_pct: last.map(|(_, h)| h),
        });
    }
    seed
}

/// Push a seed into the store: history first, then statuses.
pub fn apply(store: &TelemetryStore, seed: Seed) -> usize {
    let n = seed.history.len();
    for sample in seed.history {
        store.append_history(sample);
    }
    for status in seed.statuses {
        store.replace_status(status);
    }
    n
}

pub fn load_from_file(path: &Path) -> Result<Seed> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading history seed from {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("parsing history seed {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn seed_shape_and_invariants() {
        let plan = SeedPlan::default();
        let now = Utc::now();
        let mut rng = StdRng::seed_from_u64(7);
        let seed = generate(&plan, now, &mut rng);

        assert_eq!(seed.history.len(), 3 * 30 * 4);
        assert_eq!(seed.statuses.len(), 3);
        for s in &seed.history {
            assert!((0.0..=100.0).contains(&s.fill_percentage));
            assert!(s.trash_level_cm.is_some_and(|l| (0.0..=25.0).contains(&l)));
            assert!(s.timestamp_seconds < now.timestamp());
        }
        for st in &seed.statuses {
            assert_eq!(st.last_updated_at, Some(now));
            assert_eq!(st.is_full, st.fill_percentage >= 95.0);
        }
    }

    #[test]
    fn apply_fills_store() {
        let mut rng = StdRng::seed_from_u64(1);
        let seed = generate(&SeedPlan::default(), Utc::now(), &mut rng);
        let store = TelemetryStore::with_history_cap(10_000);
        assert_eq!(apply(&store, seed), 360);
        assert_eq!(store.history_len("ESP32_BIN_02"), 120);
        assert_eq!(store.statuses().len(), 3);
    }
}
