//! # Time-to-full
//! Linear estimate of when the focal bin reaches the full threshold, from the
//! first and last sample of a short chronological window.
//!
//! The trash level is a sensor distance, so a bin that is filling shows a
//! *shrinking* level. Only a strictly shrinking level over a positive time
//! span yields an estimate; anything else is reported as stable.

use serde::Serialize;
use std::fmt;

use crate::telemetry::HistorySample;

/// Fewer samples than this and no estimate is produced at all.
pub const MIN_SAMPLES: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EtaEstimate {
    FullIn { minutes: u64 },
    Stable,
}

impl fmt::Display for EtaEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EtaEstimate::FullIn { minutes } => write!(f, "Full in ~{minutes} mins"),
            EtaEstimate::Stable => f.write_str("Usage Stable"),
        }
    }
}

/// Estimate with the default minimum window of [`MIN_SAMPLES`].
pub fn estimate(chronological: &[HistorySample], full_threshold_cm: f64) -> Option<EtaEstimate> {
    estimate_with_min(chronological, full_threshold_cm, MIN_SAMPLES)
}

/// `None` when the window is shorter than `min_samples` or either endpoint has
/// no level reading; the caller must hide the estimate rather than show a
/// stale one.
pub fn estimate_with_min(
    chronological: &[HistorySample],
    full_threshold_cm: f64,
    min_samples: usize,
) -> Option<EtaEstimate> {
    if chronological.len() < min_samples.max(1) {
        return None;
    }
    let first = chronological.first()?;
    let last = chronological.last()?;
    // Both endpoints need a level reading.
    let (first_level, last_level) = (first.trash_level_cm?, last.trash_level_cm?);

    let time_diff_minutes = (last.timestamp_seconds - first.timestamp_seconds) as f64 / 60.0;
    let level_delta = first_level - last_level;

    if level_delta > 0.0 && time_diff_minutes > 0.0 {
        let rate = level_delta / time_diff_minutes;
        let remaining = last_level - full_threshold_cm;
        let minutes = (remaining / rate).round().abs();
        if minutes.is_finite() {
            return Some(EtaEstimate::FullIn {
                minutes: minutes as u64,
            });
        }
    }
    Some(EtaEstimate::Stable)
}
