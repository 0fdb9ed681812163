//! # Freshness
//! Online/offline classification and the human-readable "last seen" label.
//!
//! Pure functions of `(last_updated_at, now, threshold)`; an absent timestamp
//! is a valid input meaning "never reported".

use chrono::{DateTime, Duration, Utc};

/// A device is offline when it never reported, or its last report is older
/// than `threshold`. Exactly `threshold` old still counts as online.
pub fn is_offline(
    last_updated_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> bool {
    match last_updated_at {
        None => true,
        Some(ts) => now.signed_duration_since(ts) > threshold,
    }
}

/// "12s ago", "3m ago", "5h ago", "2d ago" or "Never".
///
/// Each unit is floored from the one below it. A timestamp slightly in the
/// future (clock skew) renders as "0s ago".
pub fn last_seen_text(last_updated_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(ts) = last_updated_at else {
        return "Never".to_string();
    };
    let secs = now.signed_duration_since(ts).num_seconds().max(0);
    let mins = secs / 60;
    let hours = mins / 60;
    let days = hours / 24;

    if secs < 60 {
        format!("{secs}s ago")
    } else if mins < 60 {
        format!("{mins}m ago")
    } else if hours < 24 {
        format!("{hours}h ago")
    } else {
        format!("{days}d ago")
    }
}
