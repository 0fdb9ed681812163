//! # Fleet aggregation
//! Owned fleet state keyed by device id, the derived `FleetSnapshot` (status
//! plus `is_offline`) and the aggregate counts shown in the top stats bar.
//!
//! Nothing is carried between evaluations except the snapshot set itself:
//! every call to [`FleetState::evaluate`] recomputes all counts from scratch.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::freshness;
use crate::telemetry::DeviceStatusSnapshot;

/// Badge shown on a device card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeviceBadge {
    Offline,
    #[serde(rename = "FULL")]
    Full,
    Active,
}

impl DeviceBadge {
    pub fn label(&self) -> &'static str {
        match self {
            DeviceBadge::Offline => "Offline",
            DeviceBadge::Full => "FULL",
            DeviceBadge::Active => "Active",
        }
    }

    /// CSS modifier used by the front-end (`status-badge <class>`).
    pub fn css_class(&self) -> &'static str {
        match self {
            DeviceBadge::Offline => "offline",
            DeviceBadge::Full => "full",
            DeviceBadge::Active => "active",
        }
    }
}

/// One device after freshness evaluation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedDevice {
    pub status: DeviceStatusSnapshot,
    pub is_offline: bool,
}

impl EvaluatedDevice {
    pub fn badge(&self) -> DeviceBadge {
        if self.is_offline {
            DeviceBadge::Offline
        } else if self.status.is_full {
            DeviceBadge::Full
        } else {
            DeviceBadge::Active
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FleetSummary {
    pub total_devices: usize,
    pub active_count: usize,
    pub alert_count: usize,
    pub health_percent: u8,
}

/// Evaluated fleet, in configured device order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetSnapshot {
    pub evaluated_at: DateTime<Utc>,
    pub devices: Vec<EvaluatedDevice>,
    pub summary: FleetSummary,
}

impl FleetSnapshot {
    pub fn device(&self, device_id: &str) -> Option<&EvaluatedDevice> {
        self.devices.iter().find(|d| d.status.device_id == device_id)
    }
}

/// Current status of every configured device.
///
/// Devices outside the configured fleet are ignored; configured devices that
/// never reported are kept as "never seen" placeholders.
#[derive(Debug, Clone, PartialEq)]
pub struct FleetState {
    order: Vec<String>,
    current: HashMap<String, DeviceStatusSnapshot>,
}

impl FleetState {
    pub fn new<I, S>(device_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let order: Vec<String> = device_ids.into_iter().map(Into::into).collect();
        let current = order
            .iter()
            .map(|id| (id.clone(), DeviceStatusSnapshot::never_seen(id.clone())))
            .collect();
        Self { order, current }
    }

    /// Build from a consistent copy of the store's status set.
    pub fn from_statuses<S: Into<String> + Clone>(
        device_ids: &[S],
        statuses: HashMap<String, DeviceStatusSnapshot>,
    ) -> Self {
        let mut state = Self::new(device_ids.iter().cloned());
        for (_, snapshot) in statuses {
            state.replace(snapshot);
        }
        state
    }

    /// Whole-object replacement; returns false for devices outside the fleet.
    pub fn replace(&mut self, snapshot: DeviceStatusSnapshot) -> bool {
        match self.current.get_mut(&snapshot.device_id) {
            Some(slot) => {
                *slot = snapshot;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, device_id: &str) -> Option<&DeviceStatusSnapshot> {
        self.current.get(device_id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Classify every device and aggregate the fleet in one pass.
    pub fn evaluate(&self, now: DateTime<Utc>, offline_threshold: Duration) -> FleetSnapshot {
        let devices: Vec<EvaluatedDevice> = self
            .order
            .iter()
            .filter_map(|id| self.current.get(id))
            .map(|status| EvaluatedDevice {
                is_offline: freshness::is_offline(status.last_updated_at, now, offline_threshold),
                status: status.clone(),
            })
            .collect();

        let summary = aggregate(&devices);
        FleetSnapshot {
            evaluated_at: now,
            devices,
            summary,
        }
    }
}

/// Fleet counts from evaluated devices.
///
/// `alert_count` looks only at each device's current `is_full`, whether or
/// not the device is online.
pub fn aggregate(devices: &[EvaluatedDevice]) -> FleetSummary {
    let total_devices = devices.len();
    let active_count = devices.iter().filter(|d| !d.is_offline).count();
    let alert_count = devices.iter().filter(|d| d.status.is_full).count();
    FleetSummary {
        total_devices,
        active_count,
        alert_count,
        health_percent: health_percent(active_count, total_devices),
    }
}

/// `round(100 * active / total)`; an empty fleet reports 0.
pub fn health_percent(active: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    ((100.0 * active as f64) / total as f64).round().clamp(0.0, 100.0) as u8
}
