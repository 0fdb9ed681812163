//! # Telemetry store
//! In-memory stand-in for the realtime document store the dashboard reads:
//! current status per bin (last write wins), an append-only history per bin,
//! and at most one pending command per bin.
//!
//! All reads return owned copies taken under a single lock, so callers never
//! see a half-applied update.

use std::collections::{HashMap, VecDeque};
use std::sync::RwLock;

use crate::telemetry::{DeviceCommand, DeviceStatusSnapshot, HistorySample};

#[derive(Debug)]
pub struct TelemetryStore {
    inner: RwLock<Inner>,
    history_cap: usize,
}

#[derive(Debug, Default)]
struct Inner {
    status: HashMap<String, DeviceStatusSnapshot>,
    /// Per device, ordered by `timestamp_seconds` ascending.
    history: HashMap<String, VecDeque<HistorySample>>,
    commands: HashMap<String, DeviceCommand>,
}

impl TelemetryStore {
    pub fn with_history_cap(cap: usize) -> Self {
        Self {
            inner: RwLock::new(Inner::default()),
            history_cap: cap.max(1),
        }
    }

    /// Replace the device's status wholesale; returns the previous one.
    pub fn replace_status(&self, snapshot: DeviceStatusSnapshot) -> Option<DeviceStatusSnapshot> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.status.insert(snapshot.device_id.clone(), snapshot)
    }

    pub fn status(&self, device_id: &str) -> Option<DeviceStatusSnapshot> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.status.get(device_id).cloned()
    }

    /// Consistent copy of every current status.
    pub fn statuses(&self) -> HashMap<String, DeviceStatusSnapshot> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.status.clone()
    }

    /// All current statuses plus one device's `n` newest samples (newest
    /// first), taken under a single read guard.
    pub fn snapshot(
        &self,
        device_id: &str,
        n: usize,
    ) -> (HashMap<String, DeviceStatusSnapshot>, Vec<HistorySample>) {
        let inner = self.inner.read().expect("store lock poisoned");
        let window = inner
            .history
            .get(device_id)
            .map(|buf| buf.iter().rev().take(n).cloned().collect())
            .unwrap_or_default();
        (inner.status.clone(), window)
    }

    /// Append one sample, keeping per-device time order and the retention cap.
    pub fn append_history(&self, sample: HistorySample) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        let cap = self.history_cap;
        let buf = inner.history.entry(sample.device_id.clone()).or_default();

        // Uploads arrive in order; seeded samples may not.
        let pos = buf.partition_point(|s| s.timestamp_seconds <= sample.timestamp_seconds);
        buf.insert(pos, sample);

        while buf.len() > cap {
            buf.pop_front();
        }
    }

    /// The `n` most recent samples of one device, newest first.
    pub fn latest_history(&self, device_id: &str, n: usize) -> Vec<HistorySample> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .history
            .get(device_id)
            .map(|buf| buf.iter().rev().take(n).cloned().collect())
            .unwrap_or_default()
    }

    /// Every sample (all devices) at or after `cutoff_secs`.
    pub fn history_since(&self, cutoff_secs: i64) -> Vec<HistorySample> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner
            .history
            .values()
            .flat_map(|buf| {
                let start = buf.partition_point(|s| s.timestamp_seconds < cutoff_secs);
                buf.range(start..).cloned()
            })
            .collect()
    }

    pub fn history_len(&self, device_id: &str) -> usize {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.history.get(device_id).map_or(0, VecDeque::len)
    }

    /// Set (or overwrite) the pending command for a device.
    pub fn set_command(&self, device_id: &str, command: DeviceCommand) {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.commands.insert(device_id.to_string(), command);
    }

    /// Remove and return the pending command, if any.
    pub fn take_command(&self, device_id: &str) -> Option<DeviceCommand> {
        let mut inner = self.inner.write().expect("store lock poisoned");
        inner.commands.remove(device_id)
    }

    pub fn pending_command(&self, device_id: &str) -> Option<DeviceCommand> {
        let inner = self.inner.read().expect("store lock poisoned");
        inner.commands.get(device_id).cloned()
    }
}
