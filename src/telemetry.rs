//! # Telemetry model
//! Records exchanged with the bins and kept in the store.
//!
//! `DeviceStatusSnapshot` is the current state of one bin (replaced wholesale
//! on every upload), `HistorySample` is one append-only reading used for charts
//! and the time-to-full estimate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Device id used by uploads that omit one.
pub const DEFAULT_DEVICE_ID: &str = "ESP32_BIN_01";

/// Current status of one bin, as last reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceStatusSnapshot {
    pub device_id: String,
    /// Server time of the last upload; `None` for a device never heard from.
    pub last_updated_at: Option<DateTime<Utc>>,
    /// Normalized occupancy, 0..=100.
    pub fill_percentage: f64,
    pub is_full: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub temperature_c: Option<f64>,
    pub humidity_pct: Option<f64>,
}

impl DeviceStatusSnapshot {
    /// Placeholder for a configured device that has not reported yet.
    pub fn never_seen(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            last_updated_at: None,
            fill_percentage: 0.0,
            is_full: false,
            latitude: None,
            longitude: None,
            temperature_c: None,
            humidity_pct: None,
        }
    }

    /// Both coordinates, when present and non-zero.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) if lat != 0.0 && lon != 0.0 => Some((lat, lon)),
            _ => None,
        }
    }
}

/// One historical reading of a bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub device_id: String,
    /// Unix seconds (server time of the upload).
    pub timestamp_seconds: i64,
    pub fill_percentage: f64,
    /// Distance from the sensor to the trash surface; shrinks as the bin fills.
    /// Absent when the upload did not carry a reading.
    #[serde(default)]
    pub trash_level_cm: Option<f64>,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub humidity_pct: Option<f64>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl HistorySample {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.timestamp_seconds, 0)
    }
}

/// Actions a bin picks up when it polls for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandAction {
    Reset,
}

impl CommandAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandAction::Reset => "RESET",
        }
    }
}

/// Pending command for one device; at most one per device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCommand {
    pub action: CommandAction,
    pub issued_at: DateTime<Utc>,
}

/// Raw JSON body posted by a bin. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceUpload {
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub command_check: Option<bool>,
    #[serde(default)]
    pub fill_percentage: Option<f64>,
    #[serde(default)]
    pub trash_level_cm: Option<f64>,
    #[serde(default)]
    pub temp_c: Option<f64>,
    #[serde(default)]
    pub humidity_pct: Option<f64>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl DeviceUpload {
    pub fn device_id(&self) -> &str {
        self.device_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_DEVICE_ID)
    }

    pub fn is_command_check(&self) -> bool {
        self.command_check == Some(true)
    }
}

/// Short display suffix of a device id: `ESP32_BIN_01` -> `01`.
pub fn device_suffix(device_id: &str) -> &str {
    device_id.rsplit('_').next().unwrap_or(device_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_defaults_device_id() {
        let up: DeviceUpload = serde_json::from_str(r#"{"fill_percentage": 12}"#).unwrap();
        assert_eq!(up.device_id(), DEFAULT_DEVICE_ID);
        assert!(!up.is_command_check());

        let up: DeviceUpload =
            serde_json::from_str(r#"{"device_id":"ESP32_BIN_02","command_check":true}"#).unwrap();
        assert_eq!(up.device_id(), "ESP32_BIN_02");
        assert!(up.is_command_check());
    }

    #[test]
    fn zero_coordinates_are_treated_as_missing() {
        let mut s = DeviceStatusSnapshot::never_seen("ESP32_BIN_01");
        assert_eq!(s.coordinates(), None);
        s.latitude = Some(0.0);
        s.longitude = Some(0.0);
        assert_eq!(s.coordinates(), None);
        s.latitude = Some(5.314);
        s.longitude = Some(100.312);
        assert_eq!(s.coordinates(), Some((5.314, 100.312)));
    }

    #[test]
    fn suffix_is_last_segment() {
        assert_eq!(device_suffix("ESP32_BIN_03"), "03");
        assert_eq!(device_suffix("plain"), "plain");
    }
}
