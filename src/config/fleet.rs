// src/config/fleet.rs
//! Fleet configuration: which bins exist, the focal bin, and the policy
//! constants used by the evaluator (bin height, full threshold, offline
//! threshold, history window).
//!
//! Resolution order:
//! 1) `$FLEET_CONFIG_PATH` (must exist when set)
//! 2) `config/fleet.toml`
//! 3) built-in defaults
//!
//! Individual env vars then override single values.

use anyhow::{anyhow, Context, Result};
use chrono::Duration;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FLEET_CONFIG_PATH: &str = "config/fleet.toml";
pub const ENV_FLEET_CONFIG_PATH: &str = "FLEET_CONFIG_PATH";

pub const ENV_OFFLINE_THRESHOLD_MS: &str = "OFFLINE_THRESHOLD_MS";
pub const ENV_FOCAL_DEVICE_ID: &str = "FOCAL_DEVICE_ID";
pub const ENV_FRESHNESS_TICK_MS: &str = "FRESHNESS_TICK_MS";
pub const ENV_ALERT_COOLDOWN_SECS: &str = "ALERT_COOLDOWN_SECS";
pub const ENV_STATIC_DIR: &str = "DASHBOARD_STATIC_DIR";
pub const ENV_HISTORY_SEED_PATH: &str = "HISTORY_SEED_PATH";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    /// Monitored bins, in display order.
    pub devices: Vec<String>,
    /// Bin with history, risk and time-to-full on the detail view.
    pub focal_device: String,
    pub bin_height_cm: f64,
    /// Trash level (cm from the sensor) at which a bin counts as full.
    pub full_threshold_cm: f64,
    /// Fill percentage at or above which an upload marks the bin full.
    pub full_fill_percentage: f64,
    pub offline_threshold_ms: u64,
    /// Most recent samples fed to the detail chart and time-to-full.
    pub history_window: usize,
    pub min_eta_samples: usize,
    /// Cap of retained history samples per device.
    pub max_history_per_device: usize,
    pub freshness_tick_ms: u64,
    pub alert_cooldown_secs: i64,
    /// Directory with the static dashboard front-end.
    pub static_dir: Option<PathBuf>,
    /// JSON seed (see `seed`) loaded at startup.
    pub history_seed_path: Option<PathBuf>,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            devices: vec![
                "ESP32_BIN_01".to_string(),
                "ESP32_BIN_02".to_string(),
                "ESP32_BIN_03".to_string(),
            ],
            focal_device: "ESP32_BIN_01".to_string(),
            bin_height_cm: 25.0,
            full_threshold_cm: 5.0,
            full_fill_percentage: 95.0,
            offline_threshold_ms: 120_000,
            history_window: 15,
            min_eta_samples: crate::eta::MIN_SAMPLES,
            max_history_per_device: 10_000,
            freshness_tick_ms: 5_000,
            alert_cooldown_secs: 0,
            static_dir: None,
            history_seed_path: None,
        }
    }
}

impl FleetConfig {
    /// Load using env var + fallbacks, then apply env overrides and validate.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(ENV_FLEET_CONFIG_PATH) {
            Ok(p) => {
                let pb = PathBuf::from(p);
                if !pb.exists() {
                    return Err(anyhow!(
                        "{ENV_FLEET_CONFIG_PATH} points to non-existent path {}",
                        pb.display()
                    ));
                }
                Self::from_path(&pb)?
            }
            Err(_) => {
                let default_path = PathBuf::from(DEFAULT_FLEET_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_path(&default_path)?
                } else {
                    Self::default()
                }
            }
        };
        cfg.apply_env_overrides();
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading fleet config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing fleet config {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: FleetConfig = toml::from_str(s)?;
        Ok(cfg.normalized())
    }

    fn normalized(mut self) -> Self {
        let mut seen = std::collections::HashSet::new();
        self.devices = self
            .devices
            .into_iter()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty() && seen.insert(d.clone()))
            .collect();
        self.focal_device = self.focal_device.trim().to_string();
        self
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = parse_env::<u64>(ENV_OFFLINE_THRESHOLD_MS) {
            self.offline_threshold_ms = v;
        }
        if let Ok(v) = std::env::var(ENV_FOCAL_DEVICE_ID) {
            let v = v.trim();
            if !v.is_empty() {
                self.focal_device = v.to_string();
            }
        }
        if let Some(v) = parse_env::<u64>(ENV_FRESHNESS_TICK_MS) {
            self.freshness_tick_ms = v;
        }
        if let Some(v) = parse_env::<i64>(ENV_ALERT_COOLDOWN_SECS) {
            self.alert_cooldown_secs = v.max(0);
        }
        if let Ok(v) = std::env::var(ENV_STATIC_DIR) {
            self.static_dir = Some(PathBuf::from(v));
        }
        if let Ok(v) = std::env::var(ENV_HISTORY_SEED_PATH) {
            self.history_seed_path = Some(PathBuf::from(v));
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.devices.is_empty() {
            return Err(anyhow!("fleet config lists no devices"));
        }
        if !self.devices.iter().any(|d| d == &self.focal_device) {
            return Err(anyhow!(
                "focal device `{}` is not part of the fleet",
                self.focal_device
            ));
        }
        if !(self.bin_height_cm.is_finite() && self.bin_height_cm > 0.0) {
            return Err(anyhow!("bin_height_cm must be a positive number"));
        }
        if !(self.full_threshold_cm.is_finite()
            && self.full_threshold_cm >= 0.0
            && self.full_threshold_cm < self.bin_height_cm)
        {
            return Err(anyhow!(
                "full_threshold_cm must lie within [0, bin_height_cm)"
            ));
        }
        if self.history_window == 0 {
            return Err(anyhow!("history_window must be at least 1"));
        }
        if self.min_eta_samples > self.history_window {
            return Err(anyhow!(
                "min_eta_samples ({}) exceeds history_window ({}); no estimate could ever be shown",
                self.min_eta_samples,
                self.history_window
            ));
        }
        if self.freshness_tick_ms == 0 {
            return Err(anyhow!("freshness_tick_ms must be at least 1"));
        }
        Ok(())
    }

    pub fn offline_threshold(&self) -> Duration {
        Duration::milliseconds(i64::try_from(self.offline_threshold_ms).unwrap_or(i64::MAX))
    }

    pub fn freshness_tick(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.freshness_tick_ms)
    }

    pub fn is_known_device(&self, device_id: &str) -> bool {
        self.devices.iter().any(|d| d == device_id)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.trim().parse().ok())
}
