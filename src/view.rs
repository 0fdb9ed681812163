//! # Dashboard view-model
//! Structured display records built from an evaluated fleet, the focal
//! device's history window, and the fleet history. Everything the front-end
//! shows is computed here; the front-end only binds fields.
//!
//! Missing telemetry never fails a build: the affected field is left `None`
//! (or shown as `--`) and the rest of the view is produced as usual.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::config::FleetConfig;
use crate::eta;
use crate::fleet::{DeviceBadge, EvaluatedDevice, FleetSnapshot, FleetSummary};
use crate::freshness;
use crate::risk::{self, RiskIndex};
use crate::telemetry::{device_suffix, HistorySample};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MapMarker {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceCard {
    pub device_id: String,
    pub suffix: String,
    pub badge: DeviceBadge,
    pub badge_label: &'static str,
    pub badge_class: &'static str,
    pub last_seen_text: String,
    pub fill_text: String,
    /// Offline cards are rendered dimmed.
    pub dimmed: bool,
    pub marker: Option<MapMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetOverview {
    pub evaluated_at: DateTime<Utc>,
    pub summary: FleetSummary,
    pub cards: Vec<DeviceCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskView {
    pub score: u8,
    pub label: &'static str,
    pub color: &'static str,
    /// Doughnut split: `[risk, 100 - risk]`.
    pub gauge: [u8; 2],
    /// `[heat, humidity, fill, risk]`.
    pub radar: [f64; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FillSeries {
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FocalDetail {
    pub device_id: String,
    pub badge: DeviceBadge,
    pub occupancy_text: String,
    /// Bar width in percent.
    pub occupancy_bar: f64,
    pub temperature_text: String,
    pub humidity_text: String,
    pub risk: Option<RiskView>,
    /// `None` while the history window is too short.
    pub eta_text: Option<String>,
    pub raw_level_text: Option<String>,
    pub fill_series: FillSeries,
    pub sync_text: String,
    pub marker: Option<MapMarker>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceAverage {
    pub device_id: String,
    pub label: String,
    pub average_fill: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FleetAverages {
    pub days: u32,
    pub devices: Vec<DeviceAverage>,
}

/// Full published view: overview plus the focal detail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    pub overview: FleetOverview,
    pub focal: Option<FocalDetail>,
}

pub fn device_card(device: &EvaluatedDevice, now: DateTime<Utc>) -> DeviceCard {
    let status = &device.status;
    let badge = device.badge();
    let fill_text = if status.fill_percentage == 0.0 && status.last_updated_at.is_none() {
        "--%".to_string()
    } else {
        format!("{}%", status.fill_percentage.round())
    };

    DeviceCard {
        device_id: status.device_id.clone(),
        suffix: device_suffix(&status.device_id).to_string(),
        badge,
        badge_label: badge.label(),
        badge_class: badge.css_class(),
        last_seen_text: freshness::last_seen_text(status.last_updated_at, now),
        fill_text,
        dimmed: device.is_offline,
        marker: status.coordinates().map(|(lat, lon)| MapMarker { lat, lon }),
    }
}

pub fn fleet_overview(snapshot: &FleetSnapshot) -> FleetOverview {
    FleetOverview {
        evaluated_at: snapshot.evaluated_at,
        summary: snapshot.summary,
        cards: snapshot
            .devices
            .iter()
            .map(|d| device_card(d, snapshot.evaluated_at))
            .collect(),
    }
}

/// Detail view of one device. `newest_first` is the history window exactly as
/// the store returns it.
pub fn focal_detail(
    device: &EvaluatedDevice,
    newest_first: &[HistorySample],
    cfg: &FleetConfig,
    now: DateTime<Utc>,
) -> FocalDetail {
    let status = &device.status;
    let occupancy = status.fill_percentage;

    let risk = match (status.humidity_pct, status.temperature_c) {
        (Some(h), Some(t)) => risk::risk_index(occupancy, Some(h), Some(t))
            .map(|idx| risk_view(&idx, occupancy, h, t)),
        _ => None,
    };

    let mut chronological = newest_first.to_vec();
    chronological.reverse();

    let eta_text = eta::estimate_with_min(&chronological, cfg.full_threshold_cm, cfg.min_eta_samples)
        .map(|e| e.to_string());

    let raw_level_text = chronological
        .last()
        .and_then(|s| s.trash_level_cm)
        .map(|level| format!("{} cm", round1(level)));

    FocalDetail {
        device_id: status.device_id.clone(),
        badge: device.badge(),
        occupancy_text: format!("{}%", occupancy.round()),
        occupancy_bar: occupancy.clamp(0.0, 100.0),
        temperature_text: status
            .temperature_c
            .map_or_else(|| "--".to_string(), |t| t.to_string()),
        humidity_text: status
            .humidity_pct
            .map_or_else(|| "--".to_string(), |h| h.to_string()),
        risk,
        eta_text,
        raw_level_text,
        fill_series: fill_series(&chronological),
        sync_text: format!(
            "Sync: {}",
            freshness::last_seen_text(status.last_updated_at, now)
        ),
        marker: status.coordinates().map(|(lat, lon)| MapMarker { lat, lon }),
    }
}

fn risk_view(idx: &RiskIndex, fill: f64, humidity: f64, temperature: f64) -> RiskView {
    RiskView {
        score: idx.score,
        label: idx.tier.label(),
        color: idx.tier.color(),
        gauge: [idx.score, 100 - idx.score],
        radar: risk::radar_axes(fill, humidity, temperature, idx),
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Line chart data, oldest to newest, labelled `HH:MM` (UTC).
pub fn fill_series(chronological: &[HistorySample]) -> FillSeries {
    FillSeries {
        labels: chronological
            .iter()
            .map(|s| {
                s.timestamp()
                    .map(|t| t.format("%H:%M").to_string())
                    .unwrap_or_default()
            })
            .collect(),
        values: chronological.iter().map(|s| s.fill_percentage).collect(),
    }
}

/// Mean fill per configured device over `samples`; devices without samples
/// report 0.
pub fn fleet_averages(device_ids: &[String], samples: &[HistorySample], days: u32) -> FleetAverages {
    let mut sums: HashMap<&str, (f64, usize)> = HashMap::new();
    for s in samples {
        let e = sums.entry(s.device_id.as_str()).or_insert((0.0, 0));
        e.0 += s.fill_percentage;
        e.1 += 1;
    }

    let devices = device_ids
        .iter()
        .map(|id| {
            let (sum, n) = sums.get(id.as_str()).copied().unwrap_or((0.0, 0));
            DeviceAverage {
                device_id: id.clone(),
                label: format!("BIN_{}", device_suffix(id)),
                average_fill: if n > 0 { sum / n as f64 } else { 0.0 },
                samples: n,
            }
        })
        .collect();

    FleetAverages { days, devices }
}
