//! Composite risk index for the focal bin.
//!
//! `risk = fill*0.5 + humidity*0.3 + (temperature/50)*100*0.2`, rounded and
//! clamped to 0..=100. The weights are a fixed policy, not calibrated.

use serde::Serialize;

const W_FILL: f64 = 0.5;
const W_HUMIDITY: f64 = 0.3;
const W_HEAT: f64 = 0.2;
/// Temperature mapped to 100 heat points for the score.
const HEAT_SCALE_C: f64 = 50.0;
/// Temperature mapped to 100 on the radar "Heat" axis.
const RADAR_HEAT_SCALE_C: f64 = 45.0;

const MEDIUM_FROM: u8 = 40;
const HIGH_FROM: u8 = 75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub fn from_score(score: u8) -> Self {
        if score < MEDIUM_FROM {
            RiskTier::Low
        } else if score < HIGH_FROM {
            RiskTier::Medium
        } else {
            RiskTier::High
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RiskTier::Low => "Low Risk",
            RiskTier::Medium => "Medium Risk",
            RiskTier::High => "High Risk",
        }
    }

    /// Gauge colour used by the dashboard for this tier.
    pub fn color(&self) -> &'static str {
        match self {
            RiskTier::Low => "#055C43",
            RiskTier::Medium => "#ca8a04",
            RiskTier::High => "#be123c",
        }
    }
}

/// Score plus its tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RiskIndex {
    pub score: u8,
    pub tier: RiskTier,
}

/// Risk index for the given readings.
///
/// Returns `None` when humidity or temperature is missing, or any input is
/// not a finite number; the caller leaves the gauge untouched in that case.
pub fn risk_index(
    fill_percentage: f64,
    humidity_pct: Option<f64>,
    temperature_c: Option<f64>,
) -> Option<RiskIndex> {
    let humidity = humidity_pct?;
    let temperature = temperature_c?;
    if !(fill_percentage.is_finite() && humidity.is_finite() && temperature.is_finite()) {
        return None;
    }

    let raw = fill_percentage * W_FILL
        + humidity * W_HUMIDITY
        + (temperature / HEAT_SCALE_C) * 100.0 * W_HEAT;
    let score = raw.round().clamp(0.0, 100.0) as u8;

    Some(RiskIndex {
        score,
        tier: RiskTier::from_score(score),
    })
}

/// Four-axis environmental snapshot: `[heat, humidity, fill, risk]`.
pub fn radar_axes(
    fill_percentage: f64,
    humidity_pct: f64,
    temperature_c: f64,
    risk: &RiskIndex,
) -> [f64; 4] {
    [
        (temperature_c / RADAR_HEAT_SCALE_C) * 100.0,
        humidity_pct,
        fill_percentage,
        f64::from(risk.score),
    ]
}
