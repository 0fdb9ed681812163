//! Reverse geocoding for the location line under a bin card.
//!
//! The lookup goes to the Google Geocoding REST API when
//! `GOOGLE_MAPS_API_KEY` is set; the formatted address is shortened to its
//! first two comma-separated parts.

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

#[async_trait::async_trait]
pub trait ReverseGeocoder: Send + Sync {
    /// Full formatted address of the best match, `None` when nothing matched.
    async fn lookup(&self, lat: f64, lon: f64) -> Result<Option<String>>;
}

/// `"12 Jalan X, George Town, Penang, Malaysia"` -> `"12 Jalan X, George Town"`.
pub fn short_address(formatted: &str) -> String {
    formatted
        .split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Location line shown on cards: short address plus a live marker.
pub fn location_label(formatted: &str) -> String {
    format!("{} · Live", short_address(formatted))
}

pub struct GoogleGeocoder {
    api_key: String,
    base_url: String,
    client: Client,
    timeout: Duration,
}

impl GoogleGeocoder {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: GEOCODE_URL.to_string(),
            client: Client::new(),
            timeout: Duration::from_secs(5),
        }
    }

    pub fn from_env() -> Option<Self> {
        std::env::var("GOOGLE_MAPS_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .map(Self::new)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    formatted_address: String,
}

fn first_address(resp: GeocodeResponse) -> Result<Option<String>> {
    match resp.status.as_str() {
        "OK" => Ok(resp.results.into_iter().next().map(|r| r.formatted_address)),
        "ZERO_RESULTS" => Ok(None),
        other => Err(anyhow!("geocoder status {other}")),
    }
}

#[async_trait::async_trait]
impl ReverseGeocoder for GoogleGeocoder {
    async fn lookup(&self, lat: f64, lon: f64) -> Result<Option<String>> {
        let latlng = format!("{lat},{lon}");
        let resp: GeocodeResponse = self
            .client
            .get(&self.base_url)
            .query(&[("latlng", latlng.as_str()), ("key", self.api_key.as_str())])
            .timeout(self.timeout)
            .send()
            .await
            .context("geocode request")?
            .error_for_status()
            .context("geocode non-2xx")?
            .json()
            .await
            .context("geocode body")?;
        first_address(resp)
    }
}
