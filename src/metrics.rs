use axum::{routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

use crate::config::FleetConfig;

#[derive(Clone)]
pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder (once) and expose the
    /// configured thresholds as static gauges.
    pub fn init(cfg: &FleetConfig) -> Self {
        static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();
        let handle = HANDLE
            .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
                Ok(h) => h,
                Err(e) => {
                    // Another recorder owns the process; serve an empty exposition.
                    tracing::warn!("prometheus recorder not installed: {e}");
                    PrometheusBuilder::new().build_recorder().handle()
                }
            })
            .clone();

        gauge!("fleet_offline_threshold_ms").set(cfg.offline_threshold_ms as f64);
        gauge!("fleet_configured_bins").set(cfg.devices.len() as f64);

        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router<S: Clone + Send + Sync + 'static>(&self) -> Router<S> {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
