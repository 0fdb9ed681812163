// src/lib.rs
// Public library surface for the service binary, the seed tool and integration tests.

pub mod api;
pub mod config;
pub mod metrics;

// Evaluator: freshness, fleet aggregation, risk, time-to-full
pub mod eta;
pub mod fleet;
pub mod freshness;
pub mod risk;

// Data, storage and view-model
pub mod dashboard;
pub mod store;
pub mod telemetry;
pub mod view;

// Device ingest, alerts, geocoding, demo data
pub mod alerts;
pub mod geocode;
pub mod ingest;
pub mod notify;
pub mod seed;

// ---- Re-exports for stable public API ----
pub use crate::api::{create_router, AppState};
pub use crate::config::FleetConfig;
pub use crate::dashboard::Dashboard;
pub use crate::notify::{AlertEvent, NotifierMux};

use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

/// State from a loaded config: env-wired channels plus the seed, if any.
pub fn build_state(cfg: FleetConfig) -> anyhow::Result<AppState> {
    let seed_path = cfg.history_seed_path.clone();
    let state = AppState::from_config(cfg);

    if let Some(path) = seed_path {
        let seed = seed::load_from_file(&path)?;
        let n = seed::apply(state.dashboard.store(), seed);
        info!(target: "dashboard", samples = n, path = %path.display(), "history seed loaded");
        state.dashboard.refresh(Utc::now());
    }
    Ok(state)
}

/// Periodic freshness re-check: a bin can go offline without any upload, so
/// the view is recomputed on a timer as well as on every change.
pub fn spawn_freshness_ticker(dashboard: Dashboard, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            dashboard.refresh(Utc::now());
        }
    })
}
