//! Smart Bin Dashboard: binary entrypoint.
//! Loads the fleet config, seeds the store if asked to, starts the freshness
//! ticker and hands the router to Shuttle.

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use smart_bin_dashboard::{build_state, create_router, spawn_freshness_ticker, FleetConfig};

const DEFAULT_LOG_FILTER: &str = "dashboard=info,ingest=info,alerts=info,warn";

/// Local logging is opt-in: DASHBOARD_DEV_LOG=1 in a debug build, or with
/// SHUTTLE_ENV set to a local/dev environment.
fn dev_logging_requested() -> bool {
    let flag = std::env::var("DASHBOARD_DEV_LOG").is_ok_and(|v| v == "1");
    let local = cfg!(debug_assertions)
        || std::env::var("SHUTTLE_ENV").is_ok_and(|env| {
            matches!(
                env.to_ascii_lowercase().as_str(),
                "local" | "development" | "dev"
            )
        });
    flag && local
}

/// DASHBOARD_LOG_FORMAT=json switches to one JSON object per line.
fn init_dev_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("DASHBOARD_LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));

    let registry = tracing_subscriber::registry().with(filter);
    // Shuttle may already own the global subscriber.
    let _ = if json {
        registry.with(fmt::layer().json().with_current_span(false)).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // .env is optional; production reads the real environment.
    let _ = dotenvy::dotenv();

    if dev_logging_requested() {
        init_dev_tracing();
    }

    let cfg = FleetConfig::load()?;
    let tick = cfg.freshness_tick();
    let state = build_state(cfg)?;

    spawn_freshness_ticker(state.dashboard.clone(), tick);

    let cfg = state.dashboard.config();
    tracing::info!(
        target: "dashboard",
        bins = cfg.devices.len(),
        focal = %cfg.focal_device,
        offline_after_ms = cfg.offline_threshold_ms,
        "smart bin dashboard ready"
    );

    Ok(create_router(state).into())
}
