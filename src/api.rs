use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio_stream::{wrappers::WatchStream, Stream, StreamExt as _};
use tower_http::{cors::CorsLayer, services::ServeDir};

use crate::alerts::AlertDispatcher;
use crate::config::FleetConfig;
use crate::dashboard::{CommandAck, Dashboard};
use crate::geocode::{self, GoogleGeocoder, ReverseGeocoder};
use crate::ingest;
use crate::metrics::Metrics;
use crate::notify::NotifierMux;
use crate::telemetry::DeviceUpload;
use crate::view::{DashboardView, FleetAverages, FleetOverview, FocalDetail};

const DEFAULT_AVERAGE_DAYS: u32 = 7;
const MAX_AVERAGE_DAYS: u32 = 365;

#[derive(Clone)]
pub struct AppState {
    pub dashboard: Dashboard,
    pub alerts: AlertDispatcher,
    pub geocoder: Option<Arc<dyn ReverseGeocoder>>,
}

impl AppState {
    pub fn new(dashboard: Dashboard, alerts: AlertDispatcher) -> Self {
        Self {
            dashboard,
            alerts,
            geocoder: None,
        }
    }

    /// State wired from the environment: notifier channels and geocoder.
    pub fn from_config(cfg: FleetConfig) -> Self {
        let alerts = AlertDispatcher::new(NotifierMux::from_env(), cfg.alert_cooldown_secs);
        let geocoder = GoogleGeocoder::from_env().map(|g| Arc::new(g) as Arc<dyn ReverseGeocoder>);
        Self {
            dashboard: Dashboard::new(cfg),
            alerts,
            geocoder,
        }
    }

    pub fn with_geocoder(mut self, geocoder: Arc<dyn ReverseGeocoder>) -> Self {
        self.geocoder = Some(geocoder);
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("No JSON received")]
    BadBody,
    #[error("unknown device `{0}`")]
    UnknownDevice(String),
    #[error("no location for `{0}`")]
    NoLocation(String),
    #[error("geocoding failed: {0:#}")]
    Geocode(anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::BadBody => StatusCode::BAD_REQUEST,
            ApiError::UnknownDevice(_) | ApiError::NoLocation(_) => StatusCode::NOT_FOUND,
            ApiError::Geocode(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!("request failed: {self}");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

pub fn create_router(state: AppState) -> Router {
    let metrics = Metrics::init(state.dashboard.config());
    let static_dir = state.dashboard.config().static_dir.clone();

    let router = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/ingest", post(ingest_upload))
        .route("/api/dashboard", get(dashboard_view))
        .route("/api/fleet", get(fleet_overview))
        .route("/api/focal", get(focal_detail))
        .route("/api/fleet/averages", get(fleet_averages))
        .route("/api/devices/{id}/reset", post(reset_device))
        .route("/api/devices/{id}/location", get(device_location))
        .route("/api/events", get(dashboard_events))
        .merge(metrics.router())
        .layer(CorsLayer::very_permissive())
        .with_state(state);

    match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    }
}

async fn ingest_upload(
    State(state): State<AppState>,
    body: Result<Json<DeviceUpload>, JsonRejection>,
) -> Result<String, ApiError> {
    let Json(upload) = body.map_err(|e| {
        tracing::debug!(target: "ingest", "rejected upload body: {e}");
        ApiError::BadBody
    })?;
    match ingest::handle(&state.dashboard, &state.alerts, upload, Utc::now()) {
        ingest::IngestOutcome::UnknownDevice(id) => Err(ApiError::UnknownDevice(id)),
        outcome => Ok(outcome.reply_text().to_string()),
    }
}

async fn dashboard_view(State(state): State<AppState>) -> Json<DashboardView> {
    Json(state.dashboard.current().as_ref().clone())
}

async fn fleet_overview(State(state): State<AppState>) -> Json<FleetOverview> {
    Json(state.dashboard.current().overview.clone())
}

async fn focal_detail(State(state): State<AppState>) -> Json<Option<FocalDetail>> {
    Json(state.dashboard.current().focal.clone())
}

#[derive(Debug, Deserialize)]
struct AveragesQuery {
    #[serde(default)]
    days: Option<u32>,
}

async fn fleet_averages(
    State(state): State<AppState>,
    Query(q): Query<AveragesQuery>,
) -> Json<FleetAverages> {
    let days = q
        .days
        .unwrap_or(DEFAULT_AVERAGE_DAYS)
        .clamp(1, MAX_AVERAGE_DAYS);
    Json(state.dashboard.fleet_averages(days, Utc::now()))
}

async fn reset_device(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<CommandAck>, ApiError> {
    if !state.dashboard.config().is_known_device(&id) {
        return Err(ApiError::UnknownDevice(id));
    }
    Ok(Json(state.dashboard.issue_reset(&id, Utc::now())))
}

#[derive(Debug, Serialize)]
struct LocationOut {
    device_id: String,
    address: String,
    label: String,
}

async fn device_location(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LocationOut>, ApiError> {
    if !state.dashboard.config().is_known_device(&id) {
        return Err(ApiError::UnknownDevice(id));
    }
    let coords = state
        .dashboard
        .store()
        .status(&id)
        .and_then(|s| s.coordinates());
    let (Some((lat, lon)), Some(geocoder)) = (coords, state.geocoder.as_ref()) else {
        return Err(ApiError::NoLocation(id));
    };

    let formatted = geocoder
        .lookup(lat, lon)
        .await
        .map_err(ApiError::Geocode)?
        .ok_or_else(|| ApiError::NoLocation(id.clone()))?;

    Ok(Json(LocationOut {
        device_id: id,
        address: geocode::short_address(&formatted),
        label: geocode::location_label(&formatted),
    }))
}

async fn dashboard_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = WatchStream::new(state.dashboard.subscribe())
        .map(|view| Event::default().event("dashboard").json_data(view.as_ref()));
    Sse::new(stream).keep_alive(KeepAlive::default())
}
