// tests/evaluator_flow.rs
//
// End-to-end evaluator behaviour driven through the ingest path with
// explicit timestamps: time-to-full, offline transitions, the published view
// and a seeded startup.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::fs;

use smart_bin_dashboard::alerts::AlertDispatcher;
use smart_bin_dashboard::fleet::DeviceBadge;
use smart_bin_dashboard::telemetry::DeviceUpload;
use smart_bin_dashboard::{build_state, ingest, seed, Dashboard, FleetConfig};

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
}

fn reading(device: &str, fill: f64, level: f64) -> DeviceUpload {
    DeviceUpload {
        device_id: Some(device.to_string()),
        fill_percentage: Some(fill),
        trash_level_cm: Some(level),
        temp_c: Some(25.0),
        humidity_pct: Some(50.0),
        lat: Some(5.314),
        lon: Some(100.312),
        ..DeviceUpload::default()
    }
}

#[test]
fn focal_eta_appears_after_five_samples() {
    let dash = Dashboard::new(FleetConfig::default());
    let alerts = AlertDispatcher::disabled();

    // Level 20 cm -> 10 cm over 30 minutes, threshold 5 cm: 15 minutes left.
    let levels = [20.0, 17.5, 15.0, 12.5, 10.0];
    for (i, level) in levels.iter().enumerate() {
        let at = t0() + Duration::seconds(450 * i as i64);
        ingest::handle(&dash, &alerts, reading("ESP32_BIN_01", 40.0 + 10.0 * i as f64, *level), at);

        let focal = dash.current().focal.clone().expect("focal present");
        if i < 4 {
            assert_eq!(focal.eta_text, None, "sample {i} must not show an estimate");
        } else {
            assert_eq!(focal.eta_text.as_deref(), Some("Full in ~15 mins"));
        }
    }

    let focal = dash.current().focal.clone().unwrap();
    assert_eq!(focal.raw_level_text.as_deref(), Some("10 cm"));
    assert_eq!(focal.fill_series.values, vec![40.0, 50.0, 60.0, 70.0, 80.0]);
    assert_eq!(focal.fill_series.labels[0], "08:00");
    assert_eq!(focal.sync_text, "Sync: 0s ago");
}

#[test]
fn fill_only_uploads_show_no_level_or_eta() {
    let dash = Dashboard::new(FleetConfig::default());
    let alerts = AlertDispatcher::disabled();

    for i in 0..5 {
        let upload = DeviceUpload {
            device_id: Some("ESP32_BIN_01".to_string()),
            fill_percentage: Some(40.0 + 10.0 * i as f64),
            ..DeviceUpload::default()
        };
        ingest::handle(&dash, &alerts, upload, t0() + Duration::seconds(450 * i));
    }

    let focal = dash.current().focal.clone().expect("focal present");
    assert_eq!(focal.eta_text, None);
    assert_eq!(focal.raw_level_text, None);
    assert_eq!(focal.fill_series.values, vec![40.0, 50.0, 60.0, 70.0, 80.0]);
    assert!(dash
        .store()
        .latest_history("ESP32_BIN_01", 5)
        .iter()
        .all(|s| s.trash_level_cm.is_none()));
}

#[test]
fn silent_bins_go_offline_on_refresh() {
    let dash = Dashboard::new(FleetConfig::default());
    let alerts = AlertDispatcher::disabled();
    ingest::handle(&dash, &alerts, reading("ESP32_BIN_01", 10.0, 22.5), t0());
    ingest::handle(&dash, &alerts, reading("ESP32_BIN_02", 96.0, 1.0), t0());

    let view = dash.refresh(t0() + Duration::seconds(60));
    assert_eq!(view.overview.summary.active_count, 2);
    assert_eq!(view.overview.summary.alert_count, 1);
    assert_eq!(view.overview.summary.health_percent, 67);
    assert_eq!(view.overview.cards[1].badge, DeviceBadge::Full);

    // Exactly at the threshold a bin is still online.
    let view = dash.refresh(t0() + Duration::seconds(120));
    assert_eq!(view.overview.summary.active_count, 2);

    let view = dash.refresh(t0() + Duration::seconds(121));
    assert_eq!(view.overview.summary.active_count, 0);
    assert_eq!(view.overview.summary.health_percent, 0);
    // a full bin that went silent is still counted as an alert
    assert_eq!(view.overview.summary.alert_count, 1);
    assert!(view.overview.cards.iter().all(|c| c.badge == DeviceBadge::Offline));
    assert_eq!(view.overview.cards[0].last_seen_text, "2m ago");
}

#[tokio::test]
async fn subscribers_see_every_refresh() {
    let dash = Dashboard::new(FleetConfig::default());
    let alerts = AlertDispatcher::disabled();
    let mut rx = dash.subscribe();
    rx.borrow_and_update();

    ingest::handle(&dash, &alerts, reading("ESP32_BIN_03", 30.0, 17.5), t0());
    rx.changed().await.expect("sender alive");
    let view = rx.borrow_and_update().clone();
    assert_eq!(view.overview.summary.active_count, 1);
    assert_eq!(view.overview.cards[2].fill_text, "30%");
}

#[test]
fn seeded_state_serves_history_and_averages() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("seed.json");

    let now = Utc::now();
    let mut rng = <rand::rngs::StdRng as rand::SeedableRng>::seed_from_u64(7);
    let plan = seed::SeedPlan {
        days: 3,
        ..seed::SeedPlan::default()
    };
    let generated = seed::generate(&plan, now, &mut rng);
    fs::write(&path, serde_json::to_string(&generated).unwrap()).unwrap();

    let cfg = FleetConfig {
        history_seed_path: Some(path),
        ..FleetConfig::default()
    };
    let state = build_state(cfg).unwrap();
    let dash = &state.dashboard;

    assert_eq!(dash.store().history_len("ESP32_BIN_02"), 12);
    let view = dash.current();
    assert_eq!(view.overview.summary.active_count, 3);
    let focal = view.focal.as_ref().unwrap();
    assert!(focal.risk.is_some());
    assert_eq!(focal.fill_series.values.len(), 12);

    let avg = dash.fleet_averages(7, now);
    assert!(avg.devices.iter().all(|d| d.samples == 12 && d.average_fill > 0.0));
}
