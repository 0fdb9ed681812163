// tests/fleet_config.rs
use smart_bin_dashboard::config::{FleetConfig, ENV_FLEET_CONFIG_PATH};
use std::{env, fs};

const OVERRIDE_VARS: [&str; 4] = [
    "OFFLINE_THRESHOLD_MS",
    "FOCAL_DEVICE_ID",
    "ALERT_COOLDOWN_SECS",
    "HISTORY_SEED_PATH",
];

fn clear_env() {
    env::remove_var(ENV_FLEET_CONFIG_PATH);
    for k in OVERRIDE_VARS {
        env::remove_var(k);
    }
}

#[test]
fn parse_toml_trims_and_dedups_devices() {
    let dir = tempfile::tempdir().unwrap();
    let p = dir.path().join("fleet.toml");
    fs::write(
        &p,
        r#"
devices = [" BIN_A ", "", "BIN_B", "BIN_B"]
focal_device = "BIN_B"
offline_threshold_ms = 30000
"#,
    )
    .unwrap();

    let cfg = FleetConfig::from_path(&p).unwrap();
    assert_eq!(cfg.devices, vec!["BIN_A".to_string(), "BIN_B".to_string()]);
    assert_eq!(cfg.focal_device, "BIN_B");
    assert_eq!(cfg.offline_threshold_ms, 30_000);
    // untouched keys keep their defaults
    assert_eq!(cfg.bin_height_cm, 25.0);
    assert_eq!(cfg.history_window, 15);
    cfg.validate().unwrap();
}

#[test]
fn focal_outside_fleet_is_rejected() {
    let cfg = FleetConfig::from_toml_str(
        r#"
devices = ["BIN_A"]
focal_device = "BIN_Z"
"#,
    )
    .unwrap();
    assert!(cfg.validate().is_err());
}

#[serial_test::serial]
#[test]
fn load_uses_env_then_fallbacks() {
    // Isolate CWD so the repo's own config/ is not read.
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    // 1) Nothing on disk -> built-in defaults
    let cfg = FleetConfig::load().unwrap();
    assert_eq!(cfg.devices.len(), 3);
    assert_eq!(cfg.offline_threshold_ms, 120_000);

    // 2) Fallback TOML in ./config/
    let cfg_dir = tmp.path().join("config");
    fs::create_dir_all(&cfg_dir).unwrap();
    fs::write(
        cfg_dir.join("fleet.toml"),
        r#"
devices = ["BIN_1", "BIN_2"]
focal_device = "BIN_1"
"#,
    )
    .unwrap();
    let cfg = FleetConfig::load().unwrap();
    assert_eq!(cfg.devices, vec!["BIN_1".to_string(), "BIN_2".to_string()]);

    // 3) Explicit path wins
    let p_env = tmp.path().join("other.toml");
    fs::write(
        &p_env,
        r#"
devices = ["X"]
focal_device = "X"
"#,
    )
    .unwrap();
    env::set_var(ENV_FLEET_CONFIG_PATH, p_env.display().to_string());
    let cfg = FleetConfig::load().unwrap();
    assert_eq!(cfg.devices, vec!["X".to_string()]);

    // 4) Explicit path that does not exist is an error, not a silent fallback
    env::set_var(ENV_FLEET_CONFIG_PATH, tmp.path().join("missing.toml"));
    assert!(FleetConfig::load().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}

#[serial_test::serial]
#[test]
fn env_overrides_apply_after_file() {
    let old = env::current_dir().unwrap();
    let tmp = tempfile::tempdir().unwrap();
    env::set_current_dir(tmp.path()).unwrap();
    clear_env();

    env::set_var("OFFLINE_THRESHOLD_MS", "30000");
    env::set_var("FOCAL_DEVICE_ID", "ESP32_BIN_02");
    env::set_var("ALERT_COOLDOWN_SECS", "-5");

    let cfg = FleetConfig::load().unwrap();
    assert_eq!(cfg.offline_threshold_ms, 30_000);
    assert_eq!(cfg.offline_threshold(), chrono::Duration::seconds(30));
    assert_eq!(cfg.focal_device, "ESP32_BIN_02");
    assert_eq!(cfg.alert_cooldown_secs, 0);

    // focal override outside the fleet fails validation
    env::set_var("FOCAL_DEVICE_ID", "ESP32_BIN_99");
    assert!(FleetConfig::load().is_err());

    clear_env();
    env::set_current_dir(&old).unwrap();
}
