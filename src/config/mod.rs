// src/config/mod.rs
pub mod fleet;

pub use fleet::{FleetConfig, DEFAULT_FLEET_CONFIG_PATH, ENV_FLEET_CONFIG_PATH};
