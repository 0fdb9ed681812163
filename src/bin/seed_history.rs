//! Writes a synthetic month of bin history as JSON (stdout, or the path given
//! as the first argument). Load it into the service with `HISTORY_SEED_PATH`.

use anyhow::{Context, Result};
use chrono::Utc;
use smart_bin_dashboard::seed::{generate, SeedPlan};

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let plan = SeedPlan::default();
    let seed = generate(&plan, Utc::now(), &mut rand::rng());
    let json = serde_json::to_string_pretty(&seed).context("serialize seed")?;

    match std::env::args().nth(1) {
        Some(path) => {
            std::fs::write(&path, json).with_context(|| format!("write seed to {path}"))?;
            tracing::info!(
                samples = seed.history.len(),
                bins = seed.statuses.len(),
                path = %path,
                "history seed written"
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}
