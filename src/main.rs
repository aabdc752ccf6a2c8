use std::{env, process};

use anyhow::{Context, Result};
use coreset::configs::RunConfig;
use log::{error, info};

const DEFAULT_CONFIG: &str = "demos/blobs_craigpb_warm.json";

fn run() -> Result<()> {
    let path = env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    info!("reading run configuration from {path}");

    let config =
        RunConfig::from_path(&path).with_context(|| format!("could not load config {path}"))?;
    let metrics = coreset::train(config).context("training failed")?;

    info!(
        "trained {} epochs, {} selections, {:.4} hours",
        metrics.records().len(),
        metrics.selections().len(),
        metrics.total_hours()
    );
    Ok(())
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        error!("{e:#}");
        process::exit(1);
    }
}
