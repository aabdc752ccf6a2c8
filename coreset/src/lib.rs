//! Coreset-accelerated training: periodically selects a weighted subset of the training data
//! and trains on it instead of the full dataset.

pub mod builder;
pub mod configs;
pub mod controller;
pub mod error;
pub mod eval;
pub mod isolation;
pub mod metrics;
pub mod run_log;
pub mod run_spec;
pub mod schedule;
pub mod strategy;
pub mod subset;
pub mod trainer;

use builder::RunBuilder;
use configs::{Adapter, RunConfig};
use metrics::MetricsRecorder;
use run_log::RunLog;

pub use error::{CoresetErr, Result};

/// Validates `config`, trains to completion and writes the results file.
///
/// # Errors
/// Returns a `CoresetErr` if the configuration is invalid or any epoch fails.
pub fn train(config: RunConfig) -> Result<MetricsRecorder> {
    log::info!("adapting configs");
    let adapter = Adapter::new();
    let spec = adapter.adapt(config)?;

    let path = run_log::log_path(
        &spec.train.results_dir,
        &spec.strategy.name,
        &spec.data.name,
        spec.strategy.fraction,
        spec.strategy.select_every,
    );

    let mut run = RunBuilder::new().build(spec)?;
    let mut log = RunLog::create(&path)?;
    log::info!("writing results to {}", path.display());

    let metrics = run.run(&mut log)?;
    Ok(metrics.clone())
}
