//! CLI command implementations

pub mod analyze;
pub mod remote;
pub mod train;

use anyhow::{Context, Result};
use insights_lib::{JsonFileStore, RawTelemetry, TelemetryStore};
use std::path::Path;

/// Read `logs.json`, `tasks.json` and `metrics.json` from a directory
pub async fn load_data_dir(data_dir: &Path) -> Result<RawTelemetry> {
    JsonFileStore::new(data_dir)
        .load_all()
        .await
        .with_context(|| format!("Failed to load telemetry from {:?}", data_dir))
}
