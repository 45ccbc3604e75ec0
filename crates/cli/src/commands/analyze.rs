//! Local insight generation

use anyhow::Result;
use insights_lib::{AnomalyModel, AnomalyScorer, InsightReport, InsightSynthesizer};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

use super::load_data_dir;
use crate::output::{color_status, print_error, print_info, print_insights, OutputFormat};

/// Load a model, falling back to no-model mode when it is missing or invalid
fn load_scorer(model_path: &Path) -> Option<Arc<dyn AnomalyScorer>> {
    match AnomalyModel::load(model_path) {
        Ok(model) => {
            debug!(version = %model.version, "Model loaded");
            Some(Arc::new(model))
        }
        Err(e) => {
            warn!(path = %model_path.display(), error = %format!("{:#}", e), "Model unavailable");
            None
        }
    }
}

/// Generate insights for a data directory without a server
pub async fn run_analyze(data_dir: &Path, model_path: &Path, format: OutputFormat) -> Result<()> {
    let synthesizer = InsightSynthesizer::new(load_scorer(model_path));

    let report = match load_data_dir(data_dir).await {
        Ok(raw) => synthesizer.generate_raw(&raw),
        Err(e) => InsightReport::failed(&format!("{:#}", e)),
    };

    if let OutputFormat::Table = format {
        let model = synthesizer.model_version().unwrap_or("none");
        print_info(&format!(
            "Mode: {}  Model: {}",
            color_status(report.mode.as_str()),
            model
        ));
    }
    print_insights(&report.insights, format);

    if report.is_failure() {
        print_error("Insight generation failed");
        anyhow::bail!("insight generation failed");
    }
    Ok(())
}
