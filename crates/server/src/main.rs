//! Insights server
//!
//! Serves stored telemetry and the insights derived from it. A trained model
//! is loaded once at startup; without one the service answers in fallback
//! mode.

use anyhow::Result;
use insights_lib::{
    health::{components, HealthRegistry},
    observability::{InsightMetrics, StructuredLogger},
    AnomalyModel, AnomalyScorer, InsightSynthesizer, JsonFileStore,
};
use insights_server::{api, config::ServiceConfig};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = ServiceConfig::load()?;
    info!(
        port = config.port,
        model_path = %config.model_path.display(),
        data_dir = %config.data_dir.display(),
        "Service configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::DATA_STORE).await;

    let metrics = InsightMetrics::new();
    let logger = StructuredLogger::new(&config.service_name);

    let scorer: Option<Arc<dyn AnomalyScorer>> = match AnomalyModel::load(&config.model_path) {
        Ok(model) => {
            logger.log_model_loaded(&model.version, &model.vocabulary.version);
            health_registry.register(components::MODEL).await;
            Some(Arc::new(model))
        }
        Err(e) => {
            logger.log_model_unavailable(&config.model_path.display().to_string(), &format!("{:#}", e));
            health_registry
                .set_degraded(components::MODEL, "No trained model, serving fixed insights")
                .await;
            None
        }
    };

    let synthesizer = InsightSynthesizer::new(scorer);
    metrics.set_model(synthesizer.model_version());
    logger.log_startup(SERVICE_VERSION, synthesizer.model_version());

    let store = Arc::new(JsonFileStore::new(&config.data_dir));
    let app_state = Arc::new(api::AppState::new(
        synthesizer,
        store,
        health_registry.clone(),
        logger.clone(),
    ));

    health_registry.set_ready(true).await;

    let shutdown_logger = logger.clone();
    api::serve(config.port, app_state, async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown_logger.log_shutdown("SIGINT received");
        }
    })
    .await?;

    info!("Shutdown complete");
    Ok(())
}
