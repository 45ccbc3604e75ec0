//! HTTP API: raw collections, insights, health and Prometheus metrics

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use insights_lib::{
    health::{components, ComponentStatus, HealthRegistry},
    observability::{InsightMetrics, StructuredLogger},
    Collection, InsightReport, InsightSynthesizer, RawTelemetry, TelemetryStore,
};
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Routes advertised by `/health`
pub const ENDPOINTS: [&str; 5] = ["/logs", "/tasks", "/metrics", "/insights", "/health"];

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub synthesizer: InsightSynthesizer,
    pub store: Arc<dyn TelemetryStore>,
    pub health_registry: HealthRegistry,
    pub metrics: InsightMetrics,
    pub logger: StructuredLogger,
}

impl AppState {
    pub fn new(
        synthesizer: InsightSynthesizer,
        store: Arc<dyn TelemetryStore>,
        health_registry: HealthRegistry,
        logger: StructuredLogger,
    ) -> Self {
        Self {
            synthesizer,
            store,
            health_registry,
            metrics: InsightMetrics::new(),
            logger,
        }
    }

    fn record(&self, source: &str, report: &InsightReport, started: Instant) {
        let elapsed = started.elapsed();
        self.metrics.record_report(report, elapsed);
        self.logger.log_report(source, report, elapsed);
    }

    async fn store_failed(&self, e: &anyhow::Error) {
        self.health_registry
            .set(components::DATA_STORE, store_failure_status(e), Some(format!("{:#}", e)))
            .await;
    }
}

/// Unreadable storage takes the data store down; unparseable content degrades it
fn store_failure_status(e: &anyhow::Error) -> ComponentStatus {
    if e.chain().any(|cause| cause.is::<std::io::Error>()) {
        ComponentStatus::Unhealthy
    } else {
        ComponentStatus::Degraded
    }
}

/// Wire shape of every insight response
#[derive(Debug, Serialize)]
pub struct InsightsBody {
    pub insights: Vec<String>,
}

fn respond(report: InsightReport) -> (StatusCode, Json<InsightsBody>) {
    let status = if report.is_failure() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    let insights = report.texts().map(str::to_string).collect();
    (status, Json(InsightsBody { insights }))
}

#[derive(Debug, Serialize)]
struct ServiceHealth {
    status: ComponentStatus,
    model_loaded: bool,
    model_version: Option<String>,
    endpoints: Vec<&'static str>,
    components: HashMap<String, insights_lib::ComponentHealth>,
}

/// Service health; 200 while operational, 503 when a component is unhealthy
async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = if health.status.is_operational() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let body = ServiceHealth {
        status: health.status,
        model_loaded: state.synthesizer.has_model(),
        model_version: state.synthesizer.model_version().map(str::to_string),
        endpoints: ENDPOINTS.to_vec(),
        components: health.components,
    };
    (status_code, Json(body))
}

async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Raw stored collection as a JSON array
async fn raw_collection(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Json<Vec<Value>>, (StatusCode, String)> {
    let collection = match name.as_str() {
        "logs" => Collection::Logs,
        "tasks" => Collection::Tasks,
        "metrics" => Collection::Metrics,
        _ => return Err((StatusCode::NOT_FOUND, format!("Unknown collection: {}", name))),
    };

    match state.store.load(collection).await {
        Ok(records) => {
            state.health_registry.set_healthy(components::DATA_STORE).await;
            Ok(Json(records))
        }
        Err(e) => {
            error!(collection = %collection, error = %e, "Failed to load collection");
            state.store_failed(&e).await;
            Err((StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e)))
        }
    }
}

/// Insights over the stored collections
async fn stored_insights(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let started = Instant::now();

    let report = match state.store.load_all().await {
        Ok(raw) => {
            state.health_registry.set_healthy(components::DATA_STORE).await;
            state.synthesizer.generate_raw(&raw)
        }
        Err(e) => {
            error!(error = %e, "Failed to load stored telemetry");
            state.store_failed(&e).await;
            InsightReport::failed(&e)
        }
    };

    state.record("store", &report, started);
    respond(report)
}

/// Insights over a posted `{"logs", "tasks", "metrics"}` payload
///
/// A body that is not JSON gets the same diagnostic as a malformed payload.
async fn posted_insights(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> impl IntoResponse {
    let started = Instant::now();

    let report = match payload {
        Ok(Json(payload)) => match RawTelemetry::from_json(&payload) {
            Ok(raw) => state.synthesizer.generate_raw(&raw),
            Err(e) => InsightReport::failed(&e),
        },
        Err(rejection) => InsightReport::failed(&rejection.body_text()),
    };

    state.record("request", &report, started);
    respond(report)
}

/// Prometheus metrics endpoint
async fn prometheus_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            e.to_string().into_bytes(),
        );
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/insights", get(stored_insights).post(posted_insights))
        .route("/health", get(health))
        .route("/readyz", get(readyz))
        .route("/prometheus", get(prometheus_metrics))
        .route("/:collection", get(raw_collection))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the API server; returns when `shutdown` resolves
pub async fn serve(
    port: u16,
    state: Arc<AppState>,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", port);
    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
