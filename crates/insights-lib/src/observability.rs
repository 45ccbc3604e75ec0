//! Metrics and structured event logging for insight generation
//!
//! Prometheus collectors live in the default registry and are registered once
//! per process; [`InsightMetrics`] is a cheap handle onto them.

use crate::pipeline::{InsightMode, InsightReport};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge_vec,
    Histogram, IntCounter, IntCounterVec, IntGaugeVec,
};
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info, warn};

/// Report latency buckets (seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
];

static GLOBAL_METRICS: OnceLock<InsightMetricsInner> = OnceLock::new();

struct InsightMetricsInner {
    reports_total: IntCounterVec,
    anomalies_detected: IntCounter,
    rows_scored: IntCounter,
    report_latency_seconds: Histogram,
    model_loaded: IntGaugeVec,
}

impl InsightMetricsInner {
    fn new() -> Self {
        Self {
            reports_total: register_int_counter_vec!(
                "insights_reports_total",
                "Insight reports generated, by synthesis mode",
                &["mode"]
            )
            .expect("Failed to register reports_total"),

            anomalies_detected: register_int_counter!(
                "insights_anomalies_detected_total",
                "Rows labelled anomalous by the model"
            )
            .expect("Failed to register anomalies_detected"),

            rows_scored: register_int_counter!(
                "insights_rows_scored_total",
                "Aligned rows passed through the model"
            )
            .expect("Failed to register rows_scored"),

            report_latency_seconds: register_histogram!(
                "insights_report_latency_seconds",
                "Time spent producing one insight report",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register report_latency_seconds"),

            model_loaded: register_int_gauge_vec!(
                "insights_model_loaded",
                "Whether a trained model is loaded, labelled with its version",
                &["version"]
            )
            .expect("Failed to register model_loaded"),
        }
    }
}

/// Handle to the process-wide insight metrics
#[derive(Clone)]
pub struct InsightMetrics {
    _private: (),
}

impl Default for InsightMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl InsightMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(InsightMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &InsightMetricsInner {
        GLOBAL_METRICS.get_or_init(InsightMetricsInner::new)
    }

    /// Count a finished report and its latency
    pub fn record_report(&self, report: &InsightReport, elapsed: Duration) {
        let inner = self.inner();
        inner
            .reports_total
            .with_label_values(&[report.mode.as_str()])
            .inc();
        inner.report_latency_seconds.observe(elapsed.as_secs_f64());

        if let InsightMode::Scored { anomalies, rows } = report.mode {
            inner.anomalies_detected.inc_by(anomalies as u64);
            inner.rows_scored.inc_by(rows as u64);
        }
    }

    /// Publish the loaded model version; `None` means fallback mode
    pub fn set_model(&self, version: Option<&str>) {
        let gauge = &self.inner().model_loaded;
        gauge.reset();
        match version {
            Some(version) => gauge.with_label_values(&[version]).set(1),
            None => gauge.with_label_values(&["none"]).set(0),
        }
    }

    pub fn reports_for(&self, mode: &str) -> u64 {
        self.inner().reports_total.with_label_values(&[mode]).get()
    }
}

/// Structured logger for service events
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    pub fn log_startup(&self, version: &str, model_version: Option<&str>) {
        info!(
            event = "service_started",
            service = %self.service,
            service_version = %version,
            model_version = model_version.unwrap_or("none"),
            "Insights service started"
        );
    }

    pub fn log_model_loaded(&self, model_version: &str, vocabulary_version: &str) {
        info!(
            event = "model_loaded",
            service = %self.service,
            model_version = %model_version,
            vocabulary_version = %vocabulary_version,
            "Anomaly model loaded"
        );
    }

    pub fn log_model_unavailable(&self, path: &str, reason: &str) {
        warn!(
            event = "model_unavailable",
            service = %self.service,
            path = %path,
            reason = %reason,
            "No usable model, serving fixed insights"
        );
    }

    /// One line per report; failures are logged at error level
    pub fn log_report(&self, source: &str, report: &InsightReport, elapsed: Duration) {
        let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
        match report.mode {
            InsightMode::Failed => error!(
                event = "insights_failed",
                service = %self.service,
                source = %source,
                elapsed_ms = elapsed_ms,
                "Insight generation failed"
            ),
            InsightMode::Scored { anomalies, rows } => info!(
                event = "insights_generated",
                service = %self.service,
                source = %source,
                mode = report.mode.as_str(),
                anomalies = anomalies,
                rows = rows,
                insights = report.insights.len(),
                elapsed_ms = elapsed_ms,
                "Insights generated"
            ),
            _ => info!(
                event = "insights_generated",
                service = %self.service,
                source = %source,
                mode = report.mode.as_str(),
                insights = report.insights.len(),
                elapsed_ms = elapsed_ms,
                "Insights generated"
            ),
        }
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Insights service shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Insight;

    #[test]
    fn test_record_report_counts_by_mode() {
        let metrics = InsightMetrics::new();
        let report = InsightReport {
            insights: vec![Insight::from("⚠️ No data available for analysis")],
            mode: InsightMode::NoData,
        };

        let before = metrics.reports_for("no_data");
        metrics.record_report(&report, Duration::from_millis(3));
        assert!(metrics.reports_for("no_data") > before);
    }

    #[test]
    fn test_set_model_accepts_absent_model() {
        let metrics = InsightMetrics::new();
        metrics.set_model(Some("v20240101000000"));
        metrics.set_model(None);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("insights-server");
        assert_eq!(logger.service, "insights-server");
    }
}
