//! Core data models for the insights pipeline

use crate::error::InsightError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Event log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub log_level: String,
    pub component: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Work item / ticket record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(
        default,
        rename = "jira_ticket",
        alias = "external_ticket_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub external_ticket_id: Option<String>,
    pub status: String,
    #[serde(
        default,
        rename = "assigned_to",
        alias = "assignee",
        skip_serializing_if = "Option::is_none"
    )]
    pub assignee: Option<String>,
    pub priority: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// Resource usage sample
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Percentage, 0-100
    pub cpu_usage: f64,
    /// Percentage, 0-100
    pub memory_usage: f64,
    pub disk_io: u64,
    /// Milliseconds
    pub network_latency: u64,
}

/// Number of columns in a feature vector
pub const FEATURE_COUNT: usize = 8;

/// Encoded model input for one aligned row.
///
/// Column order is part of the model contract and must not change without
/// retraining.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub log_level_code: f64,
    pub component_code: f64,
    pub status_code: f64,
    pub priority_code: f64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub disk_io: f64,
    pub network_latency: f64,
}

impl FeatureVector {
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.log_level_code,
            self.component_code,
            self.status_code,
            self.priority_code,
            self.cpu_usage,
            self.memory_usage,
            self.disk_io,
            self.network_latency,
        ]
    }
}

/// A single human-readable finding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Insight(String);

impl Insight {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Insight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Insight {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Insight {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// The three telemetry sources
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Logs,
    Tasks,
    Metrics,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Logs, Collection::Tasks, Collection::Metrics];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Logs => "logs",
            Collection::Tasks => "tasks",
            Collection::Metrics => "metrics",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped telemetry as supplied by a request body or the store
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawTelemetry {
    pub logs: Vec<Value>,
    pub tasks: Vec<Value>,
    pub metrics: Vec<Value>,
}

impl RawTelemetry {
    /// Pull the three collections out of a `{"logs", "tasks", "metrics"}` object
    pub fn from_json(value: &Value) -> Result<Self, InsightError> {
        let field = |collection: Collection| -> Result<Vec<Value>, InsightError> {
            match value.get(collection.as_str()) {
                None | Some(Value::Null) => Err(InsightError::MissingCollection(collection)),
                Some(Value::Array(items)) => Ok(items.clone()),
                Some(_) => Err(InsightError::NotAnArray(collection)),
            }
        };

        Ok(Self {
            logs: field(Collection::Logs)?,
            tasks: field(Collection::Tasks)?,
            metrics: field(Collection::Metrics)?,
        })
    }

    pub fn collection(&self, collection: Collection) -> &[Value] {
        match collection {
            Collection::Logs => &self.logs,
            Collection::Tasks => &self.tasks,
            Collection::Metrics => &self.metrics,
        }
    }

    /// True when at least one source has no records
    pub fn has_empty_source(&self) -> bool {
        self.logs.is_empty() || self.tasks.is_empty() || self.metrics.is_empty()
    }

    /// Decode every record into its typed form
    pub fn decode(&self) -> Result<TelemetryBatch, InsightError> {
        Ok(TelemetryBatch {
            logs: decode_records(Collection::Logs, &self.logs)?,
            tasks: decode_records(Collection::Tasks, &self.tasks)?,
            metrics: decode_records(Collection::Metrics, &self.metrics)?,
        })
    }
}

fn decode_records<T: DeserializeOwned>(
    collection: Collection,
    values: &[Value],
) -> Result<Vec<T>, InsightError> {
    values
        .iter()
        .enumerate()
        .map(|(index, value)| {
            T::deserialize(value).map_err(|e| InsightError::MalformedRecord {
                collection,
                index,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Typed telemetry for one analysis invocation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryBatch {
    pub logs: Vec<LogRecord>,
    pub tasks: Vec<TaskRecord>,
    pub metrics: Vec<MetricRecord>,
}

impl TelemetryBatch {
    pub fn new(logs: Vec<LogRecord>, tasks: Vec<TaskRecord>, metrics: Vec<MetricRecord>) -> Self {
        Self {
            logs,
            tasks,
            metrics,
        }
    }

    pub fn has_empty_source(&self) -> bool {
        self.logs.is_empty() || self.tasks.is_empty() || self.metrics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_task_record_accepts_generator_field_names() {
        let task: TaskRecord = serde_json::from_value(json!({
            "task_id": "TASK-1",
            "jira_ticket": "JIRA-1001",
            "status": "Done",
            "assigned_to": "Alice",
            "priority": "High",
            "created_at": "2024-01-01T10:00:00",
            "completed_at": null
        }))
        .unwrap();

        assert_eq!(task.external_ticket_id.as_deref(), Some("JIRA-1001"));
        assert_eq!(task.assignee.as_deref(), Some("Alice"));
        assert!(task.completed_at.is_none());
    }

    #[test]
    fn test_metric_record_accepts_integer_percentages() {
        let metric: MetricRecord = serde_json::from_value(json!({
            "timestamp": "2024-01-01T10:00:00",
            "cpu_usage": 85,
            "memory_usage": 40,
            "disk_io": 500,
            "network_latency": 120
        }))
        .unwrap();

        assert_eq!(metric.cpu_usage, 85.0);
        assert_eq!(metric.network_latency, 120);
    }

    #[test]
    fn test_raw_telemetry_requires_all_collections() {
        let err = RawTelemetry::from_json(&json!({"logs": [], "tasks": []})).unwrap_err();
        assert!(matches!(err, InsightError::MissingCollection(Collection::Metrics)));

        let err = RawTelemetry::from_json(&json!({"logs": {}, "tasks": [], "metrics": []}))
            .unwrap_err();
        assert!(matches!(err, InsightError::NotAnArray(Collection::Logs)));
    }

    #[test]
    fn test_decode_reports_record_position() {
        let raw = RawTelemetry {
            logs: vec![json!({"log_level": "INFO", "component": "API"})],
            tasks: vec![json!({"status": "Done", "priority": "Low"})],
            metrics: vec![
                json!({"cpu_usage": 10, "memory_usage": 20, "disk_io": 1, "network_latency": 2}),
                json!({"memory_usage": 20, "disk_io": 1, "network_latency": 2}),
            ],
        };

        match raw.decode().unwrap_err() {
            InsightError::MalformedRecord {
                collection,
                index,
                reason,
            } => {
                assert_eq!(collection, Collection::Metrics);
                assert_eq!(index, 1);
                assert!(reason.contains("cpu_usage"), "reason was {}", reason);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_feature_vector_column_order() {
        let v = FeatureVector {
            log_level_code: 1.0,
            component_code: 2.0,
            status_code: 3.0,
            priority_code: 4.0,
            cpu_usage: 5.0,
            memory_usage: 6.0,
            disk_io: 7.0,
            network_latency: 8.0,
        };
        assert_eq!(v.to_array(), [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
    }
}
