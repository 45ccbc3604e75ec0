//! Feature encoding for anomaly scoring
//!
//! Turns aligned records into 8-column feature vectors. Categorical fields are
//! encoded as nominal integer codes assigned in first-encountered order; the
//! resulting [`Vocabulary`] is persisted with the trained model so serving and
//! training agree on every code.

use super::align::AlignedRows;
use crate::error::InsightError;
use crate::models::{FeatureVector, LogRecord, MetricRecord, TaskRecord};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::borrow::Cow;

/// Ordered category values for one field; a value's code is its position
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryTable {
    values: Vec<String>,
}

impl CategoryTable {
    /// Record a value if it is new and return its code
    fn observe(&mut self, value: &str) -> usize {
        match self.position(value) {
            Some(code) => code,
            None => {
                self.values.push(value.to_string());
                self.values.len() - 1
            }
        }
    }

    fn position(&self, value: &str) -> Option<usize> {
        self.values.iter().position(|v| v == value)
    }

    /// Code for a value. Values outside the table share the code `len()`.
    pub fn code(&self, value: &str) -> usize {
        self.position(value).unwrap_or(self.values.len())
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Category tables for the four categorical columns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    pub version: String,
    pub log_level: CategoryTable,
    pub component: CategoryTable,
    pub status: CategoryTable,
    pub priority: CategoryTable,
}

impl Vocabulary {
    /// Build tables from a batch in first-encountered order
    pub fn fit(logs: &[LogRecord], tasks: &[TaskRecord]) -> Self {
        let mut log_level = CategoryTable::default();
        let mut component = CategoryTable::default();
        for log in logs {
            log_level.observe(&log.log_level);
            component.observe(&log.component);
        }

        let mut status = CategoryTable::default();
        let mut priority = CategoryTable::default();
        for task in tasks {
            status.observe(&task.status);
            priority.observe(&task.priority);
        }

        let mut vocabulary = Self {
            version: String::new(),
            log_level,
            component,
            status,
            priority,
        };
        vocabulary.version = vocabulary.fingerprint();
        vocabulary
    }

    /// Content-derived version string, stable for identical tables
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, table) in self.tables() {
            hasher.update(name.as_bytes());
            for value in table.values() {
                hasher.update([0u8]);
                hasher.update(value.as_bytes());
            }
            hasher.update([0xffu8]);
        }
        let digest = hex::encode(hasher.finalize());
        format!("vocab-{}", &digest[..12])
    }

    /// Tables paired with their column names, in feature order
    pub fn tables(&self) -> [(&'static str, &CategoryTable); 4] {
        [
            ("log_level", &self.log_level),
            ("component", &self.component),
            ("status", &self.status),
            ("priority", &self.priority),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogColumns {
    pub log_level: Vec<f64>,
    pub component: Vec<f64>,
}

impl LogColumns {
    pub fn len(&self) -> usize {
        self.log_level.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log_level.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskColumns {
    pub status: Vec<f64>,
    pub priority: Vec<f64>,
}

impl TaskColumns {
    pub fn len(&self) -> usize {
        self.status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricColumns {
    pub cpu_usage: Vec<f64>,
    pub memory_usage: Vec<f64>,
    pub disk_io: Vec<f64>,
    pub network_latency: Vec<f64>,
}

impl MetricColumns {
    pub fn len(&self) -> usize {
        self.cpu_usage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu_usage.is_empty()
    }
}

/// Encoded columns for all three sources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureColumns {
    pub logs: LogColumns,
    pub tasks: TaskColumns,
    pub metrics: MetricColumns,
}

impl FeatureColumns {
    /// True when any source produced zero rows
    pub fn any_empty(&self) -> bool {
        self.logs.is_empty() || self.tasks.is_empty() || self.metrics.is_empty()
    }

    /// Concatenate the column sets into row vectors
    pub fn into_matrix(self) -> Result<Vec<FeatureVector>, InsightError> {
        let (logs, tasks, metrics) = (self.logs, self.tasks, self.metrics);
        if logs.len() != tasks.len() || tasks.len() != metrics.len() {
            return Err(InsightError::ColumnLengthMismatch {
                logs: logs.len(),
                tasks: tasks.len(),
                metrics: metrics.len(),
            });
        }

        Ok((0..metrics.len())
            .map(|i| FeatureVector {
                log_level_code: logs.log_level[i],
                component_code: logs.component[i],
                status_code: tasks.status[i],
                priority_code: tasks.priority[i],
                cpu_usage: metrics.cpu_usage[i],
                memory_usage: metrics.memory_usage[i],
                disk_io: metrics.disk_io[i],
                network_latency: metrics.network_latency[i],
            })
            .collect())
    }
}

/// Encodes records against a vocabulary
pub struct FeatureEncoder<'v> {
    vocabulary: Cow<'v, Vocabulary>,
}

impl<'v> FeatureEncoder<'v> {
    /// Encode with a persisted vocabulary
    pub fn with_vocabulary(vocabulary: &'v Vocabulary) -> Self {
        Self {
            vocabulary: Cow::Borrowed(vocabulary),
        }
    }

    /// Encode with a vocabulary fitted fresh on this batch
    pub fn per_batch(aligned: &AlignedRows<'_>) -> FeatureEncoder<'static> {
        FeatureEncoder {
            vocabulary: Cow::Owned(Vocabulary::fit(aligned.logs, aligned.tasks)),
        }
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn encode_logs(&self, logs: &[LogRecord]) -> LogColumns {
        LogColumns {
            log_level: logs
                .iter()
                .map(|l| self.vocabulary.log_level.code(&l.log_level) as f64)
                .collect(),
            component: logs
                .iter()
                .map(|l| self.vocabulary.component.code(&l.component) as f64)
                .collect(),
        }
    }

    pub fn encode_tasks(&self, tasks: &[TaskRecord]) -> TaskColumns {
        TaskColumns {
            status: tasks
                .iter()
                .map(|t| self.vocabulary.status.code(&t.status) as f64)
                .collect(),
            priority: tasks
                .iter()
                .map(|t| self.vocabulary.priority.code(&t.priority) as f64)
                .collect(),
        }
    }

    pub fn encode_metrics(metrics: &[MetricRecord]) -> MetricColumns {
        MetricColumns {
            cpu_usage: metrics.iter().map(|m| m.cpu_usage).collect(),
            memory_usage: metrics.iter().map(|m| m.memory_usage).collect(),
            disk_io: metrics.iter().map(|m| m.disk_io as f64).collect(),
            network_latency: metrics.iter().map(|m| m.network_latency as f64).collect(),
        }
    }

    pub fn encode_columns(&self, aligned: &AlignedRows<'_>) -> FeatureColumns {
        FeatureColumns {
            logs: self.encode_logs(aligned.logs),
            tasks: self.encode_tasks(aligned.tasks),
            metrics: Self::encode_metrics(aligned.metrics),
        }
    }

    /// Encode aligned rows straight into a feature matrix
    pub fn encode(&self, aligned: &AlignedRows<'_>) -> Result<Vec<FeatureVector>, InsightError> {
        self.encode_columns(aligned).into_matrix()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::align::tests::{log, metric, task};
    use crate::pipeline::align::truncate_to_shortest;

    #[test]
    fn test_codes_follow_first_encounter_order() {
        let logs = vec![log("WARN", "DB"), log("INFO", "API"), log("WARN", "Auth")];
        let vocab = Vocabulary::fit(&logs, &[]);

        assert_eq!(vocab.log_level.values(), ["WARN", "INFO"]);
        assert_eq!(vocab.log_level.code("WARN"), 0);
        assert_eq!(vocab.log_level.code("INFO"), 1);
        assert_eq!(vocab.component.values(), ["DB", "API", "Auth"]);
    }

    #[test]
    fn test_unseen_category_gets_shared_code() {
        let vocab = Vocabulary::fit(&[], &[task("Done", "High"), task("Blocked", "Low")]);
        assert_eq!(vocab.status.code("In Progress"), 2);
        assert_eq!(vocab.status.code("Something Else"), 2);
        assert_eq!(vocab.priority.code("Critical"), 2);
    }

    #[test]
    fn test_fingerprint_tracks_table_contents() {
        let a = Vocabulary::fit(&[log("INFO", "API")], &[task("Done", "Low")]);
        let b = Vocabulary::fit(&[log("INFO", "API")], &[task("Done", "Low")]);
        let c = Vocabulary::fit(&[log("ERROR", "API")], &[task("Done", "Low")]);

        assert_eq!(a.version, b.version);
        assert_ne!(a.version, c.version);
        assert!(a.version.starts_with("vocab-"));
    }

    #[test]
    fn test_encode_produces_fixed_column_order() {
        let logs = vec![log("INFO", "API"), log("ERROR", "DB")];
        let tasks = vec![task("Done", "Low"), task("Done", "High")];
        let metrics = vec![metric(40.0, 50.0, 300, 20), metric(90.0, 70.0, 900, 180)];
        let aligned = truncate_to_shortest(&logs, &tasks, &metrics);

        let matrix = FeatureEncoder::per_batch(&aligned).encode(&aligned).unwrap();
        assert_eq!(matrix.len(), 2);
        assert_eq!(
            matrix[1].to_array(),
            [1.0, 1.0, 0.0, 1.0, 90.0, 70.0, 900.0, 180.0]
        );
    }

    #[test]
    fn test_persisted_vocabulary_overrides_batch_order() {
        let trained = Vocabulary::fit(&[log("ERROR", "DB"), log("INFO", "API")], &[task("Done", "Low")]);
        let logs = vec![log("INFO", "API")];
        let tasks = vec![task("Done", "Low")];
        let metrics = vec![metric(10.0, 10.0, 1, 1)];
        let aligned = truncate_to_shortest(&logs, &tasks, &metrics);

        let matrix = FeatureEncoder::with_vocabulary(&trained).encode(&aligned).unwrap();
        assert_eq!(matrix[0].log_level_code, 1.0);
        assert_eq!(matrix[0].component_code, 1.0);
    }

    #[test]
    fn test_empty_sources_give_zero_row_columns() {
        let metrics = vec![metric(1.0, 1.0, 1, 1)];
        let aligned = truncate_to_shortest(&[], &[], &metrics);
        let columns = FeatureEncoder::per_batch(&aligned).encode_columns(&aligned);

        assert!(columns.any_empty());
        assert_eq!(columns.logs.len(), 0);
        assert_eq!(columns.metrics.len(), 0);
        assert!(columns.into_matrix().unwrap().is_empty());
    }

    #[test]
    fn test_mismatched_columns_are_rejected() {
        let encoder = FeatureEncoder::per_batch(&truncate_to_shortest(&[], &[], &[]));
        let columns = FeatureColumns {
            logs: encoder.encode_logs(&[log("INFO", "API")]),
            tasks: encoder.encode_tasks(&[task("Done", "Low")]),
            metrics: FeatureEncoder::encode_metrics(&[metric(1.0, 1.0, 1, 1), metric(2.0, 2.0, 2, 2)]),
        };

        assert!(matches!(
            columns.into_matrix(),
            Err(InsightError::ColumnLengthMismatch { metrics: 2, .. })
        ));
    }
}
