//! Positional row alignment
//!
//! The three sources carry no shared correlation key, so rows are joined by
//! index position. Collections are truncated to the length of the shortest
//! one and any surplus records are dropped. This is a sampling policy, not a
//! time-based join: row `i` of the logs is only assumed to belong with row `i`
//! of the tasks and metrics.

use crate::models::{LogRecord, MetricRecord, TaskRecord};

/// Equal-length views over the three record collections
#[derive(Debug, Clone, Copy)]
pub struct AlignedRows<'a> {
    pub logs: &'a [LogRecord],
    pub tasks: &'a [TaskRecord],
    pub metrics: &'a [MetricRecord],
}

impl<'a> AlignedRows<'a> {
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over positionally joined rows
    pub fn rows(&self) -> impl Iterator<Item = (&'a LogRecord, &'a TaskRecord, &'a MetricRecord)> {
        let (logs, tasks, metrics) = (self.logs, self.tasks, self.metrics);
        logs.iter()
            .zip(tasks.iter())
            .zip(metrics.iter())
            .map(|((log, task), metric)| (log, task, metric))
    }
}

/// Truncate all three collections to the shortest one, preserving order
pub fn truncate_to_shortest<'a>(
    logs: &'a [LogRecord],
    tasks: &'a [TaskRecord],
    metrics: &'a [MetricRecord],
) -> AlignedRows<'a> {
    let len = logs.len().min(tasks.len()).min(metrics.len());
    AlignedRows {
        logs: &logs[..len],
        tasks: &tasks[..len],
        metrics: &metrics[..len],
    }
}
