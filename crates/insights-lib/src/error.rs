//! Domain errors for the insights pipeline

use crate::models::Collection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InsightError {
    #[error("missing `{0}` collection in payload")]
    MissingCollection(Collection),

    #[error("`{0}` must be an array of records")]
    NotAnArray(Collection),

    #[error("malformed {collection} record at index {index}: {reason}")]
    MalformedRecord {
        collection: Collection,
        index: usize,
        reason: String,
    },

    #[error("feature columns have mismatched lengths: logs={logs}, tasks={tasks}, metrics={metrics}")]
    ColumnLengthMismatch {
        logs: usize,
        tasks: usize,
        metrics: usize,
    },

    #[error("model returned {labels} labels for {rows} rows")]
    LabelCountMismatch { rows: usize, labels: usize },

    #[error("insufficient training data: need {needed} aligned rows, have {have}")]
    InsufficientTrainingData { needed: usize, have: usize },

    #[error("contamination must be in (0, 0.5], got {0}")]
    InvalidContamination(f64),
}
