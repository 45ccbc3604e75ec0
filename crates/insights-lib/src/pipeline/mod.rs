//! Insight generation pipeline
//!
//! raw records → row alignment → feature encoding → anomaly scoring →
//! insight synthesis

mod align;
mod features;
mod forest;
mod model;
mod synthesizer;

pub use align::{truncate_to_shortest, AlignedRows};
pub use features::{
    CategoryTable, FeatureColumns, FeatureEncoder, LogColumns, MetricColumns, TaskColumns,
    Vocabulary,
};
pub use forest::{ForestConfig, IsolationForest, MIN_TRAINING_ROWS};
pub use model::{train, AnomalyModel, TrainingConfig, ARTIFACT_FORMAT};
pub use synthesizer::{
    messages, HeuristicThresholds, InsightMode, InsightReport, InsightSynthesizer,
};

use crate::models::FeatureVector;
use serde::{Deserialize, Serialize};

/// Per-row model verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Normal,
    Anomaly,
}

/// Trait for anomaly scoring implementations.
///
/// Implementations are loaded once and shared read-only across requests.
pub trait AnomalyScorer: Send + Sync {
    /// One label per input row, in input order
    fn score(&self, matrix: &[FeatureVector]) -> Vec<Label>;

    /// Category vocabulary the scorer was trained with, if any
    fn vocabulary(&self) -> Option<&Vocabulary> {
        None
    }

    fn version(&self) -> &str;
}
