//! Trained anomaly model artifact
//!
//! The artifact bundles the isolation forest with the category vocabulary it
//! was trained against. It is written as JSON next to a `.sha256` sidecar and
//! verified on load.

use super::align::truncate_to_shortest;
use super::features::{FeatureEncoder, Vocabulary};
use super::forest::{FeatureRow, ForestConfig, IsolationForest};
use super::{AnomalyScorer, Label};
use crate::error::InsightError;
use crate::models::{FeatureVector, TelemetryBatch};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Artifact layout version understood by this build
pub const ARTIFACT_FORMAT: u32 = 1;

/// Settings for the offline training job
#[derive(Debug, Clone, Default)]
pub struct TrainingConfig {
    pub forest: ForestConfig,
    /// Explicit model version; derived from the training time when absent
    pub version: Option<String>,
}

/// Isolation forest plus the vocabulary it was trained with
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyModel {
    pub format: u32,
    pub version: String,
    pub trained_at: i64,
    pub training_rows: usize,
    pub vocabulary: Vocabulary,
    forest: IsolationForest,
}

impl AnomalyModel {
    pub fn contamination(&self) -> f64 {
        self.forest.contamination()
    }

    pub fn forest(&self) -> &IsolationForest {
        &self.forest
    }

    /// Write the artifact and its checksum sidecar, returning the checksum
    pub fn save(&self, path: &Path) -> Result<String> {
        let bytes = serde_json::to_vec_pretty(self).context("Failed to serialize model")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create model directory {:?}", parent))?;
        }

        let checksum = compute_checksum(&bytes);
        fs::write(path, &bytes).with_context(|| format!("Failed to write model {:?}", path))?;
        fs::write(checksum_path(path), format!("{}\n", checksum))
            .context("Failed to write model checksum")?;

        info!(
            version = %self.version,
            path = %path.display(),
            size = bytes.len(),
            checksum = %checksum,
            "Model artifact saved"
        );
        Ok(checksum)
    }

    /// Read an artifact, verifying the sidecar checksum when present
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read model {:?}", path))?;

        let sidecar = checksum_path(path);
        match fs::read_to_string(&sidecar) {
            Ok(expected) => {
                let expected = expected.trim();
                let computed = compute_checksum(&bytes);
                if computed != expected {
                    anyhow::bail!("Checksum mismatch: expected {}, got {}", expected, computed);
                }
                debug!(checksum = %computed, "Model checksum validated");
            }
            Err(_) => warn!(path = %sidecar.display(), "No checksum sidecar, skipping validation"),
        }

        let model: AnomalyModel =
            serde_json::from_slice(&bytes).context("Failed to parse model artifact")?;
        if model.format != ARTIFACT_FORMAT {
            anyhow::bail!(
                "Unsupported artifact format {}, expected {}",
                model.format,
                ARTIFACT_FORMAT
            );
        }

        info!(
            version = %model.version,
            vocabulary = %model.vocabulary.version,
            trees = model.forest.n_trees(),
            "Model artifact loaded"
        );
        Ok(model)
    }
}

impl AnomalyScorer for AnomalyModel {
    fn score(&self, matrix: &[FeatureVector]) -> Vec<Label> {
        matrix
            .iter()
            .map(|row| {
                if self.forest.is_anomaly(&row.to_array()) {
                    Label::Anomaly
                } else {
                    Label::Normal
                }
            })
            .collect()
    }

    fn vocabulary(&self) -> Option<&Vocabulary> {
        Some(&self.vocabulary)
    }

    fn version(&self) -> &str {
        &self.version
    }
}

/// Offline training job.
///
/// Uses the same alignment and encoding path as serving; the vocabulary is
/// fitted on the aligned training rows and shipped inside the artifact.
pub fn train(batch: &TelemetryBatch, config: &TrainingConfig) -> Result<AnomalyModel, InsightError> {
    let aligned = truncate_to_shortest(&batch.logs, &batch.tasks, &batch.metrics);
    let encoder = FeatureEncoder::per_batch(&aligned);
    let matrix = encoder.encode(&aligned)?;
    let rows: Vec<FeatureRow> = matrix.iter().map(FeatureVector::to_array).collect();

    let forest = IsolationForest::fit(&rows, &config.forest)?;
    let trained_at = chrono::Utc::now();
    let version = config
        .version
        .clone()
        .unwrap_or_else(|| format!("v{}", trained_at.format("%Y%m%d%H%M%S")));

    info!(
        version = %version,
        rows = rows.len(),
        dropped_logs = batch.logs.len() - aligned.len(),
        dropped_tasks = batch.tasks.len() - aligned.len(),
        dropped_metrics = batch.metrics.len() - aligned.len(),
        threshold = forest.threshold(),
        "Anomaly model trained"
    );

    Ok(AnomalyModel {
        format: ARTIFACT_FORMAT,
        version,
        trained_at: trained_at.timestamp(),
        training_rows: rows.len(),
        vocabulary: encoder.vocabulary().clone(),
        forest,
    })
}

fn checksum_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".sha256");
    PathBuf::from(name)
}

fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pipeline::align::tests::{log, metric, task};
    use tempfile::TempDir;

    /// Steady telemetry; metric columns wobble on co-prime periods so their
    /// joint maximum never occurs in small batches
    pub(crate) fn training_batch(n: usize) -> TelemetryBatch {
        let levels = ["INFO", "WARN", "INFO", "DEBUG"];
        let components = ["API", "DB", "Auth"];
        let statuses = ["Done", "In Progress", "To Do"];
        let priorities = ["Low", "Medium", "High"];

        TelemetryBatch::new(
            (0..n).map(|i| log(levels[i % 4], components[i % 3])).collect(),
            (0..n).map(|i| task(statuses[i % 3], priorities[i % 3])).collect(),
            (0..n)
                .map(|i| {
                    metric(
                        40.0 + (i % 5) as f64,
                        55.0 + ((i * 3) % 7) as f64,
                        300 + (i % 11) as u64 * 10,
                        30 + ((i * 7) % 13) as u64,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_compute_checksum() {
        let checksum = compute_checksum(b"model bytes");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"model bytes"));
    }

    #[test]
    fn test_checksum_path_appends_suffix() {
        let path = checksum_path(Path::new("models/trained_model.json"));
        assert_eq!(path, PathBuf::from("models/trained_model.json.sha256"));
    }

    #[test]
    fn test_train_uses_aligned_rows() {
        let mut batch = training_batch(40);
        batch.metrics.extend(training_batch(10).metrics);

        let model = train(&batch, &TrainingConfig::default()).unwrap();
        assert_eq!(model.training_rows, 40);
        assert_eq!(model.vocabulary.log_level.values(), ["INFO", "WARN", "DEBUG"]);
        assert!((model.contamination() - 0.1).abs() < f64::EPSILON);
    }

    #[test]
    fn test_train_rejects_tiny_batches() {
        let result = train(&training_batch(1), &TrainingConfig::default());
        assert!(matches!(result, Err(InsightError::InsufficientTrainingData { .. })));
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("models").join("trained_model.json");
        let config = TrainingConfig {
            version: Some("v-test".to_string()),
            ..Default::default()
        };
        let model = train(&training_batch(60), &config).unwrap();

        let checksum = model.save(&path).unwrap();
        assert!(checksum_path(&path).exists());

        let loaded = AnomalyModel::load(&path).unwrap();
        assert_eq!(loaded.version, "v-test");
        assert_eq!(loaded.vocabulary, model.vocabulary);

        let batch = training_batch(60);
        let aligned = truncate_to_shortest(&batch.logs, &batch.tasks, &batch.metrics);
        let matrix = FeatureEncoder::with_vocabulary(&model.vocabulary)
            .encode(&aligned)
            .unwrap();
        assert_eq!(model.score(&matrix), loaded.score(&matrix));
    }

    #[test]
    fn test_load_rejects_tampered_artifact() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("trained_model.json");
        let model = train(&training_batch(30), &TrainingConfig::default()).unwrap();
        model.save(&path).unwrap();

        let mut contents = fs::read_to_string(&path).unwrap();
        contents.push('\n');
        fs::write(&path, contents).unwrap();

        let err = AnomalyModel::load(&path).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let dir = TempDir::new().unwrap();
        assert!(AnomalyModel::load(&dir.path().join("absent.json")).is_err());
    }

    #[test]
    fn test_scores_one_label_per_row() {
        let model = train(&training_batch(50), &TrainingConfig::default()).unwrap();
        let batch = training_batch(50);
        let aligned = truncate_to_shortest(&batch.logs, &batch.tasks, &batch.metrics);
        let matrix = FeatureEncoder::with_vocabulary(&model.vocabulary)
            .encode(&aligned)
            .unwrap();

        let labels = model.score(&matrix);
        assert_eq!(labels.len(), 50);
        assert!(labels.iter().filter(|l| **l == Label::Anomaly).count() <= 5);
    }
}
