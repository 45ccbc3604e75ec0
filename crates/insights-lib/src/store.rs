//! Read access to the persisted telemetry corpora
//!
//! The three collections are stored independently, so they may differ in
//! length and time window.

use crate::models::{Collection, RawTelemetry};
use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub use async_trait::async_trait;

/// Trait for telemetry sources
#[async_trait]
pub trait TelemetryStore: Send + Sync {
    /// Load one collection as untyped records
    async fn load(&self, collection: Collection) -> Result<Vec<Value>>;

    /// Load all three collections
    async fn load_all(&self) -> Result<RawTelemetry> {
        Ok(RawTelemetry {
            logs: self.load(Collection::Logs).await?,
            tasks: self.load(Collection::Tasks).await?,
            metrics: self.load(Collection::Metrics).await?,
        })
    }
}

/// Reads `<dir>/{logs,tasks,metrics}.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    data_dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(format!("{}.json", collection.as_str()))
    }
}

#[async_trait]
impl TelemetryStore for JsonFileStore {
    async fn load(&self, collection: Collection) -> Result<Vec<Value>> {
        let path = self.path_for(collection);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Missing files read as empty so callers degrade to "no data"
                warn!(collection = %collection, path = %path.display(), "Data file not found");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to read {:?}", path));
            }
        };

        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse {:?}", path))?;
        match value {
            Value::Array(records) => {
                debug!(collection = %collection, count = records.len(), "Collection loaded");
                Ok(records)
            }
            _ => anyhow::bail!("{:?} does not contain a JSON array", path),
        }
    }
}

/// In-memory collections, for tests and embedding
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<Collection, Vec<Value>>,
}

impl MemoryStore {
    pub fn new(raw: RawTelemetry) -> Self {
        let collections = HashMap::from([
            (Collection::Logs, raw.logs),
            (Collection::Tasks, raw.tasks),
            (Collection::Metrics, raw.metrics),
        ]);
        Self { collections }
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    async fn load(&self, collection: Collection) -> Result<Vec<Value>> {
        Ok(self.collections.get(&collection).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_files_load_as_empty() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());

        let raw = store.load_all().await.unwrap();
        assert!(raw.logs.is_empty() && raw.tasks.is_empty() && raw.metrics.is_empty());
        assert!(raw.has_empty_source());
    }

    #[tokio::test]
    async fn test_loads_independent_lengths() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        let logs = json!([{"log_level": "INFO", "component": "API"}]);
        let metrics = json!([
            {"cpu_usage": 1, "memory_usage": 2, "disk_io": 3, "network_latency": 4},
            {"cpu_usage": 5, "memory_usage": 6, "disk_io": 7, "network_latency": 8}
        ]);
        tokio::fs::write(store.path_for(Collection::Logs), logs.to_string()).await.unwrap();
        tokio::fs::write(store.path_for(Collection::Metrics), metrics.to_string()).await.unwrap();

        assert_eq!(store.load(Collection::Logs).await.unwrap().len(), 1);
        assert_eq!(store.load(Collection::Metrics).await.unwrap().len(), 2);
        assert!(store.load(Collection::Tasks).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_array_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        tokio::fs::write(store.path_for(Collection::Tasks), r#"{"tasks": []}"#).await.unwrap();

        let err = store.load(Collection::Tasks).await.unwrap_err();
        assert!(err.to_string().contains("JSON array"));
    }

    #[tokio::test]
    async fn test_invalid_json_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path());
        tokio::fs::write(store.path_for(Collection::Logs), "[{").await.unwrap();

        assert!(store.load(Collection::Logs).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_store_returns_collections() {
        let store = MemoryStore::new(RawTelemetry {
            logs: vec![json!({"a": 1})],
            tasks: vec![],
            metrics: vec![json!({"b": 2}), json!({"c": 3})],
        });
        let raw = store.load_all().await.unwrap();
        assert_eq!((raw.logs.len(), raw.tasks.len(), raw.metrics.len()), (1, 0, 2));
    }
}
