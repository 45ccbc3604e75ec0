//! Service configuration

use anyhow::Result;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

/// Service configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    /// HTTP listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Trained model artifact; absence puts the service in fallback mode
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    /// Directory holding logs.json, tasks.json and metrics.json
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_service_name")]
    pub service_name: String,
}

fn default_port() -> u16 {
    5001
}

fn default_model_path() -> PathBuf {
    PathBuf::from("models/trained_model.json")
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("mock_data")
}

fn default_service_name() -> String {
    "insights-server".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            model_path: default_model_path(),
            data_dir: default_data_dir(),
            service_name: default_service_name(),
        }
    }
}

impl ServiceConfig {
    /// Load from an optional `insights.*` file, then `INSIGHTS_*` variables
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("insights").required(false))
            .add_source(config::Environment::with_prefix("INSIGHTS"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|e| {
            warn!(error = %e, "Invalid configuration, using defaults");
            ServiceConfig::default()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::default();
        assert_eq!(config.port, 5001);
        assert_eq!(config.model_path, PathBuf::from("models/trained_model.json"));
        assert_eq!(config.data_dir, PathBuf::from("mock_data"));
        assert_eq!(config.service_name, "insights-server");
    }

    #[test]
    fn test_partial_source_fills_defaults() {
        let config: ServiceConfig = config::Config::builder()
            .set_override("port", 8080)
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("mock_data"));
    }
}
