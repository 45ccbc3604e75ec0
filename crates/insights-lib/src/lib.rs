//! Telemetry insights library
//!
//! This crate provides the core functionality for:
//! - Typed log, task and metric records and their untyped JSON form
//! - Positional row alignment and feature encoding
//! - Isolation forest training and model artifacts
//! - Insight synthesis with no-data, no-model and diagnostic fallbacks
//! - Health checks and observability

pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod pipeline;
pub mod store;

pub use error::InsightError;
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{InsightMetrics, StructuredLogger};
pub use pipeline::{
    AnomalyModel, AnomalyScorer, InsightMode, InsightReport, InsightSynthesizer, Label,
};
pub use store::{JsonFileStore, MemoryStore, TelemetryStore};
