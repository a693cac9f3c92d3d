//! Library for lending-market metric watching
//!
//! This crate provides the core functionality for:
//! - Durable per-metric sample storage with sticky rate baselines
//! - Cap and rate alert classification
//! - Evaluation passes over pluggable data sources
//! - Alert routing to sinks
//! - Scheduling, run status, health checks and observability

pub mod alerts;
pub mod engine;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;
pub mod scheduler;
pub mod sink;
pub mod source;
pub mod status;
pub mod store;

pub use alerts::{Alert, AlertCategory, AlertLevel};
pub use engine::{Engine, PassReport};
pub use error::{StoreError, WatchError};
pub use health::{
    Component, ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse,
    ReadinessResponse,
};
pub use models::*;
pub use observability::{AgentMetrics, StructuredLogger};
pub use scheduler::{PassScheduler, PassSchedulerBuilder};
pub use status::{RunStatus, StatusSnapshot};
