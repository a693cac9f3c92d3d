//! Command implementations

pub mod metrics;
pub mod status;
