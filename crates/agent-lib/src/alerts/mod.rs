//! Alert classification for sampled metrics
//!
//! This module provides:
//! - Cap classification (state edges on ratio metrics)
//! - Rate classification (moves against a sticky baseline)
//! - The alert event type shared with sinks

mod alert;
mod cap_classifier;
mod rate_classifier;

pub use alert::{Alert, AlertCategory, AlertLevel};
pub use cap_classifier::{
    CapClassifier, CapPolicy, DEFAULT_CLEAR_THRESHOLD, DEFAULT_FULL_THRESHOLD,
    DEFAULT_SINGLE_THRESHOLD,
};
pub use rate_classifier::{
    RateClassifier, RateDecision, RateThresholds, DEFAULT_MAJOR_CHANGE, DEFAULT_MINOR_CHANGE,
};
