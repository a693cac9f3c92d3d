//! Data source adapters
//!
//! Adapters produce metric readings for one evaluation pass. They are
//! all-or-nothing: a malformed or unreachable upstream yields an error,
//! never a partial or zero-filled set of readings.

mod http_json;

pub use http_json::HttpJsonSource;

use crate::error::WatchError;
use crate::models::Reading;

pub use async_trait::async_trait;

/// Trait for data source adapter implementations
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Name used in logs and error reports
    fn name(&self) -> &str;

    /// Fetch the current readings
    async fn fetch(&self) -> Result<Vec<Reading>, WatchError>;
}
