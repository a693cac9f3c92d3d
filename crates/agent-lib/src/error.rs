//! Error taxonomy for evaluation passes

use std::path::PathBuf;

/// Errors that abort an evaluation pass or startup
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Upstream data was unreachable or malformed; retried by the next pass only
    #[error("data source '{source_name}' failed: {reason}")]
    Adapter { source_name: String, reason: String },

    /// Persistence failed; never treated as "no prior value"
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Missing destination, credential or inconsistent threshold; fatal at startup
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl WatchError {
    pub fn adapter(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        WatchError::Adapter {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Short label used for metrics and status reporting
    pub fn kind(&self) -> &'static str {
        match self {
            WatchError::Adapter { .. } => "adapter",
            WatchError::Store(_) => "store",
            WatchError::Configuration(_) => "configuration",
        }
    }
}

/// Sample store failures
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("state file {path:?} I/O failed: {error}")]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },

    #[error("state file {path:?} is corrupt: {error}")]
    Corrupt {
        path: PathBuf,
        #[source]
        error: serde_json::Error,
    },

    #[error("failed to serialize state: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("state lock poisoned")]
    Poisoned,

    #[error("store write task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}
