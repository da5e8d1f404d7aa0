//! Error types for scheduler operations.

use thiserror::Error;

/// Errors produced by storage collaborators (event queue, notification
/// channel, record stores).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The connection to the backing store was lost or could not be made.
    #[error("connection lost: {0}")]
    ConnectionLost(String),
    /// A query or write failed for a reason other than connectivity.
    #[error("query failed: {0}")]
    Query(String),
    /// Filesystem failure in a file-backed store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Stored record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    /// Whether this failure looks like connectivity loss and is worth retrying.
    #[must_use]
    pub const fn is_connection_loss(&self) -> bool {
        matches!(self, Self::ConnectionLost(_))
    }
}

/// Failure raised by an event handler or poll plugin.
///
/// `Ok(())` from a handler or plugin step is success; a non-fatal error is a
/// recoverable failure and `Fatal` tells a poll run to abort its chain.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The plugin declared that its failure invalidates the whole run.
    #[error("fatal plugin error: {0}")]
    Fatal(String),
    /// A store operation issued by the plugin failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Any other unexpected failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PluginError {
    /// Whether the plugin raised a recognized fatal error.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Errors produced by scheduler components.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Process-ending failure; the only error the task runner does not swallow.
    #[error("fatal: {0}")]
    Fatal(String),
    /// Store failure that was not connectivity related.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    /// Invalid configuration.
    #[error("config error: {0}")]
    Config(String),
    /// A scheduled task failed; logged and ignored by the runner.
    #[error("task failed: {0}")]
    Task(String),
}

impl SchedulerError {
    /// Whether this error must terminate the process.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

/// Best-effort text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "panic with non-string payload".into())
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
