//! Error types for the persistence layer.
//!
//! All errors here are local-recoverable: a kingdom that cannot sync
//! simply lags behind the durable store until connectivity returns.

/// Errors that can occur in the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// A `Dragonfly`/Redis operation failed.
    #[error("Dragonfly error: {0}")]
    Dragonfly(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A flush did not complete within the bounded interval. Local state
    /// is retained; the next flush carries it forward.
    #[error("flush timed out after {timeout_ms}ms")]
    FlushTimeout {
        /// The configured flush timeout in milliseconds.
        timeout_ms: u64,
    },

    /// The kingdom's owning actor has been unloaded; no further
    /// commands can be delivered.
    #[error("kingdom actor is gone")]
    ActorGone,

    /// A NATS connection or messaging failure.
    #[error("NATS error: {0}")]
    Nats(String),

    /// A configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
