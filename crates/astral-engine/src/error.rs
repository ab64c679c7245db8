//! Error types for the resource engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup.

/// Top-level error for the resource engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: astral_economy::config::ConfigError,
    },

    /// Persistence-layer setup failed (store connection, NATS).
    #[error("sync error: {source}")]
    Sync {
        /// The underlying persistence error.
        #[from]
        source: astral_sync::SyncError,
    },

    /// Bonus table seeding failed.
    #[error("bonus seed error: {message}")]
    BonusSeed {
        /// Description of the seeding failure.
        message: String,
    },
}
