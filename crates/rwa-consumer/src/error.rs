//! Error types for the consumer binary.
//!
//! [`ConsumerError`] covers startup and feed connection failures. Errors
//! on individual events never reach this type; the stream loop logs them.

/// Top-level error for the consumer binary.
#[derive(Debug, thiserror::Error)]
pub enum ConsumerError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: rwa_core::config::ConfigError,
    },

    /// The registry database could not be reached or migrated.
    #[error("database error: {source}")]
    Database {
        /// The underlying registry error.
        #[from]
        source: rwa_db::DbError,
    },

    /// An HTTP client could not be built or a request failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The feed answered with a non-success status.
    #[error("feed returned status {0}")]
    FeedStatus(u16),
}
