//! Error types for the dump ingester.

/// Top-level error for the ingester binary.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
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

    /// The HTTP client could not be built or the download failed.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The dump server answered with a non-success status.
    #[error("dump download returned status {0}")]
    Status(u16),

    /// Reading or writing the dump file failed.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// The dump is not well-formed XML.
    #[error("XML error: {0}")]
    Xml(String),

    /// The blocking parse task panicked or was cancelled.
    #[error("parse task failed: {0}")]
    Task(String),

    /// The configured dump time is not a valid time of day.
    #[error("invalid dump time {hour:02}:{minute:02}")]
    InvalidDumpTime {
        /// Configured hour.
        hour: u32,
        /// Configured minute.
        minute: u32,
    },
}
