//! Error types for event processing.
//!
//! None of these ever ends the stream loop: each is logged against the raw
//! line and the loop moves on to the next event.

use rwa_db::DbError;
use rwa_events::EventKind;

/// Failure to apply an event to the registry.
#[derive(Debug, thiserror::Error)]
pub enum MutationError {
    /// The registry could not serve the request.
    #[error("registry unavailable while updating {nation}: {source}")]
    RegistryUnavailable {
        /// The nation being written.
        nation: String,
        /// The underlying store failure.
        source: DbError,
    },

    /// The targeted nation has no record.
    #[error("no record for nation {nation}")]
    UnknownRecord {
        /// The nation that was missing.
        nation: String,
    },

    /// The event lacks a parameter its kind declares.
    ///
    /// Unreachable for events produced by [`Event::parse`](rwa_events::Event::parse).
    #[error("{kind} event has no parameter {index}")]
    MissingParameter {
        /// The event kind.
        kind: EventKind,
        /// The zero-based parameter index.
        index: usize,
    },
}

impl MutationError {
    /// Classify a registry error raised while writing `nation`.
    pub fn from_db(nation: &str, source: DbError) -> Self {
        if source.is_not_found() {
            Self::UnknownRecord {
                nation: nation.to_owned(),
            }
        } else {
            Self::RegistryUnavailable {
                nation: nation.to_owned(),
                source,
            }
        }
    }
}

/// Failure to render an event for delivery.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The rendered text exceeds the outbound message ceiling.
    #[error("rendered message is {length} characters, limit is {limit}")]
    TooLong {
        /// Length of the rendered text in characters.
        length: usize,
        /// The ceiling.
        limit: usize,
    },
}

/// Failure to deliver one message to one channel.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// The request could not be sent or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The target answered with a non-success status.
    #[error("target rejected message with status {0}")]
    Rejected(u16),

    /// The request did not complete within the configured timeout.
    #[error("delivery timed out")]
    Timeout,
}
