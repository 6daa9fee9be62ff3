//! Error types for feed line parsing.

use crate::kind::EventKind;

/// Reasons a feed line could not be turned into an [`Event`](crate::Event).
///
/// Every variant is fatal for the line only: the caller logs it and moves
/// on to the next line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EventParseError {
    /// The line had no tokens at all.
    #[error("empty feed line")]
    Empty,

    /// No declared verb phrase matched the sentence.
    #[error("unknown event kind in line: {line}")]
    UnknownEventKind {
        /// The raw line.
        line: String,
    },

    /// The line is shorter than the kind's declared parameter positions.
    #[error("{kind} line has no token at position {position}: {line}")]
    MissingParameter {
        /// The kind that matched.
        kind: EventKind,
        /// The zero-based token position that was missing.
        position: usize,
        /// The raw line.
        line: String,
    },

    /// A name token was too short to carry its markers.
    #[error("malformed name token: {token}")]
    MalformedToken {
        /// The offending token.
        token: String,
    },
}
