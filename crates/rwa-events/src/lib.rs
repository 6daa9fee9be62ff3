//! Event parsing for the RWA feed.
//!
//! The game publishes every happening as one line of plain text, e.g.
//! `@@testlandia@@ relocated from %%lazarus%% to %%testregionia%%.`. This
//! crate turns such a line into a typed [`Event`] and renders it back as
//! markdown for delivery.
//!
//! # Modules
//!
//! - [`kind`] -- The closed set of [`EventKind`]s with their verb phrases,
//!   parameter positions, and coarse [`Bucket`]s
//! - [`event`] -- The parsed [`Event`] and its markdown rendering
//! - [`error`] -- Parse failures

pub mod error;
pub mod event;
pub mod kind;

pub use error::EventParseError;
pub use event::Event;
pub use kind::{Bucket, EventKind};
