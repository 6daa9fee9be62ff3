//! Shared type definitions for the RWA feed.
//!
//! This crate is the single source of truth for the nation registry's data
//! model. Both writers (the live event stream and the bulk snapshot
//! ingester) and every reader build on the types defined here.
//!
//! # Modules
//!
//! - [`names`] -- Canonical name handling, display names, markdown links,
//!   and edit distance for fuzzy lookups
//! - [`nation`] -- [`NationRecord`], single-field updates, and snapshot rows

pub mod names;
pub mod nation;

// Re-export all public types at crate root for convenience.
pub use names::{canonicalize, display_name, levenshtein, nation_link, region_link};
pub use nation::{NationField, NationRecord, SnapshotRow};
