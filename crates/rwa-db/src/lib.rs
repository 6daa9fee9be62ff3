//! Nation registry for the RWA feed.
//!
//! The registry is the single shared mutable store of the system. The live
//! event stream writes narrow single-field updates; the daily dump ingester
//! writes guarded bulk upserts. Both go through the [`Registry`] contract so
//! the core pipeline never depends on a concrete storage engine.
//!
//! # Architecture
//!
//! ```text
//! Stream loop ----+
//!                 +--> Registry --+--> NationStore    (PostgreSQL)
//! Dump ingester --+               +--> MemoryRegistry (tests, dry runs)
//! ```
//!
//! # Modules
//!
//! - [`registry`] -- The [`Registry`] trait
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`nation_store`] -- [`Registry`] over the `nations` table
//! - [`memory`] -- [`Registry`] over an in-process map
//! - [`error`] -- Shared error types

pub mod error;
pub mod memory;
pub mod nation_store;
pub mod postgres;
pub mod registry;

// Re-export primary types for convenience.
pub use error::DbError;
pub use memory::MemoryRegistry;
pub use nation_store::{NationRow, NationStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use registry::Registry;
