//! Event processing for the RWA feed.
//!
//! This crate owns everything between a parsed feed line and the outside
//! world: applying the event to the nation registry, deciding which
//! channels want it, rendering it, and fanning it out. It also owns the
//! snapshot reconciliation algorithm used by the dump ingester.
//!
//! Every component borrows its [`Registry`](rwa_db::Registry) handle; the
//! binaries own the handle's lifecycle.
//!
//! # Modules
//!
//! - [`config`] -- Configuration loading from `rwa-config.yaml` into
//!   strongly-typed structs.
//! - [`subscription`] -- [`ChannelSubscription`] and its filter rules.
//! - [`mutator`] -- [`Mutator`]: event → registry writes.
//! - [`router`] -- [`Router`]: event → matching channels, plus rendering.
//! - [`reconcile`] -- [`Reconciler`]: snapshot rows → guarded upserts.
//! - [`lookup`] -- [`NationLookup`]: read-only registry queries.
//! - [`shutdown`] -- Cooperative shutdown signal.
//! - [`stream`] -- The stream loop and the [`Delivery`] seam.
//! - [`error`] -- Error types for mutation, rendering, and delivery.
//!
//! [`ChannelSubscription`]: subscription::ChannelSubscription
//! [`Mutator`]: mutator::Mutator
//! [`Router`]: router::Router
//! [`Reconciler`]: reconcile::Reconciler
//! [`NationLookup`]: lookup::NationLookup
//! [`Delivery`]: stream::Delivery

pub mod config;
pub mod error;
pub mod lookup;
pub mod mutator;
pub mod reconcile;
pub mod router;
pub mod shutdown;
pub mod stream;
pub mod subscription;

pub use error::{DeliveryError, MutationError, RenderError};
