//! The registry contract shared by every reader and writer.
//!
//! The trait uses `impl Future + Send` returns so implementations can be
//! written with plain `async fn` and callers stay generic (no boxing, no
//! trait objects). Names passed in are expected to be canonical already.

use std::collections::BTreeSet;
use std::future::Future;

use chrono::{DateTime, Utc};
use rwa_types::{NationField, NationRecord, SnapshotRow};

use crate::error::DbError;

/// Read/write access to the nation registry.
pub trait Registry: Send + Sync {
    /// Canonical region of `name`, or `None` if the nation is unknown or has
    /// no region recorded.
    fn get_region(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, DbError>> + Send;

    /// Whether `name` is a World Assembly member. Unknown nations are not.
    fn get_wa_status(&self, name: &str) -> impl Future<Output = Result<bool, DbError>> + Send;

    /// Canonical names of the nations endorsing `name`.
    ///
    /// Returns [`DbError::NotFound`] if the nation has no record.
    fn get_endorsers(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<BTreeSet<String>, DbError>> + Send;

    /// Create `name` in `region`, or re-activate and relocate it if it
    /// already exists.
    fn upsert_founding(
        &self,
        name: &str,
        region: &str,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Write one field of an existing record.
    ///
    /// Returns [`DbError::NotFound`] if the nation has no record.
    fn set_field(
        &self,
        name: &str,
        field: &NationField,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Replace the endorser set of an existing record.
    ///
    /// Returns [`DbError::NotFound`] if the nation has no record.
    fn set_endorsers(
        &self,
        name: &str,
        endorsers: &BTreeSet<String>,
    ) -> impl Future<Output = Result<(), DbError>> + Send;

    /// Upsert snapshot rows stamped with `timestamp`.
    ///
    /// A row overwrites an existing record only when that record's
    /// `updated_at` is strictly older than `timestamp`. `wa_delegate` and
    /// `active` of existing records are never touched. Rows must have
    /// distinct names. Returns how many records were inserted or updated.
    fn bulk_upsert_if_stale(
        &self,
        rows: &[SnapshotRow],
        timestamp: DateTime<Utc>,
    ) -> impl Future<Output = Result<u64, DbError>> + Send;

    /// The full record for `name`, if any.
    fn get_nation(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<NationRecord>, DbError>> + Send;

    /// Active WA members in `name`'s region that `name` could still endorse:
    /// everyone except `name` itself and those it already endorses.
    fn endorsable_by(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Vec<String>, DbError>> + Send;

    /// Up to `limit` nation names closest to `query` by edit distance.
    fn closest_names(
        &self,
        query: &str,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<String>, DbError>> + Send;
}
