//! Snapshot reconciliation.
//!
//! Rows from one dump share one timestamp. Each row may overwrite a record
//! only if the record's `updated_at` is strictly older, so a stream write
//! made after the dump always survives. Later duplicates of a name are
//! dropped before batching: applied row by row with one shared timestamp
//! the first occurrence would win anyway, and a single upsert statement
//! cannot touch the same key twice.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use rwa_db::Registry;
use rwa_types::SnapshotRow;
use serde::Serialize;

/// Default rows per upsert statement.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Rows received.
    pub total_rows: usize,
    /// Rows dropped as later duplicates of an earlier name.
    pub duplicate_rows: usize,
    /// Rows in batches the registry accepted.
    pub accepted_rows: usize,
    /// Records actually inserted or overwritten.
    pub written_rows: u64,
    /// Batches the registry rejected.
    pub failed_batches: usize,
    /// Rows in rejected batches.
    pub failed_rows: usize,
}

impl ReconcileReport {
    /// Whether every batch was accepted.
    pub const fn is_complete(&self) -> bool {
        self.failed_batches == 0
    }
}

/// Upserts snapshot rows in batches under the freshness guard.
pub struct Reconciler<'a, R> {
    registry: &'a R,
    batch_size: usize,
}

impl<'a, R: Registry> Reconciler<'a, R> {
    /// Create a reconciler with [`DEFAULT_BATCH_SIZE`].
    pub const fn new(registry: &'a R) -> Self {
        Self {
            registry,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size. Zero is treated as one.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Reconcile `rows` stamped with `timestamp`.
    ///
    /// A failed batch is logged and skipped; the run continues with the
    /// next batch and the failure is counted in the report.
    pub async fn reconcile<I>(&self, rows: I, timestamp: DateTime<Utc>) -> ReconcileReport
    where
        I: IntoIterator<Item = SnapshotRow>,
    {
        let mut report = ReconcileReport::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut batch: Vec<SnapshotRow> = Vec::with_capacity(self.batch_size);

        for row in rows {
            report.total_rows = report.total_rows.saturating_add(1);
            if !seen.insert(row.name.clone()) {
                tracing::debug!(nation = %row.name, "Dropping duplicate snapshot row");
                report.duplicate_rows = report.duplicate_rows.saturating_add(1);
                continue;
            }
            batch.push(row);
            if batch.len() >= self.batch_size {
                self.flush(&mut batch, timestamp, &mut report).await;
            }
        }
        self.flush(&mut batch, timestamp, &mut report).await;

        tracing::info!(
            total = report.total_rows,
            duplicates = report.duplicate_rows,
            accepted = report.accepted_rows,
            written = report.written_rows,
            failed_batches = report.failed_batches,
            failed_rows = report.failed_rows,
            %timestamp,
            "Snapshot reconciliation finished"
        );
        report
    }

    async fn flush(
        &self,
        batch: &mut Vec<SnapshotRow>,
        timestamp: DateTime<Utc>,
        report: &mut ReconcileReport,
    ) {
        if batch.is_empty() {
            return;
        }
        let len = batch.len();
        match self.registry.bulk_upsert_if_stale(batch, timestamp).await {
            Ok(written) => {
                report.accepted_rows = report.accepted_rows.saturating_add(len);
                report.written_rows = report.written_rows.saturating_add(written);
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    rows = len,
                    first = batch.first().map(|r| r.name.as_str()),
                    last = batch.last().map(|r| r.name.as_str()),
                    "Snapshot batch failed"
                );
                report.failed_batches = report.failed_batches.saturating_add(1);
                report.failed_rows = report.failed_rows.saturating_add(len);
            }
        }
        batch.clear();
    }
}

/// The most recent daily dump time at or before `now`.
///
/// Returns `None` if `hour`/`minute` is not a valid time of day.
pub fn dump_timestamp(now: DateTime<Utc>, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let today = now.date_naive().and_time(time).and_utc();
    if today <= now {
        Some(today)
    } else {
        today.checked_sub_signed(Duration::days(1))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use rwa_db::MemoryRegistry;
    use rwa_types::NationRecord;

    use super::*;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 30, 0).single().unwrap()
    }

    fn row(name: &str, region: &str) -> SnapshotRow {
        SnapshotRow {
            name: name.to_owned(),
            fullname: format!("The Republic of {name}"),
            region: region.to_owned(),
            wa_member: true,
            wa_delegate: false,
            endorsements: ["alpha".to_owned()].into_iter().collect(),
            flag: format!("https://example.invalid/{name}.png"),
        }
    }

    fn existing(name: &str, updated_at: DateTime<Utc>) -> NationRecord {
        let mut record = NationRecord::founded(name, "lazarus", updated_at);
        record.wa_delegate = true;
        record
    }

    #[tokio::test]
    async fn older_snapshot_leaves_record_unchanged() {
        let t1 = at(10, 5);
        let record = existing("testlandia", t1);
        let registry = MemoryRegistry::with_records([record.clone()]);

        let report = Reconciler::new(&registry)
            .reconcile([row("testlandia", "testregionia")], at(9, 5))
            .await;

        assert_eq!(report.written_rows, 0);
        assert_eq!(report.accepted_rows, 1);
        assert_eq!(registry.get_nation("testlandia").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn newer_snapshot_overwrites_guarded_fields_only() {
        let mut ceased = existing("testlandia", at(9, 5));
        ceased.active = false;
        let registry = MemoryRegistry::with_records([ceased]);

        let t2 = at(10, 5);
        let report = Reconciler::new(&registry)
            .reconcile([row("testlandia", "testregionia")], t2)
            .await;
        assert_eq!(report.written_rows, 1);

        let record = registry.get_nation("testlandia").await.unwrap().unwrap();
        assert_eq!(record.updated_at, t2);
        assert_eq!(record.region.as_deref(), Some("testregionia"));
        assert_eq!(record.fullname.as_deref(), Some("The Republic of testlandia"));
        assert!(record.wa_member);
        assert!(record.endorsements.contains("alpha"));
        assert!(record.flag.is_some());
        // Not guarded fields: left alone.
        assert!(record.wa_delegate);
        assert!(!record.active);
    }

    #[tokio::test]
    async fn first_duplicate_wins() {
        let registry = MemoryRegistry::new();
        let report = Reconciler::new(&registry)
            .reconcile(
                [row("testlandia", "first"), row("testlandia", "second")],
                at(10, 5),
            )
            .await;

        assert_eq!(report.total_rows, 2);
        assert_eq!(report.duplicate_rows, 1);
        assert_eq!(report.written_rows, 1);
        assert_eq!(
            registry.get_region("testlandia").await.unwrap().as_deref(),
            Some("first")
        );
    }

    #[tokio::test]
    async fn batch_size_does_not_change_outcome() {
        let rows: Vec<SnapshotRow> = (0..25)
            .map(|i| row(&format!("nation_{}", i % 20), &format!("region_{i}")))
            .collect();
        let seed = [existing("nation_3", at(11, 5)), existing("nation_7", at(1, 5))];

        let mut outcomes = Vec::new();
        for size in [1, 4, 7, 100] {
            let registry = MemoryRegistry::with_records(seed.clone());
            let report = Reconciler::new(&registry)
                .with_batch_size(size)
                .reconcile(rows.clone(), at(10, 5))
                .await;
            let mut state = Vec::new();
            for i in 0..20 {
                state.push(registry.get_nation(&format!("nation_{i}")).await.unwrap());
            }
            outcomes.push((report.written_rows, report.duplicate_rows, state));
        }

        let first = outcomes.first().cloned().unwrap();
        assert_eq!(first.0, 19);
        assert_eq!(first.1, 5);
        for outcome in &outcomes {
            assert_eq!(outcome, &first);
        }
    }

    #[tokio::test]
    async fn failed_batches_are_counted_and_run_continues() {
        let registry = MemoryRegistry::new();
        registry.set_offline(true);
        let report = Reconciler::new(&registry)
            .with_batch_size(2)
            .reconcile(
                ["a", "b", "c", "d", "e"].map(|n| row(n, "r")),
                at(10, 5),
            )
            .await;

        assert!(!report.is_complete());
        assert_eq!(report.failed_batches, 3);
        assert_eq!(report.failed_rows, 5);
        assert_eq!(report.accepted_rows, 0);
    }

    #[tokio::test]
    async fn empty_snapshot_writes_nothing() {
        let registry = MemoryRegistry::new();
        let report = Reconciler::new(&registry)
            .reconcile(Vec::<SnapshotRow>::new(), at(10, 5))
            .await;
        assert_eq!(report, ReconcileReport::default());
        assert!(registry.is_empty().await);
    }

    #[test]
    fn dump_timestamp_picks_latest_past_dump() {
        let before = Utc.with_ymd_and_hms(2026, 3, 10, 4, 0, 0).single().unwrap();
        let after = Utc.with_ymd_and_hms(2026, 3, 10, 6, 0, 0).single().unwrap();
        let exact = Utc.with_ymd_and_hms(2026, 3, 10, 5, 30, 0).single().unwrap();

        assert_eq!(dump_timestamp(before, 5, 30), Some(at(9, 5)));
        assert_eq!(dump_timestamp(after, 5, 30), Some(at(10, 5)));
        assert_eq!(dump_timestamp(exact, 5, 30), Some(exact));
        assert_eq!(dump_timestamp(after, 25, 0), None);
    }

    #[test]
    fn report_serializes_for_logging() {
        let report = ReconcileReport {
            total_rows: 3,
            ..ReconcileReport::default()
        };
        let json = serde_json::to_value(report).unwrap();
        assert_eq!(json.get("total_rows").and_then(|v| v.as_u64()), Some(3));
    }
}
