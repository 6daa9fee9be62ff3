//! [`Registry`] over an in-process map.
//!
//! Mirrors the semantics of [`NationStore`](crate::NationStore) exactly,
//! including the `updated_at` guard, so the core pipeline can be exercised
//! without a database. [`set_offline`](MemoryRegistry::set_offline) makes
//! every call fail with [`DbError::Unavailable`] to simulate an outage.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rwa_types::{NationField, NationRecord, SnapshotRow, levenshtein};
use tokio::sync::RwLock;

use crate::error::DbError;
use crate::registry::Registry;

/// In-memory nation registry.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    nations: RwLock<BTreeMap<String, NationRecord>>,
    offline: AtomicBool,
}

impl MemoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry pre-populated with `records`.
    pub fn with_records(records: impl IntoIterator<Item = NationRecord>) -> Self {
        let nations = records
            .into_iter()
            .map(|record| (record.name.clone(), record))
            .collect();
        Self {
            nations: RwLock::new(nations),
            offline: AtomicBool::new(false),
        }
    }

    /// Insert or replace a record wholesale.
    pub async fn insert(&self, record: NationRecord) {
        self.nations.write().await.insert(record.name.clone(), record);
    }

    /// Number of records held.
    pub async fn len(&self) -> usize {
        self.nations.read().await.len()
    }

    /// Whether the registry holds no records.
    pub async fn is_empty(&self) -> bool {
        self.nations.read().await.is_empty()
    }

    /// Toggle a simulated outage.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    fn check_online(&self) -> Result<(), DbError> {
        if self.offline.load(Ordering::Acquire) {
            Err(DbError::Unavailable("memory registry offline".to_owned()))
        } else {
            Ok(())
        }
    }
}

impl Registry for MemoryRegistry {
    async fn get_region(&self, name: &str) -> Result<Option<String>, DbError> {
        self.check_online()?;
        let nations = self.nations.read().await;
        Ok(nations.get(name).and_then(|record| record.region.clone()))
    }

    async fn get_wa_status(&self, name: &str) -> Result<bool, DbError> {
        self.check_online()?;
        let nations = self.nations.read().await;
        Ok(nations.get(name).is_some_and(|record| record.wa_member))
    }

    async fn get_endorsers(&self, name: &str) -> Result<BTreeSet<String>, DbError> {
        self.check_online()?;
        let nations = self.nations.read().await;
        nations
            .get(name)
            .map(|record| record.endorsements.clone())
            .ok_or_else(|| DbError::NotFound(name.to_owned()))
    }

    async fn upsert_founding(&self, name: &str, region: &str) -> Result<(), DbError> {
        self.check_online()?;
        let now = Utc::now();
        let mut nations = self.nations.write().await;
        match nations.get_mut(name) {
            Some(record) => {
                record.region = Some(region.to_owned());
                record.active = true;
                record.touch(now);
            }
            None => {
                nations.insert(name.to_owned(), NationRecord::founded(name, region, now));
            }
        }
        Ok(())
    }

    async fn set_field(&self, name: &str, field: &NationField) -> Result<(), DbError> {
        self.check_online()?;
        let mut nations = self.nations.write().await;
        let record = nations
            .get_mut(name)
            .ok_or_else(|| DbError::NotFound(name.to_owned()))?;
        record.apply_field(field);
        record.touch(Utc::now());
        Ok(())
    }

    async fn set_endorsers(
        &self,
        name: &str,
        endorsers: &BTreeSet<String>,
    ) -> Result<(), DbError> {
        self.check_online()?;
        let mut nations = self.nations.write().await;
        let record = nations
            .get_mut(name)
            .ok_or_else(|| DbError::NotFound(name.to_owned()))?;
        record.endorsements.clone_from(endorsers);
        record.touch(Utc::now());
        Ok(())
    }

    async fn bulk_upsert_if_stale(
        &self,
        rows: &[SnapshotRow],
        timestamp: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        self.check_online()?;
        let mut nations = self.nations.write().await;
        let mut written: u64 = 0;
        for row in rows {
            match nations.get_mut(&row.name) {
                Some(record) if record.updated_at < timestamp => {
                    record.apply_snapshot(row, timestamp);
                }
                Some(_) => continue,
                None => {
                    nations.insert(row.name.clone(), NationRecord::from_snapshot(row, timestamp));
                }
            }
            written = written.saturating_add(1);
        }
        Ok(written)
    }

    async fn get_nation(&self, name: &str) -> Result<Option<NationRecord>, DbError> {
        self.check_online()?;
        Ok(self.nations.read().await.get(name).cloned())
    }

    async fn endorsable_by(&self, name: &str) -> Result<Vec<String>, DbError> {
        self.check_online()?;
        let nations = self.nations.read().await;
        let Some(region) = nations.get(name).and_then(|record| record.region.as_deref()) else {
            return Ok(Vec::new());
        };
        Ok(nations
            .values()
            .filter(|candidate| {
                candidate.region.as_deref() == Some(region)
                    && candidate.wa_member
                    && candidate.active
                    && candidate.name != name
                    && !candidate.endorsements.contains(name)
            })
            .map(|candidate| candidate.name.clone())
            .collect())
    }

    async fn closest_names(&self, query: &str, limit: usize) -> Result<Vec<String>, DbError> {
        self.check_online()?;
        let nations = self.nations.read().await;
        let mut scored: Vec<(usize, &String)> = nations
            .keys()
            .map(|name| (levenshtein(name, query), name))
            .collect();
        scored.sort_unstable();
        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, name)| name.clone())
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, 5, 30, 0).single().unwrap()
    }

    fn member(name: &str, region: &str) -> NationRecord {
        let mut record = NationRecord::founded(name, region, at(1));
        record.wa_member = true;
        record
    }

    fn row(name: &str, region: &str) -> SnapshotRow {
        SnapshotRow {
            name: name.to_owned(),
            fullname: format!("The Republic of {name}"),
            region: region.to_owned(),
            wa_member: true,
            wa_delegate: true,
            endorsements: BTreeSet::new(),
            flag: String::new(),
        }
    }

    #[tokio::test]
    async fn missing_records_are_not_found() {
        let registry = MemoryRegistry::new();
        assert!(registry.get_endorsers("ghost").await.unwrap_err().is_not_found());
        assert!(
            registry
                .set_field("ghost", &NationField::WaMember(true))
                .await
                .unwrap_err()
                .is_not_found()
        );
        assert_eq!(registry.get_region("ghost").await.unwrap(), None);
        assert!(!registry.get_wa_status("ghost").await.unwrap());
    }

    #[tokio::test]
    async fn founding_reactivates_existing_record() {
        let registry = MemoryRegistry::new();
        registry.upsert_founding("testlandia", "lazarus").await.unwrap();
        registry
            .set_field("testlandia", &NationField::Active(false))
            .await
            .unwrap();
        registry.upsert_founding("testlandia", "osiris").await.unwrap();

        let record = registry.get_nation("testlandia").await.unwrap().unwrap();
        assert!(record.active);
        assert_eq!(record.region.as_deref(), Some("osiris"));
    }

    #[tokio::test]
    async fn bulk_upsert_inserts_new_records_with_delegate_flag() {
        let registry = MemoryRegistry::new();
        let written = registry
            .bulk_upsert_if_stale(&[row("testlandia", "testregionia")], at(2))
            .await
            .unwrap();
        assert_eq!(written, 1);
        let record = registry.get_nation("testlandia").await.unwrap().unwrap();
        assert!(record.wa_delegate);
        assert_eq!(record.updated_at, at(2));
    }

    #[tokio::test]
    async fn bulk_upsert_skips_fresher_records() {
        let mut fresh = member("testlandia", "lazarus");
        fresh.updated_at = at(5);
        let registry = MemoryRegistry::with_records([fresh.clone()]);

        let written = registry
            .bulk_upsert_if_stale(&[row("testlandia", "testregionia")], at(4))
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert_eq!(registry.get_nation("testlandia").await.unwrap(), Some(fresh));
    }

    #[tokio::test]
    async fn endorsable_excludes_self_non_members_and_already_endorsed() {
        let mut already = member("already", "testregionia");
        already.endorsements.insert("testlandia".to_owned());
        let mut gone = member("gone", "testregionia");
        gone.active = false;
        let registry = MemoryRegistry::with_records([
            member("testlandia", "testregionia"),
            member("candidate", "testregionia"),
            already,
            gone,
            NationRecord::founded("civilian", "testregionia", at(1)),
            member("abroad", "lazarus"),
        ]);

        let names = registry.endorsable_by("testlandia").await.unwrap();
        assert_eq!(names, vec!["candidate".to_owned()]);
    }

    #[tokio::test]
    async fn closest_names_orders_by_distance() {
        let registry = MemoryRegistry::with_records([
            member("testlandia", "r"),
            member("testlandiaa", "r"),
            member("otherlandia", "r"),
            member("zzz", "r"),
        ]);
        let names = registry.closest_names("testlandai", 3).await.unwrap();
        assert_eq!(names.len(), 3);
        assert_eq!(names.first().map(String::as_str), Some("testlandia"));
        assert!(!names.contains(&"zzz".to_owned()));
    }

    #[tokio::test]
    async fn offline_registry_is_unavailable() {
        let registry = MemoryRegistry::new();
        registry.set_offline(true);
        let err = registry.get_region("testlandia").await.unwrap_err();
        assert!(matches!(err, DbError::Unavailable(_)));
        registry.set_offline(false);
        assert!(registry.get_region("testlandia").await.is_ok());
    }
}
