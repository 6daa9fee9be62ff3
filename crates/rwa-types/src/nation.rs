//! The nation record and the writes that mutate it.
//!
//! A [`NationRecord`] is the registry's unit of truth. The live stream
//! changes it one field at a time through [`NationField`]; the daily dump
//! replaces the snapshot-owned fields wholesale through [`SnapshotRow`].

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One tracked nation.
///
/// `name` is the canonical key and never changes once the record exists.
/// `updated_at` only moves forward and decides which writer wins when the
/// stream and the snapshot race.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NationRecord {
    /// Canonical name (lowercase, underscores).
    pub name: String,
    /// Display name as shown in the game (e.g. "The Republic of Testlandia").
    pub fullname: Option<String>,
    /// Canonical name of the region the nation resides in.
    pub region: Option<String>,
    /// Whether the nation is a World Assembly member.
    pub wa_member: bool,
    /// Whether the nation is its region's World Assembly delegate.
    pub wa_delegate: bool,
    /// False once the nation has ceased to exist.
    pub active: bool,
    /// Canonical names of the nations endorsing this one.
    pub endorsements: BTreeSet<String>,
    /// Flag image URL.
    pub flag: Option<String>,
    /// Last time either writer touched this record.
    pub updated_at: DateTime<Utc>,
}

impl NationRecord {
    /// A freshly founded nation with no membership state.
    pub fn founded(name: &str, region: &str, at: DateTime<Utc>) -> Self {
        Self {
            name: name.to_owned(),
            fullname: None,
            region: Some(region.to_owned()),
            wa_member: false,
            wa_delegate: false,
            active: true,
            endorsements: BTreeSet::new(),
            flag: None,
            updated_at: at,
        }
    }

    /// A record first seen in a snapshot.
    pub fn from_snapshot(row: &SnapshotRow, at: DateTime<Utc>) -> Self {
        Self {
            name: row.name.clone(),
            fullname: Some(row.fullname.clone()),
            region: Some(row.region.clone()),
            wa_member: row.wa_member,
            wa_delegate: row.wa_delegate,
            active: true,
            endorsements: row.endorsements.clone(),
            flag: Some(row.flag.clone()),
            updated_at: at,
        }
    }

    /// Overwrite the snapshot-owned fields from `row`.
    ///
    /// `wa_delegate` and `active` are maintained by the stream only and
    /// are left untouched.
    pub fn apply_snapshot(&mut self, row: &SnapshotRow, at: DateTime<Utc>) {
        self.fullname = Some(row.fullname.clone());
        self.region = Some(row.region.clone());
        self.wa_member = row.wa_member;
        self.endorsements.clone_from(&row.endorsements);
        self.flag = Some(row.flag.clone());
        self.updated_at = at;
    }

    /// Apply a single-field stream update.
    pub fn apply_field(&mut self, field: &NationField) {
        match field {
            NationField::Region(region) => self.region = Some(region.clone()),
            NationField::WaMember(value) => self.wa_member = *value,
            NationField::WaDelegate(value) => self.wa_delegate = *value,
            NationField::Active(value) => self.active = *value,
        }
    }

    /// Move `updated_at` forward to `at`, never backwards.
    pub fn touch(&mut self, at: DateTime<Utc>) {
        if at > self.updated_at {
            self.updated_at = at;
        }
    }
}

/// A single-field mutation issued by the live stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NationField {
    /// The nation moved to (or was founded in) a region.
    Region(String),
    /// World Assembly membership changed.
    WaMember(bool),
    /// World Assembly delegacy changed.
    WaDelegate(bool),
    /// The nation ceased to exist (`false`) or was restored (`true`).
    Active(bool),
}

impl NationField {
    /// Column name of the field in the `nations` table.
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Region(_) => "region",
            Self::WaMember(_) => "wa_member",
            Self::WaDelegate(_) => "wa_delegate",
            Self::Active(_) => "active",
        }
    }
}

/// One nation as it appears in the daily full-dataset dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRow {
    /// Canonical name.
    pub name: String,
    /// Display name.
    pub fullname: String,
    /// Canonical region name.
    pub region: String,
    /// World Assembly membership.
    pub wa_member: bool,
    /// Delegate status; only used when the row creates a new record.
    pub wa_delegate: bool,
    /// Canonical names of endorsers.
    pub endorsements: BTreeSet<String>,
    /// Flag image URL.
    pub flag: String,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn row() -> SnapshotRow {
        SnapshotRow {
            name: "testlandia".to_owned(),
            fullname: "The Republic of Testlandia".to_owned(),
            region: "testregionia".to_owned(),
            wa_member: true,
            wa_delegate: true,
            endorsements: BTreeSet::from(["otherlandia".to_owned()]),
            flag: "https://example.com/flag.png".to_owned(),
        }
    }

    #[test]
    fn apply_snapshot_leaves_stream_fields_alone() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_default();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 2, 5, 30, 0).single().unwrap_or_default();
        let mut record = NationRecord::founded("testlandia", "elsewhere", t0);
        record.active = false;

        record.apply_snapshot(&row(), t1);

        assert_eq!(record.region.as_deref(), Some("testregionia"));
        assert!(record.wa_member);
        assert!(!record.wa_delegate, "delegate flag belongs to the stream");
        assert!(!record.active, "active flag belongs to the stream");
        assert_eq!(record.updated_at, t1);
    }

    #[test]
    fn touch_never_moves_backwards() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_default();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 2, 0, 0, 0).single().unwrap_or_default();
        let mut record = NationRecord::founded("testlandia", "testregionia", t1);
        record.touch(t0);
        assert_eq!(record.updated_at, t1);
    }

    #[test]
    fn field_columns() {
        assert_eq!(NationField::Region("r".to_owned()).column(), "region");
        assert_eq!(NationField::WaMember(true).column(), "wa_member");
        assert_eq!(NationField::WaDelegate(false).column(), "wa_delegate");
        assert_eq!(NationField::Active(false).column(), "active");
    }

    #[test]
    fn record_serializes_endorsements_as_list() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).single().unwrap_or_default();
        let record = NationRecord::from_snapshot(&row(), t0);
        let json = serde_json::to_value(&record).unwrap_or_default();
        assert_eq!(
            json.get("endorsements"),
            Some(&serde_json::json!(["otherlandia"]))
        );
    }
}
