//! [`Registry`] over the `PostgreSQL` `nations` table.
//!
//! Stream writes bump `updated_at` to `GREATEST(updated_at, now())` so the
//! column never moves backwards; snapshot writes stamp the dump time and
//! are guarded by `WHERE nations.updated_at < EXCLUDED.updated_at`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use rwa_types::{NationField, NationRecord, SnapshotRow};
use sqlx::PgPool;

use crate::error::DbError;
use crate::registry::Registry;

/// Operations on the `nations` table.
pub struct NationStore<'a> {
    pool: &'a PgPool,
}

impl<'a> NationStore<'a> {
    /// Create a new nation store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }
}

impl Registry for NationStore<'_> {
    async fn get_region(&self, name: &str) -> Result<Option<String>, DbError> {
        let region: Option<Option<String>> =
            sqlx::query_scalar(r"SELECT region FROM nations WHERE name = $1")
                .bind(name)
                .fetch_optional(self.pool)
                .await?;
        Ok(region.flatten())
    }

    async fn get_wa_status(&self, name: &str) -> Result<bool, DbError> {
        let member: Option<bool> =
            sqlx::query_scalar(r"SELECT wa_member FROM nations WHERE name = $1")
                .bind(name)
                .fetch_optional(self.pool)
                .await?;
        Ok(member.unwrap_or(false))
    }

    async fn get_endorsers(&self, name: &str) -> Result<BTreeSet<String>, DbError> {
        let endorsements: Option<Vec<String>> =
            sqlx::query_scalar(r"SELECT endorsements FROM nations WHERE name = $1")
                .bind(name)
                .fetch_optional(self.pool)
                .await?;
        endorsements
            .map(|list| list.into_iter().collect())
            .ok_or_else(|| DbError::NotFound(name.to_owned()))
    }

    async fn upsert_founding(&self, name: &str, region: &str) -> Result<(), DbError> {
        sqlx::query(
            r"INSERT INTO nations (name, region, active, updated_at)
              VALUES ($1, $2, TRUE, now())
              ON CONFLICT (name) DO UPDATE SET
                region = EXCLUDED.region,
                active = TRUE,
                updated_at = GREATEST(nations.updated_at, EXCLUDED.updated_at)",
        )
        .bind(name)
        .bind(region)
        .execute(self.pool)
        .await?;

        tracing::debug!(nation = name, region, "Upserted founding");
        Ok(())
    }

    async fn set_field(&self, name: &str, field: &NationField) -> Result<(), DbError> {
        // The column name comes from a closed enum, never from input.
        let sql = format!(
            "UPDATE nations SET {} = $2, updated_at = GREATEST(updated_at, now()) WHERE name = $1",
            field.column()
        );
        let query = sqlx::query(&sql).bind(name);
        let query = match field {
            NationField::Region(region) => query.bind(region.as_str()),
            NationField::WaMember(value)
            | NationField::WaDelegate(value)
            | NationField::Active(value) => query.bind(*value),
        };

        let result = query.execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(name.to_owned()));
        }

        tracing::debug!(nation = name, column = field.column(), "Updated nation field");
        Ok(())
    }

    async fn set_endorsers(
        &self,
        name: &str,
        endorsers: &BTreeSet<String>,
    ) -> Result<(), DbError> {
        let list: Vec<&str> = endorsers.iter().map(String::as_str).collect();
        let result = sqlx::query(
            r"UPDATE nations
              SET endorsements = $2, updated_at = GREATEST(updated_at, now())
              WHERE name = $1",
        )
        .bind(name)
        .bind(&list)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::NotFound(name.to_owned()));
        }
        Ok(())
    }

    /// Multi-row upsert using UNNEST, wrapped in one transaction.
    ///
    /// `UNNEST` cannot carry a jagged array-of-arrays, so each endorser set
    /// travels as one comma-joined string and is split server-side.
    /// Canonical names never contain commas.
    async fn bulk_upsert_if_stale(
        &self,
        rows: &[SnapshotRow],
        timestamp: DateTime<Utc>,
    ) -> Result<u64, DbError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let len = rows.len();
        let mut names = Vec::with_capacity(len);
        let mut fullnames = Vec::with_capacity(len);
        let mut regions = Vec::with_capacity(len);
        let mut wa_members = Vec::with_capacity(len);
        let mut wa_delegates = Vec::with_capacity(len);
        let mut endorsements = Vec::with_capacity(len);
        let mut flags = Vec::with_capacity(len);

        for row in rows {
            names.push(row.name.as_str());
            fullnames.push(row.fullname.as_str());
            regions.push(row.region.as_str());
            wa_members.push(row.wa_member);
            wa_delegates.push(row.wa_delegate);
            endorsements.push(
                row.endorsements
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(","),
            );
            flags.push(row.flag.as_str());
        }

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r"INSERT INTO nations (name, fullname, region, wa_member, wa_delegate, endorsements, flag, updated_at)
              SELECT n, f, r, m, d, string_to_array(e, ','), fl, $8::TIMESTAMPTZ
              FROM UNNEST($1::TEXT[], $2::TEXT[], $3::TEXT[], $4::BOOL[], $5::BOOL[], $6::TEXT[], $7::TEXT[])
                AS t(n, f, r, m, d, e, fl)
              ON CONFLICT (name) DO UPDATE SET
                fullname = EXCLUDED.fullname,
                region = EXCLUDED.region,
                wa_member = EXCLUDED.wa_member,
                endorsements = EXCLUDED.endorsements,
                flag = EXCLUDED.flag,
                updated_at = EXCLUDED.updated_at
              WHERE nations.updated_at < EXCLUDED.updated_at",
        )
        .bind(&names)
        .bind(&fullnames)
        .bind(&regions)
        .bind(&wa_members)
        .bind(&wa_delegates)
        .bind(&endorsements)
        .bind(&flags)
        .bind(timestamp)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let written = result.rows_affected();
        tracing::debug!(count = len, written, "Upserted snapshot rows (batch UNNEST)");
        Ok(written)
    }

    async fn get_nation(&self, name: &str) -> Result<Option<NationRecord>, DbError> {
        let row = sqlx::query_as::<_, NationRow>(
            r"SELECT name, fullname, region, wa_member, wa_delegate, active, endorsements, flag, updated_at
              FROM nations
              WHERE name = $1",
        )
        .bind(name)
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(NationRecord::from))
    }

    async fn endorsable_by(&self, name: &str) -> Result<Vec<String>, DbError> {
        let names = sqlx::query_scalar::<_, String>(
            r"SELECT n.name
              FROM nations n
              WHERE n.region = (SELECT region FROM nations WHERE name = $1)
                AND n.wa_member
                AND n.active
                AND n.name <> $1
                AND NOT ($1 = ANY(n.endorsements))
              ORDER BY n.name",
        )
        .bind(name)
        .fetch_all(self.pool)
        .await?;

        Ok(names)
    }

    async fn closest_names(&self, query: &str, limit: usize) -> Result<Vec<String>, DbError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let names = sqlx::query_scalar::<_, String>(
            r"SELECT name
              FROM nations
              ORDER BY levenshtein(name, $1), name
              LIMIT $2",
        )
        .bind(query)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;

        Ok(names)
    }
}

/// A row from the `nations` table.
///
/// Uses runtime types rather than compile-time checked types to
/// avoid requiring a live database during builds.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NationRow {
    /// Canonical name.
    pub name: String,
    /// Display name.
    pub fullname: Option<String>,
    /// Canonical region name.
    pub region: Option<String>,
    /// World Assembly membership.
    pub wa_member: bool,
    /// World Assembly delegacy.
    pub wa_delegate: bool,
    /// False once the nation ceased to exist.
    pub active: bool,
    /// Canonical names of endorsers.
    pub endorsements: Vec<String>,
    /// Flag image URL.
    pub flag: Option<String>,
    /// Last write by either writer.
    pub updated_at: DateTime<Utc>,
}

impl From<NationRow> for NationRecord {
    fn from(row: NationRow) -> Self {
        Self {
            name: row.name,
            fullname: row.fullname,
            region: row.region,
            wa_member: row.wa_member,
            wa_delegate: row.wa_delegate,
            active: row.active,
            endorsements: row.endorsements.into_iter().collect(),
            flag: row.flag,
            updated_at: row.updated_at,
        }
    }
}
