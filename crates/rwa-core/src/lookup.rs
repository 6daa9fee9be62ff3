//! Read-only queries over the registry.
//!
//! Inputs may be display names ("Nova Aohr"); they are canonicalised before
//! they reach the store.

use std::collections::BTreeSet;

use rwa_db::{DbError, Registry};
use rwa_types::{NationRecord, canonicalize};

/// Number of suggestions returned when a name has no exact match.
pub const SUGGESTION_LIMIT: usize = 3;

/// Result of [`NationLookup::find`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// The name matched a record.
    Exact(NationRecord),
    /// No exact match; the closest known names, best first.
    Suggestions(Vec<String>),
}

/// Read-only view of the registry.
pub struct NationLookup<'a, R> {
    registry: &'a R,
}

impl<'a, R: Registry> NationLookup<'a, R> {
    /// Create a lookup over `registry`.
    pub const fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    /// Region of `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store fails.
    pub async fn region(&self, name: &str) -> Result<Option<String>, DbError> {
        self.registry.get_region(&canonicalize(name)).await
    }

    /// Whether `name` is a WA member.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store fails.
    pub async fn wa_status(&self, name: &str) -> Result<bool, DbError> {
        self.registry.get_wa_status(&canonicalize(name)).await
    }

    /// Nations endorsing `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::NotFound`] if `name` has no record.
    pub async fn endorsements(&self, name: &str) -> Result<BTreeSet<String>, DbError> {
        self.registry.get_endorsers(&canonicalize(name)).await
    }

    /// Active WA members in `name`'s region that `name` has not endorsed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store fails.
    pub async fn endorsable(&self, name: &str) -> Result<Vec<String>, DbError> {
        self.registry.endorsable_by(&canonicalize(name)).await
    }

    /// The record for `name`, or up to [`SUGGESTION_LIMIT`] close names.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store fails.
    pub async fn find(&self, name: &str) -> Result<LookupResult, DbError> {
        let canonical = canonicalize(name);
        if let Some(record) = self.registry.get_nation(&canonical).await? {
            return Ok(LookupResult::Exact(record));
        }
        let suggestions = self
            .registry
            .closest_names(&canonical, SUGGESTION_LIMIT)
            .await?;
        tracing::debug!(query = %canonical, count = suggestions.len(), "No exact match, suggesting");
        Ok(LookupResult::Suggestions(suggestions))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use chrono::Utc;
    use rwa_db::MemoryRegistry;

    use super::*;

    fn registry() -> MemoryRegistry {
        let mut nova = NationRecord::founded("nova_aohr", "testregionia", Utc::now());
        nova.wa_member = true;
        let mut other = NationRecord::founded("otherlandia", "testregionia", Utc::now());
        other.wa_member = true;
        other.endorsements.insert("nova_aohr".to_owned());
        MemoryRegistry::with_records([
            nova,
            other,
            NationRecord::founded("nova_aohra", "lazarus", Utc::now()),
            NationRecord::founded("nova", "lazarus", Utc::now()),
            NationRecord::founded("zzyzx", "lazarus", Utc::now()),
        ])
    }

    #[tokio::test]
    async fn display_names_are_canonicalised() {
        let registry = registry();
        let lookup = NationLookup::new(&registry);
        assert_eq!(
            lookup.region("Nova Aohr").await.unwrap().as_deref(),
            Some("testregionia")
        );
        assert!(lookup.wa_status("NOVA AOHR").await.unwrap());
        assert!(lookup.endorsements("Otherlandia").await.unwrap().contains("nova_aohr"));
    }

    #[tokio::test]
    async fn endorsable_skips_already_endorsed() {
        let registry = registry();
        let lookup = NationLookup::new(&registry);
        assert!(lookup.endorsable("Nova Aohr").await.unwrap().is_empty());
        assert_eq!(
            lookup.endorsable("otherlandia").await.unwrap(),
            vec!["nova_aohr".to_owned()]
        );
    }

    #[tokio::test]
    async fn find_returns_exact_or_suggestions() {
        let registry = registry();
        let lookup = NationLookup::new(&registry);

        let exact = lookup.find("Nova Aohr").await.unwrap();
        assert!(matches!(exact, LookupResult::Exact(record) if record.name == "nova_aohr"));

        let LookupResult::Suggestions(names) = lookup.find("nova aoh").await.unwrap() else {
            panic!("expected suggestions");
        };
        assert_eq!(names.len(), SUGGESTION_LIMIT);
        assert_eq!(names.first().map(String::as_str), Some("nova_aohr"));
        assert!(!names.contains(&"zzyzx".to_owned()));
    }
}
