//! Applies parsed events to the nation registry.
//!
//! | Kind | Effect |
//! |---|---|
//! | `ENDO` | endorsers of the target gain the actor |
//! | `ENDO_WITHDRAW` | endorsers of the target lose the actor |
//! | `FOUNDING`, `FOUNDING_REFOUND` | upsert actor in region, active |
//! | `MEMBER_APPLY` | nothing |
//! | `MEMBER_ADMIT` / `MEMBER_RESIGN` | `wa_member` on / off |
//! | `MEMBER_DELEGATE` / `MEMBER_DELEGATE_LOST` | `wa_delegate` on / off |
//! | `MEMBER_DELEGATE_SEIZED` | actor on, ousted delegate off |
//! | `MOVE` | region = destination |
//! | `CTE` | active off |

use rwa_db::Registry;
use rwa_events::{Event, EventKind};
use rwa_types::NationField;

use crate::error::MutationError;

/// Writes the registry side effects of each event.
pub struct Mutator<'a, R> {
    registry: &'a R,
}

impl<'a, R: Registry> Mutator<'a, R> {
    /// Create a mutator writing through `registry`.
    pub const fn new(registry: &'a R) -> Self {
        Self { registry }
    }

    /// Apply one event.
    ///
    /// # Errors
    ///
    /// Returns [`MutationError::UnknownRecord`] if a targeted nation has no
    /// record and [`MutationError::RegistryUnavailable`] if the store
    /// failed. A delegate seizure attempts both writes; an outage on
    /// either is reported ahead of a missing record.
    pub async fn apply(&self, event: &Event) -> Result<(), MutationError> {
        let actor = event.actor();
        match event.kind() {
            EventKind::Endo => {
                let target = param(event, 0)?;
                self.update_endorsers(target, |endorsers| endorsers.insert(actor.to_owned()))
                    .await
            }
            EventKind::EndoWithdraw => {
                let target = param(event, 0)?;
                self.update_endorsers(target, |endorsers| endorsers.remove(actor))
                    .await
            }
            EventKind::Founding | EventKind::FoundingRefound => {
                let region = param(event, 0)?;
                self.registry
                    .upsert_founding(actor, region)
                    .await
                    .map_err(|e| MutationError::from_db(actor, e))
            }
            EventKind::MemberApply => Ok(()),
            EventKind::MemberAdmit => self.set(actor, NationField::WaMember(true)).await,
            EventKind::MemberResign => self.set(actor, NationField::WaMember(false)).await,
            EventKind::MemberDelegate => self.set(actor, NationField::WaDelegate(true)).await,
            EventKind::MemberDelegateLost => self.set(actor, NationField::WaDelegate(false)).await,
            EventKind::MemberDelegateSeized => {
                let ousted = param(event, 1)?;
                // Distinct records, so the two writes commute.
                let (gained, lost) = futures::join!(
                    self.set(actor, NationField::WaDelegate(true)),
                    self.set(ousted, NationField::WaDelegate(false)),
                );
                match (gained, lost) {
                    (Err(e @ MutationError::RegistryUnavailable { .. }), _)
                    | (_, Err(e @ MutationError::RegistryUnavailable { .. })) => Err(e),
                    (gained, lost) => gained.and(lost),
                }
            }
            EventKind::Move => {
                let destination = param(event, 1)?;
                self.set(actor, NationField::Region(destination.to_owned()))
                    .await
            }
            EventKind::Cte => self.set(actor, NationField::Active(false)).await,
        }
    }

    async fn set(&self, name: &str, field: NationField) -> Result<(), MutationError> {
        self.registry
            .set_field(name, &field)
            .await
            .map_err(|e| MutationError::from_db(name, e))
    }

    /// Read-modify-write of an endorser set. `edit` reports whether it
    /// changed the set; an unchanged set is not written back.
    async fn update_endorsers<F>(&self, target: &str, edit: F) -> Result<(), MutationError>
    where
        F: FnOnce(&mut std::collections::BTreeSet<String>) -> bool + Send,
    {
        let mut endorsers = self
            .registry
            .get_endorsers(target)
            .await
            .map_err(|e| MutationError::from_db(target, e))?;

        if !edit(&mut endorsers) {
            tracing::debug!(nation = target, "Endorser set unchanged");
            return Ok(());
        }

        self.registry
            .set_endorsers(target, &endorsers)
            .await
            .map_err(|e| MutationError::from_db(target, e))
    }
}

fn param(event: &Event, index: usize) -> Result<&str, MutationError> {
    event.param(index).ok_or(MutationError::MissingParameter {
        kind: event.kind(),
        index,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::Utc;
    use rwa_db::MemoryRegistry;
    use rwa_types::NationRecord;

    use super::*;

    fn event(line: &str) -> Event {
        Event::parse(line).unwrap()
    }

    fn registry_with(names: &[&str]) -> MemoryRegistry {
        MemoryRegistry::with_records(
            names
                .iter()
                .map(|&n| NationRecord::founded(n, "testregionia", Utc::now())),
        )
    }

    async fn endorsers(registry: &MemoryRegistry, name: &str) -> BTreeSet<String> {
        registry.get_endorsers(name).await.unwrap()
    }

    #[tokio::test]
    async fn endo_then_withdraw_restores_prior_set() {
        let registry = registry_with(&["testlandia", "otherlandia"]);
        let mutator = Mutator::new(&registry);
        let before = endorsers(&registry, "otherlandia").await;

        mutator
            .apply(&event("@@testlandia@@ endorsed @@otherlandia@@."))
            .await
            .unwrap();
        assert!(endorsers(&registry, "otherlandia").await.contains("testlandia"));

        mutator
            .apply(&event("@@testlandia@@ withdrew its endorsement from @@otherlandia@@."))
            .await
            .unwrap();
        assert_eq!(endorsers(&registry, "otherlandia").await, before);
    }

    #[tokio::test]
    async fn repeated_endo_and_withdraw_are_no_ops() {
        let registry = registry_with(&["testlandia", "otherlandia"]);
        let mutator = Mutator::new(&registry);
        let endo = event("@@testlandia@@ endorsed @@otherlandia@@");
        let withdraw = event("@@testlandia@@ withdrew its endorsement from @@otherlandia@@");

        mutator.apply(&endo).await.unwrap();
        mutator.apply(&endo).await.unwrap();
        assert_eq!(endorsers(&registry, "otherlandia").await.len(), 1);

        mutator.apply(&withdraw).await.unwrap();
        mutator.apply(&withdraw).await.unwrap();
        assert!(endorsers(&registry, "otherlandia").await.is_empty());
    }

    #[tokio::test]
    async fn endo_of_unknown_nation_is_unknown_record() {
        let registry = registry_with(&["testlandia"]);
        let err = Mutator::new(&registry)
            .apply(&event("@@testlandia@@ endorsed @@ghost@@."))
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::UnknownRecord { nation } if nation == "ghost"));
    }

    #[tokio::test]
    async fn founding_creates_and_refounding_reactivates() {
        let registry = MemoryRegistry::new();
        let mutator = Mutator::new(&registry);

        mutator
            .apply(&event("@@testlandia@@ was founded in %%the_pacific%%."))
            .await
            .unwrap();
        mutator
            .apply(&event("@@testlandia@@ ceased to exist in %%the_pacific%%."))
            .await
            .unwrap();
        assert!(!registry.get_nation("testlandia").await.unwrap().unwrap().active);

        mutator
            .apply(&event("@@testlandia@@ was refounded in %%the_rejected_realms%%."))
            .await
            .unwrap();
        let record = registry.get_nation("testlandia").await.unwrap().unwrap();
        assert!(record.active);
        assert_eq!(record.region.as_deref(), Some("the_rejected_realms"));
    }

    #[tokio::test]
    async fn membership_and_move_write_single_fields() {
        let registry = registry_with(&["testlandia"]);
        let mutator = Mutator::new(&registry);

        mutator
            .apply(&event("@@testlandia@@ applied to join the World Assembly."))
            .await
            .unwrap();
        assert!(!registry.get_wa_status("testlandia").await.unwrap());

        mutator
            .apply(&event("@@testlandia@@ was admitted to the World Assembly."))
            .await
            .unwrap();
        assert!(registry.get_wa_status("testlandia").await.unwrap());

        mutator
            .apply(&event("@@testlandia@@ relocated from %%testregionia%% to %%lazarus%%."))
            .await
            .unwrap();
        assert_eq!(
            registry.get_region("testlandia").await.unwrap().as_deref(),
            Some("lazarus")
        );

        mutator
            .apply(&event("@@testlandia@@ resigned from the World Assembly."))
            .await
            .unwrap();
        assert!(!registry.get_wa_status("testlandia").await.unwrap());
    }

    #[tokio::test]
    async fn seizure_leaves_exactly_one_delegate() {
        let registry = registry_with(&["usurper", "incumbent"]);
        let mutator = Mutator::new(&registry);
        mutator
            .apply(&event("@@incumbent@@ became WA Delegate of %%osiris%%."))
            .await
            .unwrap();

        mutator
            .apply(&event(
                "@@usurper@@ seized the position of %%osiris%% WA Delegate from @@incumbent@@.",
            ))
            .await
            .unwrap();

        let usurper = registry.get_nation("usurper").await.unwrap().unwrap();
        let incumbent = registry.get_nation("incumbent").await.unwrap().unwrap();
        assert!(usurper.wa_delegate);
        assert!(!incumbent.wa_delegate);
    }

    #[tokio::test]
    async fn seizure_end_state_is_independent_of_write_order() {
        let seizure =
            event("@@usurper@@ seized the position of %%osiris%% WA Delegate from @@incumbent@@.");

        let applied = registry_with(&["usurper", "incumbent"]);
        applied
            .set_field("incumbent", &NationField::WaDelegate(true))
            .await
            .unwrap();
        Mutator::new(&applied).apply(&seizure).await.unwrap();

        // The same two writes, ousted nation first.
        let reversed = registry_with(&["usurper", "incumbent"]);
        reversed
            .set_field("incumbent", &NationField::WaDelegate(true))
            .await
            .unwrap();
        reversed
            .set_field("incumbent", &NationField::WaDelegate(false))
            .await
            .unwrap();
        reversed
            .set_field("usurper", &NationField::WaDelegate(true))
            .await
            .unwrap();

        for registry in [&applied, &reversed] {
            let delegates: Vec<bool> = [
                registry.get_nation("usurper").await.unwrap().unwrap(),
                registry.get_nation("incumbent").await.unwrap().unwrap(),
            ]
            .iter()
            .map(|n| n.wa_delegate)
            .collect();
            assert_eq!(delegates, [true, false]);
        }
    }

    #[tokio::test]
    async fn seizure_attempts_both_writes_when_first_fails() {
        let registry = registry_with(&["incumbent"]);
        registry
            .set_field("incumbent", &NationField::WaDelegate(true))
            .await
            .unwrap();

        let err = Mutator::new(&registry)
            .apply(&event(
                "@@usurper@@ seized the position of %%osiris%% WA Delegate from @@incumbent@@.",
            ))
            .await
            .unwrap_err();

        assert!(matches!(err, MutationError::UnknownRecord { nation } if nation == "usurper"));
        let incumbent = registry.get_nation("incumbent").await.unwrap().unwrap();
        assert!(!incumbent.wa_delegate);
    }

    #[tokio::test]
    async fn store_outage_is_registry_unavailable() {
        let registry = registry_with(&["testlandia"]);
        registry.set_offline(true);
        let err = Mutator::new(&registry)
            .apply(&event("@@testlandia@@ was admitted to the World Assembly."))
            .await
            .unwrap_err();
        assert!(matches!(err, MutationError::RegistryUnavailable { .. }));
    }
}
