//! Channel subscriptions and the filter rules that decide whether a channel
//! wants an event.

use std::collections::BTreeSet;

use rwa_events::{Bucket, EventKind};

/// A channel's filter and delivery target. Read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSubscription {
    /// Configuration key of the channel.
    pub id: String,
    /// Display name used in the outbound username.
    pub name: String,
    /// Delivery target (a webhook URL).
    pub target: String,
    /// Canonical region allow-list. Empty means no restriction.
    pub regions: BTreeSet<String>,
    /// Bucket allow-list. Empty means no restriction.
    pub buckets: BTreeSet<Bucket>,
    /// Endorsement-alert mode.
    pub endotarting: bool,
}

/// What the router knows about an event when matching it against channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteFacts<'a> {
    /// The event kind.
    pub kind: EventKind,
    /// The actor's region according to the registry.
    pub region: Option<&'a str>,
    /// For MOVE, the origin region taken from the event text.
    pub origin: Option<&'a str>,
    /// Whether the actor is a WA member. Only consulted for MOVE in
    /// endorsement-alert mode.
    pub actor_is_member: bool,
}

impl ChannelSubscription {
    /// Whether the channel restricts on region at all.
    pub fn filters_region(&self) -> bool {
        !self.regions.is_empty()
    }

    fn lists_region(&self, region: Option<&str>) -> bool {
        region.is_some_and(|r| self.regions.contains(r))
    }

    /// Decide whether this channel wants an event.
    pub fn accepts(&self, facts: &RouteFacts<'_>) -> bool {
        if self.filters_region()
            && !self.lists_region(facts.region)
            && !self.lists_region(facts.origin)
        {
            return false;
        }

        if self.endotarting {
            // The origin region never qualifies here.
            return self.lists_region(facts.region)
                && match facts.kind {
                    EventKind::Endo | EventKind::MemberAdmit => true,
                    EventKind::Move => facts.actor_is_member,
                    _ => false,
                };
        }

        self.buckets.is_empty() || self.buckets.contains(&facts.kind.bucket())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(regions: &[&str], buckets: &[Bucket], endotarting: bool) -> ChannelSubscription {
        ChannelSubscription {
            id: "test".to_owned(),
            name: "Test".to_owned(),
            target: "https://example.invalid/hook".to_owned(),
            regions: regions.iter().map(|&r| r.to_owned()).collect(),
            buckets: buckets.iter().copied().collect(),
            endotarting,
        }
    }

    fn facts(kind: EventKind, region: Option<&'static str>) -> RouteFacts<'static> {
        RouteFacts {
            kind,
            region,
            origin: None,
            actor_is_member: false,
        }
    }

    #[test]
    fn unrestricted_channel_matches_everything() {
        let open = channel(&[], &[], false);
        for kind in EventKind::ALL {
            assert!(open.accepts(&facts(kind, None)), "{kind}");
            assert!(open.accepts(&facts(kind, Some("anywhere"))), "{kind}");
        }
    }

    #[test]
    fn region_filter_matches_move_by_origin_or_destination() {
        let watch = channel(&["testregionia"], &[], false);
        let into = RouteFacts {
            kind: EventKind::Move,
            region: Some("testregionia"),
            origin: Some("lazarus"),
            actor_is_member: false,
        };
        let out_of = RouteFacts {
            region: Some("lazarus"),
            origin: Some("testregionia"),
            ..into
        };
        let elsewhere = RouteFacts {
            region: Some("lazarus"),
            origin: Some("osiris"),
            ..into
        };
        assert!(watch.accepts(&into));
        assert!(watch.accepts(&out_of));
        assert!(!watch.accepts(&elsewhere));
    }

    #[test]
    fn bucket_filter_applies_after_region() {
        let endos = channel(&[], &[Bucket::Endo], false);
        assert!(endos.accepts(&facts(EventKind::Endo, None)));
        assert!(endos.accepts(&facts(EventKind::EndoWithdraw, None)));
        assert!(!endos.accepts(&facts(EventKind::Move, None)));
    }

    #[test]
    fn endotarting_only_admits_endo_and_admit_in_region() {
        let alert = channel(&["testregionia"], &[Bucket::Member, Bucket::Cte], true);
        for kind in EventKind::ALL {
            let expected = matches!(kind, EventKind::Endo | EventKind::MemberAdmit);
            assert_eq!(
                alert.accepts(&facts(kind, Some("testregionia"))),
                expected,
                "{kind}"
            );
            assert!(!alert.accepts(&facts(kind, Some("lazarus"))), "{kind}");
        }
    }

    #[test]
    fn endotarting_admits_member_moving_in() {
        let alert = channel(&["testregionia"], &[], true);
        let member_in = RouteFacts {
            kind: EventKind::Move,
            region: Some("testregionia"),
            origin: Some("lazarus"),
            actor_is_member: true,
        };
        let member_out = RouteFacts {
            region: Some("lazarus"),
            origin: Some("testregionia"),
            ..member_in
        };
        let civilian_in = RouteFacts {
            actor_is_member: false,
            ..member_in
        };
        assert!(alert.accepts(&member_in));
        assert!(!alert.accepts(&member_out));
        assert!(!alert.accepts(&civilian_in));
    }

    #[test]
    fn endotarting_without_regions_never_matches() {
        let alert = channel(&[], &[], true);
        assert!(!alert.accepts(&facts(EventKind::Endo, Some("testregionia"))));
    }
}
