//! The closed set of event kinds the feed produces.
//!
//! Each kind carries a fixed table entry: the verb phrase that identifies
//! it, the token positions that hold its parameters, its symbolic name, and
//! the coarse bucket channels filter on. Adding a kind means adding one
//! variant and one arm to each table below.

use serde::{Deserialize, Serialize};

/// One kind of feed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    /// `@@n@@ relocated from %%a%% to %%b%%.`
    Move,
    /// `@@n@@ was founded in %%r%%.`
    Founding,
    /// `@@n@@ was refounded in %%r%%.`
    FoundingRefound,
    /// `@@n@@ ceased to exist in %%r%%.`
    Cte,
    /// `@@n@@ applied to join the World Assembly.`
    MemberApply,
    /// `@@n@@ was admitted to the World Assembly.`
    MemberAdmit,
    /// `@@n@@ resigned from the World Assembly.`
    MemberResign,
    /// `@@n@@ became WA Delegate of %%r%%.`
    MemberDelegate,
    /// `@@n@@ seized the position of %%r%% WA Delegate from @@m@@.`
    MemberDelegateSeized,
    /// `@@n@@ lost WA Delegate status in %%r%%.`
    MemberDelegateLost,
    /// `@@n@@ endorsed @@m@@.`
    Endo,
    /// `@@n@@ withdrew its endorsement from @@m@@.`
    EndoWithdraw,
}

impl EventKind {
    /// Every kind, in the order verb phrases are matched.
    pub const ALL: [Self; 12] = [
        Self::Move,
        Self::Founding,
        Self::FoundingRefound,
        Self::Cte,
        Self::MemberApply,
        Self::MemberAdmit,
        Self::MemberResign,
        Self::MemberDelegate,
        Self::MemberDelegateSeized,
        Self::MemberDelegateLost,
        Self::Endo,
        Self::EndoWithdraw,
    ];

    /// The phrase a sentence of this kind starts with.
    pub const fn verb_phrase(self) -> &'static str {
        match self {
            Self::Move => "relocated from",
            Self::Founding => "was founded",
            Self::FoundingRefound => "was refounded",
            Self::Cte => "ceased to",
            Self::MemberApply => "applied to",
            Self::MemberAdmit => "was admitted",
            Self::MemberResign => "resigned from",
            Self::MemberDelegate => "became WA",
            Self::MemberDelegateSeized => "seized",
            Self::MemberDelegateLost => "lost WA",
            Self::Endo => "endorsed",
            Self::EndoWithdraw => "withdrew its",
        }
    }

    /// Zero-based token positions (counting the actor as 0) holding the
    /// kind's parameters, in parameter order.
    pub const fn parameter_positions(self) -> &'static [usize] {
        match self {
            Self::Move => &[3, 5],
            Self::Founding | Self::FoundingRefound => &[4],
            Self::Cte | Self::MemberDelegate => &[5],
            Self::MemberApply | Self::MemberAdmit | Self::MemberResign => &[],
            Self::MemberDelegateSeized => &[5, 9],
            Self::MemberDelegateLost => &[6],
            Self::Endo => &[2],
            Self::EndoWithdraw => &[5],
        }
    }

    /// Symbolic name, e.g. `MEMBER_ADMIT`.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Move => "MOVE",
            Self::Founding => "FOUNDING",
            Self::FoundingRefound => "FOUNDING_REFOUND",
            Self::Cte => "CTE",
            Self::MemberApply => "MEMBER_APPLY",
            Self::MemberAdmit => "MEMBER_ADMIT",
            Self::MemberResign => "MEMBER_RESIGN",
            Self::MemberDelegate => "MEMBER_DELEGATE",
            Self::MemberDelegateSeized => "MEMBER_DELEGATE_SEIZED",
            Self::MemberDelegateLost => "MEMBER_DELEGATE_LOST",
            Self::Endo => "ENDO",
            Self::EndoWithdraw => "ENDO_WITHDRAW",
        }
    }

    /// Coarse category: the first segment of [`symbol`](Self::symbol).
    pub const fn bucket(self) -> Bucket {
        match self {
            Self::Move => Bucket::Move,
            Self::Founding | Self::FoundingRefound => Bucket::Founding,
            Self::Cte => Bucket::Cte,
            Self::MemberApply
            | Self::MemberAdmit
            | Self::MemberResign
            | Self::MemberDelegate
            | Self::MemberDelegateSeized
            | Self::MemberDelegateLost => Bucket::Member,
            Self::Endo | Self::EndoWithdraw => Bucket::Endo,
        }
    }

    /// Identify the kind of a sentence (the line minus its actor token).
    ///
    /// First match in [`ALL`](Self::ALL) order wins.
    pub fn from_sentence(sentence: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| sentence.starts_with(kind.verb_phrase()))
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Coarse event category used for cheap channel filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Relocations.
    Move,
    /// Foundings and refoundings.
    Founding,
    /// Nations ceasing to exist.
    Cte,
    /// World Assembly membership and delegacy.
    Member,
    /// Endorsements given and withdrawn.
    Endo,
}

impl Bucket {
    /// Lowercase bucket name as used in channel configuration.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Founding => "founding",
            Self::Cte => "cte",
            Self::Member => "member",
            Self::Endo => "endo",
        }
    }
}

impl std::fmt::Display for Bucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
