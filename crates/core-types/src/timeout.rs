use core::fmt;

use crate::Round;

/// The step a timeout is armed for.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimeoutKind {
    /// Waiting for a proposal.
    Propose,

    /// Waiting for a prevote quorum to converge on one block.
    Prevote,

    /// Waiting for a precommit quorum to converge on one block.
    Precommit,
}

/// A timeout key: at most one timer is armed per `(kind, round)` pair.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct Timeout {
    /// The timeout kind.
    pub kind: TimeoutKind,

    /// The round the timeout is armed for.
    pub round: Round,
}

impl Timeout {
    /// Create a new timeout for the given round and kind.
    pub const fn new(round: Round, kind: TimeoutKind) -> Self {
        Self { kind, round }
    }

    /// Create a new propose-step timeout.
    pub const fn propose(round: Round) -> Self {
        Self::new(round, TimeoutKind::Propose)
    }

    /// Create a new prevote-step timeout.
    pub const fn prevote(round: Round) -> Self {
        Self::new(round, TimeoutKind::Prevote)
    }

    /// Create a new precommit-step timeout.
    pub const fn precommit(round: Round) -> Self {
        Self::new(round, TimeoutKind::Precommit)
    }
}

impl fmt::Display for Timeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}Timeout({})", self.kind, self.round)
    }
}
