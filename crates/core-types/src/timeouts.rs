use core::time::Duration;

use crate::{Timeout, TimeoutKind};

/// Timeout durations, per kind, escalating linearly with the round.
///
/// The wait for a given timeout is `base(kind) + round * increment`, so
/// that later rounds leave lagging validators progressively more time
/// to catch up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// How long to wait for a proposal before prevoting nil.
    pub propose_base: Duration,

    /// How long to wait after a prevote quorum for "anything" before
    /// precommitting nil.
    pub prevote_base: Duration,

    /// How long to wait after a precommit quorum for "anything" before
    /// moving to the next round.
    pub precommit_base: Duration,

    /// How much every base grows per round.
    pub increment: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            propose_base: Duration::from_secs(3),
            prevote_base: Duration::from_secs(3),
            precommit_base: Duration::from_secs(3),
            increment: Duration::from_secs(1),
        }
    }
}

impl TimeoutConfig {
    /// A uniform configuration, mostly useful in tests.
    pub const fn uniform(base: Duration, increment: Duration) -> Self {
        Self {
            propose_base: base,
            prevote_base: base,
            precommit_base: base,
            increment,
        }
    }

    /// The duration to wait before the given timeout fires.
    ///
    /// # Panics
    /// If the timeout round is nil.
    pub fn duration_for(&self, timeout: Timeout) -> Duration {
        let round = timeout.round.as_u32().expect("round must be defined");

        let base = match timeout.kind {
            TimeoutKind::Propose => self.propose_base,
            TimeoutKind::Prevote => self.prevote_base,
            TimeoutKind::Precommit => self.precommit_base,
        };

        base + self.increment * round
    }
}
