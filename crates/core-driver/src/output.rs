//! Outputs of the driver.

use basaltbft_core_types::{Block, Height, Proposal, Round, Timeout, Vote};

/// Output of the driver, to be acted upon by the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// Start a new round.
    NewRound(Height, Round),

    /// Broadcast the proposal.
    Propose(Proposal),

    /// Broadcast the vote.
    Vote(Vote),

    /// Schedule the timeout.
    ScheduleTimeout(Timeout),

    /// Build a block to propose at the given height and round, within
    /// the given timeout.
    GetValue(Height, Round, Timeout),

    /// The block carried by this proposal was decided in the given round.
    Decide(Round, Proposal),
}

impl Output {
    /// The block this output would broadcast or decide, if any.
    pub fn block(&self) -> Option<&Block> {
        match self {
            Output::Propose(proposal) => Some(&proposal.block),
            Output::Decide(_, proposal) => Some(&proposal.block),
            _ => None,
        }
    }
}
