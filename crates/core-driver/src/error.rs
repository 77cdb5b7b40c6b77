//! Errors yielded by the driver.

use basaltbft_core_types::{Address, Height, Round};

/// The types of errors that can be yielded by the driver.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// No proposer was set for this round.
    #[error("no proposer set for height {0} at round {1}")]
    NoProposer(Height, Round),

    /// The proposer for this round is not part of the validator set.
    #[error("proposer not found: {0}")]
    ProposerNotFound(Address),

    /// The vote came from outside the validator set.
    #[error("validator not found: {0}")]
    ValidatorNotFound(Address),

    /// Received a proposal for another height.
    #[error("received proposal for height {proposal_height}, consensus is at {consensus_height}")]
    InvalidProposalHeight {
        /// Height of the proposal.
        proposal_height: Height,
        /// Height consensus is at.
        consensus_height: Height,
    },

    /// Received a vote for another height.
    #[error("received vote for height {vote_height}, consensus is at {consensus_height}")]
    InvalidVoteHeight {
        /// Height of the vote.
        vote_height: Height,
        /// Height consensus is at.
        consensus_height: Height,
    },
}
