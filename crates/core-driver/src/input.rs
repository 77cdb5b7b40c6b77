//! Inputs to the driver.

use basaltbft_core_types::{
    Address, Block, Height, Round, SignedProposal, SignedVote, Timeout, Validity,
};

/// Input to the driver.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// Start the given round with the given proposer.
    NewRound(Height, Round, Address),

    /// Propose the given block, previously requested via
    /// [`Output::GetValue`](crate::Output::GetValue).
    ProposeValue(Round, Block),

    /// A proposal was received, already signature-checked, together with
    /// the chain's verdict on its block.
    Proposal(SignedProposal, Validity),

    /// A vote was received, already signature-checked.
    Vote(SignedVote),

    /// A scheduled timeout elapsed.
    TimeoutElapsed(Timeout),
}
