//! Inputs to the round state machine.

use basaltbft_core_types::{Block, BlockHash, Proposal, Round};

/// Input to the round state machine.
///
/// Line numbers refer to the consensus algorithm as published in the
/// Tendermint paper (arXiv:1807.04938).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// No input.
    NoInput,

    /// Start a new round, either as proposer or not. L14/L20
    NewRound(Round),

    /// Propose this block. L14
    ProposeValue(Block),

    /// Receive a fresh, valid proposal. L22 + L23 (valid)
    Proposal(Proposal),

    /// Receive an invalid proposal. L26 + L32 (invalid)
    InvalidProposal,

    /// Receive a valid proposal carrying a polka from a previous round.
    /// L28 + L29 (valid)
    ProposalAndPolkaPrevious(Proposal),

    /// Receive an invalid proposal carrying a polka from a previous round.
    /// L28 + L29 (invalid)
    InvalidProposalAndPolkaPrevious(Proposal),

    /// Receive +2/3 prevotes for anything. L34
    PolkaAny,

    /// Receive +2/3 prevotes for nil. L44
    PolkaNil,

    /// Receive +2/3 prevotes for the proposed block in the current round.
    /// L36
    ProposalAndPolkaCurrent(Proposal),

    /// Receive +2/3 precommits for anything. L47
    PrecommitAny,

    /// Receive +2/3 precommits for a proposed block. L49
    ProposalAndPrecommitValue(Proposal),

    /// Receive +2/3 precommits for a block hash we have no proposal for.
    /// L51
    PrecommitValue(BlockHash),

    /// Receive f+1 messages from a higher round. L55
    SkipRound(Round),

    /// Timeout waiting for a proposal. L57
    TimeoutPropose,

    /// Timeout waiting for prevotes. L61
    TimeoutPrevote,

    /// Timeout waiting for precommits. L65
    TimeoutPrecommit,
}
