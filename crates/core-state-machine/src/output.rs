//! Outputs of the round state machine.

use basaltbft_core_types::{
    Address, Block, BlockHash, Height, NilOr, Proposal, Round, Timeout, TimeoutKind, Vote,
};

/// Output of the round state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    /// Move to the new round.
    NewRound(Round),

    /// Broadcast the proposal.
    Proposal(Proposal),

    /// Broadcast the vote.
    Vote(Vote),

    /// Schedule the timeout.
    ScheduleTimeout(Timeout),

    /// Ask the host for a block to propose and schedule a timeout within
    /// which the block must arrive.
    GetValueAndScheduleTimeout(Height, Round, Timeout),

    /// Decide on the block carried by the proposal, which was proposed
    /// in the given round.
    Decision(Round, Proposal),
}

impl Output {
    /// Build a `Proposal` output.
    pub fn proposal(
        height: Height,
        round: Round,
        block: Block,
        pol_round: Round,
        address: Address,
    ) -> Self {
        Output::Proposal(Proposal::new(height, round, block, pol_round, address))
    }

    /// Build a `Vote` output for a prevote.
    pub fn prevote(
        height: Height,
        round: Round,
        block_hash: NilOr<BlockHash>,
        address: Address,
    ) -> Self {
        Output::Vote(Vote::new_prevote(height, round, block_hash, address))
    }

    /// Build a `Vote` output for a precommit.
    pub fn precommit(
        height: Height,
        round: Round,
        block_hash: NilOr<BlockHash>,
        address: Address,
    ) -> Self {
        Output::Vote(Vote::new_precommit(height, round, block_hash, address))
    }

    /// Build a `ScheduleTimeout` output.
    pub fn schedule_timeout(round: Round, kind: TimeoutKind) -> Self {
        Output::ScheduleTimeout(Timeout { round, kind })
    }

    /// Build a `GetValueAndScheduleTimeout` output.
    pub fn get_value_and_schedule_timeout(
        height: Height,
        round: Round,
        kind: TimeoutKind,
    ) -> Self {
        Output::GetValueAndScheduleTimeout(height, round, Timeout { round, kind })
    }

    /// Build a `Decision` output.
    pub fn decision(round: Round, proposal: Proposal) -> Self {
        Output::Decision(round, proposal)
    }
}
