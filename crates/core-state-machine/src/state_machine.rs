//! The round state machine proper.

use basaltbft_core_types::{Address, Block, NilOr, Proposal, Round, TimeoutKind};

use crate::input::Input;
use crate::output::Output;
use crate::state::{State, Step};
use crate::transition::Transition;

/// Immutable information about the input and our node:
/// the round the input is for, our address, and the proposer for the
/// round we are at.
pub struct Info<'a> {
    /// The round the input is for; can differ from the round we are at.
    pub input_round: Round,

    /// Address of our node.
    pub address: &'a Address,

    /// Proposer for the round we are at.
    pub proposer: &'a Address,
}

impl<'a> Info<'a> {
    /// Create a new `Info` instance.
    pub fn new(input_round: Round, address: &'a Address, proposer: &'a Address) -> Self {
        Self {
            input_round,
            address,
            proposer,
        }
    }

    /// Whether we are the proposer for the round we are at.
    pub fn is_proposer(&self) -> bool {
        self.address == self.proposer
    }
}

/// Check that a proposal has a valid proof-of-lock round.
fn is_valid_pol_round(state: &State, pol_round: Round) -> bool {
    pol_round.is_defined() && pol_round < state.round
}

/// Apply an input to the current state at the current round.
///
/// Valid transitions result in at least a change to the state and/or an
/// output. Line numbers refer to the algorithm in the Tendermint paper
/// (arXiv:1807.04938).
pub fn apply(state: State, info: &Info<'_>, input: Input) -> Transition {
    let this_round = state.round == info.input_round;

    match (state.step, input) {
        //
        // From Unstarted.
        //

        // L11/L14: we are the proposer.
        (Step::Unstarted, Input::NewRound(round)) if info.is_proposer() => {
            propose_valid_or_get_value(state.with_round(round), info.address)
        }

        // L11/L20: we are not the proposer.
        (Step::Unstarted, Input::NewRound(round)) => {
            schedule_timeout_propose(state.with_round(round))
        }

        //
        // From Propose. Input must be for the current round.
        //

        // L18: the host gave us a fresh block to propose.
        (Step::Propose, Input::ProposeValue(block)) if this_round => {
            debug_assert!(info.is_proposer());

            propose(state, block, info.address)
        }

        // L22 with a valid proposal.
        (Step::Propose, Input::Proposal(proposal)) if this_round && proposal.pol_round.is_nil() => {
            prevote(state, info.address, &proposal)
        }

        // L22 with an invalid proposal.
        (Step::Propose, Input::InvalidProposal) if this_round => prevote_nil(state, info.address),

        // L28 with a valid proposal.
        (Step::Propose, Input::ProposalAndPolkaPrevious(proposal))
            if this_round && is_valid_pol_round(&state, proposal.pol_round) =>
        {
            prevote_previous(state, info.address, &proposal)
        }

        // L28 with an invalid proposal.
        (Step::Propose, Input::InvalidProposalAndPolkaPrevious(proposal))
            if this_round && is_valid_pol_round(&state, proposal.pol_round) =>
        {
            prevote_nil(state, info.address)
        }

        // L57
        (Step::Propose, Input::TimeoutPropose) if this_round => prevote_nil(state, info.address),

        //
        // From Prevote. Input must be for the current round.
        //

        // L34
        (Step::Prevote, Input::PolkaAny) if this_round => schedule_timeout_prevote(state),

        // L44
        (Step::Prevote, Input::PolkaNil) if this_round => precommit_nil(state, info.address),

        // L36/L37: only ever seen once, the keeper emits each threshold once.
        (Step::Prevote, Input::ProposalAndPolkaCurrent(proposal)) if this_round => {
            precommit(state, info.address, proposal)
        }

        // L61
        (Step::Prevote, Input::TimeoutPrevote) if this_round => precommit_nil(state, info.address),

        //
        // From Precommit.
        //

        // L36/L42: the polka landed after we already precommitted.
        (Step::Precommit, Input::ProposalAndPolkaCurrent(proposal)) if this_round => {
            set_valid_block(state, &proposal)
        }

        //
        // From Commit. No more state transitions.
        //
        (Step::Commit, _) => Transition::invalid(state),

        //
        // From all other steps, guarded by round.
        //

        // L47
        (_, Input::PrecommitAny) if this_round => schedule_timeout_precommit(state),

        // L65
        (_, Input::TimeoutPrecommit) if this_round => {
            round_skip(state, info.input_round.increment())
        }

        // L55
        (_, Input::SkipRound(round)) if state.round < round => round_skip(state, round),

        // L49
        (_, Input::ProposalAndPrecommitValue(proposal)) => commit(state, proposal),

        // Invalid transition.
        _ => Transition::invalid(state),
    }
}

//---------------------------------------------------------------------
// Propose
//---------------------------------------------------------------------

/// We are the proposer: repropose the valid block if we have one,
/// otherwise ask the host for a fresh block.
///
/// Ref: L13-L16, L19
pub fn propose_valid_or_get_value(state: State, address: &Address) -> Transition {
    match &state.valid {
        Some(valid) => {
            // L16: carry the valid block forward, with its polka round.
            let output = Output::proposal(
                state.height,
                state.round,
                valid.block.clone(),
                valid.round,
                *address,
            );

            Transition::to(state.with_step(Step::Propose)).with_output(output)
        }
        None => {
            // L18
            let output = Output::get_value_and_schedule_timeout(
                state.height,
                state.round,
                TimeoutKind::Propose,
            );

            Transition::to(state.with_step(Step::Propose)).with_output(output)
        }
    }
}

/// We are the proposer; propose the block the host handed us.
///
/// Ref: L13, L17-18
pub fn propose(state: State, block: Block, address: &Address) -> Transition {
    let output = Output::proposal(state.height, state.round, block, Round::Nil, *address);

    Transition::to(state.with_step(Step::Propose)).with_output(output)
}

//---------------------------------------------------------------------
// Prevote
//---------------------------------------------------------------------

/// Received a fresh valid proposal; prevote its block unless we are
/// locked on a different one.
///
/// Ref: L22 with valid proposal
pub fn prevote(state: State, address: &Address, proposal: &Proposal) -> Transition {
    debug_assert!(proposal.pol_round.is_nil());

    let proposed = proposal.block_hash();

    let block_hash = match &state.locked {
        // L24: already locked on this block.
        Some(locked) if locked.block.hash() == proposed => NilOr::Val(proposed),
        // L26: locked on a different block.
        Some(_) => NilOr::Nil,
        // L24: not locked.
        None => NilOr::Val(proposed),
    };

    let output = Output::prevote(state.height, state.round, block_hash, *address);
    Transition::to(state.with_step(Step::Prevote)).with_output(output)
}

/// Received a valid proposal for a block that gathered a polka in an
/// earlier round; prevote it unless we hold a more recent lock on a
/// different block.
///
/// Ref: L28
pub fn prevote_previous(state: State, address: &Address, proposal: &Proposal) -> Transition {
    let pol_round = proposal.pol_round;
    debug_assert!(pol_round.is_defined());
    debug_assert!(pol_round < proposal.round);

    let proposed = proposal.block_hash();

    let block_hash = match &state.locked {
        // L30: the polka supersedes our lock (equal round unlocks too).
        Some(locked) if locked.round <= pol_round => NilOr::Val(proposed),
        // L30: locked on that very block.
        Some(locked) if locked.block.hash() == proposed => NilOr::Val(proposed),
        // L32: locked on a different block in a later round.
        Some(_) => NilOr::Nil,
        // L30: not locked.
        None => NilOr::Val(proposed),
    };

    let output = Output::prevote(state.height, state.round, block_hash, *address);
    Transition::to(state.with_step(Step::Prevote)).with_output(output)
}

/// Received an invalid or absent proposal; prevote nil.
///
/// Ref: L22/L25, L28/L31, L57
pub fn prevote_nil(state: State, address: &Address) -> Transition {
    let output = Output::prevote(state.height, state.round, NilOr::Nil, *address);

    Transition::to(state.with_step(Step::Prevote)).with_output(output)
}

//---------------------------------------------------------------------
// Precommit
//---------------------------------------------------------------------

/// Received a polka for the proposed block; lock on it and precommit it.
///
/// Ref: L36
pub fn precommit(state: State, address: &Address, proposal: Proposal) -> Transition {
    if state.step != Step::Prevote {
        return Transition::to(state);
    }

    let block = proposal.block;
    let output = Output::precommit(
        state.height,
        state.round,
        NilOr::Val(block.hash()),
        *address,
    );

    let next = state
        .set_locked(block.clone())
        .set_valid(block)
        .with_step(Step::Precommit);

    Transition::to(next).with_output(output)
}

/// Received a polka for nil, or timed out waiting for prevotes;
/// precommit nil and release the lock.
///
/// Precommitting nil is the one place the lock is cleared.
///
/// Ref: L44, L61
pub fn precommit_nil(state: State, address: &Address) -> Transition {
    let output = Output::precommit(state.height, state.round, NilOr::Nil, *address);

    let next = state.clear_locked().with_step(Step::Precommit);
    Transition::to(next).with_output(output)
}

//---------------------------------------------------------------------
// Timeouts
//---------------------------------------------------------------------

/// We are not the proposer; schedule the propose timeout.
///
/// Ref: L11, L20
pub fn schedule_timeout_propose(state: State) -> Transition {
    let output = Output::schedule_timeout(state.round, TimeoutKind::Propose);
    Transition::to(state.with_step(Step::Propose)).with_output(output)
}

/// We received a polka for anything; schedule the prevote timeout.
///
/// Ref: L34
pub fn schedule_timeout_prevote(state: State) -> Transition {
    let output = Output::schedule_timeout(state.round, TimeoutKind::Prevote);
    Transition::to(state).with_output(output)
}

/// We received +2/3 precommits for anything; schedule the precommit timeout.
///
/// Ref: L47
pub fn schedule_timeout_precommit(state: State) -> Transition {
    let output = Output::schedule_timeout(state.round, TimeoutKind::Precommit);
    Transition::to(state).with_output(output)
}

//---------------------------------------------------------------------
// Valid block
//---------------------------------------------------------------------

/// We received a polka for a block after we already precommitted.
/// Record the block as valid for the current round.
///
/// Ref: L36/L42
pub fn set_valid_block(state: State, proposal: &Proposal) -> Transition {
    Transition::to(state.set_valid(proposal.block.clone()))
}

//---------------------------------------------------------------------
// New round, commit
//---------------------------------------------------------------------

/// We finished a round (timeout precommit) or saw f+1 messages from a
/// higher round. Move to that round.
///
/// Ref: L65, L55
pub fn round_skip(state: State, round: Round) -> Transition {
    let next = state.with_round(round).with_step(Step::Unstarted);
    Transition::to(next).with_output(Output::NewRound(round))
}

/// We received +2/3 precommits for a proposed block: decide it.
///
/// Ref: L49
pub fn commit(state: State, proposal: Proposal) -> Transition {
    let round = proposal.round;
    let next = state
        .set_decision(round, proposal.block.clone())
        .with_step(Step::Commit);

    let output = Output::decision(round, proposal);
    Transition::to(next).with_output(output)
}
