//! Multiplexes raw proposals and vote thresholds into round state machine
//! inputs.
//!
//! Which input a message becomes depends on the step we are at and on the
//! thresholds already met by earlier messages. Looking at the first row as
//! an example: a proposal whose block already has a quorum of precommits
//! becomes `ProposalAndPrecommitValue` (L49), whatever step we are at, and
//! the state machine commits.
//!
//! | Step    | Threshold            | Proposal        | Input to round SM               | New step  |
//! |---------|----------------------|-----------------|---------------------------------|-----------|
//! | any     | PrecommitValue(b)    | Proposal(b)     | ProposalAndPrecommitValue       | commit    |
//! | any     | PrecommitAny         | *               | PrecommitAny                    | unchanged |
//! | propose | none                 | invalid         | InvalidProposal                 | prevote   |
//! | propose | none                 | Proposal        | Proposal                        | prevote   |
//! | propose | PolkaValue(b, vr)    | invalid (b, vr) | InvalidProposalAndPolkaPrevious | prevote   |
//! | propose | PolkaValue(b, vr)    | Proposal(b, vr) | ProposalAndPolkaPrevious        | prevote   |
//! | prevote | PolkaNil             | *               | PolkaNil                        | precommit |
//! | prevote | PolkaValue(b)        | Proposal(b)     | ProposalAndPolkaCurrent         | precommit |
//! | prevote | PolkaAny             | *               | PolkaAny                        | prevote   |
//! | precommit | PolkaValue(b)      | Proposal(b)     | ProposalAndPolkaCurrent         | precommit |

use basaltbft_core_state_machine::input::Input as RoundInput;
use basaltbft_core_state_machine::state::Step;

use basaltbft_core_types::{
    Proposal, Round, SignedProposal, Threshold, Validity, VoteType,
};

use basaltbft_core_votekeeper::keeper::{Output as VKOutput, VoteKeeper};

use crate::Driver;

impl Driver {
    /// Decide which round state machine input a received proposal becomes,
    /// given its validity, the step we are at, and the thresholds met so
    /// far.
    pub(crate) fn multiplex_proposal(
        &mut self,
        proposal: Proposal,
        validity: Validity,
    ) -> Option<RoundInput> {
        debug_assert_eq!(self.height(), proposal.height);

        // No round is ongoing yet.
        if self.round_state.round == Round::Nil {
            return None;
        }

        let block_hash = proposal.block_hash();

        // A polka from the proposal's proof-of-lock round?
        let polka_previous = proposal.pol_round.is_defined()
            && proposal.pol_round < self.round_state.round
            && self.vote_keeper.is_threshold_met(
                proposal.pol_round,
                VoteType::Prevote,
                Threshold::Value(block_hash),
            );

        // Handle an invalid proposal.
        if !validity.is_valid() {
            if self.round_state.step == Step::Propose {
                if proposal.pol_round.is_nil() {
                    // L26
                    return Some(RoundInput::InvalidProposal);
                } else if polka_previous {
                    // L32
                    return Some(RoundInput::InvalidProposalAndPolkaPrevious(proposal));
                }
            }

            return None;
        }

        // L49: a valid proposal whose block already has a precommit quorum
        // decides, from any round.
        if self.round_state.decision.is_none()
            && self.vote_keeper.is_threshold_met(
                proposal.round,
                VoteType::Precommit,
                Threshold::Value(block_hash),
            )
        {
            return Some(RoundInput::ProposalAndPrecommitValue(proposal));
        }

        // Below this point only the current round matters. This check must
        // come after L49: a commit quorum from any round decides.
        if self.round_state.round != proposal.round {
            return None;
        }

        let polka_for_current = self.vote_keeper.is_threshold_met(
            proposal.round,
            VoteType::Prevote,
            Threshold::Value(block_hash),
        );

        // L36
        if polka_for_current && self.round_state.step >= Step::Prevote {
            return Some(RoundInput::ProposalAndPolkaCurrent(proposal));
        }

        // L28
        if self.round_state.step == Step::Propose && polka_previous {
            return Some(RoundInput::ProposalAndPolkaPrevious(proposal));
        }

        // L22
        if proposal.pol_round.is_nil() {
            return Some(RoundInput::Proposal(proposal));
        }

        // The proposal claims a proof-of-lock round without a matching
        // polka. Wait for more prevotes to arrive, or for the propose
        // timeout to fire and prevote nil.
        None
    }

    pub(crate) fn store_and_multiplex_proposal(
        &mut self,
        signed_proposal: SignedProposal,
        validity: Validity,
    ) -> Option<RoundInput> {
        debug_assert_eq!(self.height(), signed_proposal.height());

        let proposal = signed_proposal.message.clone();
        self.proposal_keeper.store_proposal(signed_proposal, validity);

        self.multiplex_proposal(proposal, validity)
    }

    /// Decide which round state machine input a newly-met vote threshold
    /// becomes, given the proposals stored so far.
    pub(crate) fn multiplex_vote_threshold(
        &mut self,
        new_threshold: VKOutput,
        threshold_round: Round,
    ) -> (Round, RoundInput) {
        match new_threshold {
            VKOutput::PolkaAny => (threshold_round, RoundInput::PolkaAny),
            VKOutput::PolkaNil => (threshold_round, RoundInput::PolkaNil),
            VKOutput::PrecommitAny => (threshold_round, RoundInput::PrecommitAny),
            VKOutput::SkipRound(round) => (threshold_round, RoundInput::SkipRound(round)),

            VKOutput::PrecommitValue(block_hash) => {
                match self
                    .proposal_keeper
                    .get_proposal_and_validity_for_round_and_block(threshold_round, block_hash)
                {
                    Some((proposal, validity)) if validity.is_valid() => (
                        threshold_round,
                        RoundInput::ProposalAndPrecommitValue(proposal.message.clone()),
                    ),
                    // No valid matching proposal yet: schedule the
                    // precommit timeout and wait for it to arrive.
                    _ => (threshold_round, RoundInput::PrecommitAny),
                }
            }

            VKOutput::PolkaValue(block_hash) => {
                let current_round = self.round();

                match self
                    .proposal_keeper
                    .get_proposal_and_validity_for_round_and_block(current_round, block_hash)
                {
                    Some((signed_proposal, validity)) => {
                        let proposal = &signed_proposal.message;
                        let pol_round_match = proposal.pol_round == threshold_round;
                        let round_match = proposal.round == threshold_round;

                        match proposal.pol_round {
                            // L32: the state machine will prevote nil.
                            Round::Some(_) if !validity.is_valid() && pol_round_match => (
                                proposal.round,
                                RoundInput::InvalidProposalAndPolkaPrevious(proposal.clone()),
                            ),
                            // L30
                            Round::Some(_) if validity.is_valid() && pol_round_match => (
                                proposal.round,
                                RoundInput::ProposalAndPolkaPrevious(proposal.clone()),
                            ),
                            // L36, whatever the proof-of-lock round.
                            _ if round_match && validity.is_valid() => (
                                threshold_round,
                                RoundInput::ProposalAndPolkaCurrent(proposal.clone()),
                            ),
                            _ => (threshold_round, RoundInput::PolkaAny),
                        }
                    }

                    // L34
                    None => (threshold_round, RoundInput::PolkaAny),
                }
            }
        }
    }

    /// After a step change, find inputs the new step unlocks: stored
    /// proposals first, then thresholds met by earlier votes.
    pub(crate) fn multiplex_step_change(&mut self, round: Round) -> Vec<(Round, RoundInput)> {
        let mut result = Vec::new();

        let proposals = self
            .proposal_keeper
            .get_proposals_and_validities_for_round(round)
            .to_vec();

        for (signed_proposal, validity) in proposals {
            let proposal = &signed_proposal.message;

            match self.round_state.step {
                Step::Propose => {
                    if let Some(input) = self.multiplex_proposal(proposal.clone(), validity) {
                        result.push((self.round(), input));
                    }
                }

                Step::Prevote if has_polka_value(&self.vote_keeper, round, proposal) => result
                    .push(
                        self.multiplex_vote_threshold(
                            VKOutput::PolkaValue(proposal.block_hash()),
                            round,
                        ),
                    ),

                _ => {}
            }
        }

        if let Some(threshold) = find_non_value_threshold(&self.vote_keeper, round) {
            result.push(self.multiplex_vote_threshold(threshold, round));
        }

        result
    }
}

fn find_non_value_threshold(votekeeper: &VoteKeeper, round: Round) -> Option<VKOutput> {
    if has_precommit_any(votekeeper, round) {
        Some(VKOutput::PrecommitAny)
    } else if has_polka_nil(votekeeper, round) {
        Some(VKOutput::PolkaNil)
    } else if has_polka_any(votekeeper, round) {
        Some(VKOutput::PolkaAny)
    } else {
        None
    }
}

/// Check if we have a polka for the proposal's block.
fn has_polka_value(votekeeper: &VoteKeeper, round: Round, proposal: &Proposal) -> bool {
    votekeeper.is_threshold_met(
        round,
        VoteType::Prevote,
        Threshold::Value(proposal.block_hash()),
    )
}

/// Check if we have a polka for nil.
fn has_polka_nil(votekeeper: &VoteKeeper, round: Round) -> bool {
    votekeeper.is_threshold_met(round, VoteType::Prevote, Threshold::Nil)
}

/// Check if we have a polka for anything.
fn has_polka_any(votekeeper: &VoteKeeper, round: Round) -> bool {
    votekeeper.is_threshold_met(round, VoteType::Prevote, Threshold::Any)
}

/// Check if we have a quorum of precommits for anything.
fn has_precommit_any(votekeeper: &VoteKeeper, round: Round) -> bool {
    votekeeper.is_threshold_met(round, VoteType::Precommit, Threshold::Any)
}
