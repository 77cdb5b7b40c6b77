//! The driver itself.

use core::fmt;

use tracing::warn;

use basaltbft_core_state_machine::input::Input as RoundInput;
use basaltbft_core_state_machine::output::Output as RoundOutput;
use basaltbft_core_state_machine::state::{RoundBlock, State as RoundState, Step};
use basaltbft_core_state_machine::state_machine::Info;

use basaltbft_core_types::{
    Address, Block, BlockHash, Commit, Height, Round, SignedProposal, SignedVote, ThresholdParams,
    Timeout, TimeoutKind, Validator, ValidatorSet, Validity, Vote, VoteType,
};

use basaltbft_core_votekeeper::keeper::{Output as VKOutput, VoteKeeper};
use basaltbft_core_votekeeper::EvidenceMap;

use crate::input::Input;
use crate::output::Output;
use crate::proposal_keeper::ProposalKeeper;
use crate::Error;

/// Drives the round state machine for a single height.
pub struct Driver {
    /// The address of our node.
    address: Address,

    /// Quorum thresholds.
    threshold_params: ThresholdParams,

    /// The validator set at this height.
    validator_set: ValidatorSet,

    /// The proposer for the current round, `None` before the first round.
    proposer: Option<Address>,

    /// The proposals received so far.
    pub(crate) proposal_keeper: ProposalKeeper,

    /// The vote tallies.
    pub(crate) vote_keeper: VoteKeeper,

    /// The state of the round state machine.
    pub(crate) round_state: RoundState,

    /// Inputs to be fed to the state machine right after the current one,
    /// produced by the rescan that follows a step change. Each entry
    /// carries the round it was emitted for.
    pending_inputs: Vec<(Round, RoundInput)>,

    /// Our own votes already emitted this round, enforcing at-most-once
    /// broadcast per (round, vote type).
    last_prevote: Option<Vote>,
    last_precommit: Option<Vote>,
}

impl Driver {
    /// Create a new `Driver` for the given height.
    pub fn new(
        height: Height,
        validator_set: ValidatorSet,
        address: Address,
        threshold_params: ThresholdParams,
    ) -> Self {
        let vote_keeper = VoteKeeper::new(validator_set.clone(), threshold_params);
        let round_state = RoundState::new(height, Round::Nil);

        Self {
            address,
            threshold_params,
            validator_set,
            proposer: None,
            proposal_keeper: ProposalKeeper::new(),
            vote_keeper,
            round_state,
            pending_inputs: vec![],
            last_prevote: None,
            last_precommit: None,
        }
    }

    /// The height being decided.
    pub fn height(&self) -> Height {
        self.round_state.height
    }

    /// The round we are currently at.
    pub fn round(&self) -> Round {
        self.round_state.round
    }

    /// The step we are currently at within the round.
    pub fn step(&self) -> Step {
        self.round_state.step
    }

    /// The state of the round state machine.
    pub fn round_state(&self) -> &RoundState {
        &self.round_state
    }

    /// The block we are locked on, if any.
    pub fn locked_block(&self) -> Option<&RoundBlock> {
        self.round_state.locked.as_ref()
    }

    /// The block we saw the most recent polka for, if any.
    pub fn valid_block(&self) -> Option<&RoundBlock> {
        self.round_state.valid.as_ref()
    }

    /// The round and block of the decided proposal, if decided.
    pub fn decision(&self) -> Option<(Round, &Block)> {
        self.round_state
            .decision
            .as_ref()
            .map(|decision| (decision.round, &decision.block))
    }

    /// The address of our node.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The validator set at this height.
    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validator_set
    }

    /// A reference to the vote keeper.
    pub fn votes(&self) -> &VoteKeeper {
        &self.vote_keeper
    }

    /// Recorded evidence of vote equivocation at this height.
    pub fn evidence(&self) -> &EvidenceMap {
        self.vote_keeper.evidence()
    }

    /// The proposer for the current round.
    pub fn get_proposer(&self) -> Result<&Validator, Error> {
        if let Some(proposer) = &self.proposer {
            let proposer = self
                .validator_set
                .get_by_address(proposer)
                .ok_or(Error::ProposerNotFound(*proposer))?;

            Ok(proposer)
        } else {
            Err(Error::NoProposer(self.height(), self.round()))
        }
    }

    /// Assemble the commit justifying the given block at the given round,
    /// from the precommits retained by the vote keeper.
    pub fn commit_for(&self, round: Round, block_hash: BlockHash) -> Commit {
        let precommits = self
            .vote_keeper
            .per_round(round)
            .map(|per_round| per_round.received_votes())
            .into_iter()
            .flatten();

        Commit::from_precommits(self.height(), round, block_hash, precommits)
    }

    /// Record our own vote, enforcing at most one per (round, vote type).
    fn set_last_vote_cast(&mut self, vote: &Vote) {
        debug_assert_eq!(vote.height, self.height());

        if vote.round == self.round() {
            match vote.vote_type {
                VoteType::Prevote => self.last_prevote = Some(vote.clone()),
                VoteType::Precommit => self.last_precommit = Some(vote.clone()),
            }
        }
    }

    /// Process the given input, returning the outputs for the host to act
    /// on, in order.
    pub fn process(&mut self, input: Input) -> Result<Vec<Output>, Error> {
        let round_output = match self.apply(input)? {
            Some(output) => output,
            None => return Ok(Vec::new()),
        };

        let mut outputs = vec![];

        // Lift the state machine output to one or more driver outputs.
        self.lift_output(round_output, &mut outputs);

        // Apply the pending inputs from the rescan, if any, and lift
        // their outputs. Applying them can queue more pending inputs.
        while !self.pending_inputs.is_empty() {
            let new_pending = core::mem::take(&mut self.pending_inputs);
            for (round, input) in new_pending {
                if let Some(output) = self.apply_input(round, input)? {
                    self.lift_output(output, &mut outputs);
                }
            }
        }

        Ok(outputs)
    }

    /// Convert an output of the round state machine to driver outputs.
    fn lift_output(&mut self, round_output: RoundOutput, outputs: &mut Vec<Output>) {
        match round_output {
            RoundOutput::NewRound(round) => outputs.push(Output::NewRound(self.height(), round)),

            RoundOutput::Proposal(proposal) => outputs.push(Output::Propose(proposal)),

            RoundOutput::Vote(vote) => self.lift_vote_output(vote, outputs),

            RoundOutput::ScheduleTimeout(timeout) => outputs.push(Output::ScheduleTimeout(timeout)),

            RoundOutput::GetValueAndScheduleTimeout(height, round, timeout) => {
                outputs.push(Output::ScheduleTimeout(timeout));
                outputs.push(Output::GetValue(height, round, timeout));
            }

            RoundOutput::Decision(round, proposal) => outputs.push(Output::Decide(round, proposal)),
        }
    }

    /// Emit our own vote, unless one was already cast for this round and
    /// vote type. A rescan that re-derives the same trigger must not make
    /// us vote twice.
    fn lift_vote_output(&mut self, vote: Vote, outputs: &mut Vec<Output>) {
        if vote.validator_address != self.address {
            return;
        }

        let can_vote = match vote.vote_type {
            VoteType::Prevote => self
                .last_prevote
                .as_ref()
                .is_none_or(|prev| prev.round < vote.round),
            VoteType::Precommit => self
                .last_precommit
                .as_ref()
                .is_none_or(|prev| prev.round < vote.round),
        };

        if can_vote {
            self.set_last_vote_cast(&vote);
            outputs.push(Output::Vote(vote));
        } else {
            warn!(round = %vote.round, vote_type = ?vote.vote_type, "Suppressed duplicate own vote");
        }
    }

    /// Apply the given input to the state machine, returning its output,
    /// if any.
    fn apply(&mut self, input: Input) -> Result<Option<RoundOutput>, Error> {
        match input {
            Input::NewRound(height, round, proposer) => {
                self.apply_new_round(height, round, proposer)
            }
            Input::ProposeValue(round, block) => self.apply_propose_value(round, block),
            Input::Proposal(proposal, validity) => self.apply_proposal(proposal, validity),
            Input::Vote(vote) => self.apply_vote(vote),
            Input::TimeoutElapsed(timeout) => self.apply_timeout(timeout),
        }
    }

    fn apply_new_round(
        &mut self,
        height: Height,
        round: Round,
        proposer: Address,
    ) -> Result<Option<RoundOutput>, Error> {
        if self.height() == height {
            // A new round within the same height: keep the locked and
            // valid blocks, only the round moves.
            self.round_state.round = round;
        } else {
            self.round_state = RoundState::new(height, round);
        }

        self.proposer = Some(proposer);

        self.apply_input(round, RoundInput::NewRound(round))
    }

    fn apply_propose_value(
        &mut self,
        round: Round,
        block: Block,
    ) -> Result<Option<RoundOutput>, Error> {
        self.apply_input(round, RoundInput::ProposeValue(block))
    }

    fn apply_proposal(
        &mut self,
        proposal: SignedProposal,
        validity: Validity,
    ) -> Result<Option<RoundOutput>, Error> {
        if self.height() != proposal.height() {
            return Err(Error::InvalidProposalHeight {
                proposal_height: proposal.height(),
                consensus_height: self.height(),
            });
        }

        let round = proposal.round();
        let current_round = self.round();

        // The proposer is a sender at its round: it weighs into the
        // f+1-messages round-skip rule.
        let skip = self
            .vote_keeper
            .apply_round_message(round, proposal.proposer(), current_round);

        if let Some(VKOutput::SkipRound(skip_round)) = skip {
            // Store the proposal first: the rescan that follows entering
            // the new round replays it.
            self.proposal_keeper.store_proposal(proposal, validity);
            return self.apply_input(skip_round, RoundInput::SkipRound(skip_round));
        }

        match self.store_and_multiplex_proposal(proposal, validity) {
            Some(round_input) => self.apply_input(round, round_input),
            None => Ok(None),
        }
    }

    fn apply_vote(&mut self, vote: SignedVote) -> Result<Option<RoundOutput>, Error> {
        if self.height() != vote.height() {
            return Err(Error::InvalidVoteHeight {
                vote_height: vote.height(),
                consensus_height: self.height(),
            });
        }

        if self
            .validator_set
            .get_by_address(vote.validator_address())
            .is_none()
        {
            return Err(Error::ValidatorNotFound(*vote.validator_address()));
        }

        let vote_round = vote.round();
        let current_round = self.round();

        let Some(output) = self.vote_keeper.apply_vote(vote, current_round) else {
            return Ok(None);
        };

        let (input_round, round_input) = self.multiplex_vote_threshold(output, vote_round);

        if round_input == RoundInput::NoInput {
            return Ok(None);
        }

        self.apply_input(input_round, round_input)
    }

    fn apply_timeout(&mut self, timeout: Timeout) -> Result<Option<RoundOutput>, Error> {
        let input = match timeout.kind {
            TimeoutKind::Propose => RoundInput::TimeoutPropose,
            TimeoutKind::Prevote => RoundInput::TimeoutPrevote,
            TimeoutKind::Precommit => RoundInput::TimeoutPrecommit,
        };

        self.apply_input(timeout.round, input)
    }

    /// Apply the input to the state machine and update the round state.
    fn apply_input(
        &mut self,
        input_round: Round,
        input: RoundInput,
    ) -> Result<Option<RoundOutput>, Error> {
        let round_state = core::mem::take(&mut self.round_state);
        let previous_step = round_state.step;

        let proposer = self.get_proposer()?;
        let info = Info::new(input_round, &self.address, &proposer.address);

        // Apply the input to the round state machine.
        let transition = round_state.apply(&info, input);

        self.round_state = transition.next_state;

        // A step change can satisfy upon-rules that were waiting for it:
        // rescan the stored proposals and tallies for this round.
        if previous_step != self.round_state.step && self.round_state.step != Step::Unstarted {
            self.pending_inputs = self.multiplex_step_change(input_round);
        }

        Ok(transition.output)
    }
}

impl fmt::Debug for Driver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Driver")
            .field("address", &self.address)
            .field("validator_set", &self.validator_set)
            .field("round_state", &self.round_state)
            .finish_non_exhaustive()
    }
}
