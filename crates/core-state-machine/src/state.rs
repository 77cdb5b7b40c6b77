//! The state maintained by the round state machine.

use basaltbft_core_types::{Block, Height, Round};

use crate::input::Input;
use crate::state_machine::{self, Info};
use crate::transition::Transition;

/// A block and the round it is associated with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundBlock {
    /// The block.
    pub block: Block,

    /// The round.
    pub round: Round,
}

impl RoundBlock {
    /// Create a new `RoundBlock` instance.
    pub fn new(block: Block, round: Round) -> Self {
        Self { block, round }
    }
}

/// The step of consensus within a round.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Step {
    /// The round has not started yet.
    Unstarted,

    /// Propose step: either we are the proposer, or we wait for a proposal.
    Propose,

    /// Prevote step.
    Prevote,

    /// Precommit step.
    Precommit,

    /// We have committed and decided on a block. Terminal.
    Commit,
}

impl Step {
    /// The step name, as rendered in the status output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Unstarted => "Unstarted",
            Step::Propose => "Propose",
            Step::Prevote => "Prevote",
            Step::Precommit => "Precommit",
            Step::Commit => "Commit",
        }
    }
}

/// The state of the round state machine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct State {
    /// The height being decided.
    pub height: Height,

    /// The round we are at within the height.
    pub round: Round,

    /// The step we are at within the round.
    pub step: Step,

    /// The block we are locked on: the last block we precommitted,
    /// together with the round we precommitted it in.
    pub locked: Option<RoundBlock>,

    /// The block for which we last saw a polka, with that polka's round.
    pub valid: Option<RoundBlock>,

    /// The block we have decided on, `None` until commit. The associated
    /// round is the round of the decided proposal, which can differ from
    /// the state machine round.
    pub decision: Option<RoundBlock>,
}

impl State {
    /// Create a new `State` at the given height and round.
    pub fn new(height: Height, round: Round) -> Self {
        Self {
            height,
            round,
            step: Step::Unstarted,
            locked: None,
            valid: None,
            decision: None,
        }
    }

    /// Set the round.
    pub fn with_round(self, round: Round) -> Self {
        Self { round, ..self }
    }

    /// Set the step.
    pub fn with_step(self, step: Step) -> Self {
        Self { step, ..self }
    }

    /// Lock on the given block at the current round.
    pub fn set_locked(self, block: Block) -> Self {
        Self {
            locked: Some(RoundBlock::new(block, self.round)),
            ..self
        }
    }

    /// Release the lock.
    pub fn clear_locked(self) -> Self {
        Self {
            locked: None,
            ..self
        }
    }

    /// Record the given block as valid at the current round.
    pub fn set_valid(self, block: Block) -> Self {
        Self {
            valid: Some(RoundBlock::new(block, self.round)),
            ..self
        }
    }

    /// Record the decision.
    pub fn set_decision(self, proposal_round: Round, block: Block) -> Self {
        Self {
            decision: Some(RoundBlock::new(block, proposal_round)),
            ..self
        }
    }

    /// Apply the given input to this state, producing a transition.
    pub fn apply(self, info: &Info<'_>, input: Input) -> Transition {
        state_machine::apply(self, info, input)
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new(Height::default(), Round::Nil)
    }
}
