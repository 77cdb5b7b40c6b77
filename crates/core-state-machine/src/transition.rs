//! Transitions of the round state machine.

use crate::output::Output;
use crate::state::State;

/// A transition taken by the state machine: the next state, an optional
/// output, and whether the (state, input) pair was a valid transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transition {
    /// The next state.
    pub next_state: State,

    /// The output to emit, if any.
    pub output: Option<Output>,

    /// Whether the transition was valid.
    pub valid: bool,
}

impl Transition {
    /// A valid transition to the given state, with no output.
    pub fn to(next_state: State) -> Self {
        Self {
            next_state,
            output: None,
            valid: true,
        }
    }

    /// An invalid transition: the state is left untouched.
    pub fn invalid(next_state: State) -> Self {
        Self {
            next_state,
            output: None,
            valid: false,
        }
    }

    /// Attach an output to the transition.
    pub fn with_output(mut self, output: Output) -> Self {
        self.output = Some(output);
        self
    }
}
