//! A serializable snapshot of the context's state.

use serde::Serialize;

use basaltbft_core_state_machine::state::{RoundBlock, State as RoundState};

/// A snapshot of the context's state, for debugging and test harnesses.
///
/// Rounds are plain integers (`-1` for nil); hashes are hex strings, with
/// the string `"nil"` standing in for an absent block.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContextStatus {
    /// The height being decided.
    pub height: u64,

    /// The current round.
    pub round: i64,

    /// The current step.
    pub step: String,

    /// The round we locked in, `-1` if not locked.
    pub locked_round: i64,

    /// The hash of the locked block, `"nil"` if not locked.
    pub locked_value: String,

    /// The round of the last observed polka, `-1` if none.
    pub valid_round: i64,

    /// The hash of the last polka'd block, `"nil"` if none.
    pub valid_value: String,
}

fn round_and_hash(round_block: Option<&RoundBlock>) -> (i64, String) {
    match round_block {
        Some(rb) => (rb.round.as_i64(), rb.block.hash().to_string()),
        None => (-1, "nil".to_string()),
    }
}

impl ContextStatus {
    /// Snapshot the given round state.
    pub fn from_round_state(state: &RoundState) -> Self {
        let (locked_round, locked_value) = round_and_hash(state.locked.as_ref());
        let (valid_round, valid_value) = round_and_hash(state.valid.as_ref());

        Self {
            height: state.height.as_u64(),
            round: state.round.as_i64(),
            step: state.step.as_str().to_string(),
            locked_round,
            locked_value,
            valid_round,
            valid_value,
        }
    }

    /// Render the snapshot as a JSON object.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}
