//! Local faults: everything that makes the context drop a message or stop.

use basaltbft_core_types::{Address, BlockHash, Height};

/// A fault observed while processing consensus messages.
///
/// All message-validation faults are recovered locally: the offending
/// message is dropped and the fault is surfaced to observers. Only
/// [`Fault::AppendFailed`] is fatal to the context.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum Fault {
    /// A message signature did not verify.
    #[error("invalid signature from {0}")]
    InvalidSignature(Address),

    /// A message came from outside the validator set.
    #[error("unknown validator {0}")]
    UnknownValidator(Address),

    /// A message was for another height.
    #[error("message for height {got}, consensus is at {expected}")]
    HeightMismatch {
        /// The height carried by the message.
        got: Height,
        /// The height this context decides.
        expected: Height,
    },

    /// A proposal came from a validator that is not the round's proposer.
    #[error("proposal from {got}, round proposer is {expected}")]
    WrongProposer {
        /// The claimed proposer.
        got: Address,
        /// The actual proposer for that round.
        expected: Address,
    },

    /// A validator cast two conflicting votes for the same round and step.
    #[error("equivocation by {0}")]
    Equivocation(Address),

    /// A proposed block's header did not validate against the chain.
    #[error("invalid block header: {0}")]
    InvalidBlockHeader(String),

    /// A proposed block's payload did not validate.
    #[error("invalid block payload: {0}")]
    InvalidBlockContent(String),

    /// The decided block could not be appended to the chain. Fatal.
    #[error("failed to append block {0}")]
    AppendFailed(BlockHash),

    /// The context was stopped.
    #[error("context cancelled")]
    Cancelled,
}

/// The kind of a [`Fault`], without its payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum FaultKind {
    InvalidSignature,
    UnknownValidator,
    HeightMismatch,
    WrongProposer,
    Equivocation,
    InvalidBlockHeader,
    InvalidBlockContent,
    AppendFailed,
    Cancelled,
}

impl Fault {
    /// The kind of this fault.
    pub fn kind(&self) -> FaultKind {
        match self {
            Fault::InvalidSignature(_) => FaultKind::InvalidSignature,
            Fault::UnknownValidator(_) => FaultKind::UnknownValidator,
            Fault::HeightMismatch { .. } => FaultKind::HeightMismatch,
            Fault::WrongProposer { .. } => FaultKind::WrongProposer,
            Fault::Equivocation(_) => FaultKind::Equivocation,
            Fault::InvalidBlockHeader(_) => FaultKind::InvalidBlockHeader,
            Fault::InvalidBlockContent(_) => FaultKind::InvalidBlockContent,
            Fault::AppendFailed(_) => FaultKind::AppendFailed,
            Fault::Cancelled => FaultKind::Cancelled,
        }
    }
}
