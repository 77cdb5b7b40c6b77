//! Core data types for the basalt consensus engine.
//!
//! One [`Height`] is decided by one consensus context, across an unbounded
//! sequence of [`Round`]s. Validators exchange signed [`Proposal`]s and
//! [`Vote`]s over [`Block`]s; quorum arithmetic is always over summed
//! voting power, never over raw message counts.

#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![warn(
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    variant_size_differences
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

mod address;
mod block;
mod commit;
mod height;
mod proposal;
mod round;
mod signed_message;
mod signing;
mod threshold;
mod timeout;
mod timeouts;
mod validator_set;
mod vote;

pub use address::Address;
pub use block::{Block, BlockHash, BlockHeader};
pub use commit::{Commit, CommitSignature};
pub use height::Height;
pub use proposal::{Proposal, Validity};
pub use round::Round;
pub use signed_message::{ConsensusMsg, SignedMessage, SignedProposal, SignedVote};
pub use signing::{PrivateKey, PublicKey, Signature};
pub use threshold::{Threshold, ThresholdParam, ThresholdParams};
pub use timeout::{Timeout, TimeoutKind};
pub use timeouts::TimeoutConfig;
pub use validator_set::{Validator, ValidatorSet};
pub use vote::{NilOr, Vote, VoteType};

/// Voting power held by a validator.
pub type VotingPower = u64;
