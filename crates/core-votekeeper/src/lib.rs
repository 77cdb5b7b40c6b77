//! Vote tallying and quorum detection.
//!
//! Votes are bucketed by `(round, vote type)` and, within a bucket, by
//! validator. Per-value power sums are kept incrementally, so quorum
//! queries during the threshold rescan never walk the stored votes.

#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![warn(
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    variant_size_differences
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

pub mod evidence;
pub mod keeper;
pub mod round_votes;
pub mod round_weights;
pub mod value_weights;

pub use evidence::EvidenceMap;

/// Represents the weight of a vote,
/// ie. the voting power of the validator that cast the vote.
pub type Weight = basaltbft_core_types::VotingPower;
