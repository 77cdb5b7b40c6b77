//! Driver for the round state machine at one height.
//!
//! The driver sits between raw consensus messages and the pure state
//! machine: it guards heights, tallies votes through the vote keeper,
//! stores proposals, and multiplexes every newly-met threshold into the
//! exact input the state machine expects. After each step change it
//! rescans the stored proposals and tallies so that thresholds satisfied
//! by earlier messages take effect in the new step.

#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![warn(
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    variant_size_differences
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

mod driver;
mod error;
mod input;
mod mux;
mod output;
mod proposal_keeper;

pub use driver::Driver;
pub use error::Error;
pub use input::Input;
pub use output::Output;
pub use proposal_keeper::ProposalKeeper;
