//! Per-round consensus state machine.
//!
//! A pure state machine: [`state_machine::apply`] maps a state and an input
//! to the next state and at most one output, with no clocks, queues, or IO.
//! The driver above it owns vote tallies and message storage and decides
//! which input each raw message becomes.

#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![warn(
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    variant_size_differences
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

pub mod input;
pub mod output;
pub mod state;
pub mod state_machine;
pub mod transition;
