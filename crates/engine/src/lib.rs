//! The per-height consensus context.
//!
//! A [`Context`] drives one validator's participation in deciding one block
//! at one height: it consumes signed consensus messages and timer fires
//! from a single mailbox, runs them through the driver and round state
//! machine, signs and broadcasts this validator's own messages, and
//! surfaces everything observable through a fan-out of [`Observer`]s.
//!
//! The context is single-use: it runs until the block is committed or the
//! context is stopped.

#![forbid(unsafe_code)]
#![deny(trivial_casts, trivial_numeric_casts)]
#![warn(
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links,
    variant_size_differences
)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::panic))]

mod chain;
mod context;
mod events;
mod fault;
mod signer;
mod status;
mod timers;
mod transport;

pub use chain::{BlockChain, ChainError};
pub use context::{Context, ContextParams};
pub use events::{Event, Observer, Observers};
pub use fault::{Fault, FaultKind};
pub use signer::Ed25519Signer;
pub use status::ContextStatus;
pub use timers::TimeoutScheduler;
pub use transport::BroadcastSink;
