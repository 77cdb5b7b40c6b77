//! Observations emitted by the context.

use core::fmt;

use tokio::sync::mpsc;

use basaltbft_core_state_machine::state::Step;
use basaltbft_core_types::{BlockHash, ConsensusMsg, Round, TimeoutKind};

use crate::fault::Fault;

/// An observation of the context's behavior.
///
/// Delivered synchronously from the consumer task, in processing order.
#[derive(Clone, Debug)]
pub enum Event {
    /// The context moved to a new round and/or step.
    StateChanged {
        /// The round after the transition.
        round: Round,
        /// The step after the transition.
        step: Step,
    },

    /// The context broadcast one of its own messages.
    MessageBroadcast {
        /// The message handed to the transport.
        message: ConsensusMsg,
    },

    /// A timeout fired and was processed.
    TimeoutProcessed {
        /// The timeout kind.
        kind: TimeoutKind,
        /// The round the timeout was armed for.
        round: Round,
    },

    /// A block was committed; the context is done.
    BlockCommitted {
        /// The hash of the committed block.
        hash: BlockHash,
    },

    /// A message was dropped or the context failed; see [`Fault`].
    ExceptionOccurred {
        /// The fault that occurred.
        fault: Fault,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::StateChanged { round, step } => {
                write!(f, "StateChanged(round: {round}, step: {})", step.as_str())
            }
            Event::MessageBroadcast { message } => write!(f, "MessageBroadcast({message:?})"),
            Event::TimeoutProcessed { kind, round } => {
                write!(f, "TimeoutProcessed(kind: {kind:?}, round: {round})")
            }
            Event::BlockCommitted { hash } => write!(f, "BlockCommitted({hash})"),
            Event::ExceptionOccurred { fault } => write!(f, "ExceptionOccurred({fault})"),
        }
    }
}

/// A subscriber to the context's observations.
pub trait Observer: Send + Sync + 'static {
    /// Called for every event, from the consumer task.
    fn on_event(&self, event: &Event);
}

/// An unbounded channel makes a convenient observer.
impl Observer for mpsc::UnboundedSender<Event> {
    fn on_event(&self, event: &Event) {
        let _ = self.send(event.clone());
    }
}

/// Fan-out sink for the registered observers.
///
/// Events are built lazily: with no observers registered, the closure is
/// never run.
#[derive(Default)]
pub struct Observers {
    observers: Vec<std::sync::Arc<dyn Observer>>,
}

impl Observers {
    /// Create an empty fan-out.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Must happen before the context starts.
    pub fn register(&mut self, observer: std::sync::Arc<dyn Observer>) {
        self.observers.push(observer);
    }

    /// Whether any observer is registered.
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    /// Deliver the event built by `event` to every observer.
    pub fn send(&self, event: impl FnOnce() -> Event) {
        if self.observers.is_empty() {
            return;
        }

        let event = event();
        for observer in &self.observers {
            observer.on_event(&event);
        }
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("count", &self.observers.len())
            .finish()
    }
}
