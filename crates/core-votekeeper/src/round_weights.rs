//! The senders observed in a round, and their weight.

use std::collections::BTreeMap;

use basaltbft_core_types::Address;

use crate::Weight;

/// The distinct senders observed in a round, with their voting power.
///
/// This feeds the round-skip rule: any message (vote or proposal) from a
/// higher round counts its sender here, and f+1 total weight justifies
/// moving to that round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundWeights {
    map: BTreeMap<Address, Weight>,
}

impl RoundWeights {
    /// Create a new `RoundWeights` instance.
    pub fn new() -> RoundWeights {
        RoundWeights {
            map: BTreeMap::new(),
        }
    }

    /// Record the sender's weight. A sender is only counted once,
    /// whatever and however often it sends.
    pub fn set_once(&mut self, address: &Address, weight: Weight) {
        self.map.entry(*address).or_insert(weight);
    }

    /// The weight recorded for the given sender.
    pub fn get(&self, address: &Address) -> Weight {
        self.map.get(address).copied().unwrap_or(0)
    }

    /// The combined weight of all senders observed so far.
    pub fn sum(&self) -> Weight {
        self.map
            .values()
            .try_fold(Weight::default(), |acc, w| acc.checked_add(*w))
            .expect("attempt to sum with overflow")
    }
}
