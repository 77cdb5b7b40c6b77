//! Evidence of equivocation.

use std::collections::BTreeMap;

use basaltbft_core_types::{Address, SignedVote};

/// A pair of conflicting votes from the same validator:
/// the canonical first vote, and the conflicting one.
pub type DoubleVote = (SignedVote, SignedVote);

/// Keeps track of evidence of equivocation.
///
/// Conflicting votes are retained here in full, signatures included, so a
/// host can hand them to whatever accountability machinery it runs. They are
/// never tallied.
#[derive(Clone, Debug, Default)]
pub struct EvidenceMap {
    map: BTreeMap<Address, Vec<DoubleVote>>,
}

impl EvidenceMap {
    /// Create a new `EvidenceMap` instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any equivocation has been observed.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The number of conflicting vote pairs recorded, across validators.
    pub fn total(&self) -> usize {
        self.map.values().map(Vec::len).sum()
    }

    /// The evidence recorded against the given validator, if any.
    pub fn get(&self, address: &Address) -> Option<&Vec<DoubleVote>> {
        self.map.get(address)
    }

    /// Record a pair of equivocating votes.
    ///
    /// # Precondition
    /// - Both votes must be from the same validator (debug-asserted).
    pub fn add(&mut self, existing: SignedVote, conflicting: SignedVote) {
        debug_assert_eq!(
            existing.validator_address(),
            conflicting.validator_address()
        );

        self.map
            .entry(*conflicting.validator_address())
            .or_default()
            .push((existing, conflicting));
    }

    /// Iterate over all addresses with recorded equivocations.
    pub fn iter(&self) -> impl Iterator<Item = &Address> {
        self.map.keys()
    }
}
