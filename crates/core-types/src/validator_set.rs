use core::slice;
use std::sync::Arc;

use crate::{Address, Height, PublicKey, Round, VotingPower};

/// A validator: a public key and its voting power.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Validator {
    /// The validator's address, derived from its public key.
    pub address: Address,

    /// The validator's public key.
    pub public_key: PublicKey,

    /// The voting power held by the validator.
    pub voting_power: VotingPower,
}

impl Validator {
    /// Create a validator from a public key and voting power.
    pub fn new(public_key: PublicKey, voting_power: VotingPower) -> Self {
        Self {
            address: Address::from_public_key(&public_key),
            public_key,
            voting_power,
        }
    }
}

impl PartialOrd for Validator {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Validator {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.address.cmp(&other.address)
    }
}

/// The fixed validator roster for one height.
///
/// # Important
/// The roster order is consensus-critical: proposer selection walks it by
/// index, so peers must construct the set in the same order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatorSet {
    validators: Arc<Vec<Validator>>,
}

impl ValidatorSet {
    /// Create a new validator set from an iterator of validators.
    ///
    /// # Panics
    /// If the validator set is empty.
    pub fn new(validators: impl IntoIterator<Item = Validator>) -> Self {
        let validators: Vec<_> = validators.into_iter().collect();

        assert!(!validators.is_empty());

        Self {
            validators: Arc::new(validators),
        }
    }

    /// The number of validators in the set.
    pub fn count(&self) -> usize {
        self.validators.len()
    }

    /// Iterate over the validators in the set.
    pub fn iter(&self) -> slice::Iter<'_, Validator> {
        self.validators.iter()
    }

    /// The total voting power of the validator set.
    pub fn total_voting_power(&self) -> VotingPower {
        self.validators.iter().map(|v| v.voting_power).sum()
    }

    /// Get a validator by its index in the roster.
    pub fn get_by_index(&self, index: usize) -> Option<&Validator> {
        self.validators.get(index)
    }

    /// Get a validator by its address.
    pub fn get_by_address(&self, address: &Address) -> Option<&Validator> {
        self.validators.iter().find(|v| &v.address == address)
    }

    /// Get a validator by its public key.
    pub fn get_by_public_key(&self, public_key: &PublicKey) -> Option<&Validator> {
        self.validators.iter().find(|v| &v.public_key == public_key)
    }

    /// The proposer for the given height and round.
    ///
    /// Rotates through the roster: index `(height - 1 + round) mod count`.
    /// Peers must agree on this schedule bit-exactly.
    ///
    /// # Panics
    /// If `round` is nil.
    pub fn select_proposer(&self, height: Height, round: Round) -> &Validator {
        assert!(round.is_defined());

        let index = {
            let height = height.as_u64() as usize;
            let round = round.as_i64() as usize;

            (height.saturating_sub(1) + round) % self.count()
        };

        self.get_by_index(index).expect("index is within the roster")
    }
}
