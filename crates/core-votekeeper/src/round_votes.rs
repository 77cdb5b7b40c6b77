//! Tallies for one round: a prevote bucket and a precommit bucket.

use std::collections::BTreeMap;

use basaltbft_core_types::{
    Address, BlockHash, NilOr, Threshold, ThresholdParam, Vote, VoteType,
};

use crate::value_weights::ValuesWeights;
use crate::Weight;

/// The outcome of recording a vote in a bucket.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AddVote {
    /// First vote from this validator in this bucket; it was tallied.
    Added,

    /// The validator had already cast this exact vote; nothing changed.
    Duplicate,

    /// The validator had already voted for a different block hash in this
    /// bucket. The first vote stays canonical, the new one is not tallied.
    Equivocation,
}

/// Tallies votes of one type within a round.
///
/// Keeps a running power sum per voted-for value, so threshold queries are
/// lookups rather than scans, and remembers each validator's first vote to
/// count every validator at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct VoteCount {
    /// Weight of votes for each value, including nil.
    values_weights: ValuesWeights<NilOr<BlockHash>>,

    /// The first block hash each validator voted for in this bucket.
    by_validator: BTreeMap<Address, NilOr<BlockHash>>,
}

impl VoteCount {
    /// Create a new `VoteCount`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote with the given weight.
    pub fn add(
        &mut self,
        address: &Address,
        block_hash: NilOr<BlockHash>,
        weight: Weight,
    ) -> AddVote {
        match self.by_validator.get(address) {
            Some(first) if *first == block_hash => AddVote::Duplicate,
            Some(_) => AddVote::Equivocation,
            None => {
                self.by_validator.insert(*address, block_hash);
                self.values_weights.add(block_hash, weight);
                AddVote::Added
            }
        }
    }

    /// The first block hash the given validator voted for, if any.
    pub fn get_by_validator(&self, address: &Address) -> Option<&NilOr<BlockHash>> {
        self.by_validator.get(address)
    }

    /// The weight of votes for the given value (or nil).
    pub fn get(&self, block_hash: &NilOr<BlockHash>) -> Weight {
        self.values_weights.get(block_hash)
    }

    /// The sum of the weights of votes for all values.
    pub fn sum(&self) -> Weight {
        self.values_weights.sum()
    }

    /// Whether the given threshold is met by this bucket.
    pub fn is_threshold_met(
        &self,
        threshold: Threshold,
        param: ThresholdParam,
        total_weight: Weight,
    ) -> bool {
        match threshold {
            Threshold::Value(block_hash) => {
                let weight = self.values_weights.get(&NilOr::Val(block_hash));
                param.is_met(weight, total_weight)
            }

            Threshold::Nil => {
                let weight = self.values_weights.get(&NilOr::Nil);
                param.is_met(weight, total_weight)
            }

            Threshold::Any => param.is_met(self.values_weights.sum(), total_weight),

            Threshold::Unreached => false,
        }
    }
}

/// The two vote buckets of a round.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundVotes {
    prevotes: VoteCount,
    precommits: VoteCount,
}

impl RoundVotes {
    /// Create a new `RoundVotes`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a vote with the given weight in the matching bucket.
    pub fn add_vote(&mut self, vote: &Vote, weight: Weight) -> AddVote {
        self.bucket_mut(vote.vote_type)
            .add(&vote.validator_address, vote.block_hash, weight)
    }

    /// The weight of votes of the given type for the given value.
    pub fn get_weight(&self, vote_type: VoteType, block_hash: &NilOr<BlockHash>) -> Weight {
        self.bucket(vote_type).get(block_hash)
    }

    /// The total weight of votes of the given type, across all values.
    pub fn weight_sum(&self, vote_type: VoteType) -> Weight {
        self.bucket(vote_type).sum()
    }

    /// Whether the given threshold is met in the given bucket.
    pub fn is_threshold_met(
        &self,
        vote_type: VoteType,
        threshold: Threshold,
        param: ThresholdParam,
        total_weight: Weight,
    ) -> bool {
        self.bucket(vote_type)
            .is_threshold_met(threshold, param, total_weight)
    }

    fn bucket(&self, vote_type: VoteType) -> &VoteCount {
        match vote_type {
            VoteType::Prevote => &self.prevotes,
            VoteType::Precommit => &self.precommits,
        }
    }

    fn bucket_mut(&mut self, vote_type: VoteType) -> &mut VoteCount {
        match vote_type {
            VoteType::Prevote => &mut self.prevotes,
            VoteType::Precommit => &mut self.precommits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use basaltbft_core_types::{Height, Round};

    fn prevote(addr: u8, block_hash: NilOr<BlockHash>) -> Vote {
        Vote::new_prevote(
            Height::new(1),
            Round::new(0),
            block_hash,
            Address::new([addr; 20]),
        )
    }

    #[test]
    fn duplicate_and_equivocation() {
        let hash_a = NilOr::Val(BlockHash::new([0xaa; 32]));
        let hash_b = NilOr::Val(BlockHash::new([0xbb; 32]));

        let mut votes = RoundVotes::new();

        assert_eq!(votes.add_vote(&prevote(1, hash_a), 1), AddVote::Added);
        assert_eq!(votes.add_vote(&prevote(1, hash_a), 1), AddVote::Duplicate);
        assert_eq!(votes.add_vote(&prevote(1, hash_b), 1), AddVote::Equivocation);

        // The first vote stays canonical: only it is tallied.
        assert_eq!(votes.get_weight(VoteType::Prevote, &hash_a), 1);
        assert_eq!(votes.get_weight(VoteType::Prevote, &hash_b), 0);
        assert_eq!(votes.weight_sum(VoteType::Prevote), 1);
    }

    #[test]
    fn thresholds_use_voting_power() {
        let hash = NilOr::Val(BlockHash::new([0xaa; 32]));

        let mut votes = RoundVotes::new();

        // One heavyweight validator out of total power 10.
        votes.add_vote(&prevote(1, hash), 7);

        assert!(votes.is_threshold_met(
            VoteType::Prevote,
            Threshold::Value(BlockHash::new([0xaa; 32])),
            ThresholdParam::TWO_F_PLUS_ONE,
            10,
        ));

        // Three lightweights for nil do not reach a quorum of power.
        let mut votes = RoundVotes::new();
        votes.add_vote(&prevote(1, NilOr::Nil), 1);
        votes.add_vote(&prevote(2, NilOr::Nil), 1);
        votes.add_vote(&prevote(3, NilOr::Nil), 1);

        assert!(!votes.is_threshold_met(
            VoteType::Prevote,
            Threshold::Nil,
            ThresholdParam::TWO_F_PLUS_ONE,
            10,
        ));
    }

    #[test]
    fn buckets_are_independent() {
        let hash = NilOr::Val(BlockHash::new([0xaa; 32]));

        let mut votes = RoundVotes::new();
        votes.add_vote(&prevote(1, hash), 3);

        assert_eq!(votes.get_weight(VoteType::Prevote, &hash), 3);
        assert_eq!(votes.get_weight(VoteType::Precommit, &hash), 0);
    }
}
