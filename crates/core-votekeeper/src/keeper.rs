//! Tallies votes and emits an output when a threshold is newly reached.

use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;
use tracing::warn;

use basaltbft_core_types::{
    Address, BlockHash, NilOr, Round, SignedVote, Threshold, ThresholdParams, ValidatorSet,
    VoteType,
};

use crate::evidence::EvidenceMap;
use crate::round_votes::{AddVote, RoundVotes};
use crate::round_weights::RoundWeights;
use crate::Weight;

/// Thresholds emitted by the vote keeper.
///
/// Each variant is emitted at most once per round; the driver relies on
/// this when it rescans for newly-satisfied thresholds after every event.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Output {
    /// We have a quorum of prevotes for some block or nil.
    PolkaAny,

    /// We have a quorum of prevotes for nil.
    PolkaNil,

    /// We have a quorum of prevotes for a specific block.
    PolkaValue(BlockHash),

    /// We have a quorum of precommits for some block or nil.
    PrecommitAny,

    /// We have a quorum of precommits for a specific block.
    PrecommitValue(BlockHash),

    /// We have f+1 messages from a higher round.
    SkipRound(Round),
}

/// Errors that can be yielded when recording a vote.
#[derive(Clone, Debug, Error)]
pub enum RecordVoteError {
    /// Attempted to record a conflicting vote.
    #[error("conflicting vote: {existing:?} vs {conflicting:?}")]
    ConflictingVote {
        /// The canonical vote already recorded.
        existing: SignedVote,
        /// The conflicting vote.
        conflicting: SignedVote,
    },
}

/// Keeps track of the votes, senders, and emitted outputs for one round.
#[derive(Clone, Debug, Default)]
pub struct PerRound {
    /// The tallied votes for this round.
    votes: RoundVotes,

    /// Every distinct sender observed for this round, votes and proposals
    /// alike, with their weight. Feeds the round-skip rule.
    senders_weights: RoundWeights,

    /// All votes received for this round, signatures included.
    received_votes: BTreeSet<SignedVote>,

    /// The outputs already emitted for this round.
    emitted_outputs: BTreeSet<Output>,
}

impl PerRound {
    /// Add a vote to the round, checking for conflicts.
    fn add(&mut self, vote: SignedVote, weight: Weight) -> Result<AddVote, RecordVoteError> {
        match self.votes.add_vote(&vote.message, weight) {
            AddVote::Equivocation => {
                let existing = self
                    .get_vote(vote.message.vote_type, vote.validator_address())
                    .cloned()
                    .unwrap_or_else(|| vote.clone());

                Err(RecordVoteError::ConflictingVote {
                    existing,
                    conflicting: vote,
                })
            }

            outcome => {
                self.senders_weights.set_once(vote.validator_address(), weight);
                self.received_votes.insert(vote);
                Ok(outcome)
            }
        }
    }

    /// Return the canonical vote of the given type from the given validator.
    pub fn get_vote(&self, vote_type: VoteType, address: &Address) -> Option<&SignedVote> {
        self.received_votes
            .iter()
            .find(|vote| vote.message.vote_type == vote_type && vote.validator_address() == address)
    }

    /// The tallied votes for this round.
    pub fn votes(&self) -> &RoundVotes {
        &self.votes
    }

    /// All votes received for this round.
    pub fn received_votes(&self) -> &BTreeSet<SignedVote> {
        &self.received_votes
    }

    /// The outputs already emitted for this round.
    pub fn emitted_outputs(&self) -> &BTreeSet<Output> {
        &self.emitted_outputs
    }
}

/// Keeps track of votes and emits outputs when thresholds are reached.
#[derive(Clone, Debug)]
pub struct VoteKeeper {
    /// The validator set for this height.
    validator_set: ValidatorSet,

    /// The threshold parameters.
    threshold_params: ThresholdParams,

    /// The votes and emitted outputs for each round.
    per_round: BTreeMap<Round, PerRound>,

    /// Evidence of equivocation.
    evidence: EvidenceMap,
}

impl VoteKeeper {
    /// Create a new `VoteKeeper` for the given validator set.
    pub fn new(validator_set: ValidatorSet, threshold_params: ThresholdParams) -> Self {
        Self {
            validator_set,
            threshold_params,
            per_round: BTreeMap::new(),
            evidence: EvidenceMap::new(),
        }
    }

    /// The validator set this keeper tallies for.
    pub fn validator_set(&self) -> &ValidatorSet {
        &self.validator_set
    }

    /// The total weight (ie. voting power) of the network.
    pub fn total_weight(&self) -> Weight {
        self.validator_set.total_voting_power()
    }

    /// The tallies for the given round, if any vote or sender was seen.
    pub fn per_round(&self, round: Round) -> Option<&PerRound> {
        self.per_round.get(&round)
    }

    /// The evidence of equivocation recorded so far.
    pub fn evidence(&self) -> &EvidenceMap {
        &self.evidence
    }

    /// Whether this exact vote has already been received.
    pub fn has_vote(&self, vote: &SignedVote) -> bool {
        self.per_round
            .get(&vote.round())
            .is_some_and(|per_round| per_round.received_votes.contains(vote))
    }

    /// Apply a vote, potentially emitting a newly-reached threshold.
    ///
    /// Duplicates are absorbed silently; equivocations are retained as
    /// evidence without being tallied. `current_round` is the round the
    /// state machine is at, used for the round-skip rule.
    pub fn apply_vote(&mut self, vote: SignedVote, current_round: Round) -> Option<Output> {
        let total_weight = self.total_weight();

        let Some(validator) = self.validator_set.get_by_address(vote.validator_address()) else {
            warn!(validator = %vote.validator_address(), "Vote from unknown validator, dropping");
            return None;
        };

        let weight = validator.voting_power;

        let vote_round = vote.round();
        let vote_type = vote.message.vote_type;
        let block_hash = vote.message.block_hash;

        let per_round = self.per_round.entry(vote_round).or_default();

        match per_round.add(vote, weight) {
            Ok(AddVote::Added) => (),
            Ok(AddVote::Duplicate) => return None,
            Ok(AddVote::Equivocation) => unreachable!("conflicts are reported as errors"),
            Err(RecordVoteError::ConflictingVote {
                existing,
                conflicting,
            }) => {
                warn!(validator = %conflicting.validator_address(), "Equivocating vote detected");
                self.evidence.add(existing, conflicting);
                return None;
            }
        }

        if vote_round > current_round {
            let combined_weight = per_round.senders_weights.sum();

            if self
                .threshold_params
                .honest
                .is_met(combined_weight, total_weight)
            {
                let output = Output::SkipRound(vote_round);
                if per_round.emitted_outputs.insert(output.clone()) {
                    return Some(output);
                }
            }
        }

        let threshold = compute_threshold(
            vote_type,
            per_round,
            &block_hash,
            self.threshold_params,
            total_weight,
        );

        let output = threshold_to_output(vote_type, threshold)?;

        if per_round.emitted_outputs.insert(output.clone()) {
            Some(output)
        } else {
            None
        }
    }

    /// Note a non-vote consensus message (a proposal) from `sender` for
    /// `round`, potentially emitting a round skip.
    ///
    /// The round-skip rule counts f+1 *messages* from a higher round, so
    /// proposal senders weigh in alongside voters.
    pub fn apply_round_message(
        &mut self,
        round: Round,
        sender: &Address,
        current_round: Round,
    ) -> Option<Output> {
        let total_weight = self.total_weight();

        let weight = self.validator_set.get_by_address(sender)?.voting_power;

        let per_round = self.per_round.entry(round).or_default();
        per_round.senders_weights.set_once(sender, weight);

        if round > current_round {
            let combined_weight = per_round.senders_weights.sum();

            if self
                .threshold_params
                .honest
                .is_met(combined_weight, total_weight)
            {
                let output = Output::SkipRound(round);
                if per_round.emitted_outputs.insert(output.clone()) {
                    return Some(output);
                }
            }
        }

        None
    }

    /// Whether the given threshold is met in the given round and bucket.
    pub fn is_threshold_met(
        &self,
        round: Round,
        vote_type: VoteType,
        threshold: Threshold,
    ) -> bool {
        self.per_round.get(&round).is_some_and(|per_round| {
            per_round.votes.is_threshold_met(
                vote_type,
                threshold,
                self.threshold_params.quorum,
                self.total_weight(),
            )
        })
    }
}

/// Compute the strongest threshold reached for the given value, if any.
fn compute_threshold(
    vote_type: VoteType,
    per_round: &PerRound,
    block_hash: &NilOr<BlockHash>,
    thresholds: ThresholdParams,
    total_weight: Weight,
) -> Threshold {
    let weight = per_round.votes.get_weight(vote_type, block_hash);

    match block_hash {
        NilOr::Val(block_hash) if thresholds.quorum.is_met(weight, total_weight) => {
            Threshold::Value(*block_hash)
        }

        NilOr::Nil if thresholds.quorum.is_met(weight, total_weight) => Threshold::Nil,

        _ => {
            let weight_sum = per_round.votes.weight_sum(vote_type);

            if thresholds.quorum.is_met(weight_sum, total_weight) {
                Threshold::Any
            } else {
                Threshold::Unreached
            }
        }
    }
}

/// Map a vote type and a threshold to a keeper output.
fn threshold_to_output(vote_type: VoteType, threshold: Threshold) -> Option<Output> {
    match (vote_type, threshold) {
        (_, Threshold::Unreached) => None,

        (VoteType::Prevote, Threshold::Any) => Some(Output::PolkaAny),
        (VoteType::Prevote, Threshold::Nil) => Some(Output::PolkaNil),
        (VoteType::Prevote, Threshold::Value(hash)) => Some(Output::PolkaValue(hash)),

        (VoteType::Precommit, Threshold::Any) => Some(Output::PrecommitAny),
        (VoteType::Precommit, Threshold::Nil) => Some(Output::PrecommitAny),
        (VoteType::Precommit, Threshold::Value(hash)) => Some(Output::PrecommitValue(hash)),
    }
}
