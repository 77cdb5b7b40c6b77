//! Storage for the proposals received at each round.

use std::collections::BTreeMap;

use basaltbft_core_types::{BlockHash, Round, SignedProposal, Validity};

/// Keeps the proposals received for each round, with the chain's verdict
/// on their blocks, so they can be replayed when thresholds or steps catch
/// up with them.
///
/// A Byzantine proposer can send several distinct proposals for one round;
/// all of them are retained (each can match a later polka), exact
/// duplicates are absorbed.
#[derive(Clone, Debug, Default)]
pub struct ProposalKeeper {
    per_round: BTreeMap<Round, Vec<(SignedProposal, Validity)>>,
}

impl ProposalKeeper {
    /// Create a new `ProposalKeeper`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a proposal and its validity, unless an identical one is
    /// already stored.
    pub fn store_proposal(&mut self, proposal: SignedProposal, validity: Validity) {
        let proposals = self.per_round.entry(proposal.round()).or_default();

        let block_hash = proposal.message.block_hash();
        let already_stored = proposals
            .iter()
            .any(|(stored, _)| stored.message.block_hash() == block_hash);

        if !already_stored {
            proposals.push((proposal, validity));
        }
    }

    /// The stored proposal for the given round carrying the given block,
    /// if any.
    pub fn get_proposal_and_validity_for_round_and_block(
        &self,
        round: Round,
        block_hash: BlockHash,
    ) -> Option<&(SignedProposal, Validity)> {
        self.per_round.get(&round).and_then(|proposals| {
            proposals
                .iter()
                .find(|(proposal, _)| proposal.message.block_hash() == block_hash)
        })
    }

    /// All stored proposals for the given round.
    pub fn get_proposals_and_validities_for_round(
        &self,
        round: Round,
    ) -> &[(SignedProposal, Validity)] {
        self.per_round
            .get(&round)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
