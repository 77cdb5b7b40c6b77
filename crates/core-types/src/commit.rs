use crate::{Address, BlockHash, Height, Round, Signature, SignedVote, VoteType, VotingPower};

/// A single precommit signature within a [`Commit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitSignature {
    /// Address of the validator that precommitted.
    pub address: Address,

    /// The precommit signature.
    pub signature: Signature,
}

impl CommitSignature {
    /// Create a new commit signature.
    pub fn new(address: Address, signature: Signature) -> Self {
        Self { address, signature }
    }
}

/// The evidence justifying an appended block: the 2f+1-power set of
/// precommits for its hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Commit {
    /// The height of the committed block.
    pub height: Height,

    /// The round in which the block was committed.
    pub round: Round,

    /// The hash of the committed block.
    pub block_hash: BlockHash,

    /// Precommit signatures for the block hash.
    pub signatures: Vec<CommitSignature>,
}

impl Commit {
    /// Assemble a commit from precommit votes for `block_hash`.
    ///
    /// Prevotes, and votes for other hashes or other rounds, are skipped.
    pub fn from_precommits<'a>(
        height: Height,
        round: Round,
        block_hash: BlockHash,
        precommits: impl IntoIterator<Item = &'a SignedVote>,
    ) -> Self {
        let signatures = precommits
            .into_iter()
            .filter(|vote| {
                vote.message.vote_type == VoteType::Precommit
                    && vote.round() == round
                    && vote.message.block_hash.as_option() == Some(&block_hash)
            })
            .map(|vote| CommitSignature::new(*vote.validator_address(), vote.signature))
            .collect();

        Self {
            height,
            round,
            block_hash,
            signatures,
        }
    }

    /// The number of signatures in the commit.
    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    /// Whether the commit carries no signatures.
    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }

    /// Sum the voting power of the signers, as assigned by `power_of`.
    pub fn voting_power(&self, power_of: impl Fn(&Address) -> VotingPower) -> VotingPower {
        self.signatures.iter().map(|sig| power_of(&sig.address)).sum()
    }
}
