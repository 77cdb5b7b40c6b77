use crate::{Address, Height, Proposal, Round, Signature, Vote};

/// A message together with its signature.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct SignedMessage<M> {
    /// The message.
    pub message: M,

    /// The signature over the message's canonical sign-bytes.
    pub signature: Signature,
}

impl<M> SignedMessage<M> {
    /// Attach a signature to a message.
    pub fn new(message: M, signature: Signature) -> Self {
        Self { message, signature }
    }
}

/// A signed vote.
pub type SignedVote = SignedMessage<Vote>;

impl SignedMessage<Vote> {
    /// The height the vote is for.
    pub fn height(&self) -> Height {
        self.message.height
    }

    /// The round the vote is for.
    pub fn round(&self) -> Round {
        self.message.round
    }

    /// The address of the validator that cast the vote.
    pub fn validator_address(&self) -> &Address {
        &self.message.validator_address
    }
}

/// A signed proposal.
pub type SignedProposal = SignedMessage<Proposal>;

impl SignedMessage<Proposal> {
    /// The height the proposal is for.
    pub fn height(&self) -> Height {
        self.message.height
    }

    /// The round the proposal is for.
    pub fn round(&self) -> Round {
        self.message.round
    }

    /// The address of the proposer.
    pub fn proposer(&self) -> &Address {
        &self.message.proposer
    }
}

/// A signed consensus message as carried on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsensusMsg {
    /// A signed proposal.
    Proposal(SignedProposal),

    /// A signed vote.
    Vote(SignedVote),
}

impl ConsensusMsg {
    /// The height the message is for.
    pub fn height(&self) -> Height {
        match self {
            ConsensusMsg::Proposal(proposal) => proposal.height(),
            ConsensusMsg::Vote(vote) => vote.height(),
        }
    }

    /// The round the message is for.
    pub fn round(&self) -> Round {
        match self {
            ConsensusMsg::Proposal(proposal) => proposal.round(),
            ConsensusMsg::Vote(vote) => vote.round(),
        }
    }

    /// The address of the message's sender.
    pub fn sender(&self) -> &Address {
        match self {
            ConsensusMsg::Proposal(proposal) => proposal.proposer(),
            ConsensusMsg::Vote(vote) => vote.validator_address(),
        }
    }
}
