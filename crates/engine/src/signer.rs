//! Signing and verification of consensus messages.

use basaltbft_core_types::{
    Address, ConsensusMsg, PrivateKey, Proposal, PublicKey, SignedProposal, SignedVote, Vote,
};

/// Signs this validator's messages and verifies everyone else's.
#[derive(Debug)]
pub struct Ed25519Signer {
    private_key: PrivateKey,
    address: Address,
}

impl Ed25519Signer {
    /// Create a signer from the validator's private key.
    pub fn new(private_key: PrivateKey) -> Self {
        let address = Address::from_public_key(&private_key.public_key());
        Self {
            private_key,
            address,
        }
    }

    /// The address of the signing validator.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// The private key, for seams that build blocks on our behalf.
    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }

    /// Sign a vote.
    pub fn sign_vote(&self, vote: Vote) -> SignedVote {
        let signature = self.private_key.sign(&vote.sign_bytes());
        SignedVote::new(vote, signature)
    }

    /// Sign a proposal.
    pub fn sign_proposal(&self, proposal: Proposal) -> SignedProposal {
        let signature = self.private_key.sign(&proposal.sign_bytes());
        SignedProposal::new(proposal, signature)
    }

    /// Verify a signed consensus message against its sender's public key.
    pub fn verify_msg(&self, msg: &ConsensusMsg, public_key: &PublicKey) -> bool {
        match msg {
            ConsensusMsg::Vote(vote) => public_key
                .verify(&vote.message.sign_bytes(), &vote.signature)
                .is_ok(),
            ConsensusMsg::Proposal(proposal) => public_key
                .verify(&proposal.message.sign_bytes(), &proposal.signature)
                .is_ok(),
        }
    }
}
