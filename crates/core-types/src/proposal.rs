use core::fmt;

use serde::Serialize;

use basaltbft_codec as codec;

use crate::{Address, Block, BlockHash, Height, Round};

/// A proposal for a block in a round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposal {
    /// The height the proposal is for.
    pub height: Height,

    /// The round the proposal is for.
    pub round: Round,

    /// The proposed block.
    pub block: Block,

    /// The round at which the proposer claims the block became valid,
    /// ie. gathered a polka. `Nil` for a fresh block.
    pub pol_round: Round,

    /// Address of the proposer.
    pub proposer: Address,
}

impl Proposal {
    /// Create a new proposal.
    pub fn new(
        height: Height,
        round: Round,
        block: Block,
        pol_round: Round,
        proposer: Address,
    ) -> Self {
        Self {
            height,
            round,
            block,
            pol_round,
            proposer,
        }
    }

    /// The hash of the proposed block.
    pub fn block_hash(&self) -> BlockHash {
        self.block.hash()
    }

    /// The canonical bytes covered by this proposal's signature.
    pub fn sign_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct SignBytes {
            block_hash: BlockHash,
            height: Height,
            kind: &'static str,
            pol_round: i64,
            round: i64,
        }

        let bytes = codec::to_canonical_vec(&SignBytes {
            block_hash: self.block_hash(),
            height: self.height,
            kind: "proposal",
            pol_round: self.pol_round.as_i64(),
            round: self.round.as_i64(),
        });

        bytes.unwrap_or_else(|e| unreachable!("proposal encoding cannot fail: {e}"))
    }
}

/// The outcome of validating a proposed block against the chain.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Validity {
    /// The block is valid.
    Valid,

    /// The block is invalid.
    Invalid,
}

impl Validity {
    /// Whether this is the valid case.
    pub fn is_valid(&self) -> bool {
        *self == Validity::Valid
    }

    /// `Valid` if `valid` is true, `Invalid` otherwise.
    pub fn from_bool(valid: bool) -> Self {
        if valid {
            Validity::Valid
        } else {
            Validity::Invalid
        }
    }
}

impl fmt::Display for Proposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Proposal({}/{}, {}, pol: {}) by {}",
            self.height,
            self.round,
            self.block_hash(),
            self.pol_round,
            self.proposer,
        )
    }
}
