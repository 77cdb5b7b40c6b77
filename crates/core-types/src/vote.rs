use core::fmt;

use serde::Serialize;

use basaltbft_codec as codec;

use crate::{Address, BlockHash, Height, Round};

/// A type of vote.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VoteType {
    /// Votes for blocks which validators observe are valid for a given round.
    Prevote,

    /// Votes to commit to a particular block for a given round.
    Precommit,
}

impl VoteType {
    fn as_str(&self) -> &'static str {
        match self {
            VoteType::Prevote => "prevote",
            VoteType::Precommit => "precommit",
        }
    }
}

/// Either nil or a value.
///
/// A nil vote signals "no acceptable block this round".
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NilOr<T> {
    /// The nil case.
    #[default]
    Nil,

    /// The value case.
    Val(T),
}

impl<T> NilOr<T> {
    /// Whether this is the nil case.
    pub fn is_nil(&self) -> bool {
        matches!(self, NilOr::Nil)
    }

    /// Whether this holds a value.
    pub fn is_val(&self) -> bool {
        matches!(self, NilOr::Val(_))
    }

    /// Convert from `&NilOr<T>` to `NilOr<&T>`.
    pub fn as_ref(&self) -> NilOr<&T> {
        match self {
            NilOr::Nil => NilOr::Nil,
            NilOr::Val(value) => NilOr::Val(value),
        }
    }

    /// View this as an `Option`, mapping nil to `None`.
    pub fn as_option(&self) -> Option<&T> {
        match self {
            NilOr::Nil => None,
            NilOr::Val(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for NilOr<T> {
    fn from(option: Option<T>) -> Self {
        match option {
            None => NilOr::Nil,
            Some(value) => NilOr::Val(value),
        }
    }
}

/// A vote for a block hash (or nil) in a round.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vote {
    /// The vote type.
    pub vote_type: VoteType,

    /// The height the vote is for.
    pub height: Height,

    /// The round the vote is for.
    pub round: Round,

    /// The block hash voted for, or nil.
    pub block_hash: NilOr<BlockHash>,

    /// Address of the validator that cast the vote.
    pub validator_address: Address,
}

impl Vote {
    /// Create a new prevote.
    pub fn new_prevote(
        height: Height,
        round: Round,
        block_hash: NilOr<BlockHash>,
        validator_address: Address,
    ) -> Self {
        Self {
            vote_type: VoteType::Prevote,
            height,
            round,
            block_hash,
            validator_address,
        }
    }

    /// Create a new precommit.
    pub fn new_precommit(
        height: Height,
        round: Round,
        block_hash: NilOr<BlockHash>,
        validator_address: Address,
    ) -> Self {
        Self {
            vote_type: VoteType::Precommit,
            height,
            round,
            block_hash,
            validator_address,
        }
    }

    /// The canonical bytes covered by this vote's signature.
    pub fn sign_bytes(&self) -> Vec<u8> {
        #[derive(Serialize)]
        struct SignBytes<'a> {
            block_hash: Option<&'a BlockHash>,
            height: Height,
            kind: &'static str,
            round: i64,
        }

        let bytes = codec::to_canonical_vec(&SignBytes {
            block_hash: self.block_hash.as_option(),
            height: self.height,
            kind: self.vote_type.as_str(),
            round: self.round.as_i64(),
        });

        bytes.unwrap_or_else(|e| unreachable!("vote encoding cannot fail: {e}"))
    }
}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}({}/{}, ",
            match self.vote_type {
                VoteType::Prevote => "Prevote",
                VoteType::Precommit => "Precommit",
            },
            self.height,
            self.round,
        )?;

        match &self.block_hash {
            NilOr::Nil => write!(f, "nil")?,
            NilOr::Val(hash) => write!(f, "{hash}")?,
        }

        write!(f, ") by {}", self.validator_address)
    }
}
