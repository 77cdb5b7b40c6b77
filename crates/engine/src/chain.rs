//! The seam to the blockchain this context decides blocks for.

use basaltbft_core_types::{Block, Commit, PrivateKey};

/// Errors returned by the chain seam.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The block header is inconsistent with the chain tip.
    #[error("invalid block header: {0}")]
    InvalidHeader(String),

    /// The block payload is invalid.
    #[error("invalid block payload: {0}")]
    InvalidContent(String),

    /// A block to propose could not be built.
    #[error("failed to build block: {0}")]
    BuildFailed(String),

    /// The block could not be appended.
    #[error("failed to append block: {0}")]
    AppendFailed(String),
}

/// The blockchain as seen by one consensus context.
///
/// All calls are made from the context's consumer task, one at a time.
/// Implementations are expected to be cheap; a result that arrives after
/// the context was stopped is discarded.
pub trait BlockChain: Send + Sync + 'static {
    /// The current tip of the chain.
    fn tip(&self) -> Block;

    /// Build the next block, to be proposed by the holder of `proposer`.
    fn propose_block(&self, proposer: &PrivateKey) -> Result<Block, ChainError>;

    /// Validate a proposed block as the next block of the chain.
    fn validate_next_block(&self, block: &Block) -> Result<(), ChainError>;

    /// Append a decided block, justified by `commit`.
    fn append(&self, block: Block, commit: Commit) -> Result<(), ChainError>;
}
