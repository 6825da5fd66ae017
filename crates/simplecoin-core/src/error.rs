use crate::Block;
use thiserror::Error;

/// Why a block could not extend the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AppendError {
    #[error("stale tip: block builds on {got}, current tip is {expected}")]
    StaleTip { expected: String, got: String },
    #[error("index mismatch: expected {expected}, got {got}")]
    IndexMismatch { expected: u64, got: u64 },
    #[error("hash mismatch: block claims {claimed}, contents hash to {computed}")]
    HashMismatch { claimed: String, computed: String },
    #[error("insufficient proof-of-work: {found} leading zero digits, {required} required")]
    InsufficientWork { required: u32, found: u32 },
}

/// A stored chain that cannot be trusted as the active ledger.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("stored chain is empty")]
    Empty,
    #[error("block 0 is not the genesis block")]
    GenesisMismatch,
    #[error("block at position {position} is invalid: {source}")]
    InvalidBlock {
        position: usize,
        #[source]
        source: AppendError,
    },
}

#[derive(Debug, Error)]
pub enum ChainError {
    #[error("block rejected: {0}")]
    Rejected(#[from] AppendError),
    #[error("no pending transactions to mine")]
    NothingToMine,
    #[error("nonce space exhausted")]
    NonceSpaceExhausted,
    #[error("stored chain failed verification: {0}")]
    Load(#[from] LoadError),
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
    /// The block was mined and is now the tip, but writing the chain failed.
    #[error("block {} committed but not persisted: {source}", .block.index)]
    Unpersisted {
        block: Box<Block>,
        #[source]
        source: anyhow::Error,
    },
}

impl ChainError {
    /// The consensus check that rejected a block, if that is what happened.
    pub fn rejection(&self) -> Option<&AppendError> {
        match self {
            ChainError::Rejected(reason) => Some(reason),
            _ => None,
        }
    }
}
