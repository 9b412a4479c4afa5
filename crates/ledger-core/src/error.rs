use thiserror::Error;

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Reasons a ledger operation is refused. None of them leave partial state behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid transaction: missing or empty `{0}`")]
    InvalidTransaction(&'static str),

    #[error("invalid peer address: {0:?}")]
    InvalidPeer(String),

    #[error("stale parent: block builds on {found}, tip is {expected}")]
    StaleParent { expected: String, found: String },

    #[error("invalid proof for block {index}")]
    InvalidProof { index: u64 },

    #[error("candidate chain of length {offered} is not longer than local length {current}")]
    NotLonger { offered: usize, current: usize },

    #[error("candidate chain rejected: {0}")]
    InvalidChain(#[from] ChainError),

    #[error("pool changed while block {index} was being mined")]
    PoolChanged { index: u64 },

    #[error("tip index {tip} has no successor")]
    IndexOverflow { tip: u64 },

    #[error("chain dump is empty")]
    EmptyChain,
}

/// First defect found while walking a chain.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChainError {
    #[error("block at position {position} links to {found}, expected {expected}")]
    BrokenLink {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("block at position {position} carries hash {stored}, contents hash to {computed}")]
    HashMismatch {
        position: usize,
        stored: String,
        computed: String,
    },

    #[error("block at position {position} has hash {hash} below difficulty {difficulty}")]
    InsufficientWork {
        position: usize,
        hash: String,
        difficulty: usize,
    },
}
