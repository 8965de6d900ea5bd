use thiserror::Error;

/// Errors raised while parsing or encoding wire-level types.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PrimitivesError {
    #[error("Invalid account id {id:?}: {reason}")]
    InvalidAccountId { id: String, reason: String },

    #[error("Invalid base58 string: {0}")]
    Base58(String),

    #[error("Invalid length: expected {expected} bytes, got {got}")]
    InvalidLength { expected: usize, got: usize },

    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("Cannot parse {0:?} as NEAR amount")]
    InvalidAmount(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

pub type Result<T> = std::result::Result<T, PrimitivesError>;
