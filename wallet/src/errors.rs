use custody_primitives::{AccountId, PrimitivesError, PublicKey};
use thiserror::Error;

use crate::sender::SendStage;

/// Why the node (or the local send guard) refused a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RejectionReason {
    #[error("invalid nonce: transaction used {tx_nonce}, access key is at {ak_nonce}")]
    StaleNonce { tx_nonce: u64, ak_nonce: u64 },

    #[error("block hash expired")]
    StaleBlockHash,

    #[error("insufficient balance: have {balance}, need {cost}")]
    InsufficientBalance { balance: u128, cost: u128 },

    #[error("invalid signature")]
    InvalidSignature,

    #[error("another send from this account already holds the next nonce")]
    NonceConflict,

    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    #[error("{0}")]
    Other(String),
}

impl RejectionReason {
    /// Rejections that a freshly resolved nonce and block hash can fix.
    pub fn should_reresolve(&self) -> bool {
        matches!(
            self,
            RejectionReason::StaleNonce { .. } | RejectionReason::StaleBlockHash
        )
    }

    /// Message shown to the user. Each reason maps to a different next step.
    pub fn user_message(&self) -> String {
        match self {
            RejectionReason::StaleNonce { .. } => {
                "Another transaction from this account was processed first. Please send again."
                    .to_string()
            }
            RejectionReason::StaleBlockHash => {
                "The transaction expired before it reached the network. Please send again."
                    .to_string()
            }
            RejectionReason::InsufficientBalance { .. } => {
                "Your balance is too low to cover this transfer.".to_string()
            }
            RejectionReason::InvalidSignature => {
                "The network could not verify the signature. Log out and back in, then retry."
                    .to_string()
            }
            RejectionReason::NonceConflict => {
                "A transaction from this account is already in progress. Wait for it to finish."
                    .to_string()
            }
            RejectionReason::ExecutionFailed(detail) => {
                format!("The transfer was included but failed: {}", detail)
            }
            RejectionReason::Other(detail) => format!("The network rejected the transfer: {}", detail),
        }
    }
}

#[derive(Error, Debug)]
pub enum WalletError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Access key {public_key} is not registered for account {account_id}")]
    UnknownAccessKey {
        account_id: AccountId,
        public_key: PublicKey,
    },

    #[error("Node unavailable: {0}")]
    NodeUnavailable(String),

    #[error("Invalid transaction: {}", .0.join("; "))]
    InvalidTransaction(Vec<String>),

    #[error("Signing rejected: {0}")]
    SigningRejected(String),

    #[error("Signer unavailable: {0}")]
    SignerUnavailable(String),

    #[error("Signed transaction does not match the request: {0}")]
    SignerMismatch(String),

    #[error("Submission rejected: {0}")]
    SubmissionRejected(RejectionReason),

    #[error("Send cancelled while {0}")]
    Cancelled(SendStage),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Session error: {0}")]
    Session(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Encoding error: {0}")]
    Primitives(#[from] PrimitivesError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Cloneable summary of a [`WalletError`], carried by terminal send states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Connection,
    UnknownAccessKey,
    NodeUnavailable,
    InvalidTransaction,
    SigningRejected,
    SignerUnavailable,
    SignerMismatch,
    SubmissionRejected(RejectionReason),
    Cancelled(SendStage),
    InvalidAmount,
    Session,
    Internal,
}

impl WalletError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WalletError::Connection(_) => ErrorKind::Connection,
            WalletError::UnknownAccessKey { .. } => ErrorKind::UnknownAccessKey,
            WalletError::NodeUnavailable(_) => ErrorKind::NodeUnavailable,
            WalletError::InvalidTransaction(_) => ErrorKind::InvalidTransaction,
            WalletError::SigningRejected(_) => ErrorKind::SigningRejected,
            WalletError::SignerUnavailable(_) => ErrorKind::SignerUnavailable,
            WalletError::SignerMismatch(_) => ErrorKind::SignerMismatch,
            WalletError::SubmissionRejected(reason) => ErrorKind::SubmissionRejected(reason.clone()),
            WalletError::Cancelled(stage) => ErrorKind::Cancelled(*stage),
            WalletError::InvalidAmount(_) => ErrorKind::InvalidAmount,
            WalletError::NotLoggedIn | WalletError::Session(_) => ErrorKind::Session,
            WalletError::Rpc(_)
            | WalletError::Primitives(_)
            | WalletError::Json(_)
            | WalletError::Io(_) => ErrorKind::Internal,
        }
    }

    /// Transient failures where a second attempt with fresh inputs may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            WalletError::NodeUnavailable(_) => true,
            WalletError::SubmissionRejected(reason) => reason.should_reresolve(),
            _ => false,
        }
    }

    /// Message for the user-facing error banner.
    pub fn user_message(&self) -> String {
        match self {
            WalletError::SubmissionRejected(reason) => reason.user_message(),
            WalletError::SigningRejected(_) => {
                "The transaction was not approved. You can send it again.".to_string()
            }
            WalletError::UnknownAccessKey { .. } => {
                "This account has no key on chain yet. Fund it first.".to_string()
            }
            WalletError::NodeUnavailable(_) | WalletError::Connection(_) => {
                "The network is not responding. Try again in a moment.".to_string()
            }
            WalletError::Cancelled(_) => "The transaction was cancelled.".to_string(),
            other => other.to_string(),
        }
    }
}
