use base64::{engine::general_purpose::STANDARD, Engine as _};
use custody_primitives::{AccountId, CryptoHash, SignedTransaction, Transaction};
use ed25519_dalek::{Signature as DalekSignature, Verifier, VerifyingKey};
use tracing::{info, warn};

use crate::connection::Connection;
use crate::errors::{RejectionReason, WalletError};
use crate::rpc_client::{FinalExecutionOutcome, FinalExecutionStatus};

/// Result of an accepted submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionOutcome {
    pub transaction_hash: CryptoHash,
    pub status: FinalExecutionStatus,
}

/// Signed transaction that passed local checks and is ready to broadcast.
#[derive(Debug, Clone)]
pub struct PreparedSubmission {
    pub signed: SignedTransaction,
    pub transaction_hash: CryptoHash,
    encoded: String,
}

/// Checks what came back from the signer, then hands it to the node.
#[derive(Clone)]
pub struct TransactionSubmitter {
    connection: Connection,
}

impl TransactionSubmitter {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Decode the signer's bytes.
    pub fn decode(signed_bytes: &[u8]) -> Result<SignedTransaction, WalletError> {
        SignedTransaction::decode(signed_bytes)
            .map_err(|e| WalletError::SignerMismatch(format!("undecodable signed transaction: {}", e)))
    }

    /// The signer must have signed exactly what was built, with the key it advertised.
    pub fn verify(signed: &SignedTransaction, expected: &Transaction) -> Result<CryptoHash, WalletError> {
        if &signed.transaction != expected {
            return Err(WalletError::SignerMismatch(
                "signed transaction differs from the one submitted for signing".to_string(),
            ));
        }

        let hash = expected.hash()?;
        let key = VerifyingKey::from_bytes(expected.public_key.as_bytes())
            .map_err(|e| WalletError::SignerMismatch(format!("unusable public key: {}", e)))?;
        let signature = DalekSignature::from_bytes(signed.signature.as_bytes());
        key.verify(hash.as_bytes(), &signature)
            .map_err(|_| WalletError::SignerMismatch("signature does not verify".to_string()))?;

        Ok(hash)
    }

    /// Decode and verify without touching the network.
    pub fn prepare(
        &self,
        signed_bytes: &[u8],
        expected: &Transaction,
    ) -> Result<PreparedSubmission, WalletError> {
        let signed = Self::decode(signed_bytes)?;
        let transaction_hash = Self::verify(&signed, expected)?;
        Ok(PreparedSubmission {
            encoded: STANDARD.encode(signed_bytes),
            signed,
            transaction_hash,
        })
    }

    /// Broadcast a prepared transaction and wait for its final outcome.
    pub async fn broadcast(&self, prepared: &PreparedSubmission) -> Result<SubmissionOutcome, WalletError> {
        let hash = prepared.transaction_hash;
        info!(tx_hash = %hash, nonce = prepared.signed.transaction.nonce, "submitting transaction");

        let outcome = self.connection.rpc().broadcast_tx_commit(&prepared.encoded).await?;
        if outcome.transaction.hash != hash {
            warn!(local = %hash, node = %outcome.transaction.hash, "node reported a different hash");
        }

        match outcome.status {
            FinalExecutionStatus::Failure(failure) => {
                warn!(tx_hash = %hash, %failure, "transaction failed during execution");
                Err(WalletError::SubmissionRejected(RejectionReason::ExecutionFailed(
                    failure.to_string(),
                )))
            }
            status => {
                info!(tx_hash = %hash, "transaction accepted");
                Ok(SubmissionOutcome {
                    transaction_hash: hash,
                    status,
                })
            }
        }
    }

    /// Decode, verify, then broadcast.
    pub async fn submit(
        &self,
        signed_bytes: &[u8],
        expected: &Transaction,
    ) -> Result<SubmissionOutcome, WalletError> {
        let prepared = self.prepare(signed_bytes, expected)?;
        self.broadcast(&prepared).await
    }

    /// Whether the node knows about `hash`. Used after an ambiguous submission.
    pub async fn transaction_status(
        &self,
        hash: &CryptoHash,
        sender_id: &AccountId,
    ) -> Result<Option<FinalExecutionOutcome>, WalletError> {
        self.connection.rpc().tx_status(hash, sender_id).await
    }
}
