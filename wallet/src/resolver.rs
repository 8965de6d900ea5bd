use custody_primitives::{AccountId, CryptoHash, PublicKey};
use tracing::debug;

use crate::connection::Connection;
use crate::errors::WalletError;

/// Nonce and block reference for the next transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedInputs {
    /// On-chain nonce plus one.
    pub nonce: u64,
    pub block_hash: CryptoHash,
}

/// Reads the two chain-dependent inputs a transaction needs.
///
/// Both go stale (other transactions bump the nonce, block hashes expire), so
/// they are fetched per attempt, right before signing, and never cached.
#[derive(Clone)]
pub struct NonceAndBlockResolver {
    connection: Connection,
}

impl NonceAndBlockResolver {
    pub fn new(connection: Connection) -> Self {
        Self { connection }
    }

    /// Current nonce of the access key. An unregistered key is an error, never zero.
    pub async fn resolve_nonce(
        &self,
        account_id: &AccountId,
        public_key: &PublicKey,
    ) -> Result<u64, WalletError> {
        let access_key = self
            .connection
            .rpc()
            .view_access_key(account_id, public_key)
            .await?;
        Ok(access_key.nonce)
    }

    /// Hash of the latest block the node knows about.
    pub async fn resolve_block_reference(&self) -> Result<CryptoHash, WalletError> {
        let status = self.connection.rpc().status().await?;
        Ok(status.sync_info.latest_block_hash)
    }

    /// Fetch both inputs back to back.
    pub async fn resolve(
        &self,
        account_id: &AccountId,
        public_key: &PublicKey,
    ) -> Result<ResolvedInputs, WalletError> {
        let current = self.resolve_nonce(account_id, public_key).await?;
        let block_hash = self.resolve_block_reference().await?;

        let nonce = current.checked_add(1).ok_or_else(|| {
            WalletError::InvalidTransaction(vec![format!(
                "access key nonce {} cannot be incremented",
                current
            )])
        })?;

        debug!(account = %account_id, nonce, block_hash = %block_hash, "resolved inputs");
        Ok(ResolvedInputs { nonce, block_hash })
    }
}
