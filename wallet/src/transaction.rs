use custody_primitives::{AccountId, Action, CryptoHash, PublicKey, Transaction};

use crate::errors::WalletError;

/// Transaction builder
///
/// Pure: builds and validates, never touches the network. Every violated
/// constraint is reported, not just the first.
#[derive(Debug, Clone, Default)]
pub struct TransactionBuilder {
    signer_id: Option<AccountId>,
    public_key: Option<PublicKey>,
    receiver_id: Option<String>,
    nonce: u64,
    actions: Vec<Action>,
    block_hash: Option<CryptoHash>,
}

impl TransactionBuilder {
    /// Create new transaction builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set sender account
    pub fn signer(mut self, signer_id: AccountId) -> Self {
        self.signer_id = Some(signer_id);
        self
    }

    /// Set sender access key
    pub fn public_key(mut self, public_key: PublicKey) -> Self {
        self.public_key = Some(public_key);
        self
    }

    /// Set receiver; validated at build time
    pub fn receiver(mut self, receiver_id: impl Into<String>) -> Self {
        self.receiver_id = Some(receiver_id.into());
        self
    }

    /// Set nonce
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Replace the action list
    pub fn actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }

    /// Append a transfer of `deposit` yoctoNEAR
    pub fn transfer(mut self, deposit: u128) -> Self {
        self.actions.push(Action::transfer(deposit));
        self
    }

    /// Set block reference
    pub fn block_hash(mut self, block_hash: CryptoHash) -> Self {
        self.block_hash = Some(block_hash);
        self
    }

    /// Check the receiver and action list alone. Used before any inputs are fetched
    /// so bad input never costs a network round trip.
    pub fn validate_request(receiver_id: &str, actions: &[Action]) -> Result<AccountId, WalletError> {
        let mut violations = Vec::new();
        let receiver = Self::check_request(receiver_id, actions, &mut violations);
        match receiver {
            Some(receiver) if violations.is_empty() => Ok(receiver),
            _ => Err(WalletError::InvalidTransaction(violations)),
        }
    }

    fn check_request(
        receiver_id: &str,
        actions: &[Action],
        violations: &mut Vec<String>,
    ) -> Option<AccountId> {
        if actions.is_empty() {
            violations.push("transaction has no actions".to_string());
        }
        for (index, action) in actions.iter().enumerate() {
            match action {
                Action::Transfer(transfer) if transfer.deposit == 0 => {
                    violations.push(format!("action {}: transfer amount must be greater than zero", index));
                }
                Action::Transfer(_) => {}
            }
        }

        match receiver_id.parse::<AccountId>() {
            Ok(receiver) => Some(receiver),
            Err(e) => {
                violations.push(format!("receiver: {}", e));
                None
            }
        }
    }

    /// Build the unsigned transaction
    pub fn build(self) -> Result<Transaction, WalletError> {
        let mut violations = Vec::new();

        if self.signer_id.is_none() {
            violations.push("signer account not set".to_string());
        }
        if self.public_key.is_none() {
            violations.push("signer public key not set".to_string());
        }
        if self.block_hash.is_none() {
            violations.push("block hash not set".to_string());
        }
        let receiver = match &self.receiver_id {
            Some(receiver_id) => Self::check_request(receiver_id, &self.actions, &mut violations),
            None => {
                violations.push("receiver account not set".to_string());
                None
            }
        };

        match (self.signer_id, self.public_key, receiver, self.block_hash) {
            (Some(signer_id), Some(public_key), Some(receiver_id), Some(block_hash))
                if violations.is_empty() =>
            {
                Ok(Transaction {
                    signer_id,
                    public_key,
                    nonce: self.nonce,
                    receiver_id,
                    block_hash,
                    actions: self.actions,
                })
            }
            _ => Err(WalletError::InvalidTransaction(violations)),
        }
    }
}

/// Single-transfer convenience over [`TransactionBuilder`].
pub fn build_transfer(
    signer_id: AccountId,
    public_key: PublicKey,
    receiver_id: &str,
    nonce: u64,
    deposit: u128,
    block_hash: CryptoHash,
) -> Result<Transaction, WalletError> {
    TransactionBuilder::new()
        .signer(signer_id)
        .public_key(public_key)
        .receiver(receiver_id)
        .nonce(nonce)
        .transfer(deposit)
        .block_hash(block_hash)
        .build()
}
