use borsh::{BorshDeserialize, BorshSerialize};

use crate::account::AccountId;
use crate::action::Action;
use crate::error::{PrimitivesError, Result};
use crate::hash::CryptoHash;
use crate::key::{PublicKey, Signature};

fn encoding_error(e: std::io::Error) -> PrimitivesError {
    PrimitivesError::Encoding(e.to_string())
}

/// Unsigned transaction. Field order is the wire order.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct Transaction {
    pub signer_id: AccountId,
    pub public_key: PublicKey,
    pub nonce: u64,
    pub receiver_id: AccountId,
    pub block_hash: CryptoHash,
    pub actions: Vec<Action>,
}

impl Transaction {
    /// Canonical Borsh bytes, the payload handed to the signer.
    pub fn encode(&self) -> Result<Vec<u8>> {
        borsh::to_vec(self).map_err(encoding_error)
    }

    /// Exact inverse of [`Transaction::encode`]. Trailing bytes are an error.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        borsh::from_slice(bytes).map_err(encoding_error)
    }

    /// SHA-256 of the encoded transaction. This is both the transaction id and the
    /// message the signature covers.
    pub fn hash(&self) -> Result<CryptoHash> {
        Ok(CryptoHash::hash_bytes(&self.encode()?))
    }

    /// Sum of all deposits carried by the actions.
    pub fn total_deposit(&self) -> u128 {
        self.actions
            .iter()
            .fold(0u128, |acc, action| acc.saturating_add(action.deposit()))
    }
}

/// Transaction plus the custodial signer's signature.
#[derive(Debug, Clone, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub struct SignedTransaction {
    pub transaction: Transaction,
    pub signature: Signature,
}

impl SignedTransaction {
    pub fn new(transaction: Transaction, signature: Signature) -> Self {
        Self {
            transaction,
            signature,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        borsh::to_vec(self).map_err(encoding_error)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        borsh::from_slice(bytes).map_err(encoding_error)
    }

    pub fn hash(&self) -> Result<CryptoHash> {
        self.transaction.hash()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn sample(nonce: u64, deposit: u128) -> Transaction {
        Transaction {
            signer_id: "alice.testnet".parse().unwrap(),
            public_key: PublicKey::new([1u8; 32]),
            nonce,
            receiver_id: "bob.testnet".parse().unwrap(),
            block_hash: CryptoHash::new([2u8; 32]),
            actions: vec![Action::transfer(deposit)],
        }
    }

    #[test]
    fn test_field_order_on_the_wire() {
        let tx = sample(6, 10);
        let bytes = tx.encode().unwrap();

        let mut expected = Vec::new();
        expected.extend_from_slice(&13u32.to_le_bytes());
        expected.extend_from_slice(b"alice.testnet");
        expected.push(0);
        expected.extend_from_slice(&[1u8; 32]);
        expected.extend_from_slice(&6u64.to_le_bytes());
        expected.extend_from_slice(&11u32.to_le_bytes());
        expected.extend_from_slice(b"bob.testnet");
        expected.extend_from_slice(&[2u8; 32]);
        expected.extend_from_slice(&1u32.to_le_bytes());
        expected.push(3);
        expected.extend_from_slice(&10u128.to_le_bytes());

        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_decode_rejects_trailing_bytes() {
        let mut bytes = sample(1, 1).encode().unwrap();
        bytes.push(0);
        assert!(matches!(
            Transaction::decode(&bytes),
            Err(PrimitivesError::Encoding(_))
        ));
    }

    #[test]
    fn test_signed_transaction_appends_signature() {
        let tx = sample(1, 1);
        let unsigned_len = tx.encode().unwrap().len();
        let signed = SignedTransaction::new(tx.clone(), Signature::new([9u8; 64]));
        let bytes = signed.encode().unwrap();
        assert_eq!(bytes.len(), unsigned_len + 65);
        assert_eq!(SignedTransaction::decode(&bytes).unwrap(), signed);
        assert_eq!(signed.hash().unwrap(), tx.hash().unwrap());
    }

    #[test]
    fn test_hash_changes_with_nonce() {
        assert_ne!(sample(1, 1).hash().unwrap(), sample(2, 1).hash().unwrap());
    }

    fn account_id() -> impl Strategy<Value = AccountId> {
        prop_oneof![
            "[a-z0-9]{2,12}([-_.][a-z0-9]{1,12}){0,4}",
            "[0-9a-f]{64}",
        ]
        .prop_map(|id| id.parse().unwrap())
    }

    fn transfers() -> impl Strategy<Value = Vec<Action>> {
        prop::collection::vec(1u128..=u128::MAX, 1..6)
            .prop_map(|deposits| deposits.into_iter().map(Action::transfer).collect())
    }

    prop_compose! {
        fn transaction()(
            signer_id in account_id(),
            receiver_id in account_id(),
            key in any::<[u8; 32]>(),
            nonce in any::<u64>(),
            hash in any::<[u8; 32]>(),
            actions in transfers(),
        ) -> Transaction {
            Transaction {
                signer_id,
                public_key: PublicKey::new(key),
                nonce,
                receiver_id,
                block_hash: CryptoHash::new(hash),
                actions,
            }
        }
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(tx in transaction()) {
            let decoded = Transaction::decode(&tx.encode().unwrap()).unwrap();
            prop_assert_eq!(decoded, tx);
        }

        #[test]
        fn prop_signed_decode_inverts_encode(
            tx in transaction(),
            sig in prop::collection::vec(any::<u8>(), 64),
        ) {
            let mut bytes = [0u8; 64];
            bytes.copy_from_slice(&sig);
            let signed = SignedTransaction::new(tx, Signature::new(bytes));
            let decoded = SignedTransaction::decode(&signed.encode().unwrap()).unwrap();
            prop_assert_eq!(decoded.hash().unwrap(), signed.hash().unwrap());
            prop_assert_eq!(decoded, signed);
        }
    }
}
