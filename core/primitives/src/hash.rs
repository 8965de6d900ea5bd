use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::{PrimitivesError, Result};

/// 32-byte hash used for block references and transaction identifiers.
///
/// The text form is base58, which is what the RPC node returns in
/// `sync_info.latest_block_hash` and in transaction outcomes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord, BorshSerialize, BorshDeserialize,
)]
pub struct CryptoHash(pub [u8; 32]);

impl CryptoHash {
    pub fn new(data: [u8; 32]) -> Self {
        Self(data)
    }

    /// SHA-256 of `bytes`.
    pub fn hash_bytes(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut data = [0u8; 32];
        data.copy_from_slice(&digest);
        Self(data)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn from_base58(encoded: &str) -> Result<Self> {
        let bytes = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| PrimitivesError::Base58(e.to_string()))?;
        Self::try_from(bytes.as_slice())
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }
}

impl TryFrom<&[u8]> for CryptoHash {
    type Error = PrimitivesError;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let data: [u8; 32] = bytes.try_into().map_err(|_| PrimitivesError::InvalidLength {
            expected: 32,
            got: bytes.len(),
        })?;
        Ok(Self(data))
    }
}

impl fmt::Display for CryptoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl FromStr for CryptoHash {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58(s)
    }
}

impl Serialize for CryptoHash {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for CryptoHash {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = <String as Deserialize>::deserialize(deserializer)?;
        encoded.parse().map_err(serde::de::Error::custom)
    }
}
