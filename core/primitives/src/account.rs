use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{Error as IoError, ErrorKind, Read, Write};
use std::str::FromStr;

use crate::error::{PrimitivesError, Result};

pub const MIN_ACCOUNT_ID_LEN: usize = 2;
pub const MAX_ACCOUNT_ID_LEN: usize = 64;

/// A validated account identifier (`alice.testnet`, or a 64-char hex implicit account).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Check `id` against the network's account naming rules.
    pub fn validate(id: &str) -> Result<()> {
        let invalid = |reason: &str| PrimitivesError::InvalidAccountId {
            id: id.to_string(),
            reason: reason.to_string(),
        };

        if id.len() < MIN_ACCOUNT_ID_LEN {
            return Err(invalid("too short"));
        }
        if id.len() > MAX_ACCOUNT_ID_LEN {
            return Err(invalid("too long"));
        }

        // Starts true so a leading separator is caught.
        let mut last_was_separator = true;
        for (index, c) in id.chars().enumerate() {
            match c {
                'a'..='z' | '0'..='9' => last_was_separator = false,
                '-' | '_' | '.' => {
                    if last_was_separator {
                        return Err(if index == 0 {
                            invalid("starts with a separator")
                        } else {
                            invalid("contains consecutive separators")
                        });
                    }
                    last_was_separator = true;
                }
                _ => return Err(invalid(&format!("invalid character {:?}", c))),
            }
        }

        if last_was_separator {
            return Err(invalid("ends with a separator"));
        }

        Ok(())
    }

    /// Implicit accounts are the hex encoding of an ed25519 public key.
    pub fn is_implicit(&self) -> bool {
        self.0.len() == 64 && self.0.chars().all(|c| c.is_ascii_hexdigit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for AccountId {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self> {
        Self::validate(s)?;
        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for AccountId {
    type Error = PrimitivesError;

    fn try_from(value: String) -> Result<Self> {
        Self::validate(&value)?;
        Ok(Self(value))
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl BorshSerialize for AccountId {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        BorshSerialize::serialize(&self.0, writer)
    }
}

impl BorshDeserialize for AccountId {
    fn deserialize_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        let raw = String::deserialize_reader(reader)?;
        Self::try_from(raw).map_err(|e| IoError::new(ErrorKind::InvalidData, e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        for id in [
            "alice.testnet",
            "bob_1.near",
            "a-b.c_d",
            "ok",
            "98793cd91a3f870fb126f66285808c7e094afcfc4eda8a970f6648cdf0dbd6de",
        ] {
            assert!(AccountId::validate(id).is_ok(), "{} should be valid", id);
        }
    }

    #[test]
    fn test_invalid_ids() {
        let cases = [
            ("a", "too short"),
            ("Alice.testnet", "invalid character 'A'"),
            (".alice", "starts with a separator"),
            ("alice.", "ends with a separator"),
            ("alice..testnet", "contains consecutive separators"),
            ("alice@testnet", "invalid character '@'"),
        ];
        for (id, reason) in cases {
            match AccountId::validate(id) {
                Err(PrimitivesError::InvalidAccountId { reason: got, .. }) => {
                    assert_eq!(got, reason, "wrong reason for {}", id)
                }
                other => panic!("expected failure for {}, got {:?}", id, other),
            }
        }

        let long = "a".repeat(MAX_ACCOUNT_ID_LEN + 1);
        assert!(AccountId::validate(&long).is_err());
    }

    #[test]
    fn test_implicit_account() {
        let implicit: AccountId = "ab".repeat(32).parse().unwrap();
        assert!(implicit.is_implicit());
        let named: AccountId = "alice.testnet".parse().unwrap();
        assert!(!named.is_implicit());
    }

    #[test]
    fn test_borsh_is_length_prefixed_string() {
        let id: AccountId = "bob.near".parse().unwrap();
        let bytes = borsh::to_vec(&id).unwrap();
        assert_eq!(&bytes[..4], &8u32.to_le_bytes());
        assert_eq!(&bytes[4..], b"bob.near");
    }

    #[test]
    fn test_serde_validates() {
        assert!(serde_json::from_str::<AccountId>("\"bob.near\"").is_ok());
        assert!(serde_json::from_str::<AccountId>("\"BOB\"").is_err());
    }
}
