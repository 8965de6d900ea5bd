use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::io::{Error as IoError, ErrorKind, Read, Write};
use std::str::FromStr;

use crate::error::{PrimitivesError, Result};

/// Key curve tag as it appears on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum KeyType {
    Ed25519 = 0,
}

impl KeyType {
    pub fn prefix(&self) -> &'static str {
        match self {
            KeyType::Ed25519 => "ed25519",
        }
    }

    fn from_tag(tag: u8) -> std::io::Result<Self> {
        match tag {
            0 => Ok(KeyType::Ed25519),
            other => Err(IoError::new(
                ErrorKind::InvalidData,
                format!("unsupported key type tag {}", other),
            )),
        }
    }
}

/// Splits `ed25519:<base58>` into its payload, accepting a bare base58 string too.
fn strip_key_prefix(text: &str) -> Result<&str> {
    match text.split_once(':') {
        Some((prefix, payload)) if prefix == KeyType::Ed25519.prefix() => Ok(payload),
        Some((prefix, _)) => Err(PrimitivesError::UnsupportedKeyType(prefix.to_string())),
        None => Ok(text),
    }
}

fn decode_fixed<const N: usize>(payload: &str) -> Result<[u8; N]> {
    let bytes = bs58::decode(payload)
        .into_vec()
        .map_err(|e| PrimitivesError::Base58(e.to_string()))?;
    bytes.as_slice().try_into().map_err(|_| PrimitivesError::InvalidLength {
        expected: N,
        got: bytes.len(),
    })
}

/// Ed25519 public key of an access key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey([u8; 32]);

impl PublicKey {
    pub fn new(data: [u8; 32]) -> Self {
        Self(data)
    }

    pub fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key_type().prefix(), bs58::encode(self.0).into_string())
    }
}

impl FromStr for PublicKey {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self> {
        decode_fixed::<32>(strip_key_prefix(s)?).map(Self)
    }
}

impl BorshSerialize for PublicKey {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&[self.key_type() as u8])?;
        writer.write_all(&self.0)
    }
}

impl BorshDeserialize for PublicKey {
    fn deserialize_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        KeyType::from_tag(u8::deserialize_reader(reader)?)?;
        let data = <[u8; 32]>::deserialize_reader(reader)?;
        Ok(Self(data))
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = <String as Deserialize>::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Ed25519 signature produced by the custodial signer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signature([u8; 64]);

impl Signature {
    pub fn new(data: [u8; 64]) -> Self {
        Self(data)
    }

    pub fn key_type(&self) -> KeyType {
        KeyType::Ed25519
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

impl Default for Signature {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.key_type().prefix(), bs58::encode(self.0).into_string())
    }
}

impl FromStr for Signature {
    type Err = PrimitivesError;

    fn from_str(s: &str) -> Result<Self> {
        decode_fixed::<64>(strip_key_prefix(s)?).map(Self)
    }
}

impl BorshSerialize for Signature {
    fn serialize<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        writer.write_all(&[self.key_type() as u8])?;
        writer.write_all(&self.0)
    }
}

impl BorshDeserialize for Signature {
    fn deserialize_reader<R: Read>(reader: &mut R) -> std::io::Result<Self> {
        KeyType::from_tag(u8::deserialize_reader(reader)?)?;
        let data = <[u8; 64]>::deserialize_reader(reader)?;
        Ok(Self(data))
    }
}
