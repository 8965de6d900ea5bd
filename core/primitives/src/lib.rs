//! Wire-level types shared by the custody wallet crates.
//!
//! Everything here is pure: account ids, keys, hashes, the Borsh transaction
//! layout the validators check signatures against, amount conversion and
//! network endpoint templating.

pub mod account;
pub mod action;
pub mod error;
pub mod hash;
pub mod key;
pub mod network;
pub mod transaction;
pub mod units;

pub use account::AccountId;
pub use action::{Action, ActionTag, TransferAction};
pub use error::{PrimitivesError, Result};
pub use hash::CryptoHash;
pub use key::{KeyType, PublicKey, Signature};
pub use network::NetworkConfig;
pub use transaction::{SignedTransaction, Transaction};
pub use units::{
    format_near_amount, parse_near_amount, DEFAULT_DISPLAY_DECIMALS, NEAR_NOMINATION_EXP,
    ONE_NEAR,
};
