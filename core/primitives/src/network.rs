use serde::{Deserialize, Serialize};

use crate::account::AccountId;
use crate::error::{PrimitivesError, Result};
use crate::hash::CryptoHash;

/// Endpoints for one network id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub network_id: String,
    pub node_url: String,
    pub wallet_url: String,
    pub helper_url: String,
    pub explorer_url: String,
}

impl NetworkConfig {
    /// Endpoint set for a known network id (`mainnet`, `testnet`, `betanet`, `localnet`).
    pub fn for_network(network_id: &str) -> Result<Self> {
        match network_id {
            "mainnet" | "testnet" | "betanet" => Ok(Self {
                network_id: network_id.to_string(),
                node_url: format!("https://rpc.{}.near.org", network_id),
                wallet_url: format!("https://wallet.{}.near.org", network_id),
                helper_url: format!("https://helper.{}.near.org", network_id),
                explorer_url: format!("https://explorer.{}.near.org", network_id),
            }),
            "localnet" => Ok(Self {
                network_id: network_id.to_string(),
                node_url: "http://127.0.0.1:3030".to_string(),
                wallet_url: "http://127.0.0.1:4000/wallet".to_string(),
                helper_url: "http://127.0.0.1:3000".to_string(),
                explorer_url: "http://127.0.0.1:9001".to_string(),
            }),
            other => Err(PrimitivesError::UnknownNetwork(other.to_string())),
        }
    }

    pub fn with_node_url(mut self, node_url: impl Into<String>) -> Self {
        self.node_url = node_url.into();
        self
    }

    pub fn explorer_transaction_url(&self, hash: &CryptoHash) -> String {
        format!("{}/transactions/{}", self.explorer_url.trim_end_matches('/'), hash)
    }

    pub fn explorer_account_url(&self, account_id: &AccountId) -> String {
        format!("{}/accounts/{}", self.explorer_url.trim_end_matches('/'), account_id)
    }

    /// Where a user tops up a test account.
    pub fn faucet_url(&self) -> &str {
        &self.wallet_url
    }
}
