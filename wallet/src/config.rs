use custody_primitives::{NetworkConfig, DEFAULT_DISPLAY_DECIMALS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::WalletError;
use crate::rpc_client::RpcOptions;
use crate::sender::ConcurrencyPolicy;
use crate::session::FileSessionProvider;

/// Wallet configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// `mainnet`, `testnet`, `betanet` or `localnet`
    pub network_id: String,
    /// Overrides the templated RPC endpoint.
    pub node_url: Option<String>,
    pub signer_url: String,
    pub publishable_key: String,
    pub session_path: PathBuf,
    pub rpc_timeout_secs: u64,
    pub submit_timeout_secs: u64,
    /// Signing may wait on the user approving a prompt.
    pub signer_timeout_secs: u64,
    pub concurrency: ConcurrencyPolicy,
    pub max_retries: u32,
    pub display_decimals: usize,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            network_id: "testnet".to_string(),
            node_url: None,
            signer_url: "https://api.magic.link".to_string(),
            publishable_key: String::new(),
            session_path: FileSessionProvider::default_path(),
            rpc_timeout_secs: 10,
            submit_timeout_secs: 60,
            signer_timeout_secs: 300,
            concurrency: ConcurrencyPolicy::Reject,
            max_retries: 1,
            display_decimals: DEFAULT_DISPLAY_DECIMALS,
        }
    }
}

impl WalletConfig {
    /// `~/.custody/config.json`
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".custody")
            .join("config.json")
    }

    /// Endpoints for the configured network, with the node override applied.
    pub fn network(&self) -> Result<NetworkConfig, WalletError> {
        let network = NetworkConfig::for_network(&self.network_id)?;
        Ok(match &self.node_url {
            Some(url) => network.with_node_url(url.clone()),
            None => network,
        })
    }

    pub fn rpc_options(&self) -> RpcOptions {
        RpcOptions {
            request_timeout: Duration::from_secs(self.rpc_timeout_secs),
            submit_timeout: Duration::from_secs(self.submit_timeout_secs),
        }
    }

    pub fn signer_timeout(&self) -> Duration {
        Duration::from_secs(self.signer_timeout_secs)
    }

    pub fn load(path: &Path) -> Result<Self, WalletError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), WalletError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
