use custody_primitives::{AccountId, NetworkConfig};
use std::sync::Arc;
use tracing::{info, warn};

use crate::balance::AccountBalance;
use crate::errors::WalletError;
use crate::rpc_client::{RpcClient, RpcOptions, RpcTransport};

/// Open connection to one network's RPC node.
///
/// Owned by whoever created it and handed to each component that queries the
/// node; cloning shares the underlying client.
#[derive(Clone)]
pub struct Connection {
    network: NetworkConfig,
    rpc: Arc<RpcClient>,
}

impl Connection {
    /// Connect over HTTP and confirm the node answers `status`.
    pub async fn connect(network: NetworkConfig, options: RpcOptions) -> Result<Self, WalletError> {
        let rpc = RpcClient::http(&network.node_url, options);
        Self::establish(network, rpc).await
    }

    /// Connect through a caller-supplied transport.
    pub async fn with_transport(
        network: NetworkConfig,
        transport: Arc<dyn RpcTransport>,
        options: RpcOptions,
    ) -> Result<Self, WalletError> {
        Self::establish(network, RpcClient::new(transport, options)).await
    }

    async fn establish(network: NetworkConfig, rpc: RpcClient) -> Result<Self, WalletError> {
        match rpc.status().await {
            Ok(status) => {
                info!(
                    network = %network.network_id,
                    node = %network.node_url,
                    chain_id = %status.chain_id,
                    height = status.sync_info.latest_block_height,
                    "connected to node"
                );
                Ok(Self {
                    network,
                    rpc: Arc::new(rpc),
                })
            }
            Err(e) => {
                warn!(node = %network.node_url, error = %e, "node unreachable");
                Err(WalletError::Connection(format!("{}: {}", network.node_url, e)))
            }
        }
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn network_id(&self) -> &str {
        &self.network.network_id
    }

    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Current balance. A never-funded account reads as zero.
    pub async fn get_balance(&self, account_id: &AccountId) -> Result<AccountBalance, WalletError> {
        match self.rpc.view_account(account_id).await? {
            Some(view) => Ok(AccountBalance::from_view(&view)),
            None => Ok(AccountBalance::default()),
        }
    }
}
