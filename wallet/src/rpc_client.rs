use async_trait::async_trait;
use custody_primitives::{AccountId, CryptoHash, PublicKey};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::errors::{RejectionReason, WalletError};

/// JSON-RPC request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcRequest {
    pub jsonrpc: String,
    pub method: String,
    pub params: Value,
    pub id: u64,
}

/// JSON-RPC response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub jsonrpc: String,
    #[serde(default)]
    pub result: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
    #[serde(default)]
    pub id: u64,
}

impl RpcResponse {
    pub fn ok(id: u64, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result,
            error: None,
            id,
        }
    }

    pub fn err(id: u64, error: RpcError) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            result: Value::Null,
            error: Some(error),
            id,
        }
    }
}

/// Structured cause attached to node errors (`UNKNOWN_ACCOUNT`, `INVALID_TRANSACTION`, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcErrorCause {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<Value>,
}

/// JSON-RPC error
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cause: Option<RpcErrorCause>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    pub fn handler(cause: &str, info: Option<Value>, data: Option<Value>) -> Self {
        Self {
            code: -32000,
            message: "Server error".to_string(),
            name: Some("HANDLER_ERROR".to_string()),
            cause: Some(RpcErrorCause {
                name: cause.to_string(),
                info,
            }),
            data,
        }
    }

    pub fn cause_name(&self) -> Option<&str> {
        self.cause.as_ref().map(|c| c.name.as_str())
    }

    fn describe(&self) -> String {
        match (&self.cause, &self.data) {
            (Some(cause), _) => format!("{} ({}): {}", self.message, cause.name, self.code),
            (None, Some(data)) => format!("{}: {} ({})", self.code, self.message, data),
            (None, None) => format!("{}: {}", self.code, self.message),
        }
    }
}

/// Carries one JSON-RPC exchange to a node. Swappable so tests can stand in for the network.
#[async_trait]
pub trait RpcTransport: Send + Sync {
    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse, WalletError>;
}

/// HTTP POST transport
pub struct HttpTransport {
    url: String,
    client: Client,
}

impl HttpTransport {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: Client::new(),
        }
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse, WalletError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| WalletError::NodeUnavailable(e.to_string()))?;

        if response.status().is_server_error() {
            return Err(WalletError::NodeUnavailable(format!(
                "{} returned {}",
                self.url,
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| WalletError::Rpc(format!("Malformed response from {}: {}", self.url, e)))
    }
}

/// Timeouts applied to node calls.
#[derive(Debug, Clone, Copy)]
pub struct RpcOptions {
    pub request_timeout: Duration,
    pub submit_timeout: Duration,
}

impl Default for RpcOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            submit_timeout: Duration::from_secs(60),
        }
    }
}

mod u128_string {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// `view_account` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountView {
    #[serde(with = "u128_string")]
    pub amount: u128,
    #[serde(with = "u128_string")]
    pub locked: u128,
    pub storage_usage: u64,
    #[serde(default)]
    pub code_hash: String,
    pub block_height: u64,
    pub block_hash: CryptoHash,
}

/// `view_access_key` result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessKeyView {
    pub nonce: u64,
    #[serde(default)]
    pub permission: Value,
    pub block_height: u64,
    pub block_hash: CryptoHash,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncInfo {
    pub latest_block_hash: CryptoHash,
    pub latest_block_height: u64,
    #[serde(default)]
    pub syncing: bool,
}

/// `status` result, trimmed to what the client reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    #[serde(default)]
    pub chain_id: String,
    pub sync_info: SyncInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FinalExecutionStatus {
    NotStarted,
    Started,
    Failure(Value),
    SuccessValue(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionView {
    pub hash: CryptoHash,
    pub signer_id: String,
    pub receiver_id: String,
    pub nonce: u64,
}

/// Outcome returned by `broadcast_tx_commit` and `tx`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalExecutionOutcome {
    pub status: FinalExecutionStatus,
    pub transaction: TransactionView,
    #[serde(default)]
    pub transaction_outcome: Value,
    #[serde(default)]
    pub receipts_outcome: Vec<Value>,
}

enum CallError {
    /// The node answered with a JSON-RPC error object.
    Node(RpcError),
    /// No usable answer: transport failure, timeout, or garbage.
    Client(WalletError),
}

/// RPC client for blockchain interaction
pub struct RpcClient {
    transport: Arc<dyn RpcTransport>,
    options: RpcOptions,
    request_id: AtomicU64,
}

impl RpcClient {
    pub fn new(transport: Arc<dyn RpcTransport>, options: RpcOptions) -> Self {
        Self {
            transport,
            options,
            request_id: AtomicU64::new(1),
        }
    }

    /// Client talking HTTP to `url`
    pub fn http(url: &str, options: RpcOptions) -> Self {
        Self::new(Arc::new(HttpTransport::new(url)), options)
    }

    /// Make RPC call. Transport failures and timeouts surface as `NodeUnavailable`,
    /// node-reported errors are handed back for the caller to classify.
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> Result<Value, CallError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);

        let request = RpcRequest {
            jsonrpc: "2.0".to_string(),
            method: method.to_string(),
            params,
            id,
        };

        debug!(method, id, "rpc call");
        let response = match tokio::time::timeout(timeout, self.transport.send(&request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return Err(CallError::Client(e)),
            Err(_) => {
                warn!(method, ?timeout, "rpc call timed out");
                return Err(CallError::Client(WalletError::NodeUnavailable(format!(
                    "{} timed out after {:?}",
                    method, timeout
                ))));
            }
        };

        match response.error {
            Some(error) => Err(CallError::Node(error)),
            None => Ok(response.result),
        }
    }

    fn unexpected(method: &str, error: RpcError) -> WalletError {
        match error.cause_name() {
            Some("TIMEOUT_ERROR") | Some("NO_SYNCED_BLOCKS") | Some("NOT_SYNCED_YET") => {
                WalletError::NodeUnavailable(format!("{}: {}", method, error.describe()))
            }
            _ => WalletError::Rpc(format!("{}: {}", method, error.describe())),
        }
    }

    /// Get node status
    pub async fn status(&self) -> Result<StatusResponse, WalletError> {
        match self.call("status", json!([]), self.options.request_timeout).await {
            Ok(result) => Ok(serde_json::from_value(result)?),
            Err(CallError::Node(error)) => Err(Self::unexpected("status", error)),
            Err(CallError::Client(e)) => Err(e),
        }
    }

    /// Get account state. `None` when the account does not exist on chain.
    pub async fn view_account(
        &self,
        account_id: &AccountId,
    ) -> Result<Option<AccountView>, WalletError> {
        let params = json!({
            "request_type": "view_account",
            "finality": "final",
            "account_id": account_id,
        });

        match self.call("query", params, self.options.request_timeout).await {
            Ok(result) => Ok(Some(serde_json::from_value(result)?)),
            Err(CallError::Node(error)) if error.cause_name() == Some("UNKNOWN_ACCOUNT") => Ok(None),
            Err(CallError::Node(error)) => Err(Self::unexpected("view_account", error)),
            Err(CallError::Client(e)) => Err(e),
        }
    }

    /// Get access key state for `(account_id, public_key)`
    pub async fn view_access_key(
        &self,
        account_id: &AccountId,
        public_key: &PublicKey,
    ) -> Result<AccessKeyView, WalletError> {
        let params = json!({
            "request_type": "view_access_key",
            "finality": "final",
            "account_id": account_id,
            "public_key": public_key,
        });

        let unknown = || WalletError::UnknownAccessKey {
            account_id: account_id.clone(),
            public_key: *public_key,
        };

        match self.call("query", params, self.options.request_timeout).await {
            Ok(result) => {
                // Older nodes report a missing key inside a successful result.
                if let Some(message) = result.get("error").and_then(Value::as_str) {
                    if message.contains("does not exist") {
                        return Err(unknown());
                    }
                    return Err(WalletError::Rpc(format!("view_access_key: {}", message)));
                }
                Ok(serde_json::from_value(result)?)
            }
            Err(CallError::Node(error)) if error.cause_name() == Some("UNKNOWN_ACCESS_KEY") => Err(unknown()),
            Err(CallError::Node(error)) => Err(Self::unexpected("view_access_key", error)),
            Err(CallError::Client(e)) => Err(e),
        }
    }

    /// Submit a base64-encoded signed transaction and wait for its final outcome.
    pub async fn broadcast_tx_commit(
        &self,
        signed_transaction_base64: &str,
    ) -> Result<FinalExecutionOutcome, WalletError> {
        let params = json!([signed_transaction_base64]);

        match self
            .call("broadcast_tx_commit", params, self.options.submit_timeout)
            .await
        {
            Ok(result) => Ok(serde_json::from_value(result)?),
            Err(CallError::Node(error)) => match rejection_reason(&error) {
                Some(reason) => Err(WalletError::SubmissionRejected(reason)),
                None => Err(Self::unexpected("broadcast_tx_commit", error)),
            },
            Err(CallError::Client(e)) => Err(e),
        }
    }

    /// Look up a transaction by hash. `None` when the node has not seen it.
    pub async fn tx_status(
        &self,
        hash: &CryptoHash,
        sender_id: &AccountId,
    ) -> Result<Option<FinalExecutionOutcome>, WalletError> {
        let params = json!([hash, sender_id]);

        match self.call("tx", params, self.options.request_timeout).await {
            Ok(result) => Ok(Some(serde_json::from_value(result)?)),
            Err(CallError::Node(error)) if error.cause_name() == Some("UNKNOWN_TRANSACTION") => Ok(None),
            Err(CallError::Node(error)) => Err(Self::unexpected("tx", error)),
            Err(CallError::Client(e)) => Err(e),
        }
    }
}

/// True when `value` names `variant`, either as a bare string or as an object key.
fn names_variant(value: &Value, variant: &str) -> bool {
    value.as_str() == Some(variant) || value.get(variant).is_some()
}

fn u128_field(value: &Value, field: &str) -> u128 {
    match value.get(field) {
        Some(Value::String(text)) => text.parse().unwrap_or_default(),
        Some(other) => other.as_u64().map(u128::from).unwrap_or_default(),
        None => 0,
    }
}

/// Classify an `INVALID_TRANSACTION` node error.
pub fn rejection_reason(error: &RpcError) -> Option<RejectionReason> {
    const POINTER: &str = "/TxExecutionError/InvalidTxError";

    let invalid_tx = error
        .data
        .as_ref()
        .and_then(|data| data.pointer(POINTER))
        .or_else(|| {
            error
                .cause
                .as_ref()
                .and_then(|cause| cause.info.as_ref())
                .and_then(|info| info.pointer(POINTER))
        });

    let Some(invalid_tx) = invalid_tx else {
        return (error.cause_name() == Some("INVALID_TRANSACTION"))
            .then(|| RejectionReason::Other(error.message.clone()));
    };

    let reason = if let Some(nonce) = invalid_tx.get("InvalidNonce") {
        RejectionReason::StaleNonce {
            tx_nonce: nonce.get("tx_nonce").and_then(Value::as_u64).unwrap_or_default(),
            ak_nonce: nonce.get("ak_nonce").and_then(Value::as_u64).unwrap_or_default(),
        }
    } else if names_variant(invalid_tx, "Expired") {
        RejectionReason::StaleBlockHash
    } else if let Some(balance) = invalid_tx.get("NotEnoughBalance") {
        RejectionReason::InsufficientBalance {
            balance: u128_field(balance, "balance"),
            cost: u128_field(balance, "cost"),
        }
    } else if names_variant(invalid_tx, "InvalidSignature") {
        RejectionReason::InvalidSignature
    } else {
        RejectionReason::Other(invalid_tx.to_string())
    };

    Some(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedTransport;

    fn client(transport: ScriptedTransport) -> RpcClient {
        RpcClient::new(Arc::new(transport), RpcOptions::default())
    }

    fn alice() -> AccountId {
        "alice.testnet".parse().unwrap()
    }

    #[tokio::test]
    async fn test_view_account_parses_string_amounts() {
        let transport = ScriptedTransport::new().respond(
            "query",
            json!({
                "amount": "100000000000000000000000000",
                "locked": "0",
                "storage_usage": 182,
                "code_hash": "11111111111111111111111111111111",
                "block_height": 10,
                "block_hash": CryptoHash::new([1; 32]),
            }),
        );
        let view = client(transport).view_account(&alice()).await.unwrap().unwrap();
        assert_eq!(view.amount, 100 * custody_primitives::ONE_NEAR);
        assert_eq!(view.storage_usage, 182);
    }

    #[tokio::test]
    async fn test_unknown_account_is_none() {
        let transport = ScriptedTransport::new()
            .fail("query", RpcError::handler("UNKNOWN_ACCOUNT", None, None));
        assert!(client(transport).view_account(&alice()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_legacy_missing_access_key() {
        let transport = ScriptedTransport::new().respond(
            "query",
            json!({
                "error": "access key ed25519:abc does not exist while viewing",
                "logs": [],
                "block_height": 1,
                "block_hash": CryptoHash::default(),
            }),
        );
        let err = client(transport)
            .view_access_key(&alice(), &PublicKey::new([0; 32]))
            .await
            .unwrap_err();
        assert!(matches!(err, WalletError::UnknownAccessKey { .. }));
    }

    #[tokio::test]
    async fn test_timeout_becomes_node_unavailable() {
        let transport = ScriptedTransport::new().hang("status");
        let client = RpcClient::new(
            Arc::new(transport),
            RpcOptions {
                request_timeout: Duration::from_millis(20),
                submit_timeout: Duration::from_millis(20),
            },
        );
        let err = client.status().await.unwrap_err();
        assert!(matches!(err, WalletError::NodeUnavailable(_)));
    }

    #[test]
    fn test_rejection_reasons() {
        let invalid_nonce = RpcError::handler(
            "INVALID_TRANSACTION",
            None,
            Some(json!({"TxExecutionError": {"InvalidTxError": {"InvalidNonce": {"tx_nonce": 6, "ak_nonce": 6}}}})),
        );
        assert_eq!(
            rejection_reason(&invalid_nonce),
            Some(RejectionReason::StaleNonce { tx_nonce: 6, ak_nonce: 6 })
        );

        let expired = RpcError::handler(
            "INVALID_TRANSACTION",
            Some(json!({"TxExecutionError": {"InvalidTxError": "Expired"}})),
            None,
        );
        assert_eq!(rejection_reason(&expired), Some(RejectionReason::StaleBlockHash));

        let broke = RpcError::handler(
            "INVALID_TRANSACTION",
            None,
            Some(json!({"TxExecutionError": {"InvalidTxError": {"NotEnoughBalance": {
                "signer_id": "alice.testnet", "balance": "5", "cost": "10"
            }}}})),
        );
        assert_eq!(
            rejection_reason(&broke),
            Some(RejectionReason::InsufficientBalance { balance: 5, cost: 10 })
        );

        let timeout = RpcError::handler("TIMEOUT_ERROR", None, None);
        assert_eq!(rejection_reason(&timeout), None);
    }

    #[tokio::test]
    async fn test_broadcast_timeout_error_is_transient() {
        let transport = ScriptedTransport::new()
            .fail("broadcast_tx_commit", RpcError::handler("TIMEOUT_ERROR", None, None));
        let err = client(transport).broadcast_tx_commit("AAAA").await.unwrap_err();
        assert!(matches!(err, WalletError::NodeUnavailable(_)));
    }
}
