#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use custody_primitives::{
    AccountId, CryptoHash, NetworkConfig, PublicKey, Signature, SignedTransaction, Transaction,
    ONE_NEAR,
};
use custody_wallet::rpc_client::{RpcError, RpcRequest, RpcResponse, RpcTransport};
use custody_wallet::{CancelHandle, Connection, RemoteSigner, RpcOptions, WalletError};
use ed25519_dalek::{Signer, SigningKey};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const ALICE: &str = "alice.testnet";
pub const BOB: &str = "bob.testnet";

pub fn account(id: &str) -> AccountId {
    id.parse().unwrap()
}

pub fn test_key() -> SigningKey {
    SigningKey::from_bytes(&[7; 32])
}

pub fn public_key_of(key: &SigningKey) -> PublicKey {
    PublicKey::new(key.verifying_key().to_bytes())
}

// ============================================================================
// Mock node
// ============================================================================

#[derive(Default)]
struct NodeState {
    balances: HashMap<String, u128>,
    nonces: HashMap<(String, String), u64>,
    height: u64,
    stale_hashes: HashSet<CryptoHash>,
    expire_next: u32,
    steal_nonce_next: u32,
    drop_before_apply: u32,
    drop_after_apply: u32,
    hold_back_next: u32,
    held: Option<SignedTransaction>,
    submitted: Vec<SignedTransaction>,
    applied: HashMap<CryptoHash, SignedTransaction>,
    applied_order: Vec<CryptoHash>,
    calls: Vec<String>,
}

/// In-memory node speaking the JSON-RPC subset the wallet uses.
///
/// Every `status` call produces a new block hash. Balances and nonces change only
/// when a broadcast is applied.
#[derive(Clone, Default)]
pub struct MockNode {
    state: Arc<Mutex<NodeState>>,
}

impl MockNode {
    pub fn new() -> Self {
        let node = Self::default();
        node.state.lock().unwrap().height = 100;
        node
    }

    /// Alice holds 100 NEAR and the test key at nonce 5.
    pub fn funded() -> Self {
        let node = Self::new();
        node.set_balance(ALICE, 100 * ONE_NEAR);
        node.add_access_key(ALICE, &public_key_of(&test_key()), 5);
        node
    }

    pub fn set_balance(&self, account_id: &str, amount: u128) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(account_id.to_string(), amount);
    }

    pub fn add_access_key(&self, account_id: &str, public_key: &PublicKey, nonce: u64) {
        self.state
            .lock()
            .unwrap()
            .nonces
            .insert((account_id.to_string(), public_key.to_string()), nonce);
    }

    pub fn balance(&self, account_id: &str) -> u128 {
        self.state
            .lock()
            .unwrap()
            .balances
            .get(account_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn nonce(&self, account_id: &str, public_key: &PublicKey) -> u64 {
        self.state.lock().unwrap().nonces[&(account_id.to_string(), public_key.to_string())]
    }

    /// Reject the next broadcast as expired and blacklist its block hash.
    pub fn expire_once(&self) {
        self.state.lock().unwrap().expire_next += 1;
    }

    /// Another client spends the nonce right before the next broadcast lands.
    pub fn steal_nonce_once(&self) {
        self.state.lock().unwrap().steal_nonce_next += 1;
    }

    /// Lose the next broadcast before the node applies it.
    pub fn drop_before_apply_once(&self) {
        self.state.lock().unwrap().drop_before_apply += 1;
    }

    /// Apply the next broadcast, then lose the response.
    pub fn drop_after_apply_once(&self) {
        self.state.lock().unwrap().drop_after_apply += 1;
    }

    /// Lose the response to the next broadcast and keep the transaction in flight.
    /// It lands just before the broadcast after it is processed.
    pub fn hold_back_once(&self) {
        self.state.lock().unwrap().hold_back_next += 1;
    }

    pub fn submitted(&self) -> Vec<SignedTransaction> {
        self.state.lock().unwrap().submitted.clone()
    }

    pub fn applied(&self) -> Vec<SignedTransaction> {
        let state = self.state.lock().unwrap();
        state
            .applied_order
            .iter()
            .map(|hash| state.applied[hash].clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, method: &str) -> usize {
        self.calls().iter().filter(|m| m.as_str() == method).count()
    }

    pub fn network(&self) -> NetworkConfig {
        NetworkConfig::for_network("testnet").unwrap()
    }

    pub async fn connect(&self) -> Connection {
        Connection::with_transport(self.network(), Arc::new(self.clone()), RpcOptions::default())
            .await
            .unwrap()
    }

    fn block_hash(height: u64) -> CryptoHash {
        CryptoHash::hash_bytes(&height.to_le_bytes())
    }

    fn invalid_tx(detail: Value) -> RpcError {
        RpcError::handler(
            "INVALID_TRANSACTION",
            None,
            Some(json!({"TxExecutionError": {"InvalidTxError": detail}})),
        )
    }

    fn outcome(signed: &SignedTransaction, hash: &CryptoHash) -> Value {
        let tx = &signed.transaction;
        json!({
            "status": {"SuccessValue": ""},
            "transaction": {
                "hash": hash,
                "signer_id": tx.signer_id,
                "receiver_id": tx.receiver_id,
                "nonce": tx.nonce,
            },
            "transaction_outcome": {"id": hash},
            "receipts_outcome": [],
        })
    }

    fn status(state: &mut NodeState) -> Result<Value, RpcError> {
        state.height += 1;
        Ok(json!({
            "chain_id": "testnet",
            "sync_info": {
                "latest_block_hash": Self::block_hash(state.height),
                "latest_block_height": state.height,
                "syncing": false,
            }
        }))
    }

    fn query(state: &mut NodeState, params: &Value) -> Result<Value, RpcError> {
        let account_id = params["account_id"].as_str().unwrap_or_default().to_string();
        let block_hash = Self::block_hash(state.height);

        match params["request_type"].as_str() {
            Some("view_account") => match state.balances.get(&account_id) {
                Some(amount) => Ok(json!({
                    "amount": amount.to_string(),
                    "locked": "0",
                    "storage_usage": 0,
                    "code_hash": "11111111111111111111111111111111",
                    "block_height": state.height,
                    "block_hash": block_hash,
                })),
                None => Err(RpcError::handler(
                    "UNKNOWN_ACCOUNT",
                    Some(json!({"requested_account_id": account_id})),
                    None,
                )),
            },
            Some("view_access_key") => {
                let public_key = params["public_key"].as_str().unwrap_or_default().to_string();
                match state.nonces.get(&(account_id, public_key)) {
                    Some(nonce) => Ok(json!({
                        "nonce": nonce,
                        "permission": "FullAccess",
                        "block_height": state.height,
                        "block_hash": block_hash,
                    })),
                    None => Err(RpcError::handler("UNKNOWN_ACCESS_KEY", None, None)),
                }
            }
            other => Err(RpcError::handler(
                "UNKNOWN_REQUEST",
                Some(json!({"request_type": other})),
                None,
            )),
        }
    }

    fn broadcast(state: &mut NodeState, params: &Value) -> Result<Result<Value, RpcError>, WalletError> {
        let encoded = params[0].as_str().unwrap_or_default();
        let bytes = STANDARD.decode(encoded).unwrap();
        let signed = SignedTransaction::decode(&bytes).unwrap();
        state.submitted.push(signed.clone());

        if let Some(held) = state.held.take() {
            let _ = Self::apply(state, held)?;
        }
        if state.hold_back_next > 0 {
            state.hold_back_next -= 1;
            state.held = Some(signed);
            return Err(WalletError::NodeUnavailable("gateway timeout".to_string()));
        }
        if state.drop_before_apply > 0 {
            state.drop_before_apply -= 1;
            return Err(WalletError::NodeUnavailable("connection reset".to_string()));
        }

        Self::apply(state, signed)
    }

    fn apply(state: &mut NodeState, signed: SignedTransaction) -> Result<Result<Value, RpcError>, WalletError> {
        let tx = signed.transaction.clone();
        let hash = tx.hash().unwrap();

        if state.expire_next > 0 {
            state.expire_next -= 1;
            state.stale_hashes.insert(tx.block_hash);
        }
        if state.stale_hashes.contains(&tx.block_hash) {
            return Ok(Err(Self::invalid_tx(json!("Expired"))));
        }

        let key = (tx.signer_id.to_string(), tx.public_key.to_string());
        if state.steal_nonce_next > 0 {
            state.steal_nonce_next -= 1;
            if let Some(nonce) = state.nonces.get_mut(&key) {
                *nonce += 1;
            }
        }
        let ak_nonce = match state.nonces.get(&key) {
            Some(nonce) => *nonce,
            None => return Ok(Err(Self::invalid_tx(json!({"InvalidAccessKeyError": "AccessKeyNotFound"})))),
        };
        if tx.nonce <= ak_nonce {
            return Ok(Err(Self::invalid_tx(json!({
                "InvalidNonce": {"tx_nonce": tx.nonce, "ak_nonce": ak_nonce}
            }))));
        }

        let deposit = tx.total_deposit();
        let balance = state.balances.get(tx.signer_id.as_str()).copied().unwrap_or_default();
        if balance < deposit {
            return Ok(Err(Self::invalid_tx(json!({
                "NotEnoughBalance": {
                    "signer_id": tx.signer_id,
                    "balance": balance.to_string(),
                    "cost": deposit.to_string(),
                }
            }))));
        }

        state.balances.insert(tx.signer_id.to_string(), balance - deposit);
        *state.balances.entry(tx.receiver_id.to_string()).or_default() += deposit;
        state.nonces.insert(key, tx.nonce);
        state.applied.insert(hash, signed.clone());
        state.applied_order.push(hash);

        if state.drop_after_apply > 0 {
            state.drop_after_apply -= 1;
            return Err(WalletError::NodeUnavailable("response lost".to_string()));
        }

        Ok(Ok(Self::outcome(&signed, &hash)))
    }

    fn tx(state: &mut NodeState, params: &Value) -> Result<Value, RpcError> {
        let hash: CryptoHash = params[0].as_str().unwrap_or_default().parse().unwrap();
        match state.applied.get(&hash) {
            Some(signed) => Ok(Self::outcome(signed, &hash)),
            None => Err(RpcError::handler("UNKNOWN_TRANSACTION", None, None)),
        }
    }
}

#[async_trait]
impl RpcTransport for MockNode {
    async fn send(&self, request: &RpcRequest) -> Result<RpcResponse, WalletError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(request.method.clone());

        let result = match request.method.as_str() {
            "status" => Self::status(&mut state),
            "query" => Self::query(&mut state, &request.params),
            "broadcast_tx_commit" => Self::broadcast(&mut state, &request.params)?,
            "tx" => Self::tx(&mut state, &request.params),
            other => Err(RpcError::handler(
                "METHOD_NOT_FOUND",
                Some(json!({"method_name": other})),
                None,
            )),
        };

        Ok(match result {
            Ok(value) => RpcResponse::ok(request.id, value),
            Err(error) => RpcResponse::err(request.id, error),
        })
    }
}

// ============================================================================
// Signers
// ============================================================================

/// Signs with a fixed test key, the way the custodial service would.
pub struct KeySigner {
    key: SigningKey,
    sign_calls: AtomicUsize,
}

impl KeySigner {
    pub fn new(key: SigningKey) -> Self {
        Self {
            key,
            sign_calls: AtomicUsize::new(0),
        }
    }

    pub fn sign_calls(&self) -> usize {
        self.sign_calls.load(Ordering::SeqCst)
    }

    fn sign_now(&self, unsigned: &[u8]) -> Result<Vec<u8>, WalletError> {
        self.sign_calls.fetch_add(1, Ordering::SeqCst);
        let transaction = Transaction::decode(unsigned)?;
        let hash = transaction.hash()?;
        let signature = Signature::new(self.key.sign(hash.as_bytes()).to_bytes());
        Ok(SignedTransaction::new(transaction, signature).encode()?)
    }
}

#[async_trait]
impl RemoteSigner for KeySigner {
    async fn public_key(&self) -> Result<PublicKey, WalletError> {
        Ok(public_key_of(&self.key))
    }

    async fn sign(&self, unsigned: &[u8], _network_id: &str) -> Result<Vec<u8>, WalletError> {
        self.sign_now(unsigned)
    }
}

/// The user declines every signing prompt.
pub struct RejectingSigner;

#[async_trait]
impl RemoteSigner for RejectingSigner {
    async fn public_key(&self) -> Result<PublicKey, WalletError> {
        Ok(public_key_of(&test_key()))
    }

    async fn sign(&self, _unsigned: &[u8], _network_id: &str) -> Result<Vec<u8>, WalletError> {
        Err(WalletError::SigningRejected("User closed the prompt".to_string()))
    }
}

/// Blocks inside `sign` until released, like a user staring at the approval prompt.
pub struct GatedSigner {
    inner: KeySigner,
    entered: Arc<Notify>,
    gate: Arc<Notify>,
}

impl GatedSigner {
    pub fn new() -> Self {
        Self {
            inner: KeySigner::new(test_key()),
            entered: Arc::new(Notify::new()),
            gate: Arc::new(Notify::new()),
        }
    }

    /// Wait until a send is parked on the prompt.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Approve one pending prompt.
    pub fn release(&self) {
        self.gate.notify_one();
    }
}

#[async_trait]
impl RemoteSigner for GatedSigner {
    async fn public_key(&self) -> Result<PublicKey, WalletError> {
        self.inner.public_key().await
    }

    async fn sign(&self, unsigned: &[u8], network_id: &str) -> Result<Vec<u8>, WalletError> {
        self.entered.notify_one();
        self.gate.notified().await;
        self.inner.sign(unsigned, network_id).await
    }
}

/// Signs, then the user hits cancel before the result is submitted.
pub struct CancelAfterSigning {
    inner: KeySigner,
    cancel: CancelHandle,
    on_call: usize,
}

impl CancelAfterSigning {
    pub fn new(cancel: CancelHandle) -> Self {
        Self::on_call(cancel, 1)
    }

    /// Cancel only once the `n`th signature has been produced.
    pub fn on_call(cancel: CancelHandle, n: usize) -> Self {
        Self {
            inner: KeySigner::new(test_key()),
            cancel,
            on_call: n,
        }
    }
}

#[async_trait]
impl RemoteSigner for CancelAfterSigning {
    async fn public_key(&self) -> Result<PublicKey, WalletError> {
        self.inner.public_key().await
    }

    async fn sign(&self, unsigned: &[u8], network_id: &str) -> Result<Vec<u8>, WalletError> {
        let signed = self.inner.sign(unsigned, network_id).await?;
        if self.inner.sign_calls() == self.on_call {
            self.cancel.cancel();
        }
        Ok(signed)
    }
}
