use custody_primitives::{AccountId, Action, CryptoHash, PublicKey, Transaction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, warn};

use crate::balance::{AccountBalance, BalanceTracker};
use crate::connection::Connection;
use crate::errors::{ErrorKind, RejectionReason, WalletError};
use crate::resolver::NonceAndBlockResolver;
use crate::rpc_client::FinalExecutionStatus;
use crate::signer::RemoteSigner;
use crate::submitter::TransactionSubmitter;
use crate::transaction::{build_transfer, TransactionBuilder};

/// Pipeline stage a send can be cancelled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SendStage {
    BuildingInputs,
    AwaitingSignature,
    Submitting,
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SendStage::BuildingInputs => "building inputs",
            SendStage::AwaitingSignature => "awaiting signature",
            SendStage::Submitting => "submitting",
        };
        f.write_str(text)
    }
}

/// Observable state of one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendState {
    Idle,
    BuildingInputs,
    AwaitingSignature,
    Submitting,
    Succeeded(CryptoHash),
    Failed(ErrorKind),
}

impl SendState {
    fn rank(&self) -> u8 {
        match self {
            SendState::Idle => 0,
            SendState::BuildingInputs => 1,
            SendState::AwaitingSignature => 2,
            SendState::Submitting => 3,
            SendState::Succeeded(_) | SendState::Failed(_) => 4,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.rank() == 4
    }
}

impl From<SendStage> for SendState {
    fn from(stage: SendStage) -> Self {
        match stage {
            SendStage::BuildingInputs => SendState::BuildingInputs,
            SendStage::AwaitingSignature => SendState::AwaitingSignature,
            SendStage::Submitting => SendState::Submitting,
        }
    }
}

/// Publishes the state of a single send. Observers only ever see forward moves;
/// a retry that revisits an earlier stage is recorded in [`SendReport::transitions`]
/// but not published.
pub struct SendProgress {
    tx: watch::Sender<SendState>,
}

impl SendProgress {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SendState::Idle);
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<SendState> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> SendState {
        self.tx.borrow().clone()
    }

    fn advance(&self, next: &SendState) -> bool {
        self.tx.send_if_modified(|current| {
            if next.rank() > current.rank() {
                *current = next.clone();
                true
            } else {
                false
            }
        })
    }
}

impl Default for SendProgress {
    fn default() -> Self {
        Self::new()
    }
}

/// What to do when a second send starts for an account that already has one in flight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConcurrencyPolicy {
    /// Fail the second send with `NonceConflict` without touching the network.
    #[default]
    Reject,
    /// Wait for the first send, then resolve a fresh nonce.
    Queue,
}

/// User-triggered cancellation, shared between the UI and the running send.
#[derive(Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`CancelHandle::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// "Sending transaction..." flag. True while at least one send is running.
#[derive(Clone)]
pub struct SendingIndicator {
    active: Arc<AtomicUsize>,
    tx: Arc<watch::Sender<bool>>,
}

impl SendingIndicator {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            active: Arc::new(AtomicUsize::new(0)),
            tx: Arc::new(tx),
        }
    }

    pub fn is_sending(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    pub fn begin(&self) -> SendingGuard {
        self.active.fetch_add(1, Ordering::SeqCst);
        self.tx.send_replace(true);
        SendingGuard {
            indicator: self.clone(),
        }
    }
}

impl Default for SendingIndicator {
    fn default() -> Self {
        Self::new()
    }
}

/// Holds the indicator up. Clears it on drop, including when the send future is dropped.
pub struct SendingGuard {
    indicator: SendingIndicator,
}

impl Drop for SendingGuard {
    fn drop(&mut self) {
        if self.indicator.active.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.indicator.tx.send_replace(false);
        }
    }
}

type LockMap = Arc<parking_lot::Mutex<HashMap<AccountId, Arc<Mutex<()>>>>>;

/// One mutex per sending account. An entry lives only while a send holds or waits on it.
#[derive(Default)]
pub struct AccountLocks {
    locks: LockMap,
}

impl AccountLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, account_id: &AccountId) -> Arc<Mutex<()>> {
        self.locks.lock().entry(account_id.clone()).or_default().clone()
    }

    fn hold(&self, account_id: &AccountId, guard: OwnedMutexGuard<()>) -> AccountLock {
        AccountLock {
            account_id: account_id.clone(),
            guard: Some(guard),
            locks: self.locks.clone(),
        }
    }

    /// Take the account's lock without waiting. `None` if another send holds it.
    pub fn try_acquire(&self, account_id: &AccountId) -> Option<AccountLock> {
        let guard = self.lock_for(account_id).try_lock_owned().ok()?;
        Some(self.hold(account_id, guard))
    }

    /// Wait for the account's lock.
    pub async fn acquire(&self, account_id: &AccountId) -> AccountLock {
        let guard = self.lock_for(account_id).lock_owned().await;
        self.hold(account_id, guard)
    }

    /// Accounts with a send holding or waiting on their lock.
    pub fn tracked(&self) -> usize {
        self.locks.lock().len()
    }
}

/// Held for the duration of one send.
pub struct AccountLock {
    account_id: AccountId,
    guard: Option<OwnedMutexGuard<()>>,
    locks: LockMap,
}

impl Drop for AccountLock {
    fn drop(&mut self) {
        let mut locks = self.locks.lock();
        drop(self.guard.take());
        // Waiters clone the Arc under the map lock, so a count of one means nobody is queued.
        if locks
            .get(&self.account_id)
            .map_or(false, |lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.account_id);
        }
    }
}

/// Transfer the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub receiver_id: String,
    /// yoctoNEAR
    pub amount: u128,
}

impl TransferRequest {
    pub fn new(receiver_id: impl Into<String>, amount: u128) -> Self {
        Self {
            receiver_id: receiver_id.into(),
            amount,
        }
    }
}

/// How a send ended.
#[derive(Debug)]
pub struct SendReport {
    pub state: SendState,
    /// Every state entered, in order, retries included.
    pub transitions: Vec<SendState>,
    pub attempts: u32,
    /// Nonce of the last attempt that got as far as building.
    pub nonce: Option<u64>,
    /// Hash of the transaction that landed. Only set on success.
    pub transaction_hash: Option<CryptoHash>,
    /// Balance read after success.
    pub balance: Option<AccountBalance>,
    pub error: Option<WalletError>,
}

impl SendReport {
    /// Report for a send refused before the pipeline started.
    pub(crate) fn rejected(err: WalletError) -> Self {
        let state = SendState::Failed(err.kind());
        Self {
            transitions: vec![SendState::Idle, state.clone()],
            state,
            attempts: 0,
            nonce: None,
            transaction_hash: None,
            balance: None,
            error: Some(err),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.state, SendState::Succeeded(_))
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match &self.state {
            SendState::Failed(kind) => Some(kind.clone()),
            _ => None,
        }
    }
}

struct Run<'a> {
    progress: &'a SendProgress,
    transitions: Vec<SendState>,
    attempts: u32,
    nonce: Option<u64>,
}

impl<'a> Run<'a> {
    fn new(progress: &'a SendProgress) -> Self {
        Self {
            progress,
            transitions: vec![SendState::Idle],
            attempts: 0,
            nonce: None,
        }
    }

    fn enter(&mut self, state: SendState) {
        self.progress.advance(&state);
        self.transitions.push(state);
    }

    fn succeed(mut self, hash: CryptoHash, balance: Option<AccountBalance>) -> SendReport {
        let state = SendState::Succeeded(hash);
        self.enter(state.clone());
        SendReport {
            state,
            transitions: self.transitions,
            attempts: self.attempts,
            nonce: self.nonce,
            transaction_hash: Some(hash),
            balance,
            error: None,
        }
    }

    fn fail(mut self, err: WalletError) -> SendReport {
        let state = SendState::Failed(err.kind());
        self.enter(state.clone());
        SendReport {
            state,
            transitions: self.transitions,
            attempts: self.attempts,
            nonce: self.nonce,
            transaction_hash: None,
            balance: None,
            error: Some(err),
        }
    }
}

/// Result of checking whether an ambiguous submission landed.
enum Reconciled {
    Landed(CryptoHash),
    NotConsumed,
}

/// Race `future` against the cancel handle. Cancellation wins ties.
async fn guarded<T, F>(cancel: &CancelHandle, stage: SendStage, future: F) -> Result<T, WalletError>
where
    F: Future<Output = Result<T, WalletError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(WalletError::Cancelled(stage)),
        result = future => result,
    }
}

/// Runs the send pipeline: resolve, build, sign, submit, refresh.
#[derive(Clone)]
pub struct TransferSender {
    connection: Connection,
    signer: Arc<dyn RemoteSigner>,
    resolver: NonceAndBlockResolver,
    submitter: TransactionSubmitter,
    balance: BalanceTracker,
    locks: Arc<AccountLocks>,
    indicator: SendingIndicator,
    policy: ConcurrencyPolicy,
    max_retries: u32,
}

impl TransferSender {
    pub fn new(connection: Connection, signer: Arc<dyn RemoteSigner>) -> Self {
        Self {
            resolver: NonceAndBlockResolver::new(connection.clone()),
            submitter: TransactionSubmitter::new(connection.clone()),
            balance: BalanceTracker::new(connection.clone()),
            connection,
            signer,
            locks: Arc::new(AccountLocks::new()),
            indicator: SendingIndicator::new(),
            policy: ConcurrencyPolicy::default(),
            max_retries: 1,
        }
    }

    pub fn with_policy(mut self, policy: ConcurrencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_balance_tracker(mut self, balance: BalanceTracker) -> Self {
        self.balance = balance;
        self
    }

    pub fn indicator(&self) -> &SendingIndicator {
        &self.indicator
    }

    /// Send `request` from `sender`. Never returns an error: every outcome,
    /// cancellation included, is a terminal state in the report.
    pub async fn send(
        &self,
        sender: &AccountId,
        request: &TransferRequest,
        cancel: &CancelHandle,
        progress: &SendProgress,
    ) -> SendReport {
        let _sending = self.indicator.begin();
        let mut run = Run::new(progress);

        info!(
            sender = %sender,
            receiver = %request.receiver_id,
            amount = %request.amount,
            "send requested"
        );

        let actions = [Action::transfer(request.amount)];
        if let Err(e) = TransactionBuilder::validate_request(&request.receiver_id, &actions) {
            warn!(error = %e, "send rejected before any network call");
            return run.fail(e);
        }

        let _lock = match self.policy {
            ConcurrencyPolicy::Reject => match self.locks.try_acquire(sender) {
                Some(lock) => lock,
                None => {
                    warn!(sender = %sender, "send already in flight for account");
                    return run.fail(WalletError::SubmissionRejected(RejectionReason::NonceConflict));
                }
            },
            ConcurrencyPolicy::Queue => {
                let acquire = async { Ok::<_, WalletError>(self.locks.acquire(sender).await) };
                match guarded(cancel, SendStage::BuildingInputs, acquire).await {
                    Ok(lock) => lock,
                    Err(e) => return run.fail(e),
                }
            }
        };

        match self.run_attempts(&mut run, sender, request, cancel).await {
            Ok(hash) => {
                let balance = match self.balance.refresh(sender).await {
                    Ok(balance) => Some(balance),
                    Err(e) => {
                        warn!(sender = %sender, error = %e, "balance refresh after send failed");
                        None
                    }
                };
                info!(tx_hash = %hash, attempts = run.attempts, "send succeeded");
                run.succeed(hash, balance)
            }
            Err(e) => {
                error!(sender = %sender, attempts = run.attempts, error = %e, "send failed");
                run.fail(e)
            }
        }
    }

    async fn run_attempts(
        &self,
        run: &mut Run<'_>,
        sender: &AccountId,
        request: &TransferRequest,
        cancel: &CancelHandle,
    ) -> Result<CryptoHash, WalletError> {
        let mut retries_left = self.max_retries;
        // Broadcasts whose response was lost. Any of them may still land.
        let mut unconfirmed: Vec<CryptoHash> = Vec::new();

        run.enter(SendState::BuildingInputs);
        let public_key = guarded(cancel, SendStage::BuildingInputs, self.signer.public_key()).await?;

        loop {
            run.attempts += 1;
            if run.attempts > 1 {
                run.enter(SendState::BuildingInputs);
            }

            let resolved = guarded(
                cancel,
                SendStage::BuildingInputs,
                self.resolver.resolve(sender, &public_key),
            )
            .await;
            let inputs = match resolved {
                Ok(inputs) => inputs,
                Err(WalletError::NodeUnavailable(reason)) if retries_left > 0 => {
                    retries_left -= 1;
                    warn!(%reason, "node unavailable while resolving inputs, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            };

            let transaction = build_transfer(
                sender.clone(),
                public_key,
                &request.receiver_id,
                inputs.nonce,
                request.amount,
                inputs.block_hash,
            )?;
            run.nonce = Some(transaction.nonce);
            let unsigned = transaction.encode()?;

            run.enter(SendState::AwaitingSignature);
            debug!(nonce = transaction.nonce, bytes = unsigned.len(), "requesting signature");
            let signed = guarded(
                cancel,
                SendStage::AwaitingSignature,
                self.signer.sign(&unsigned, self.connection.network_id()),
            )
            .await?;

            run.enter(SendState::Submitting);
            let prepared = self.submitter.prepare(&signed, &transaction)?;
            // Once broadcast starts the transaction may land, so cancelling stops here.
            if cancel.is_cancelled() {
                return Err(WalletError::Cancelled(SendStage::Submitting));
            }

            let err = match self.submitter.broadcast(&prepared).await {
                Ok(outcome) => return Ok(outcome.transaction_hash),
                Err(e) => e,
            };

            // A nonce taken from under us may have been taken by our own earlier broadcast.
            if let WalletError::SubmissionRejected(RejectionReason::StaleNonce { .. }) = &err {
                if let Some(hash) = self.find_landed(sender, &unconfirmed).await? {
                    info!(tx_hash = %hash, "earlier broadcast landed, not resending");
                    return Ok(hash);
                }
            }

            match err {
                WalletError::SubmissionRejected(reason) if reason.should_reresolve() && retries_left > 0 => {
                    retries_left -= 1;
                    warn!(%reason, nonce = transaction.nonce, "stale inputs, re-resolving");
                }
                WalletError::NodeUnavailable(reason) => {
                    warn!(%reason, tx_hash = %prepared.transaction_hash, "submission outcome unknown");
                    unconfirmed.push(prepared.transaction_hash);
                    match self
                        .reconcile(sender, &public_key, &transaction, &unconfirmed)
                        .await?
                    {
                        Reconciled::Landed(hash) => return Ok(hash),
                        Reconciled::NotConsumed if retries_left > 0 => {
                            retries_left -= 1;
                            info!(nonce = transaction.nonce, "nonce unused, resubmitting");
                        }
                        Reconciled::NotConsumed => return Err(WalletError::NodeUnavailable(reason)),
                    }
                }
                other => return Err(other),
            }
        }
    }

    /// Decide whether a submission whose response was lost made it on chain.
    /// A consumed nonce without a findable transaction is never resubmitted.
    async fn reconcile(
        &self,
        sender: &AccountId,
        public_key: &PublicKey,
        transaction: &Transaction,
        unconfirmed: &[CryptoHash],
    ) -> Result<Reconciled, WalletError> {
        let current = self.resolver.resolve_nonce(sender, public_key).await?;
        if current < transaction.nonce {
            return Ok(Reconciled::NotConsumed);
        }

        match self.find_landed(sender, unconfirmed).await? {
            Some(hash) => {
                info!(tx_hash = %hash, "ambiguous submission found on chain");
                Ok(Reconciled::Landed(hash))
            }
            None => Err(WalletError::NodeUnavailable(format!(
                "nonce {} was consumed but none of {} unconfirmed broadcasts is known to the node",
                transaction.nonce,
                unconfirmed.len()
            ))),
        }
    }

    /// Look up earlier broadcasts, newest first. A landed one that failed execution
    /// ends the send with that failure.
    async fn find_landed(
        &self,
        sender: &AccountId,
        unconfirmed: &[CryptoHash],
    ) -> Result<Option<CryptoHash>, WalletError> {
        for hash in unconfirmed.iter().rev() {
            let Some(outcome) = self.submitter.transaction_status(hash, sender).await? else {
                continue;
            };
            if let FinalExecutionStatus::Failure(failure) = outcome.status {
                return Err(WalletError::SubmissionRejected(RejectionReason::ExecutionFailed(
                    failure.to_string(),
                )));
            }
            return Ok(Some(*hash));
        }
        Ok(None)
    }
}
