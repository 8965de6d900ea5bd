pub mod balance;
pub mod config;
pub mod connection;
pub mod errors;
pub mod resolver;
pub mod rpc_client;
pub mod sender;
pub mod session;
pub mod signer;
pub mod submitter;
pub mod transaction;
pub mod wallet;

pub use balance::{AccountBalance, BalanceTracker};
pub use config::WalletConfig;
pub use connection::Connection;
pub use errors::{ErrorKind, RejectionReason, WalletError};
pub use resolver::{NonceAndBlockResolver, ResolvedInputs};
pub use rpc_client::{RpcClient, RpcOptions, RpcTransport};
pub use sender::{
    CancelHandle, ConcurrencyPolicy, SendProgress, SendReport, SendStage, SendState,
    SendingIndicator, TransferRequest, TransferSender,
};
pub use session::{FileSessionProvider, LoginMethod, MemorySession, SessionProvider, UserMetadata};
pub use signer::{HttpRemoteSigner, RemoteSigner};
pub use submitter::{SubmissionOutcome, TransactionSubmitter};
pub use transaction::TransactionBuilder;
pub use wallet::{Profile, SendOutcome, Startup, Wallet};
