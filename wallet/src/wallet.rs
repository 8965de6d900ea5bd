use custody_primitives::parse_near_amount;
use std::sync::Arc;
use tracing::{info, warn};

use crate::balance::{AccountBalance, BalanceTracker};
use crate::config::WalletConfig;
use crate::connection::Connection;
use crate::errors::WalletError;
use crate::sender::{
    CancelHandle, SendProgress, SendReport, SendingIndicator, TransferRequest, TransferSender,
};
use crate::session::{SessionProvider, UserMetadata, HOME_ROUTE, LOGIN_ROUTE};
use crate::signer::RemoteSigner;

/// Profile screen contents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub metadata: UserMetadata,
    pub balance: AccountBalance,
    /// e.g. `"90 NEAR"`
    pub display_balance: String,
}

/// Where the app lands after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Startup {
    LoginRequired,
    Ready(Profile),
}

impl Startup {
    pub fn route(&self) -> &'static str {
        match self {
            Startup::LoginRequired => LOGIN_ROUTE,
            Startup::Ready(_) => HOME_ROUTE,
        }
    }
}

/// Finished send plus the explorer link when it succeeded.
#[derive(Debug)]
pub struct SendOutcome {
    pub report: SendReport,
    pub explorer_url: Option<String>,
}

/// Main wallet structure
pub struct Wallet {
    config: WalletConfig,
    connection: Connection,
    session: Arc<dyn SessionProvider>,
    sender: TransferSender,
    balance: BalanceTracker,
}

impl Wallet {
    /// Connect to the configured network. Fails if the node does not answer.
    pub async fn open(
        config: WalletConfig,
        session: Arc<dyn SessionProvider>,
        signer: Arc<dyn RemoteSigner>,
    ) -> Result<Self, WalletError> {
        let connection = Connection::connect(config.network()?, config.rpc_options()).await?;
        Ok(Self::from_parts(config, connection, session, signer))
    }

    /// Assemble around an existing connection.
    pub fn from_parts(
        config: WalletConfig,
        connection: Connection,
        session: Arc<dyn SessionProvider>,
        signer: Arc<dyn RemoteSigner>,
    ) -> Self {
        let balance =
            BalanceTracker::new(connection.clone()).with_display_decimals(config.display_decimals);
        let sender = TransferSender::new(connection.clone(), signer)
            .with_policy(config.concurrency)
            .with_max_retries(config.max_retries)
            .with_balance_tracker(balance.clone());

        Self {
            config,
            connection,
            session,
            sender,
            balance,
        }
    }

    /// Check the session and, when logged in, load the profile.
    pub async fn startup(&self) -> Result<Startup, WalletError> {
        if !self.session.is_logged_in().await? {
            info!("no active session");
            return Ok(Startup::LoginRequired);
        }
        Ok(Startup::Ready(self.profile().await?))
    }

    /// Re-read metadata and balance.
    pub async fn profile(&self) -> Result<Profile, WalletError> {
        let metadata = self.session.get_metadata().await?;
        let balance = self.balance.refresh(&metadata.public_address).await?;
        Ok(Profile {
            display_balance: self.balance.display(&balance),
            metadata,
            balance,
        })
    }

    /// Send `amount_text` NEAR to `receiver`.
    ///
    /// Empty receiver or amount does nothing and returns `Ok(None)`. Errors
    /// from the pipeline come back inside the report, not as `Err`.
    pub async fn send(
        &self,
        receiver: &str,
        amount_text: &str,
        cancel: &CancelHandle,
    ) -> Result<Option<SendOutcome>, WalletError> {
        self.send_with_progress(receiver, amount_text, cancel, &SendProgress::new())
            .await
    }

    pub async fn send_with_progress(
        &self,
        receiver: &str,
        amount_text: &str,
        cancel: &CancelHandle,
        progress: &SendProgress,
    ) -> Result<Option<SendOutcome>, WalletError> {
        let receiver = receiver.trim();
        let amount_text = amount_text.trim();
        if receiver.is_empty() || amount_text.is_empty() {
            return Ok(None);
        }

        let metadata = self.session.get_metadata().await?;

        let amount = match parse_near_amount(amount_text) {
            Ok(amount) => amount,
            Err(e) => {
                warn!(amount = amount_text, error = %e, "unparseable amount");
                return Ok(Some(SendOutcome {
                    report: SendReport::rejected(WalletError::InvalidAmount(e.to_string())),
                    explorer_url: None,
                }));
            }
        };

        let request = TransferRequest::new(receiver, amount);
        let report = self
            .sender
            .send(&metadata.public_address, &request, cancel, progress)
            .await;

        let explorer_url = match (&report.transaction_hash, report.is_success()) {
            (Some(hash), true) => Some(self.connection.network().explorer_transaction_url(hash)),
            _ => None,
        };

        Ok(Some(SendOutcome {
            report,
            explorer_url,
        }))
    }

    /// End the session; returns the route to show next.
    pub async fn logout(&self) -> Result<&'static str, WalletError> {
        self.session.logout().await?;
        info!("logged out");
        Ok(LOGIN_ROUTE)
    }

    pub fn sending_indicator(&self) -> &SendingIndicator {
        self.sender.indicator()
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    pub fn balance_tracker(&self) -> &BalanceTracker {
        &self.balance
    }
}
