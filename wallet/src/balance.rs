use custody_primitives::{format_near_amount, AccountId, DEFAULT_DISPLAY_DECIMALS};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::connection::Connection;
use crate::errors::WalletError;
use crate::rpc_client::AccountView;

/// yoctoNEAR locked per byte of account storage.
pub const STORAGE_AMOUNT_PER_BYTE: u128 = 10_000_000_000_000_000_000;

/// Balance breakdown in yoctoNEAR.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub total: u128,
    pub state_staked: u128,
    pub staked: u128,
    pub available: u128,
}

impl AccountBalance {
    pub fn from_view(view: &AccountView) -> Self {
        let total = view.amount.saturating_add(view.locked);
        let state_staked = u128::from(view.storage_usage).saturating_mul(STORAGE_AMOUNT_PER_BYTE);
        let staked = view.locked;
        let available = total.saturating_sub(staked.max(state_staked));
        Self {
            total,
            state_staked,
            staked,
            available,
        }
    }
}

/// Re-reads balances after login and after each successful send.
#[derive(Clone)]
pub struct BalanceTracker {
    connection: Connection,
    display_decimals: usize,
}

impl BalanceTracker {
    pub fn new(connection: Connection) -> Self {
        Self {
            connection,
            display_decimals: DEFAULT_DISPLAY_DECIMALS,
        }
    }

    pub fn with_display_decimals(mut self, decimals: usize) -> Self {
        self.display_decimals = decimals;
        self
    }

    /// Query the node. Read-only, so calling it redundantly or concurrently is harmless.
    pub async fn refresh(&self, account_id: &AccountId) -> Result<AccountBalance, WalletError> {
        let balance = self.connection.get_balance(account_id).await?;
        debug!(account = %account_id, total = %balance.total, "balance refreshed");
        Ok(balance)
    }

    /// `"90 NEAR"` style text for the profile view.
    pub fn display(&self, balance: &AccountBalance) -> String {
        format!("{} NEAR", format_near_amount(balance.total, self.display_decimals))
    }
}
