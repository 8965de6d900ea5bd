use anyhow::{Context, Result};
use colored::Colorize;
use custody_primitives::{format_near_amount, AccountId};
use custody_wallet::{BalanceTracker, CancelHandle, SendProgress, SendState, SessionProvider, WalletConfig};

use super::{connect, open_wallet, session_provider, spinner};

pub async fn balance(config: &WalletConfig, account: Option<String>) -> Result<()> {
    let account_id: AccountId = match account {
        Some(account) => account.parse().context("Invalid account id")?,
        None => {
            session_provider(config)
                .get_metadata()
                .await
                .context("No account given and not logged in")?
                .public_address
        }
    };

    let pb = spinner("Fetching balance...")?;
    let connection = connect(config).await?;
    let tracker = BalanceTracker::new(connection.clone()).with_display_decimals(config.display_decimals);
    let balance = tracker.refresh(&account_id).await?;
    pb.finish_and_clear();

    let decimals = config.display_decimals;
    println!("{}", "Account Balance:".bright_cyan());
    println!("  Account:   {}", account_id);
    println!("  Total:     {}", tracker.display(&balance).bright_green());
    println!("  Available: {} NEAR", format_near_amount(balance.available, decimals));
    println!("  Staked:    {} NEAR", format_near_amount(balance.staked, decimals));
    println!("  Storage:   {} NEAR", format_near_amount(balance.state_staked, decimals));

    if connection.network_id() == "testnet" {
        println!();
        println!("Get testnet tokens: {}", connection.network().faucet_url());
    }

    Ok(())
}

fn describe(state: &SendState) -> &'static str {
    match state {
        SendState::Idle => "Preparing...",
        SendState::BuildingInputs => "Fetching nonce and block hash...",
        SendState::AwaitingSignature => "Waiting for signature...",
        SendState::Submitting => "Sending transaction...",
        SendState::Succeeded(_) => "Done",
        SendState::Failed(_) => "Failed",
    }
}

pub async fn send(config: &WalletConfig, to: &str, amount: &str, yes: bool) -> Result<()> {
    let wallet = open_wallet(config).await?;
    let metadata = session_provider(config)
        .get_metadata()
        .await
        .context("Log in before sending")?;

    println!("{}", "Transaction Details:".bright_cyan());
    println!("  From:    {}", metadata.public_address);
    println!("  To:      {}", to);
    println!("  Amount:  {} NEAR", amount.bright_yellow());
    println!("  Network: {}", config.network_id);

    if !yes {
        println!();
        let confirm = dialoguer::Confirm::new()
            .with_prompt("Send transaction?")
            .default(false)
            .interact()?;

        if !confirm {
            println!("{}", "Transaction cancelled".yellow());
            return Ok(());
        }
    }

    let cancel = CancelHandle::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let progress = SendProgress::new();
    let pb = spinner(describe(&progress.current()))?;
    let watcher = {
        let pb = pb.clone();
        let mut rx = progress.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                let message = describe(&rx.borrow_and_update());
                pb.set_message(message);
            }
        })
    };

    let outcome = wallet.send_with_progress(to, amount, &cancel, &progress).await;
    watcher.abort();
    pb.finish_and_clear();

    let Some(outcome) = outcome? else {
        println!("{}", "Nothing to send: destination and amount are required".yellow());
        return Ok(());
    };

    let report = outcome.report;
    match (&report.state, &report.error) {
        (SendState::Succeeded(hash), _) => {
            println!("{}", "✓ Transaction sent successfully!".green());
            println!("  Hash:  {}", hash);
            println!("  Nonce: {}", report.nonce.unwrap_or_default());
            if let Some(url) = outcome.explorer_url {
                println!("  View in explorer: {}", url.cyan());
            }
            if let Some(balance) = report.balance {
                println!(
                    "  New balance: {}",
                    wallet.balance_tracker().display(&balance).bright_green()
                );
            }
            Ok(())
        }
        (_, Some(err)) => {
            println!("{} {}", "✗".red(), err.user_message().red());
            Err(anyhow::anyhow!("{}", err))
        }
        (state, None) => Err(anyhow::anyhow!("send ended in unexpected state {:?}", state)),
    }
}
