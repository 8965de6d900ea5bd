use anyhow::Result;
use colored::Colorize;
use custody_primitives::{AccountId, CryptoHash};
use custody_wallet::WalletConfig;

use super::{connect, spinner};

pub async fn status(config: &WalletConfig) -> Result<()> {
    let pb = spinner("Contacting node...")?;
    let connection = connect(config).await?;
    let status = connection.rpc().status().await?;
    pb.finish_and_clear();

    let network = connection.network();
    println!("{}", "Network Status:".bright_cyan());
    println!("  Network:      {}", network.network_id);
    println!("  Chain ID:     {}", status.chain_id);
    println!("  Block height: {}", status.sync_info.latest_block_height);
    println!("  Block hash:   {}", status.sync_info.latest_block_hash);
    println!(
        "  Syncing:      {}",
        if status.sync_info.syncing { "yes".yellow() } else { "no".green() }
    );
    println!();
    println!("  Node:     {}", network.node_url);
    println!("  Wallet:   {}", network.wallet_url);
    println!("  Helper:   {}", network.helper_url);
    println!("  Explorer: {}", network.explorer_url);

    Ok(())
}

/// Print the explorer link for a transaction hash or an account id.
pub fn explorer(config: &WalletConfig, target: &str) -> Result<()> {
    let network = config.network()?;

    let url = if let Ok(hash) = target.parse::<CryptoHash>() {
        network.explorer_transaction_url(&hash)
    } else if let Ok(account_id) = target.parse::<AccountId>() {
        network.explorer_account_url(&account_id)
    } else {
        anyhow::bail!("{:?} is neither a transaction hash nor an account id", target);
    };

    println!("{}", url.cyan());
    Ok(())
}
