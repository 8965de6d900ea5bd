pub mod account;
pub mod network;
pub mod session;

use anyhow::{Context, Result};
use custody_wallet::{Connection, FileSessionProvider, HttpRemoteSigner, Wallet, WalletConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;

pub(crate) fn spinner(message: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

pub(crate) async fn connect(config: &WalletConfig) -> Result<Connection> {
    let network = config.network()?;
    let node_url = network.node_url.clone();
    Connection::connect(network, config.rpc_options())
        .await
        .with_context(|| format!("Failed to reach node at {}", node_url))
}

pub(crate) fn session_provider(config: &WalletConfig) -> FileSessionProvider {
    FileSessionProvider::new(&config.session_path)
}

pub(crate) async fn open_wallet(config: &WalletConfig) -> Result<Wallet> {
    if config.publishable_key.is_empty() {
        anyhow::bail!("No publishable key configured. Set CUSTODY_PUBLISHABLE_KEY or edit the config file");
    }
    let signer = HttpRemoteSigner::new(
        &config.signer_url,
        &config.publishable_key,
        config.signer_timeout(),
    );
    Ok(Wallet::from_parts(
        config.clone(),
        connect(config).await?,
        Arc::new(session_provider(config)),
        Arc::new(signer),
    ))
}
