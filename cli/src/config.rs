use anyhow::{Context, Result};
use custody_wallet::WalletConfig;
use std::path::{Path, PathBuf};

/// Values taken from flags or `CUSTODY_*` environment variables.
#[derive(Debug, Default)]
pub struct Overrides<'a> {
    pub rpc: Option<&'a str>,
    pub network: Option<&'a str>,
    pub publishable_key: Option<&'a str>,
}

fn resolve_path(config_path: Option<&Path>) -> PathBuf {
    config_path
        .map(PathBuf::from)
        .unwrap_or_else(WalletConfig::default_config_path)
}

pub fn load(config_path: Option<&Path>, overrides: &Overrides) -> Result<WalletConfig> {
    let config_path = resolve_path(config_path);

    let mut config = if config_path.exists() {
        WalletConfig::load(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        WalletConfig::default()
    };

    if let Some(network) = overrides.network {
        config.network_id = network.to_string();
    }
    if let Some(rpc) = overrides.rpc {
        config.node_url = Some(rpc.to_string());
    }
    if let Some(key) = overrides.publishable_key {
        config.publishable_key = key.to_string();
    }

    config
        .network()
        .with_context(|| format!("Unsupported network {:?}", config.network_id))?;

    Ok(config)
}

pub fn init(config_path: Option<&Path>, force: bool) -> Result<PathBuf> {
    let config_path = resolve_path(config_path);

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {:?}. Use --force to overwrite",
            config_path
        );
    }

    let config = WalletConfig::default();
    config
        .save(&config_path)
        .with_context(|| format!("Failed to write config to {:?}", config_path))?;

    Ok(config_path)
}
