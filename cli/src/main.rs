use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

mod commands;
mod config;

use commands::{account, network, session};

#[derive(Parser)]
#[command(
    name = "custody",
    version,
    about = "Custody - send NEAR from an identity-provider custodied account",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file path
    #[arg(short, long, global = true, env = "CUSTODY_CONFIG")]
    config: Option<PathBuf>,

    /// RPC endpoint
    #[arg(short, long, global = true, env = "CUSTODY_RPC")]
    rpc: Option<String>,

    /// Network id (mainnet, testnet, betanet, localnet)
    #[arg(short, long, global = true, env = "CUSTODY_NETWORK")]
    network: Option<String>,

    /// Publishable key for the custodial signer
    #[arg(long, global = true, env = "CUSTODY_PUBLISHABLE_KEY", hide_env_values = true)]
    publishable_key: Option<String>,

    /// Verbosity level
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Record a completed identity provider login
    Login {
        /// NEAR account controlled by the custodied key
        #[arg(short, long)]
        account: String,

        #[command(flatten)]
        method: session::LoginArgs,

        /// Origin the app is served from, used for the OAuth callback
        #[arg(long, default_value = "http://localhost:3000")]
        origin: String,
    },

    /// Show the logged-in user
    Whoami,

    /// Get account balance
    Balance {
        /// Account id (defaults to the logged-in account)
        account: Option<String>,
    },

    /// Send NEAR
    Send {
        /// Destination account id
        #[arg(short, long)]
        to: String,

        /// Amount in NEAR, e.g. 1.5
        #[arg(short, long)]
        amount: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Get network status
    Status,

    /// Print the explorer link for a transaction hash or account
    Explorer {
        /// Transaction hash or account id
        target: String,
    },

    /// End the current session
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = match cli.verbose {
        0 => "error",
        1 => "warn",
        2 => "info",
        3 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(false)
        .init();

    if let Commands::Init { force } = cli.command {
        let path = config::init(cli.config.as_deref(), force)?;
        println!("{}", "✓ Configuration initialized successfully".green());
        println!("  Config: {:?}", path);
        return Ok(());
    }

    let overrides = config::Overrides {
        rpc: cli.rpc.as_deref(),
        network: cli.network.as_deref(),
        publishable_key: cli.publishable_key.as_deref(),
    };
    let config = config::load(cli.config.as_deref(), &overrides)?;

    match cli.command {
        Commands::Init { .. } => {}
        Commands::Login {
            account,
            method,
            origin,
        } => session::login(&config, &account, &method, &origin).await?,
        Commands::Whoami => session::whoami(&config).await?,
        Commands::Balance { account: target } => account::balance(&config, target).await?,
        Commands::Send { to, amount, yes } => account::send(&config, &to, &amount, yes).await?,
        Commands::Status => network::status(&config).await?,
        Commands::Explorer { target } => network::explorer(&config, &target)?,
        Commands::Logout => session::logout(&config).await?,
    }

    Ok(())
}
