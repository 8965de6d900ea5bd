use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use custody_primitives::AccountId;
use custody_wallet::session::oauth_redirect_uri;
use custody_wallet::{LoginMethod, SessionProvider, UserMetadata, WalletConfig};

use super::session_provider;

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct LoginArgs {
    /// Email the magic link was sent to
    #[arg(long)]
    pub email: Option<String>,

    /// Phone number the one-time code was sent to (+12345678901)
    #[arg(long)]
    pub phone: Option<String>,

    /// OAuth provider used for the redirect login
    #[arg(long)]
    pub oauth: Option<String>,
}

impl LoginArgs {
    fn method(&self) -> Option<LoginMethod> {
        if let Some(email) = &self.email {
            return Some(LoginMethod::MagicLink { email: email.clone() });
        }
        if let Some(phone_number) = &self.phone {
            return Some(LoginMethod::Sms {
                phone_number: phone_number.clone(),
            });
        }
        self.oauth
            .as_ref()
            .map(|provider| LoginMethod::OAuth { provider: provider.clone() })
    }
}

/// Record the session produced by the identity provider's login flow.
pub async fn login(config: &WalletConfig, account: &str, args: &LoginArgs, origin: &str) -> Result<()> {
    let method = args.method().context("Pick one of --email, --phone or --oauth")?;
    method.validate()?;

    let public_address: AccountId = account.parse().context("Invalid account id")?;
    let (email, phone_number) = match &method {
        LoginMethod::MagicLink { email } => (Some(email.clone()), None),
        LoginMethod::Sms { phone_number } => (None, Some(phone_number.clone())),
        LoginMethod::OAuth { provider } => {
            println!(
                "OAuth via {} redirects to {}",
                provider,
                oauth_redirect_uri(origin).cyan()
            );
            (None, None)
        }
    };

    let metadata = UserMetadata {
        public_address,
        email,
        phone_number,
    };
    let provider = session_provider(config);
    provider.store(&metadata)?;

    println!("{}", "✓ Logged in".green());
    println!("  Account: {}", metadata.public_address);
    println!("  Session: {:?}", provider.path());
    Ok(())
}

pub async fn whoami(config: &WalletConfig) -> Result<()> {
    let provider = session_provider(config);
    if !provider.is_logged_in().await? {
        println!("{}", "Not logged in. Use 'custody login' first".yellow());
        return Ok(());
    }

    let metadata = provider.get_metadata().await?;
    println!(
        "{} {}",
        "Current user:".bright_cyan(),
        metadata.contact_point().unwrap_or("<unknown>")
    );
    println!("  NEAR account id: {}", metadata.public_address);
    Ok(())
}

pub async fn logout(config: &WalletConfig) -> Result<()> {
    session_provider(config).logout().await?;
    println!("{}", "✓ Logged out".green());
    Ok(())
}
