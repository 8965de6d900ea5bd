use async_trait::async_trait;
use custody_primitives::AccountId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info};

use crate::errors::WalletError;

/// Route of the login screen.
pub const LOGIN_ROUTE: &str = "/login";
/// Route of the profile screen.
pub const HOME_ROUTE: &str = "/";
/// Path the identity provider redirects back to after OAuth.
pub const OAUTH_CALLBACK_PATH: &str = "/callback";

/// OAuth redirect target for an app served from `origin`.
pub fn oauth_redirect_uri(origin: &str) -> String {
    format!("{}{}", origin.trim_end_matches('/'), OAUTH_CALLBACK_PATH)
}

/// Profile of the logged-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserMetadata {
    /// Account the custodied key controls.
    pub public_address: AccountId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl UserMetadata {
    /// Email if present, otherwise the phone number.
    pub fn contact_point(&self) -> Option<&str> {
        self.email.as_deref().or(self.phone_number.as_deref())
    }
}

/// How the user proves who they are.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginMethod {
    MagicLink { email: String },
    Sms { phone_number: String },
    OAuth { provider: String },
}

impl LoginMethod {
    /// Reject input the identity provider would bounce anyway.
    pub fn validate(&self) -> Result<(), WalletError> {
        match self {
            LoginMethod::MagicLink { email } => {
                let valid = email
                    .split_once('@')
                    .map(|(user, domain)| !user.is_empty() && domain.contains('.'))
                    .unwrap_or(false);
                if !valid {
                    return Err(WalletError::Session(format!("invalid email address {:?}", email)));
                }
            }
            LoginMethod::Sms { phone_number } => {
                let digits = phone_number.strip_prefix('+').unwrap_or_default();
                if digits.len() < 7 || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(WalletError::Session(format!(
                        "phone number must be in +12345678901 form, got {:?}",
                        phone_number
                    )));
                }
            }
            LoginMethod::OAuth { provider } => {
                if provider.is_empty() {
                    return Err(WalletError::Session("OAuth provider not set".to_string()));
                }
            }
        }
        Ok(())
    }
}

/// Identity provider session, as seen by the wallet. Login itself happens outside.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn is_logged_in(&self) -> Result<bool, WalletError>;

    /// Fails with [`WalletError::NotLoggedIn`] when there is no session.
    async fn get_metadata(&self) -> Result<UserMetadata, WalletError>;

    async fn logout(&self) -> Result<(), WalletError>;
}

/// Session persisted as JSON by the external login flow.
pub struct FileSessionProvider {
    path: PathBuf,
}

impl FileSessionProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `~/.custody/session.json`
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".custody")
            .join("session.json")
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a completed login.
    pub fn store(&self, metadata: &UserMetadata) -> Result<(), WalletError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(metadata)?)?;
        info!(account = %metadata.public_address, "session stored");
        Ok(())
    }

    fn read(&self) -> Result<Option<UserMetadata>, WalletError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map(Some)
                .map_err(|e| WalletError::Session(format!("corrupt session file {:?}: {}", self.path, e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SessionProvider for FileSessionProvider {
    async fn is_logged_in(&self) -> Result<bool, WalletError> {
        Ok(self.read()?.is_some())
    }

    async fn get_metadata(&self) -> Result<UserMetadata, WalletError> {
        self.read()?.ok_or(WalletError::NotLoggedIn)
    }

    async fn logout(&self) -> Result<(), WalletError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = ?self.path, "session removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process session.
#[derive(Default)]
pub struct MemorySession {
    metadata: Mutex<Option<UserMetadata>>,
}

impl MemorySession {
    pub fn logged_in(metadata: UserMetadata) -> Self {
        Self {
            metadata: Mutex::new(Some(metadata)),
        }
    }

    pub fn logged_out() -> Self {
        Self::default()
    }

    fn current(&self) -> Result<Option<UserMetadata>, WalletError> {
        self.metadata
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| WalletError::Session("session lock poisoned".to_string()))
    }
}

#[async_trait]
impl SessionProvider for MemorySession {
    async fn is_logged_in(&self) -> Result<bool, WalletError> {
        Ok(self.current()?.is_some())
    }

    async fn get_metadata(&self) -> Result<UserMetadata, WalletError> {
        self.current()?.ok_or(WalletError::NotLoggedIn)
    }

    async fn logout(&self) -> Result<(), WalletError> {
        let mut guard = self
            .metadata
            .lock()
            .map_err(|_| WalletError::Session("session lock poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}
