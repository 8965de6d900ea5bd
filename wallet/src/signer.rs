use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use custody_primitives::PublicKey;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::WalletError;

/// Error codes the custodial service uses when the user or its policy declines.
const REJECTION_CODES: &[&str] = &["USER_REJECTED", "USER_DENIED", "POLICY_REJECTED"];

/// Remote custodial signer. The private key stays on the other side.
#[async_trait]
pub trait RemoteSigner: Send + Sync {
    /// Public key of the custodied access key.
    async fn public_key(&self) -> Result<PublicKey, WalletError>;

    /// Sign Borsh-encoded transaction bytes; returns the Borsh-encoded signed transaction.
    async fn sign(&self, unsigned: &[u8], network_id: &str) -> Result<Vec<u8>, WalletError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SignRequest<'a> {
    raw_transaction: String,
    #[serde(rename = "networkID")]
    network_id: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignResponse {
    encoded_signed_transaction: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyResponse {
    public_key: String,
}

/// Signer reached over HTTPS with the app's publishable key.
pub struct HttpRemoteSigner {
    base_url: String,
    publishable_key: String,
    client: Client,
    timeout: Duration,
}

impl HttpRemoteSigner {
    pub fn new(base_url: &str, publishable_key: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            publishable_key: publishable_key.to_string(),
            client: Client::new(),
            timeout,
        }
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, WalletError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "signer request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.publishable_key)
            .timeout(self.timeout)
            .json(body)
            .send()
            .await
            .map_err(|e| WalletError::SignerUnavailable(e.to_string()))?;

        let status = response.status();
        let payload: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() || payload.get("error").is_some() {
            let err = classify_failure(Some(status), &payload);
            warn!(%url, %status, error = %err, "signer refused request");
            return Err(err);
        }

        Ok(payload)
    }
}

/// Map a failed signer exchange to the error the pipeline reports.
///
/// A rejection code or HTTP 403 means the request was declined and may be sent
/// again; anything else means the service could not answer.
pub fn classify_failure(status: Option<StatusCode>, payload: &Value) -> WalletError {
    let error = payload.get("error");
    let code = error
        .and_then(|e| e.get("code"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let message = error
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| match status {
            Some(status) => format!("signer returned {}", status),
            None => "signer returned no answer".to_string(),
        });

    if REJECTION_CODES.contains(&code) || status == Some(StatusCode::FORBIDDEN) {
        WalletError::SigningRejected(message)
    } else {
        WalletError::SignerUnavailable(message)
    }
}

#[async_trait]
impl RemoteSigner for HttpRemoteSigner {
    async fn public_key(&self) -> Result<PublicKey, WalletError> {
        let payload = self.post("/near/public-key", &Value::Object(Default::default())).await?;
        let response: PublicKeyResponse = serde_json::from_value(payload)
            .map_err(|e| WalletError::SignerUnavailable(format!("malformed public key response: {}", e)))?;
        Ok(response.public_key.parse()?)
    }

    async fn sign(&self, unsigned: &[u8], network_id: &str) -> Result<Vec<u8>, WalletError> {
        let request = SignRequest {
            raw_transaction: STANDARD.encode(unsigned),
            network_id,
        };
        let payload = self
            .post("/near/sign-transaction", &serde_json::to_value(&request)?)
            .await?;
        let response: SignResponse = serde_json::from_value(payload)
            .map_err(|e| WalletError::SignerUnavailable(format!("malformed sign response: {}", e)))?;

        let signed = STANDARD
            .decode(response.encoded_signed_transaction)
            .map_err(|e| WalletError::SignerMismatch(format!("signed transaction is not base64: {}", e)))?;
        info!(network = network_id, bytes = signed.len(), "transaction signed remotely");
        Ok(signed)
    }
}
