//! Vault unseal API client.
//!
//! Reference: https://developer.hashicorp.com/vault/api-docs/system/unseal

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use unsealer_common::{UnsealProgress, UnsealerError};

use crate::credential::Credential;

/// Submits one key share to a member's unseal endpoint
#[async_trait]
pub trait UnsealApi: Send + Sync {
    async fn unseal(
        &self,
        endpoint: &str,
        credential: &Credential,
    ) -> Result<UnsealProgress, UnsealerError>;
}

#[derive(Serialize)]
struct UnsealRequest<'a> {
    key: &'a str,
}

/// Seal status returned by `PUT /v1/sys/unseal`
#[derive(Debug, Deserialize)]
pub struct SealStatus {
    pub sealed: bool,
    /// Threshold
    pub t: u32,
    /// Total shares
    pub n: u32,
    /// Shares accepted towards the threshold
    pub progress: u32,
}

impl SealStatus {
    /// Vault resets `progress` to 0 once it unseals, so an unsealed member
    /// reports the full threshold.
    pub fn to_progress(&self) -> UnsealProgress {
        let submitted = if self.sealed { self.progress } else { self.t };
        UnsealProgress::new(submitted, self.t)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    errors: Vec<String>,
}

/// HTTP client for the Vault system backend
pub struct VaultClient {
    http: reqwest::Client,
}

impl VaultClient {
    pub fn new(timeout: Duration) -> Result<Self, UnsealerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UnsealerError::Config(format!("failed to build Vault client: {}", e)))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl UnsealApi for VaultClient {
    async fn unseal(
        &self,
        endpoint: &str,
        credential: &Credential,
    ) -> Result<UnsealProgress, UnsealerError> {
        let url = format!("{}/v1/sys/unseal", endpoint.trim_end_matches('/'));

        let response = self
            .http
            .put(&url)
            .json(&UnsealRequest {
                key: credential.expose(),
            })
            .send()
            .await
            .map_err(|e| UnsealerError::Transport(format!("PUT {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .filter(|b| !b.errors.is_empty())
                .map(|b| b.errors.join("; "))
                .unwrap_or_else(|| body.trim().to_string());

            return Err(UnsealerError::Vault {
                status: status.as_u16(),
                message,
            });
        }

        let seal: SealStatus = response
            .json()
            .await
            .map_err(|e| UnsealerError::Transport(format!("invalid unseal response: {}", e)))?;

        tracing::debug!(
            sealed = seal.sealed,
            progress = seal.progress,
            threshold = seal.t,
            shares = seal.n,
            "Unseal response"
        );

        Ok(seal.to_progress())
    }
}
