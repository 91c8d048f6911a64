//! Scaleway server inventory resolver.
//!
//! Matches a member's private IP against the servers of one region and
//! returns that server's public IP. Credentials are read from the
//! scaleway-cli `.scwrc` file:
//!
//! ```json
//! { "organization": "...", "token": "..." }
//! ```

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use unsealer_common::UnsealerError;
use unsealer_common::constants::headers::X_AUTH_TOKEN;

use super::AddressResolver;
use crate::config::ResolverConfig;

/// Page size requested from the server list endpoint
const SERVERS_PER_PAGE: usize = 50;

/// Response header carrying the inventory size
const X_TOTAL_COUNT: &str = "X-Total-Count";

/// Subset of `.scwrc` used here
#[derive(Deserialize)]
struct ScwConfig {
    organization: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct ServerList {
    #[serde(default)]
    servers: Vec<Server>,
}

#[derive(Debug, Deserialize)]
struct Server {
    #[serde(default)]
    private_ip: Option<String>,
    #[serde(default)]
    public_ip: Option<PublicIp>,
}

#[derive(Debug, Deserialize)]
struct PublicIp {
    address: String,
}

pub struct ScalewayResolver {
    http: reqwest::Client,
    api_url: String,
    organization: String,
    token: String,
}

impl ScalewayResolver {
    pub fn from_config(config: &ResolverConfig, timeout: Duration) -> Result<Self, UnsealerError> {
        let path = match config.scwrc_path {
            Some(ref path) => path.clone(),
            None => default_scwrc_path()?,
        };
        let credentials = load_scwrc(&path)?;

        let api_url = config
            .scaleway_api_url
            .clone()
            .unwrap_or_else(|| regional_api_url(&config.scaleway_region));

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UnsealerError::Config(format!("failed to build Scaleway client: {}", e)))?;

        tracing::debug!(api_url = %api_url, "Scaleway resolver configured");

        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            organization: credentials.organization,
            token: credentials.token,
        })
    }

    /// One page of running servers, plus the inventory size when the API
    /// reports it
    async fn list_servers_page(
        &self,
        page: usize,
    ) -> Result<(Vec<Server>, Option<usize>), UnsealerError> {
        let url = format!("{}/servers", self.api_url);
        let page = page.to_string();
        let per_page = SERVERS_PER_PAGE.to_string();

        let response = self
            .http
            .get(&url)
            .header(X_AUTH_TOKEN, &self.token)
            .query(&[
                ("organization", self.organization.as_str()),
                ("state", "running"),
                ("page", page.as_str()),
                ("per_page", per_page.as_str()),
            ])
            .send()
            .await
            .map_err(|e| UnsealerError::Resolver(format!("GET {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(UnsealerError::Resolver(format!(
                "GET {} returned {}",
                url, status
            )));
        }

        let total = response
            .headers()
            .get(X_TOTAL_COUNT)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.trim().parse::<usize>().ok());

        let list: ServerList = response
            .json()
            .await
            .map_err(|e| UnsealerError::Resolver(format!("invalid server list: {}", e)))?;

        Ok((list.servers, total))
    }
}

#[async_trait]
impl AddressResolver for ScalewayResolver {
    fn name(&self) -> &'static str {
        "scaleway"
    }

    /// Walks the inventory page by page, stopping at the first match
    async fn lookup(&self, internal_address: &str) -> Result<Option<String>, UnsealerError> {
        let mut seen = 0;

        for page in 1.. {
            let (servers, total) = self.list_servers_page(page).await?;
            let count = servers.len();
            seen += count;

            if let Some(server) = servers
                .into_iter()
                .find(|server| server.private_ip.as_deref() == Some(internal_address))
            {
                let public = server
                    .public_ip
                    .map(|ip| ip.address)
                    .filter(|address| !address.is_empty());
                return Ok(public);
            }

            let exhausted = match total {
                Some(total) => seen >= total,
                None => count < SERVERS_PER_PAGE,
            };
            if count == 0 || exhausted {
                break;
            }
        }

        Ok(None)
    }
}

fn regional_api_url(region: &str) -> String {
    format!("https://cp-{}.scaleway.com", region)
}

fn default_scwrc_path() -> Result<PathBuf, UnsealerError> {
    std::env::var_os("HOME")
        .map(|home| PathBuf::from(home).join(".scwrc"))
        .ok_or_else(|| UnsealerError::Config("HOME is not set, cannot locate .scwrc".to_string()))
}

fn load_scwrc(path: &Path) -> Result<ScwConfig, UnsealerError> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        UnsealerError::Config(format!(
            "unable to open {} config file: {}",
            path.display(),
            e
        ))
    })?;

    serde_json::from_str(&raw).map_err(|e| {
        UnsealerError::Config(format!("invalid {} config file: {}", path.display(), e))
    })
}
