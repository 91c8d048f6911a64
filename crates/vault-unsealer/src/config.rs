//! Configuration management for the unsealer.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use unsealer_common::constants::{
    DEFAULT_CONSUL_ADDR, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_SCALEWAY_REGION, SEALED_CHECK_NAME,
    STANDBY_TAG, VAULT_API_PORT, VAULT_SERVICE_NAME,
};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Consul registry settings
    #[serde(default)]
    pub consul: ConsulConfig,

    /// How Vault members are found and contacted
    #[serde(default)]
    pub vault: VaultConfig,

    /// Address resolver settings
    #[serde(default)]
    pub resolver: ResolverConfig,

    /// Outbound HTTP settings
    #[serde(default)]
    pub http: HttpConfig,
}

/// Consul-specific configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ConsulConfig {
    /// Consul HTTP API address
    #[serde(default = "default_consul_addr")]
    pub address: String,

    /// ACL token
    #[serde(default)]
    pub token: Option<String>,

    /// Datacenter to query (agent's own when unset)
    #[serde(default)]
    pub datacenter: Option<String>,
}

impl Default for ConsulConfig {
    fn default() -> Self {
        Self {
            address: default_consul_addr(),
            token: None,
            datacenter: None,
        }
    }
}

/// Vault discovery configuration
#[derive(Debug, Clone, Deserialize)]
pub struct VaultConfig {
    /// Consul service name Vault registers under
    #[serde(default = "default_service_name")]
    pub service_name: String,

    /// Tag selecting the members to inspect
    #[serde(default = "default_standby_tag")]
    pub tag: String,

    /// Health check carrying the seal state
    #[serde(default = "default_sealed_check")]
    pub sealed_check_name: String,

    /// Vault API port
    #[serde(default = "default_vault_port")]
    pub port: u16,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            tag: default_standby_tag(),
            sealed_check_name: default_sealed_check(),
            port: default_vault_port(),
        }
    }
}

/// Resolver backend configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Scaleway region for the inventory lookup
    #[serde(default = "default_region")]
    pub scaleway_region: String,

    /// Path to the scaleway-cli credentials file (defaults to ~/.scwrc)
    #[serde(default)]
    pub scwrc_path: Option<PathBuf>,

    /// Scaleway API base URL override (defaults to the regional endpoint)
    #[serde(default)]
    pub scaleway_api_url: Option<String>,

    /// Internal -> external address pairs for the static resolver
    #[serde(default)]
    pub static_hosts: Vec<StaticHost>,
}

/// One entry of the static host inventory
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StaticHost {
    pub internal: String,
    pub external: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            scaleway_region: default_region(),
            scwrc_path: None,
            scaleway_api_url: None,
            static_hosts: Vec::new(),
        }
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// Default value functions
fn default_consul_addr() -> String { DEFAULT_CONSUL_ADDR.to_string() }
fn default_service_name() -> String { VAULT_SERVICE_NAME.to_string() }
fn default_standby_tag() -> String { STANDBY_TAG.to_string() }
fn default_sealed_check() -> String { SEALED_CHECK_NAME.to_string() }
fn default_vault_port() -> u16 { VAULT_API_PORT }
fn default_region() -> String { DEFAULT_SCALEWAY_REGION.to_string() }
fn default_timeout() -> u64 { DEFAULT_HTTP_TIMEOUT_SECS }

/// CLI values that take precedence over the config file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub consul_addr: Option<String>,
    pub consul_token: Option<String>,
    pub region: Option<String>,
}

impl AppConfig {
    /// Load configuration from file, with CLI overrides
    pub fn load(config_path: &str, overrides: &Overrides) -> Result<Self> {
        let mut config = if Path::new(config_path).exists() {
            let settings = config::Config::builder()
                .add_source(config::File::with_name(config_path))
                .build()
                .context("Failed to load config file")?;

            settings
                .try_deserialize()
                .context("Failed to parse config")?
        } else {
            tracing::warn!(path = config_path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply(overrides);
        Ok(config)
    }

    fn apply(&mut self, overrides: &Overrides) {
        if let Some(ref addr) = overrides.consul_addr {
            self.consul.address = addr.clone();
        }
        if let Some(ref token) = overrides.consul_token {
            self.consul.token = Some(token.clone());
        }
        if let Some(ref region) = overrides.region {
            self.resolver.scaleway_region = region.clone();
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            consul: ConsulConfig::default(),
            vault: VaultConfig::default(),
            resolver: ResolverConfig::default(),
            http: HttpConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_vault_conventions() {
        let config = AppConfig::default();
        assert_eq!(config.consul.address, "http://127.0.0.1:8500");
        assert_eq!(config.vault.service_name, "vault");
        assert_eq!(config.vault.tag, "standby");
        assert_eq!(config.vault.sealed_check_name, "Vault Sealed Status");
        assert_eq!(config.vault.port, 8200);
        assert_eq!(config.resolver.scaleway_region, "par1");
    }

    #[test]
    fn test_missing_file_uses_defaults_with_overrides() {
        let overrides = Overrides {
            consul_addr: Some("http://consul.internal:8500".into()),
            consul_token: Some("acl-token".into()),
            region: Some("ams1".into()),
        };
        let config = AppConfig::load("does/not/exist.toml", &overrides).unwrap();

        assert_eq!(config.consul.address, "http://consul.internal:8500");
        assert_eq!(config.consul.token.as_deref(), Some("acl-token"));
        assert_eq!(config.resolver.scaleway_region, "ams1");
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [vault]
                port = 8300

                [[resolver.static_hosts]]
                internal = "10.0.0.5"
                external = "203.0.113.5"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();
        let config: AppConfig = settings.try_deserialize().unwrap();

        assert_eq!(config.vault.port, 8300);
        assert_eq!(config.vault.tag, "standby");
        assert_eq!(
            config.resolver.static_hosts,
            vec![StaticHost {
                internal: "10.0.0.5".into(),
                external: "203.0.113.5".into(),
            }]
        );
        assert_eq!(config.http.timeout_secs, 30);
    }
}
