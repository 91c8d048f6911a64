//! Shared constants for the Vault unsealer.

/// Consul service name Vault registers itself under
pub const VAULT_SERVICE_NAME: &str = "vault";

/// Consul tag carried by non-leader Vault members
pub const STANDBY_TAG: &str = "standby";

/// Name of the health check Vault registers for its seal state
pub const SEALED_CHECK_NAME: &str = "Vault Sealed Status";

/// Port of the Vault HTTP management API
pub const VAULT_API_PORT: u16 = 8200;

/// Default Consul HTTP API address
pub const DEFAULT_CONSUL_ADDR: &str = "http://127.0.0.1:8500";

/// Default Scaleway region for the inventory resolver
pub const DEFAULT_SCALEWAY_REGION: &str = "par1";

/// Default HTTP request timeout (seconds)
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Prompt shown when reading the unseal key share
pub const UNSEAL_KEY_PROMPT: &str = "Please enter the unseal key: ";

/// Environment variable names shared with the Consul CLI
pub mod env {
    /// Consul HTTP API address
    pub const CONSUL_HTTP_ADDR: &str = "CONSUL_HTTP_ADDR";

    /// Consul ACL token
    pub const CONSUL_HTTP_TOKEN: &str = "CONSUL_HTTP_TOKEN";
}

/// HTTP header names
pub mod headers {
    /// Consul ACL token header
    pub const X_CONSUL_TOKEN: &str = "X-Consul-Token";

    /// Scaleway API auth header
    pub const X_AUTH_TOKEN: &str = "X-Auth-Token";
}
