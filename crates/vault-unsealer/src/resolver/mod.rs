//! Address resolvers.
//!
//! Vault members register their cluster-internal address in Consul. When
//! the operator runs the unsealer from outside that network, a resolver
//! maps each internal address to one reachable from here.
//!
//! Backends:
//! - `identity` - the internal address is used as-is (default)
//! - `scaleway` - looks the host up in the Scaleway server inventory
//! - `static` - looks the host up in the config file's host table

mod scaleway;
mod static_hosts;

pub use scaleway::ScalewayResolver;
pub use static_hosts::StaticResolver;

use async_trait::async_trait;
use clap::ValueEnum;
use unsealer_common::UnsealerError;

use crate::config::AppConfig;

/// Maps an internal member address to an externally reachable one
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Backend name, for logs
    fn name(&self) -> &'static str;

    /// Backend lookup; `Ok(None)` means the inventory has no such host
    async fn lookup(&self, internal_address: &str) -> Result<Option<String>, UnsealerError>;

    /// Lookup with every failure collapsed to "not found"
    async fn resolve(&self, internal_address: &str) -> Option<String> {
        match self.lookup(internal_address).await {
            Ok(Some(external)) => Some(external),
            Ok(None) => {
                tracing::warn!(
                    resolver = self.name(),
                    address = internal_address,
                    "No matching host in inventory"
                );
                None
            }
            Err(e) => {
                tracing::warn!(
                    resolver = self.name(),
                    address = internal_address,
                    error = %e,
                    "Address lookup failed"
                );
                None
            }
        }
    }
}

/// Resolver backends selectable from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ResolverKind {
    Identity,
    Scaleway,
    Static,
}

/// Returns its input unchanged
pub struct IdentityResolver;

#[async_trait]
impl AddressResolver for IdentityResolver {
    fn name(&self) -> &'static str {
        "identity"
    }

    async fn lookup(&self, internal_address: &str) -> Result<Option<String>, UnsealerError> {
        Ok(Some(internal_address.to_string()))
    }
}

/// Build the selected resolver; `None` selects the identity resolver
///
/// A backend that cannot start (missing credentials, bad config) is a
/// fatal configuration error.
pub fn build_resolver(
    kind: Option<ResolverKind>,
    config: &AppConfig,
) -> Result<Box<dyn AddressResolver>, UnsealerError> {
    let resolver: Box<dyn AddressResolver> = match kind.unwrap_or(ResolverKind::Identity) {
        ResolverKind::Identity => Box::new(IdentityResolver),
        ResolverKind::Scaleway => Box::new(ScalewayResolver::from_config(
            &config.resolver,
            config.http.timeout(),
        )?),
        ResolverKind::Static => Box::new(StaticResolver::new(&config.resolver.static_hosts)?),
    };

    tracing::info!(resolver = resolver.name(), "Address resolver ready");
    Ok(resolver)
}
