//! Sealed member discovery.
//!
//! Asks the service registry for every Vault standby, then keeps the ones
//! whose seal-status health check is critical.

mod consul;

pub use consul::{ConsulClient, ServiceEntry};

use async_trait::async_trait;
use unsealer_common::{ClusterMember, HealthStatus, UnsealerError};

use crate::config::VaultConfig;

/// Health query against a service registry
#[async_trait]
pub trait ServiceRegistry: Send + Sync {
    /// List instances of `service` carrying `tag`, with their health checks
    async fn health_service(
        &self,
        service: &str,
        tag: &str,
        passing_only: bool,
    ) -> Result<Vec<ServiceEntry>, UnsealerError>;
}

/// Finds sealed Vault members through a [`ServiceRegistry`]
pub struct MemberDiscovery<R> {
    registry: R,
    service_name: String,
    tag: String,
    sealed_check_name: String,
}

impl<R: ServiceRegistry> MemberDiscovery<R> {
    pub fn new(registry: R, vault: &VaultConfig) -> Self {
        Self {
            registry,
            service_name: vault.service_name.clone(),
            tag: vault.tag.clone(),
            sealed_check_name: vault.sealed_check_name.clone(),
        }
    }

    /// Sealed members, in registry order
    ///
    /// A registry failure aborts the run. An empty list means discovery
    /// worked and nothing is sealed.
    pub async fn discover_sealed(&self) -> Result<Vec<ClusterMember>, UnsealerError> {
        let entries = self
            .registry
            .health_service(&self.service_name, &self.tag, false)
            .await?;

        tracing::debug!(
            service = %self.service_name,
            tag = %self.tag,
            members = entries.len(),
            "Registry returned members"
        );

        let sealed = entries
            .iter()
            .map(|entry| {
                let sealed = is_sealed(entry, &self.sealed_check_name);
                tracing::debug!(service_id = %entry.service.id, sealed, "Checked member");
                ClusterMember::new(entry.address(), entry.node.node.clone(), sealed)
            })
            .filter(|member| member.sealed)
            .collect();

        Ok(sealed)
    }
}

/// A member is sealed iff its seal-status check is critical
///
/// The first check with a matching name decides; a member without it is
/// never classified sealed.
pub fn is_sealed(entry: &ServiceEntry, check_name: &str) -> bool {
    entry
        .checks
        .iter()
        .find(|check| check.name == check_name)
        .is_some_and(|check| check.status == HealthStatus::Critical)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;
    use unsealer_common::constants::SEALED_CHECK_NAME;

    use super::consul::{HealthCheck, NodeInfo, ServiceInfo};

    pub(crate) fn entry(address: &str, checks: &[(&str, HealthStatus)]) -> ServiceEntry {
        ServiceEntry {
            node: NodeInfo {
                node: format!("node-{}", address),
                address: address.to_string(),
            },
            service: ServiceInfo {
                id: format!("vault:{}:8200", address),
                address: address.to_string(),
            },
            checks: checks
                .iter()
                .map(|(name, status)| HealthCheck {
                    name: name.to_string(),
                    status: *status,
                })
                .collect(),
        }
    }

    pub(crate) fn sealed_entry(address: &str) -> ServiceEntry {
        entry(
            address,
            &[
                ("Serf Health Status", HealthStatus::Passing),
                (SEALED_CHECK_NAME, HealthStatus::Critical),
            ],
        )
    }

    pub(crate) fn unsealed_entry(address: &str) -> ServiceEntry {
        entry(address, &[(SEALED_CHECK_NAME, HealthStatus::Passing)])
    }

    /// Registry fake returning a fixed answer and recording the query
    pub(crate) struct FakeRegistry {
        pub entries: Result<Vec<ServiceEntry>, String>,
        pub queries: Mutex<Vec<(String, String, bool)>>,
    }

    impl FakeRegistry {
        pub fn with(entries: Vec<ServiceEntry>) -> Self {
            Self {
                entries: Ok(entries),
                queries: Mutex::new(Vec::new()),
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                entries: Err(message.to_string()),
                queries: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ServiceRegistry for FakeRegistry {
        async fn health_service(
            &self,
            service: &str,
            tag: &str,
            passing_only: bool,
        ) -> Result<Vec<ServiceEntry>, UnsealerError> {
            self.queries
                .lock()
                .unwrap()
                .push((service.to_string(), tag.to_string(), passing_only));
            self.entries.clone().map_err(UnsealerError::Registry)
        }
    }

    #[test]
    fn test_sealed_requires_critical_named_check() {
        assert!(is_sealed(&sealed_entry("10.0.0.1"), SEALED_CHECK_NAME));
        assert!(!is_sealed(&unsealed_entry("10.0.0.1"), SEALED_CHECK_NAME));

        let warning = entry("10.0.0.1", &[(SEALED_CHECK_NAME, HealthStatus::Warning)]);
        assert!(!is_sealed(&warning, SEALED_CHECK_NAME));
    }

    #[test]
    fn test_missing_check_is_not_sealed() {
        let other_critical = entry("10.0.0.1", &[("Serf Health Status", HealthStatus::Critical)]);
        assert!(!is_sealed(&other_critical, SEALED_CHECK_NAME));

        let no_checks = entry("10.0.0.1", &[]);
        assert!(!is_sealed(&no_checks, SEALED_CHECK_NAME));
    }

    #[test]
    fn test_check_name_must_match_exactly() {
        let lowercase = entry("10.0.0.1", &[("vault sealed status", HealthStatus::Critical)]);
        assert!(!is_sealed(&lowercase, SEALED_CHECK_NAME));
    }

    #[tokio::test]
    async fn test_discovers_sealed_standbys_in_order() {
        let registry = FakeRegistry::with(vec![
            sealed_entry("10.0.0.1"),
            unsealed_entry("10.0.0.2"),
            sealed_entry("10.0.0.3"),
        ]);
        let discovery = MemberDiscovery::new(registry, &VaultConfig::default());

        let members = discovery.discover_sealed().await.unwrap();

        let addresses: Vec<_> = members.iter().map(|m| m.internal_address.as_str()).collect();
        assert_eq!(addresses, vec!["10.0.0.1", "10.0.0.3"]);
        assert!(members.iter().all(|m| m.sealed));

        let queries = discovery.registry.queries.lock().unwrap();
        assert_eq!(
            *queries,
            vec![("vault".to_string(), "standby".to_string(), false)]
        );
    }

    #[tokio::test]
    async fn test_nothing_sealed_is_empty_not_error() {
        let registry = FakeRegistry::with(vec![unsealed_entry("10.0.0.2")]);
        let discovery = MemberDiscovery::new(registry, &VaultConfig::default());

        assert!(discovery.discover_sealed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registry_failure_propagates() {
        let discovery =
            MemberDiscovery::new(FakeRegistry::failing("connection refused"), &VaultConfig::default());

        let err = discovery.discover_sealed().await.unwrap_err();
        assert!(matches!(err, UnsealerError::Registry(_)));
        assert!(err.is_fatal());
    }
}
