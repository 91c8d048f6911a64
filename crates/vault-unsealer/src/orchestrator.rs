//! Discovery -> resolve -> unseal control loop.
//!
//! Members are processed one at a time, in discovery order. A failure on
//! one member is recorded in its outcome and the loop moves on; only a
//! registry or credential failure aborts the run.

use chrono::Utc;
use unsealer_common::{
    ClusterMember, MemberFailure, ResolvedTarget, UnsealOutcome, UnsealerError,
};

use crate::credential::{Credential, CredentialSource};
use crate::discovery::{MemberDiscovery, ServiceRegistry};
use crate::report::RunReport;
use crate::resolver::AddressResolver;
use crate::vault::UnsealApi;

pub struct UnsealOrchestrator<R, V> {
    discovery: MemberDiscovery<R>,
    resolver: Box<dyn AddressResolver>,
    vault: V,
    /// Vault API port on every member
    port: u16,
}

impl<R: ServiceRegistry, V: UnsealApi> UnsealOrchestrator<R, V> {
    pub fn new(
        discovery: MemberDiscovery<R>,
        resolver: Box<dyn AddressResolver>,
        vault: V,
        port: u16,
    ) -> Self {
        Self {
            discovery,
            resolver,
            vault,
            port,
        }
    }

    /// Discover sealed members and submit the credential to each
    ///
    /// The credential is read once, after discovery, and only when at
    /// least one member is sealed. A read failure aborts the run.
    pub async fn run(
        &self,
        credential: &dyn CredentialSource,
    ) -> Result<RunReport, UnsealerError> {
        let started_at = Utc::now();
        let members = self.discover().await?;
        if members.is_empty() {
            return Ok(RunReport::new(started_at, Vec::new()));
        }

        let credential = credential.read()?;
        let outcomes = self.unseal_all(&members, &credential).await;
        Ok(RunReport::new(started_at, outcomes))
    }

    async fn discover(&self) -> Result<Vec<ClusterMember>, UnsealerError> {
        let members = self.discovery.discover_sealed().await?;

        if members.is_empty() {
            tracing::info!("No sealed vault servers were discovered");
        } else {
            let addresses: Vec<&str> = members
                .iter()
                .map(|m| m.internal_address.as_str())
                .collect();
            tracing::info!(
                count = members.len(),
                servers = %addresses.join(", "),
                "Discovered sealed vault servers"
            );
        }

        Ok(members)
    }

    /// One outcome per member, in order; never stops early
    async fn unseal_all(
        &self,
        members: &[ClusterMember],
        credential: &Credential,
    ) -> Vec<UnsealOutcome> {
        let mut outcomes = Vec::with_capacity(members.len());
        for member in members {
            outcomes.push(self.unseal_member(member, credential).await);
        }
        outcomes
    }

    async fn unseal_member(&self, member: &ClusterMember, credential: &Credential) -> UnsealOutcome {
        let address = &member.internal_address;

        let target = ResolvedTarget {
            internal_address: address.clone(),
            external_address: self.resolver.resolve(address).await,
        };

        let Some(endpoint) = target.endpoint(self.port) else {
            tracing::warn!(address = %address, "Failed to resolve address, skipping");
            return UnsealOutcome::failed(
                address.clone(),
                MemberFailure::ResolutionFailed {
                    address: address.clone(),
                },
            );
        };

        tracing::info!(
            address = %address,
            node = %member.node,
            endpoint = %endpoint,
            "Attempting to unseal Vault server"
        );

        match self.vault.unseal(&endpoint, credential).await {
            Ok(progress) => {
                tracing::info!(
                    address = %address,
                    submitted = progress.shares_submitted,
                    required = progress.shares_required,
                    complete = progress.is_complete(),
                    "Unseal key accepted"
                );
                UnsealOutcome::progress(address.clone(), progress)
            }
            Err(e) => {
                tracing::warn!(address = %address, error = %e, "Unsealing failed");
                UnsealOutcome::failed(address.clone(), e.into())
            }
        }
    }
}
