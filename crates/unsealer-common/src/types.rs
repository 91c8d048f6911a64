//! Core types shared across the Vault unsealer.

use serde::{Deserialize, Serialize};

use crate::error::MemberFailure;

/// Consul health check status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Passing,
    Warning,
    Critical,
    Maintenance,
    /// Any status this build does not know about
    #[serde(other)]
    Unknown,
}

/// A Vault member reported by the service registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMember {
    /// Address the member registered with (cluster-internal)
    pub internal_address: String,

    /// Consul node the member runs on
    pub node: String,

    /// Is the member sealed?
    pub sealed: bool,
}

impl ClusterMember {
    pub fn new(internal_address: impl Into<String>, node: impl Into<String>, sealed: bool) -> Self {
        Self {
            internal_address: internal_address.into(),
            node: node.into(),
            sealed,
        }
    }
}

/// A member address after resolution
///
/// `external_address == None` means resolution failed and the member
/// must not be contacted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub internal_address: String,
    pub external_address: Option<String>,
}

impl ResolvedTarget {
    /// Management API endpoint for this target, if it resolved
    pub fn endpoint(&self, port: u16) -> Option<String> {
        self.external_address
            .as_deref()
            .map(|addr| format!("http://{}:{}", addr, port))
    }
}

/// Unseal progress reported by a member after a share submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsealProgress {
    /// Distinct shares accepted so far
    pub shares_submitted: u32,

    /// Shares needed to unseal (threshold)
    pub shares_required: u32,
}

impl UnsealProgress {
    pub fn new(shares_submitted: u32, shares_required: u32) -> Self {
        Self {
            shares_submitted,
            shares_required,
        }
    }

    /// Returns true once the threshold has been reached
    pub fn is_complete(&self) -> bool {
        self.shares_required > 0 && self.shares_submitted >= self.shares_required
    }
}

impl std::fmt::Display for UnsealProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.shares_submitted, self.shares_required)
    }
}

/// Result of processing one sealed member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsealOutcome {
    /// Internal address of the member, as discovered
    pub member_address: String,

    /// Progress on success, failure reason otherwise
    pub result: Result<UnsealProgress, MemberFailure>,
}

impl UnsealOutcome {
    pub fn progress(member_address: impl Into<String>, progress: UnsealProgress) -> Self {
        Self {
            member_address: member_address.into(),
            result: Ok(progress),
        }
    }

    pub fn failed(member_address: impl Into<String>, failure: MemberFailure) -> Self {
        Self {
            member_address: member_address.into(),
            result: Err(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_status_parsing() {
        let status: HealthStatus = serde_json::from_str("\"critical\"").unwrap();
        assert_eq!(status, HealthStatus::Critical);

        let status: HealthStatus = serde_json::from_str("\"something-new\"").unwrap();
        assert_eq!(status, HealthStatus::Unknown);
    }

    #[test]
    fn test_endpoint_uses_external_address() {
        let target = ResolvedTarget {
            internal_address: "10.1.0.4".into(),
            external_address: Some("51.15.0.4".into()),
        };
        assert_eq!(target.endpoint(8200).as_deref(), Some("http://51.15.0.4:8200"));

        let unresolved = ResolvedTarget {
            internal_address: "10.1.0.4".into(),
            external_address: None,
        };
        assert_eq!(unresolved.endpoint(8200), None);
    }

    #[test]
    fn test_progress_completion() {
        assert!(!UnsealProgress::new(2, 3).is_complete());
        assert!(UnsealProgress::new(3, 3).is_complete());
        assert!(!UnsealProgress::new(0, 0).is_complete());
        assert_eq!(UnsealProgress::new(2, 3).to_string(), "2/3");
    }
}
