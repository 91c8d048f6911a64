//! Error types for the Vault unsealer.

use thiserror::Error;

/// Errors raised while discovering, resolving, or unsealing members
#[derive(Debug, Error)]
pub enum UnsealerError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Service registry query failed
    #[error("Registry error: {0}")]
    Registry(String),

    /// Credential could not be read
    #[error("Credential error: {0}")]
    Credential(String),

    /// Address resolver backend failed
    #[error("Resolver error: {0}")]
    Resolver(String),

    /// Connection or protocol failure talking to a member
    #[error("Transport error: {0}")]
    Transport(String),

    /// Vault answered with an error response
    #[error("Vault error (HTTP {status}): {message}")]
    Vault { status: u16, message: String },
}

impl UnsealerError {
    /// Returns true if this error must abort the whole run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config(_) | Self::Registry(_) | Self::Credential(_)
        )
    }
}

/// Why a single sealed member could not be advanced
///
/// Captured into that member's outcome; never aborts the run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemberFailure {
    /// The resolver had no external address for this member
    #[error("failed to resolve {address} address")]
    ResolutionFailed { address: String },

    /// The unseal call failed (transport error or error response)
    #[error("unsealing failed: {detail}")]
    SubmissionFailed { detail: String },
}

impl From<UnsealerError> for MemberFailure {
    fn from(err: UnsealerError) -> Self {
        Self::SubmissionFailed {
            detail: err.to_string(),
        }
    }
}
