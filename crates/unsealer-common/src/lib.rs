//! # Unsealer Common
//!
//! Shared types, errors, and constants used across the Vault unsealer.
//!
//! ## Modules
//! - `types` - Core data structures (ClusterMember, UnsealOutcome, etc.)
//! - `error` - Error taxonomy (fatal vs per-member)
//! - `constants` - Well-known service names, ports, and defaults

pub mod constants;
pub mod error;
pub mod types;

pub use error::{MemberFailure, UnsealerError};
pub use types::*;
