//! Unseal key share capture.
//!
//! The share is read once from a masked terminal prompt and held in a
//! [`SecretString`], which zeroes its buffer on drop. [`Credential`] has no
//! `Debug`, `Display`, or `Serialize` impl so it cannot end up in logs.

use secrecy::{ExposeSecret, SecretString};
use unsealer_common::UnsealerError;
use unsealer_common::constants::UNSEAL_KEY_PROMPT;

/// One unseal key share, held in memory for the duration of a run
#[derive(Clone)]
pub struct Credential(SecretString);

impl Credential {
    pub fn new(share: impl Into<String>) -> Result<Self, UnsealerError> {
        let share: String = share.into();
        if share.trim().is_empty() {
            return Err(UnsealerError::Credential("empty unseal key".to_string()));
        }
        Ok(Self(SecretString::from(share)))
    }

    /// Raw share, for building the unseal request body only
    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Where the unseal key share comes from
pub trait CredentialSource {
    fn read(&self) -> Result<Credential, UnsealerError>;
}

/// An already-read share
impl CredentialSource for Credential {
    fn read(&self) -> Result<Credential, UnsealerError> {
        Ok(self.clone())
    }
}

/// Masked interactive prompt on the controlling terminal
pub struct TerminalPrompt;

impl CredentialSource for TerminalPrompt {
    fn read(&self) -> Result<Credential, UnsealerError> {
        let share = rpassword::prompt_password(UNSEAL_KEY_PROMPT).map_err(|e| {
            UnsealerError::Credential(format!("failed to read unseal key from stdin: {}", e))
        })?;
        Credential::new(share)
    }
}
