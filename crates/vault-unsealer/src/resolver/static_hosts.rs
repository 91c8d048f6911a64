//! Host table resolver backed by the config file.

use async_trait::async_trait;
use std::collections::HashMap;
use unsealer_common::UnsealerError;

use super::AddressResolver;
use crate::config::StaticHost;

pub struct StaticResolver {
    hosts: HashMap<String, String>,
}

impl StaticResolver {
    /// Duplicate internal addresses are rejected, so every lookup has a
    /// single answer.
    pub fn new(hosts: &[StaticHost]) -> Result<Self, UnsealerError> {
        let mut table = HashMap::with_capacity(hosts.len());
        for host in hosts {
            if table
                .insert(host.internal.clone(), host.external.clone())
                .is_some()
            {
                return Err(UnsealerError::Config(format!(
                    "duplicate static host entry for {}",
                    host.internal
                )));
            }
        }

        if table.is_empty() {
            tracing::warn!("Static resolver selected with an empty host table");
        }

        Ok(Self { hosts: table })
    }
}

#[async_trait]
impl AddressResolver for StaticResolver {
    fn name(&self) -> &'static str {
        "static"
    }

    async fn lookup(&self, internal_address: &str) -> Result<Option<String>, UnsealerError> {
        Ok(self.hosts.get(internal_address).cloned())
    }
}
