//! Consul HTTP API client (health endpoint only).
//!
//! Reference: https://developer.hashicorp.com/consul/api-docs/health#list-service-instances-for-service

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use unsealer_common::constants::headers::X_CONSUL_TOKEN;
use unsealer_common::{HealthStatus, UnsealerError};

use super::ServiceRegistry;
use crate::config::ConsulConfig;

/// One entry of `/v1/health/service/:service`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceEntry {
    pub node: NodeInfo,
    pub service: ServiceInfo,
    #[serde(default)]
    pub checks: Vec<HealthCheck>,
}

impl ServiceEntry {
    /// Service address, falling back to the node address when unset
    pub fn address(&self) -> String {
        if self.service.address.is_empty() {
            self.node.address.clone()
        } else {
            self.service.address.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NodeInfo {
    pub node: String,
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceInfo {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

/// Consul agent client
pub struct ConsulClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
    datacenter: Option<String>,
}

impl ConsulClient {
    pub fn new(config: &ConsulConfig, timeout: Duration) -> Result<Self, UnsealerError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UnsealerError::Config(format!("failed to build Consul client: {}", e)))?;

        Ok(Self {
            http,
            base_url: normalize_address(&config.address),
            token: config.token.clone(),
            datacenter: config.datacenter.clone(),
        })
    }
}

/// Accept `host:port` as well as full URLs, like the Consul CLI does
fn normalize_address(address: &str) -> String {
    let address = address.trim_end_matches('/');
    if address.contains("://") {
        address.to_string()
    } else {
        format!("http://{}", address)
    }
}

#[async_trait]
impl ServiceRegistry for ConsulClient {
    async fn health_service(
        &self,
        service: &str,
        tag: &str,
        passing_only: bool,
    ) -> Result<Vec<ServiceEntry>, UnsealerError> {
        let url = format!("{}/v1/health/service/{}", self.base_url, service);

        let mut query: Vec<(&str, &str)> = vec![("tag", tag)];
        if let Some(ref dc) = self.datacenter {
            query.push(("dc", dc.as_str()));
        }
        if passing_only {
            query.push(("passing", "true"));
        }

        let mut request = self.http.get(&url).query(&query);
        if let Some(ref token) = self.token {
            request = request.header(X_CONSUL_TOKEN, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UnsealerError::Registry(format!("GET {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UnsealerError::Registry(format!(
                "GET {} returned {}: {}",
                url,
                status,
                body.trim()
            )));
        }

        response
            .json::<Vec<ServiceEntry>>()
            .await
            .map_err(|e| UnsealerError::Registry(format!("invalid health response: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer, token: Option<&str>) -> ConsulClient {
        let config = ConsulConfig {
            address: server.base_url(),
            token: token.map(str::to_string),
            datacenter: None,
        };
        ConsulClient::new(&config, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("127.0.0.1:8500"), "http://127.0.0.1:8500");
        assert_eq!(normalize_address("https://consul:8501/"), "https://consul:8501");
    }

    #[test]
    fn test_empty_service_address_falls_back_to_node() {
        let entry: ServiceEntry = serde_json::from_value(json!({
            "Node": {"Node": "vault-2", "Address": "10.0.0.2"},
            "Service": {"ID": "vault:10.0.0.2:8200", "Service": "vault", "Address": "", "Port": 8200, "Tags": null},
            "Checks": []
        }))
        .unwrap();

        assert_eq!(entry.address(), "10.0.0.2");
    }

    #[tokio::test]
    async fn test_health_service_queries_standby_tag() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/v1/health/service/vault")
                .query_param("tag", "standby")
                .header("x-consul-token", "acl-secret");
            then.status(200).json_body(json!([
                {
                    "Node": {"Node": "vault-1", "Address": "10.0.0.1"},
                    "Service": {"ID": "vault:10.0.0.1:8200", "Service": "vault", "Address": "10.0.0.1", "Port": 8200, "Tags": ["standby"]},
                    "Checks": [
                        {"Name": "Serf Health Status", "Status": "passing"},
                        {"Name": "Vault Sealed Status", "Status": "critical"}
                    ]
                }
            ]));
        });

        let entries = client(&server, Some("acl-secret"))
            .health_service("vault", "standby", false)
            .await
            .unwrap();

        mock.assert();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].address(), "10.0.0.1");
        assert_eq!(entries[0].checks[1].status, HealthStatus::Critical);
    }

    #[tokio::test]
    async fn test_health_service_error_status_is_registry_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/v1/health/service/vault");
            then.status(403).body("ACL not found");
        });

        let err = client(&server, None)
            .health_service("vault", "standby", false)
            .await
            .unwrap_err();

        assert!(matches!(err, UnsealerError::Registry(ref msg) if msg.contains("ACL not found")));
    }
}
