//! HTTP client for the registry API, used by consumers (lookup) and providers
//! (register / renew / deregister).

use crate::api::protocol::{
    InstanceResponse, RegisterRequest, instance_path, renew_path, service_path,
};
use crate::error::TransportError;
use crate::registry::types::ServiceInstance;

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

/// Where the resolver gets instance lists from. The resolver's only dependency on
/// the registry; tests plug in in-memory fakes.
#[async_trait]
pub trait RegistryLookup: Send + Sync {
    async fn fetch_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>, TransportError>;
}

/// Outcome of a heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenewOutcome {
    Renewed,
    /// The registry no longer knows the instance (e.g. it was evicted).
    NotRegistered,
}

#[derive(Debug, Clone)]
pub struct RegistryClient {
    base_url: String,
    timeout: Duration,
    http_client: reqwest::Client,
}

impl RegistryClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim().trim_end_matches('/').to_string(),
            timeout,
            http_client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn register(&self, instance: &ServiceInstance) -> Result<(), TransportError> {
        let url = format!(
            "{}{}",
            self.base_url,
            instance_path(&instance.service_name, &instance.instance_id)
        );
        let payload = RegisterRequest {
            host: Some(instance.host.clone()),
            port: Some(u32::from(instance.port)),
            metadata: instance.metadata.clone(),
        };

        let response = self
            .http_client
            .put(&url)
            .json(&payload)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, &e))?;

        expect_success(&url, response.status())
    }

    pub async fn renew(&self, service_name: &str, instance_id: &str) -> Result<RenewOutcome, TransportError> {
        let url = format!("{}{}", self.base_url, renew_path(service_name, instance_id));

        let response = self
            .http_client
            .put(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, &e))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(RenewOutcome::NotRegistered);
        }
        expect_success(&url, response.status())?;
        Ok(RenewOutcome::Renewed)
    }

    pub async fn deregister(&self, service_name: &str, instance_id: &str) -> Result<(), TransportError> {
        let url = format!("{}{}", self.base_url, instance_path(service_name, instance_id));

        let response = self
            .http_client
            .delete(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, &e))?;

        expect_success(&url, response.status())
    }
}

#[async_trait]
impl RegistryLookup for RegistryClient {
    async fn fetch_instances(&self, service_name: &str) -> Result<Vec<ServiceInstance>, TransportError> {
        let url = format!("{}{}", self.base_url, service_path(service_name));

        let response = self
            .http_client
            .get(&url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, &e))?;

        expect_success(&url, response.status())?;

        let instances: Vec<InstanceResponse> = response
            .json()
            .await
            .map_err(|e| TransportError::from_reqwest(&url, &e))?;

        Ok(instances
            .into_iter()
            .map(|instance| instance.into_instance(service_name))
            .collect())
    }
}

fn expect_success(url: &str, status: StatusCode) -> Result<(), TransportError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(TransportError::Status {
            target: url.to_string(),
            status: status.as_u16(),
        })
    }
}
