//! Registry HTTP Protocol
//!
//! Endpoint paths and the JSON bodies exchanged between providers, consumers and the
//! registry. Field names on the wire are camelCase.

use crate::registry::types::{InstanceStatus, ServiceInstance};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// --- API Endpoints ---

/// Lists every service with live instances.
pub const ENDPOINT_REGISTRY: &str = "/registry";
/// Lists the live instances of one service.
pub const ENDPOINT_SERVICE: &str = "/registry/:service_name";
/// Register (PUT) or deregister (DELETE) one instance.
pub const ENDPOINT_INSTANCE: &str = "/registry/:service_name/:instance_id";
/// Heartbeat.
pub const ENDPOINT_RENEW: &str = "/registry/:service_name/:instance_id/renew";
/// Status override.
pub const ENDPOINT_STATUS: &str = "/registry/:service_name/:instance_id/status";
/// Liveness of the registry itself.
pub const ENDPOINT_HEALTH: &str = "/health";

/// Path segments are percent-encoded, so names containing `/`, `?` or `#` stay
/// inside their segment.
pub fn service_path(service_name: &str) -> String {
    format!("{}/{}", ENDPOINT_REGISTRY, urlencoding::encode(service_name))
}

pub fn instance_path(service_name: &str, instance_id: &str) -> String {
    format!(
        "{}/{}",
        service_path(service_name),
        urlencoding::encode(instance_id)
    )
}

pub fn renew_path(service_name: &str, instance_id: &str) -> String {
    format!("{}/renew", instance_path(service_name, instance_id))
}

pub fn status_path(service_name: &str, instance_id: &str) -> String {
    format!("{}/status", instance_path(service_name, instance_id))
}

// --- Data Transfer Objects ---

/// Body of a registration. Every field is optional on the wire so that a missing
/// host or port is reported as a validation error instead of a decoding failure.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub host: Option<String>,
    pub port: Option<u32>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusRequest {
    pub status: InstanceStatus,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RenewResponse {
    pub status: InstanceStatus,
}

/// One element of a lookup response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InstanceResponse {
    pub instance_id: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub status: InstanceStatus,
    #[serde(default)]
    pub last_renewal_at: u64,
}

impl InstanceResponse {
    /// Rebuilds the consumer-side copy; the service name comes from the request path.
    pub fn into_instance(self, service_name: &str) -> ServiceInstance {
        ServiceInstance {
            service_name: service_name.to_string(),
            instance_id: self.instance_id,
            host: self.host,
            port: self.port,
            metadata: self.metadata,
            last_renewal_at: self.last_renewal_at,
            status: self.status,
        }
    }
}

impl From<ServiceInstance> for InstanceResponse {
    fn from(instance: ServiceInstance) -> Self {
        Self {
            instance_id: instance.instance_id,
            host: instance.host,
            port: instance.port,
            metadata: instance.metadata,
            status: instance.status,
            last_renewal_at: instance.last_renewal_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub services: usize,
    pub instances: usize,
}
