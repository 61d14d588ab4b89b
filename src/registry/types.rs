use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Lifecycle state of a registered instance.
///
/// Only `Up` instances are handed out to consumers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Up,
    #[default]
    Starting,
    Down,
    OutOfService,
}

/// One running process of a named service.
///
/// The registry store owns the authoritative copy; consumers only ever hold clones.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceInstance {
    pub service_name: String,
    pub instance_id: String,
    pub host: String,
    pub port: u16,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    /// Unix milliseconds of the last register or renew call.
    #[serde(default)]
    pub last_renewal_at: u64,
    #[serde(default)]
    pub status: InstanceStatus,
}

impl ServiceInstance {
    pub fn new(
        service_name: impl Into<String>,
        instance_id: impl Into<String>,
        host: impl Into<String>,
        port: u16,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            instance_id: instance_id.into(),
            host: host.into(),
            port,
            metadata: HashMap::new(),
            last_renewal_at: 0,
            status: InstanceStatus::Starting,
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// `host:port`, used for logging and as the sticky-policy fallback key.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn is_up(&self) -> bool {
        self.status == InstanceStatus::Up
    }
}

/// Notifications published by the registry's background sweeper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Evicted {
        service_name: String,
        instance_id: String,
        last_renewal_at: u64,
    },
}
