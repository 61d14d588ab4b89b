//! In-memory registry table.
//!
//! Layout: `service name -> instance id -> ServiceInstance`. Both levels are `DashMap`s,
//! so a lock is only ever held for the duration of a single map read or write and
//! never across an `.await`.

use super::types::{InstanceStatus, ServiceInstance};
use crate::clock::{Clock, SystemClock};
use crate::error::RegistryError;

use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub struct RegistryStore {
    services: DashMap<String, DashMap<String, ServiceInstance>>,
    clock: Arc<dyn Clock>,
}

impl RegistryStore {
    pub fn new() -> Arc<Self> {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self {
            services: DashMap::new(),
            clock,
        })
    }

    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Inserts or replaces the instance keyed by `(service_name, instance_id)`.
    ///
    /// The stored copy always starts as `Starting` with a fresh renewal timestamp,
    /// so repeating the call with the same data leaves the same state behind.
    pub fn register(&self, mut instance: ServiceInstance) -> Result<ServiceInstance, RegistryError> {
        validate(&instance)?;

        instance.last_renewal_at = self.clock.now_ms();
        instance.status = InstanceStatus::Starting;

        self.services
            .entry(instance.service_name.clone())
            .or_default()
            .insert(instance.instance_id.clone(), instance.clone());

        tracing::info!(
            service = %instance.service_name,
            instance = %instance.instance_id,
            "Registered instance at {}",
            instance.address()
        );

        Ok(instance)
    }

    /// Records a heartbeat. The first renewal of a `Starting` instance marks it `Up`.
    pub fn renew(&self, service_name: &str, instance_id: &str) -> Result<InstanceStatus, RegistryError> {
        let now = self.clock.now_ms();

        let bucket = self
            .services
            .get(service_name)
            .ok_or_else(|| not_found(service_name, instance_id))?;
        let mut instance = bucket
            .get_mut(instance_id)
            .ok_or_else(|| not_found(service_name, instance_id))?;

        instance.last_renewal_at = now;
        if instance.status == InstanceStatus::Starting {
            instance.status = InstanceStatus::Up;
            tracing::info!(service = %service_name, instance = %instance_id, "Instance is UP");
        } else {
            tracing::trace!(service = %service_name, instance = %instance_id, "Renewed lease");
        }

        Ok(instance.status)
    }

    /// Removes the instance. Returns `false` if it was not registered.
    pub fn deregister(&self, service_name: &str, instance_id: &str) -> bool {
        let removed = match self.services.get(service_name) {
            Some(bucket) => bucket.remove(instance_id).is_some(),
            None => false,
        };

        if removed {
            self.drop_if_empty(service_name);
            tracing::info!(service = %service_name, instance = %instance_id, "Deregistered instance");
        }

        removed
    }

    /// Overrides the status of a registered instance, e.g. to take it out of rotation.
    pub fn set_status(
        &self,
        service_name: &str,
        instance_id: &str,
        status: InstanceStatus,
    ) -> Result<(), RegistryError> {
        let bucket = self
            .services
            .get(service_name)
            .ok_or_else(|| not_found(service_name, instance_id))?;
        let mut instance = bucket
            .get_mut(instance_id)
            .ok_or_else(|| not_found(service_name, instance_id))?;

        if instance.status != status {
            tracing::info!(
                service = %service_name,
                instance = %instance_id,
                "Status {:?} -> {:?}",
                instance.status,
                status
            );
            instance.status = status;
        }

        Ok(())
    }

    /// `Up` instances of a service ordered by instance id. Unknown services yield `[]`.
    pub fn list_instances(&self, service_name: &str) -> Vec<ServiceInstance> {
        let Some(bucket) = self.services.get(service_name) else {
            return Vec::new();
        };

        let mut instances: Vec<ServiceInstance> = bucket
            .iter()
            .filter(|entry| entry.value().is_up())
            .map(|entry| entry.value().clone())
            .collect();
        instances.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        instances
    }

    /// Every service that currently has at least one `Up` instance.
    pub fn list_services(&self) -> BTreeMap<String, Vec<ServiceInstance>> {
        let names: Vec<String> = self.services.iter().map(|entry| entry.key().clone()).collect();

        names
            .into_iter()
            .filter_map(|name| {
                let instances = self.list_instances(&name);
                (!instances.is_empty()).then_some((name, instances))
            })
            .collect()
    }

    /// The stored record regardless of status.
    pub fn get(&self, service_name: &str, instance_id: &str) -> Option<ServiceInstance> {
        self.services
            .get(service_name)
            .and_then(|bucket| bucket.get(instance_id).map(|instance| instance.clone()))
    }

    /// Keys of instances whose last renewal is older than `threshold`.
    pub fn expired(&self, threshold: Duration) -> Vec<(String, String)> {
        let now = self.clock.now_ms();
        let mut expired = Vec::new();

        for bucket in self.services.iter() {
            for entry in bucket.value().iter() {
                if is_expired(entry.value(), now, threshold) {
                    expired.push((bucket.key().clone(), entry.key().clone()));
                }
            }
        }

        expired
    }

    /// Removes the instance only if it is still expired, so a renewal that raced
    /// with the sweeper keeps the instance alive.
    pub fn evict_if_expired(
        &self,
        service_name: &str,
        instance_id: &str,
        threshold: Duration,
    ) -> Option<ServiceInstance> {
        let now = self.clock.now_ms();

        let removed = self.services.get(service_name).and_then(|bucket| {
            bucket
                .remove_if(instance_id, |_, instance| is_expired(instance, now, threshold))
                .map(|(_, instance)| instance)
        });

        if removed.is_some() {
            self.drop_if_empty(service_name);
        }

        removed
    }

    pub fn instance_count(&self) -> usize {
        self.services.iter().map(|bucket| bucket.value().len()).sum()
    }

    pub fn service_count(&self) -> usize {
        self.services.len()
    }

    fn drop_if_empty(&self, service_name: &str) {
        self.services.remove_if(service_name, |_, bucket| bucket.is_empty());
    }
}

fn is_expired(instance: &ServiceInstance, now_ms: u64, threshold: Duration) -> bool {
    u128::from(now_ms.saturating_sub(instance.last_renewal_at)) > threshold.as_millis()
}

fn not_found(service_name: &str, instance_id: &str) -> RegistryError {
    RegistryError::NotFound {
        service_name: service_name.to_string(),
        instance_id: instance_id.to_string(),
    }
}

fn validate(instance: &ServiceInstance) -> Result<(), RegistryError> {
    if instance.service_name.trim().is_empty() {
        return Err(RegistryError::Validation("service name is required".to_string()));
    }
    if instance.instance_id.trim().is_empty() {
        return Err(RegistryError::Validation("instance id is required".to_string()));
    }
    if instance.host.trim().is_empty() {
        return Err(RegistryError::Validation("host is required".to_string()));
    }
    if instance.port == 0 {
        return Err(RegistryError::Validation("port must be between 1 and 65535".to_string()));
    }
    Ok(())
}
