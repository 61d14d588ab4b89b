use crate::config::AgentConfig;
use crate::error::ConfigError;
use crate::registry::types::ServiceInstance;
use crate::resolver::client::{RegistryClient, RenewOutcome};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// `(service, instance id)` pair of one provider process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceIdentity {
    pub service_name: String,
    pub instance_id: String,
}

impl InstanceIdentity {
    pub fn generate(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
            instance_id: format!("{}:{}", service_name, Uuid::new_v4()),
        }
    }

    pub fn into_instance(self, host: impl Into<String>, port: u16) -> ServiceInstance {
        ServiceInstance::new(self.service_name, self.instance_id, host, port)
    }
}

/// Keeps one instance registered for as long as the agent runs.
pub struct RegistrationAgent {
    client: RegistryClient,
    instance: ServiceInstance,
    config: AgentConfig,
    registered: AtomicBool,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RegistrationAgent {
    pub fn new(config: AgentConfig, instance: ServiceInstance) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;

        Ok(Arc::new(Self {
            client: RegistryClient::new(&config.registry_url, config.request_timeout),
            instance,
            config,
            registered: AtomicBool::new(false),
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
        }))
    }

    pub fn instance(&self) -> &ServiceInstance {
        &self.instance
    }

    /// True once the registry accepted the registration and until it reports the
    /// instance unknown.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Spawns the heartbeat loop. The first registration attempt happens immediately.
    /// Calling it after `stop` does nothing.
    pub async fn start(self: &Arc<Self>) {
        if self.cancel.is_cancelled() {
            tracing::warn!(
                instance = %self.instance.instance_id,
                "Registration agent already stopped, not starting heartbeat loop"
            );
            return;
        }

        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            tracing::warn!(instance = %self.instance.instance_id, "Registration agent already running");
            return;
        }

        tracing::info!(
            service = %self.instance.service_name,
            instance = %self.instance.instance_id,
            "Starting registration agent for {} (renew every {:?})",
            self.instance.address(),
            self.config.renew_interval
        );

        let agent = self.clone();
        *handle = Some(tokio::spawn(async move {
            agent.heartbeat_loop().await;
        }));
    }

    /// True between `start` and `stop`.
    pub async fn is_running(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Stops heartbeating and deregisters. A failed deregistration is only logged;
    /// the registry evicts the instance once its lease runs out.
    pub async fn stop(&self) {
        self.cancel.cancel();

        if let Some(handle) = self.handle.lock().await.take()
            && let Err(e) = handle.await
        {
            tracing::error!("Registration agent task failed: {}", e);
        }

        let ServiceInstance {
            service_name,
            instance_id,
            ..
        } = &self.instance;

        match self.client.deregister(service_name, instance_id).await {
            Ok(()) => tracing::info!(service = %service_name, instance = %instance_id, "Deregistered"),
            Err(e) => tracing::warn!(
                service = %service_name,
                instance = %instance_id,
                "Deregistration failed, leaving it to expiry: {}",
                e
            ),
        }
        self.registered.store(false, Ordering::Release);
    }

    async fn heartbeat_loop(&self) {
        let mut interval = tokio::time::interval(self.config.renew_interval);

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.heartbeat().await;
                }
            }
        }
    }

    /// One tick: register if needed, then renew.
    async fn heartbeat(&self) {
        if !self.is_registered() && !self.register().await {
            return;
        }

        match self
            .client
            .renew(&self.instance.service_name, &self.instance.instance_id)
            .await
        {
            Ok(RenewOutcome::Renewed) => {
                tracing::trace!(instance = %self.instance.instance_id, "Renewed");
            }
            Ok(RenewOutcome::NotRegistered) => {
                tracing::warn!(
                    instance = %self.instance.instance_id,
                    "Registry no longer knows this instance, registering again"
                );
                self.registered.store(false, Ordering::Release);
                if self.register().await {
                    // Promote to UP right away instead of waiting a full interval.
                    let _ = self
                        .client
                        .renew(&self.instance.service_name, &self.instance.instance_id)
                        .await;
                }
            }
            Err(e) => {
                tracing::warn!(instance = %self.instance.instance_id, "Renewal failed: {}", e);
            }
        }
    }

    async fn register(&self) -> bool {
        match self.client.register(&self.instance).await {
            Ok(()) => {
                tracing::info!(
                    service = %self.instance.service_name,
                    instance = %self.instance.instance_id,
                    "Registered with {}",
                    self.client.base_url()
                );
                self.registered.store(true, Ordering::Release);
                true
            }
            Err(e) => {
                tracing::warn!(
                    instance = %self.instance.instance_id,
                    "Registration failed, retrying in {:?}: {}",
                    self.config.renew_interval,
                    e
                );
                false
            }
        }
    }
}
