//! The client-side resolver: turns a service name into one concrete instance.
//!
//! ## Lifecycle
//! `start()` spawns the periodic refresh loop; `shutdown()` cancels it and waits for
//! every in-flight refresh to finish.
//!
//! ## Refresh rules
//! - Cache miss (or a known-empty list): fetch on the calling path, bounded by
//!   `refresh_timeout`.
//! - Expired entry: serve the cached snapshot immediately and revalidate in the
//!   background.
//! - Failed refresh: keep the previous snapshot. Only an empty cache turns into
//!   `NoInstancesAvailable`.
//! - Entries without instances that nobody resolved within `cache_ttl` are dropped by
//!   the refresh loop, so unknown names do not keep the registry busy.

use super::cache::{CacheSnapshot, ResolverCache, ServiceCache};
use super::client::{RegistryClient, RegistryLookup};
use super::executor::{HttpExecutor, RequestExecutor, Response};
use super::policy::{SelectionContext, SelectionPolicy};
use crate::config::ResolverConfig;
use crate::error::{ConfigError, ResolverError, TransportError};
use crate::registry::types::ServiceInstance;

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub struct Resolver {
    lookup: Arc<dyn RegistryLookup>,
    executor: Arc<dyn RequestExecutor>,
    policy: Arc<dyn SelectionPolicy>,
    cache: ResolverCache,
    config: ResolverConfig,
    cancel: CancellationToken,
    tasks: TaskTracker,
}

impl Resolver {
    /// Resolver talking to the registry and to instances over HTTP.
    pub fn from_config(config: ResolverConfig) -> Result<Arc<Self>, ConfigError> {
        let lookup = Arc::new(RegistryClient::new(&config.registry_url, config.refresh_timeout));
        let executor = Arc::new(HttpExecutor::new(config.call_timeout));
        Self::new(config, lookup, executor)
    }

    /// Resolver with explicit collaborators; the policy comes from `config.policy`.
    pub fn new(
        config: ResolverConfig,
        lookup: Arc<dyn RegistryLookup>,
        executor: Arc<dyn RequestExecutor>,
    ) -> Result<Arc<Self>, ConfigError> {
        let policy = config.policy.build();
        Self::with_policy(config, lookup, executor, policy)
    }

    pub fn with_policy(
        config: ResolverConfig,
        lookup: Arc<dyn RegistryLookup>,
        executor: Arc<dyn RequestExecutor>,
        policy: Arc<dyn SelectionPolicy>,
    ) -> Result<Arc<Self>, ConfigError> {
        config.validate()?;

        tracing::info!(
            "Resolver using {} policy against {} (refresh every {:?})",
            policy.name(),
            config.registry_url,
            config.refresh_interval
        );

        Ok(Arc::new(Self {
            lookup,
            executor,
            policy,
            cache: ResolverCache::new(),
            config,
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
        }))
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Picks one instance of `service_name` using the configured policy.
    pub async fn resolve(&self, service_name: &str) -> Result<ServiceInstance, ResolverError> {
        self.resolve_with_key(service_name, None).await
    }

    /// Like [`Resolver::resolve`], passing an affinity key to the policy.
    pub async fn resolve_with_key(
        &self,
        service_name: &str,
        key: Option<&str>,
    ) -> Result<ServiceInstance, ResolverError> {
        let (snapshot, index) = self.pick(service_name, key).await?;
        Ok(snapshot.instances[index].clone())
    }

    /// Instances currently cached for a service, without touching the network.
    pub fn cached_instances(&self, service_name: &str) -> Vec<ServiceInstance> {
        self.cache.instances(service_name)
    }

    /// Fetches a fresh instance list now. On failure the previous list is kept.
    pub async fn refresh(&self, service_name: &str) -> Result<usize, TransportError> {
        let entry = self.cache.entry(service_name);
        let seen = entry.generation();

        let _guard = entry.refresh_lock.lock().await;
        if entry.generation() != seen {
            // Someone else refreshed while we waited for the lock.
            return Ok(entry.snapshot().map(|s| s.instances.len()).unwrap_or(0));
        }

        refresh_entry(
            self.lookup.as_ref(),
            &entry,
            service_name,
            self.config.refresh_timeout,
        )
        .await
    }

    /// Names of the services the resolver currently tracks.
    pub fn cached_services(&self) -> Vec<String> {
        self.cache.service_names()
    }

    /// Refreshes every cached service concurrently. Services that have no instances
    /// and were not resolved within `cache_ttl` are forgotten instead of polled.
    pub async fn refresh_all(&self) {
        for service_name in self.cache.evict_idle(self.config.cache_ttl) {
            tracing::debug!(service = %service_name, "Dropping idle empty cache entry");
        }

        let mut refreshes = tokio::task::JoinSet::new();

        for service_name in self.cache.service_names() {
            let lookup = self.lookup.clone();
            let entry = self.cache.entry(&service_name);
            let timeout = self.config.refresh_timeout;

            refreshes.spawn(async move {
                let _guard = entry.refresh_lock.lock().await;
                let _ = refresh_entry(lookup.as_ref(), &entry, &service_name, timeout).await;
            });
        }

        while let Some(result) = refreshes.join_next().await {
            if let Err(e) = result {
                tracing::error!("Refresh task failed: {}", e);
            }
        }
    }

    /// Sends `GET path` to an instance of `service_name`.
    ///
    /// A connection failure moves on to the next cached instance, at most
    /// `max_attempts` instances in total. Any HTTP response, including errors, is
    /// returned as-is.
    pub async fn call(&self, service_name: &str, path: &str) -> Result<Response, ResolverError> {
        self.call_with_key(service_name, path, None).await
    }

    pub async fn call_with_key(
        &self,
        service_name: &str,
        path: &str,
        key: Option<&str>,
    ) -> Result<Response, ResolverError> {
        let (snapshot, first) = self.pick(service_name, key).await?;
        let instances = &snapshot.instances;
        let attempts = self.config.max_attempts.min(instances.len());

        let mut last_error = None;
        for attempt in 0..attempts {
            let instance = &instances[(first + attempt) % instances.len()];

            match self
                .executor
                .execute(&instance.host, instance.port, path)
                .await
            {
                Ok(response) => {
                    tracing::debug!(
                        service = %service_name,
                        instance = %instance.instance_id,
                        "Call to {} answered {}",
                        path,
                        response.status
                    );
                    return Ok(response);
                }
                Err(e) if e.is_connection() => {
                    tracing::warn!(
                        service = %service_name,
                        instance = %instance.instance_id,
                        "Attempt {}/{} failed: {}",
                        attempt + 1,
                        attempts,
                        e
                    );
                    if last_error.is_none() {
                        self.revalidate_in_background(service_name);
                    }
                    last_error = Some(e);
                }
                Err(e) => {
                    tracing::warn!(
                        service = %service_name,
                        instance = %instance.instance_id,
                        "Call failed: {}",
                        e
                    );
                    return Err(ResolverError::CallFailed {
                        service: service_name.to_string(),
                        attempts: attempt + 1,
                        source: e,
                    });
                }
            }
        }

        match last_error {
            Some(source) => Err(ResolverError::CallFailed {
                service: service_name.to_string(),
                attempts,
                source,
            }),
            None => Err(ResolverError::NoInstancesAvailable(service_name.to_string())),
        }
    }

    /// Spawns the periodic refresh loop. Calling it again after `shutdown` does nothing.
    pub fn start(self: &Arc<Self>) {
        if self.cancel.is_cancelled() {
            tracing::warn!("Resolver already shut down, not starting refresh loop");
            return;
        }

        let resolver = self.clone();
        self.tasks.spawn(async move {
            resolver.refresh_loop().await;
        });
    }

    /// Stops the refresh loop and waits for in-flight refreshes.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tasks.close();
        self.tasks.wait().await;
        tracing::info!("Resolver stopped");
    }

    async fn refresh_loop(&self) {
        let mut interval = tokio::time::interval(self.config.refresh_interval);
        interval.tick().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    tracing::debug!("Refreshing {} cached service(s)", self.cache.len());
                    self.refresh_all().await;
                }
            }
        }
    }

    async fn pick(
        &self,
        service_name: &str,
        key: Option<&str>,
    ) -> Result<(Arc<CacheSnapshot>, usize), ResolverError> {
        let entry = self.cache.entry(service_name);
        entry.touch();

        let snapshot = match entry.snapshot() {
            Some(snapshot) if !snapshot.instances.is_empty() => {
                if snapshot.is_expired(self.config.cache_ttl) {
                    self.revalidate_in_background(service_name);
                }
                snapshot
            }
            _ => {
                if let Err(e) = self.refresh(service_name).await {
                    tracing::debug!(service = %service_name, "Lookup on cache miss failed: {}", e);
                }
                entry
                    .snapshot()
                    .filter(|snapshot| !snapshot.instances.is_empty())
                    .ok_or_else(|| ResolverError::NoInstancesAvailable(service_name.to_string()))?
            }
        };

        let ctx = SelectionContext {
            next_index: &entry.next_index,
            key,
        };
        let index = self.policy.select(&snapshot.instances, &ctx);

        Ok((snapshot, index))
    }

    /// Starts a refresh unless one is already running for this service.
    fn revalidate_in_background(&self, service_name: &str) {
        if self.cancel.is_cancelled() {
            return;
        }

        let entry = self.cache.entry(service_name);
        let Ok(guard) = entry.refresh_lock.clone().try_lock_owned() else {
            return;
        };

        let lookup = self.lookup.clone();
        let service_name = service_name.to_string();
        let timeout = self.config.refresh_timeout;

        self.tasks.spawn(async move {
            let _guard = guard;
            let _ = refresh_entry(lookup.as_ref(), &entry, &service_name, timeout).await;
        });
    }
}

/// Fetches and swaps in a new snapshot. Callers hold the entry's refresh lock.
async fn refresh_entry(
    lookup: &dyn RegistryLookup,
    entry: &ServiceCache,
    service_name: &str,
    timeout: Duration,
) -> Result<usize, TransportError> {
    let result = match tokio::time::timeout(timeout, lookup.fetch_instances(service_name)).await {
        Ok(result) => result,
        Err(_) => Err(TransportError::Timeout {
            target: format!("registry lookup for {}", service_name),
        }),
    };

    match result {
        Ok(instances) => {
            let count = instances.len();
            entry.replace(instances);
            tracing::debug!(service = %service_name, "Cached {} instance(s)", count);
            Ok(count)
        }
        Err(e) => {
            let cached = entry.snapshot().map(|s| s.instances.len()).unwrap_or(0);
            tracing::warn!(
                service = %service_name,
                "Refresh failed, keeping {} cached instance(s): {}",
                cached,
                e
            );
            Err(e)
        }
    }
}
