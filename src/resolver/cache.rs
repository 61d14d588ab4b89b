//! Consumer-side instance cache.
//!
//! Each service has an immutable snapshot published through `ArcSwapOption`.
//! Readers load the last complete snapshot without locking; a refresh builds a new
//! snapshot and swaps it in. The per-service refresh mutex only serialises refreshes.

use crate::registry::types::ServiceInstance;

use arc_swap::ArcSwapOption;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

#[derive(Debug)]
pub struct CacheSnapshot {
    pub instances: Vec<ServiceInstance>,
    pub fetched_at: Instant,
}

impl CacheSnapshot {
    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.fetched_at.elapsed() > ttl
    }
}

#[derive(Debug)]
pub struct ServiceCache {
    snapshot: ArcSwapOption<CacheSnapshot>,
    /// Round-robin cursor; survives refreshes.
    pub next_index: AtomicUsize,
    /// Bumped on every successful refresh.
    generation: AtomicU64,
    /// Last time a caller resolved through this entry.
    last_used: StdMutex<Instant>,
    pub(crate) refresh_lock: Arc<Mutex<()>>,
}

impl ServiceCache {
    pub fn new() -> Self {
        Self {
            snapshot: ArcSwapOption::empty(),
            next_index: AtomicUsize::new(0),
            generation: AtomicU64::new(0),
            last_used: StdMutex::new(Instant::now()),
            refresh_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.snapshot.load_full()
    }

    pub fn replace(&self, instances: Vec<ServiceInstance>) {
        self.snapshot.store(Some(Arc::new(CacheSnapshot {
            instances,
            fetched_at: Instant::now(),
        })));
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn touch(&self) {
        if let Ok(mut last_used) = self.last_used.lock() {
            *last_used = Instant::now();
        }
    }

    pub fn idle_for(&self) -> Duration {
        self.last_used
            .lock()
            .map(|last_used| last_used.elapsed())
            .unwrap_or_default()
    }

    /// True while the latest snapshot holds at least one instance.
    pub fn has_instances(&self) -> bool {
        self.snapshot()
            .is_some_and(|snapshot| !snapshot.instances.is_empty())
    }
}

impl Default for ServiceCache {
    fn default() -> Self {
        Self::new()
    }
}

/// `service name -> ServiceCache`. Entries are created on first lookup. An entry
/// without instances is dropped once nobody resolved it for a while.
#[derive(Debug, Default)]
pub struct ResolverCache {
    services: DashMap<String, Arc<ServiceCache>>,
}

impl ResolverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry(&self, service_name: &str) -> Arc<ServiceCache> {
        if let Some(entry) = self.services.get(service_name) {
            return entry.clone();
        }
        self.services
            .entry(service_name.to_string())
            .or_default()
            .clone()
    }

    pub fn get(&self, service_name: &str) -> Option<Arc<ServiceCache>> {
        self.services.get(service_name).map(|entry| entry.clone())
    }

    pub fn service_names(&self) -> Vec<String> {
        self.services.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Cached instances of a service; empty when never fetched.
    pub fn instances(&self, service_name: &str) -> Vec<ServiceInstance> {
        self.get(service_name)
            .and_then(|entry| entry.snapshot())
            .map(|snapshot| snapshot.instances.clone())
            .unwrap_or_default()
    }

    /// Drops entries that hold no instances and were not used for longer than `idle`.
    /// Returns the names of the dropped services.
    pub fn evict_idle(&self, idle: Duration) -> Vec<String> {
        let mut evicted = Vec::new();
        self.services.retain(|service_name, entry| {
            let keep = entry.has_instances() || entry.idle_for() <= idle;
            if !keep {
                evicted.push(service_name.clone());
            }
            keep
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
