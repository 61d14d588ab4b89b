use super::store::RegistryStore;
use super::types::RegistryEvent;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Background task that evicts instances whose renewals stopped.
///
/// This is the only failure detector: a crashed provider simply stops renewing
/// and disappears after `eviction_threshold`. Nothing probes providers actively.
pub struct ExpirySweeper {
    store: Arc<RegistryStore>,
    sweep_interval: Duration,
    eviction_threshold: Duration,
    events: broadcast::Sender<RegistryEvent>,
    cancel: CancellationToken,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ExpirySweeper {
    pub fn new(
        store: Arc<RegistryStore>,
        sweep_interval: Duration,
        eviction_threshold: Duration,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Arc::new(Self {
            store,
            sweep_interval,
            eviction_threshold,
            events,
            cancel: CancellationToken::new(),
            handle: Mutex::new(None),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.events.subscribe()
    }

    /// Spawns the sweep loop. Calling it twice keeps the first loop; calling it after
    /// `stop` does nothing.
    pub async fn start(self: &Arc<Self>) {
        if self.cancel.is_cancelled() {
            tracing::warn!("Expiry sweeper already stopped, not starting sweep loop");
            return;
        }

        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            tracing::warn!("Expiry sweeper already running");
            return;
        }

        tracing::info!(
            "Starting expiry sweeper (interval={:?}, threshold={:?})",
            self.sweep_interval,
            self.eviction_threshold
        );

        let sweeper = self.clone();
        *handle = Some(tokio::spawn(async move {
            sweeper.sweep_loop().await;
        }));
    }

    /// True between `start` and `stop`.
    pub async fn is_running(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    /// Cancels the loop and waits for an in-progress sweep to finish.
    pub async fn stop(&self) {
        self.cancel.cancel();

        if let Some(handle) = self.handle.lock().await.take()
            && let Err(e) = handle.await
        {
            tracing::error!("Expiry sweeper task failed: {}", e);
        }

        tracing::info!("Expiry sweeper stopped");
    }

    async fn sweep_loop(&self) {
        let mut interval = tokio::time::interval(self.sweep_interval);
        // The first tick completes immediately; skip it so a fresh registry
        // does not sweep before anyone had a chance to renew.
        interval.tick().await;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                _ = interval.tick() => {
                    self.sweep_once();
                }
            }
        }
    }

    /// Runs a single pass and returns the evicted instances' keys.
    ///
    /// The expired set is snapshotted first; each removal then re-checks the
    /// lease so a renewal arriving mid-sweep keeps its instance.
    pub fn sweep_once(&self) -> Vec<(String, String)> {
        let candidates = self.store.expired(self.eviction_threshold);
        let mut evicted = Vec::with_capacity(candidates.len());

        for (service_name, instance_id) in candidates {
            let Some(instance) =
                self.store
                    .evict_if_expired(&service_name, &instance_id, self.eviction_threshold)
            else {
                continue;
            };

            tracing::info!(
                service = %service_name,
                instance = %instance_id,
                "Evicted instance at {} (no renewal for {}ms)",
                instance.address(),
                self.store.now_ms().saturating_sub(instance.last_renewal_at)
            );

            // No subscribers is fine; events are informational.
            let _ = self.events.send(RegistryEvent::Evicted {
                service_name: service_name.clone(),
                instance_id: instance_id.clone(),
                last_renewal_at: instance.last_renewal_at,
            });

            evicted.push((service_name, instance_id));
        }

        if !evicted.is_empty() {
            tracing::info!(
                "Sweep evicted {} instance(s), {} remaining",
                evicted.len(),
                self.store.instance_count()
            );
        }

        evicted
    }
}
