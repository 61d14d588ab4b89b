//! Load-balancing strategies.
//!
//! A policy only answers "which element of this non-empty slice"; caching and
//! refreshing stay in the resolver, so policies can be swapped without touching them.

use crate::registry::types::ServiceInstance;

use rand::Rng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-call input handed to a policy.
pub struct SelectionContext<'a> {
    /// Round-robin cursor of the service being resolved.
    pub next_index: &'a AtomicUsize,
    /// Affinity key supplied by the caller, if any.
    pub key: Option<&'a str>,
}

pub trait SelectionPolicy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns an index into `instances`, which is never empty.
    fn select(&self, instances: &[ServiceInstance], ctx: &SelectionContext<'_>) -> usize;
}

/// `instances[next_index % len]`, then advance the cursor.
#[derive(Debug, Default)]
pub struct RoundRobin;

impl SelectionPolicy for RoundRobin {
    fn name(&self) -> &'static str {
        "round-robin"
    }

    fn select(&self, instances: &[ServiceInstance], ctx: &SelectionContext<'_>) -> usize {
        ctx.next_index.fetch_add(1, Ordering::Relaxed) % instances.len()
    }
}

#[derive(Debug, Default)]
pub struct Random;

impl SelectionPolicy for Random {
    fn name(&self) -> &'static str {
        "random"
    }

    fn select(&self, instances: &[ServiceInstance], _ctx: &SelectionContext<'_>) -> usize {
        rand::thread_rng().gen_range(0..instances.len())
    }
}

/// Same key, same instance, for as long as the instance list does not change.
/// Calls without a key are spread round-robin.
#[derive(Debug, Default)]
pub struct StickyByKey;

impl SelectionPolicy for StickyByKey {
    fn name(&self) -> &'static str {
        "sticky"
    }

    fn select(&self, instances: &[ServiceInstance], ctx: &SelectionContext<'_>) -> usize {
        match ctx.key {
            Some(key) => {
                let mut hasher = DefaultHasher::new();
                key.hash(&mut hasher);
                (hasher.finish() % instances.len() as u64) as usize
            }
            None => RoundRobin.select(instances, ctx),
        }
    }
}

/// Policy choice exposed to configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PolicyKind {
    #[default]
    RoundRobin,
    Random,
    Sticky,
}

impl PolicyKind {
    pub fn build(self) -> Arc<dyn SelectionPolicy> {
        match self {
            PolicyKind::RoundRobin => Arc::new(RoundRobin),
            PolicyKind::Random => Arc::new(Random),
            PolicyKind::Sticky => Arc::new(StickyByKey),
        }
    }
}
