//! Registry Module
//!
//! Authoritative, in-memory table of live service instances.
//!
//! ## Core Mechanisms
//! - **Registration**: providers insert themselves keyed by `(service, instance id)`.
//!   New entries start as `STARTING` and become `UP` with their first renewal.
//! - **Heartbeats**: each renewal refreshes `last_renewal_at`.
//! - **Eviction**: `ExpirySweeper` removes instances whose last renewal is older than
//!   the eviction threshold and publishes a `RegistryEvent::Evicted`.

pub mod store;
pub mod sweeper;
pub mod types;

pub use store::RegistryStore;
pub use sweeper::ExpirySweeper;
pub use types::{InstanceStatus, RegistryEvent, ServiceInstance};
