//! Client-Side Resolver Module
//!
//! Runs inside a consumer. Pulls instance lists from the registry, caches them and
//! picks one instance per call.
//!
//! ## Submodules
//! - **`cache`**: per-service copy-on-write snapshots and round-robin cursors.
//! - **`policy`**: pluggable selection strategies (round-robin, random, sticky).
//! - **`client`**: reqwest client for the registry API.
//! - **`executor`**: outbound requests to resolved instances.
//! - **`resolver`**: refresh scheduling, resolution and call-with-failover.

pub mod cache;
pub mod client;
pub mod executor;
pub mod policy;
pub mod resolver;

pub use client::{RegistryClient, RegistryLookup, RenewOutcome};
pub use executor::{HttpExecutor, RequestExecutor, Response};
pub use policy::{PolicyKind, SelectionPolicy};
pub use resolver::Resolver;

#[cfg(test)]
mod tests;
