//! Client-Side Service Discovery Library
//!
//! Building blocks for a registry service and the processes that use it.
//!
//! ## Architecture Modules
//! - **`registry`**: The authoritative instance table. Providers register and renew a
//!   lease; a background sweeper evicts instances whose renewals stopped.
//! - **`api`**: The registry's HTTP surface (axum router, wire DTOs, status codes).
//! - **`resolver`**: Consumer-side discovery. Caches instance lists pulled from the
//!   registry, picks an instance per call (round robin by default) and fails over to
//!   the next instance on connection errors.
//! - **`provider`**: Provider-side registration agent (register, heartbeat, deregister).
//! - **`config`** / **`error`** / **`clock`**: shared configuration, error types and the
//!   time source used for lease bookkeeping.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod provider;
pub mod registry;
pub mod resolver;
