//! Provider Module
//!
//! Everything a service instance needs to stay discoverable.
//!
//! ## Core Mechanisms
//! - **Identity**: instance ids are `{service}:{uuid}`, unique per process start.
//! - **Registration Agent**: registers on start, renews on a fixed interval and
//!   re-registers when the registry reports the instance as unknown (evicted or
//!   restarted registry). Stopping deregisters on a best-effort basis.

pub mod agent;

pub use agent::{InstanceIdentity, RegistrationAgent};
