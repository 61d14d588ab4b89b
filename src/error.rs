//! Error types shared by the registry, the resolver and the provider agent.

use thiserror::Error;

/// Failures of registry store operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Malformed registration input. Nothing was written.
    #[error("validation error: {0}")]
    Validation(String),

    /// The instance is not registered; the provider has to register again.
    #[error("instance {instance_id} of service {service_name} is not registered")]
    NotFound {
        service_name: String,
        instance_id: String,
    },
}

/// Network-level failure talking to the registry or to a resolved instance.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("connection to {target} failed: {message}")]
    Connect { target: String, message: String },

    #[error("request to {target} timed out")]
    Timeout { target: String },

    #[error("{target} answered with status {status}")]
    Status { target: String, status: u16 },

    #[error("invalid response from {target}: {message}")]
    Decode { target: String, message: String },
}

impl TransportError {
    /// Whether the failure means the target could not be reached at all.
    /// Only these are worth failing over to another instance.
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connect { .. } | Self::Timeout { .. })
    }

    /// Classifies a reqwest failure for `target`.
    pub fn from_reqwest(target: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                target: target.to_string(),
            }
        } else if err.is_decode() || err.is_body() {
            Self::Decode {
                target: target.to_string(),
                message: err.to_string(),
            }
        } else if let Some(status) = err.status() {
            Self::Status {
                target: target.to_string(),
                status: status.as_u16(),
            }
        } else {
            Self::Connect {
                target: target.to_string(),
                message: err.to_string(),
            }
        }
    }
}

/// Errors surfaced by the client-side resolver.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolverError {
    /// The cache for the service is empty and could not be refreshed.
    #[error("no instances available for service {0}")]
    NoInstancesAvailable(String),

    /// Every attempt of a call failed to reach an instance.
    #[error("call to service {service} failed after {attempts} attempt(s): {source}")]
    CallFailed {
        service: String,
        attempts: usize,
        #[source]
        source: TransportError,
    },
}

/// Rejected configuration values.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("invalid registry url {0:?}")]
    RegistryUrl(String),
}
