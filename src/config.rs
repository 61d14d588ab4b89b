//! Runtime configuration for the three roles: registry, resolver and provider agent.
//!
//! Binaries fill these from command-line flags and environment variables;
//! library users construct them directly or start from `Default`.

use crate::error::ConfigError;
use crate::resolver::policy::PolicyKind;
use std::net::SocketAddr;
use std::time::Duration;

pub const DEFAULT_REGISTRY_ADDR: &str = "127.0.0.1:8761";
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_EVICTION_THRESHOLD: Duration = Duration::from_secs(90);
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(30);
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_RENEW_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct RegistryConfig {
    pub bind_addr: SocketAddr,
    /// How often the sweeper scans for expired instances.
    pub sweep_interval: Duration,
    /// Age of the last renewal after which an instance is evicted.
    pub eviction_threshold: Duration,
}

impl RegistryConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::Zero("sweep interval"));
        }
        if self.eviction_threshold.is_zero() {
            return Err(ConfigError::Zero("eviction threshold"));
        }
        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8761)),
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            eviction_threshold: DEFAULT_EVICTION_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Base URL of the registry, e.g. `http://127.0.0.1:8761`.
    pub registry_url: String,
    pub refresh_interval: Duration,
    pub refresh_timeout: Duration,
    /// A cache entry older than this is refreshed on the calling path.
    pub cache_ttl: Duration,
    pub policy: PolicyKind,
    /// Upper bound on instances tried by a single `call`.
    pub max_attempts: usize,
    pub call_timeout: Duration,
}

impl ResolverConfig {
    pub fn new(registry_url: impl Into<String>) -> Self {
        Self {
            registry_url: registry_url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.registry_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::RegistryUrl(self.registry_url.clone()));
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::Zero("refresh interval"));
        }
        if self.refresh_timeout.is_zero() {
            return Err(ConfigError::Zero("refresh timeout"));
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::Zero("max attempts"));
        }
        Ok(())
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            registry_url: format!("http://{}", DEFAULT_REGISTRY_ADDR),
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            cache_ttl: DEFAULT_CACHE_TTL,
            policy: PolicyKind::RoundRobin,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub registry_url: String,
    pub renew_interval: Duration,
    pub request_timeout: Duration,
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.registry_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::RegistryUrl(self.registry_url.clone()));
        }
        if self.renew_interval.is_zero() {
            return Err(ConfigError::Zero("renew interval"));
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            registry_url: format!("http://{}", DEFAULT_REGISTRY_ADDR),
            renew_interval: DEFAULT_RENEW_INTERVAL,
            request_timeout: DEFAULT_REFRESH_TIMEOUT,
        }
    }
}
