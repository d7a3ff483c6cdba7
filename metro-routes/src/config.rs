//! Engine configuration, read from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::cache::{DEFAULT_FLUSH_THRESHOLD, PersistenceConfig};
use crate::fares::FareFormConfig;
use crate::orchestrator::FetchOrchestrator;

pub const ENV_PERSIST: &str = "METRO_PERSIST";
pub const ENV_SNAPSHOT_PATH: &str = "METRO_SNAPSHOT_PATH";
pub const ENV_FLUSH_THRESHOLD: &str = "METRO_FLUSH_THRESHOLD";
pub const ENV_FARES_URL: &str = "METRO_FARES_URL";
pub const ENV_MAX_CONCURRENT: &str = "METRO_MAX_CONCURRENT";
pub const ENV_TIMEOUT_SECS: &str = "METRO_TIMEOUT_SECS";
pub const ENV_WARM_ON_START: &str = "METRO_WARM_ON_START";
pub const ENV_BATCH_DEADLINE_SECS: &str = "METRO_BATCH_DEADLINE_SECS";
pub const ENV_LISTEN_ADDR: &str = "METRO_LISTEN_ADDR";

const DEFAULT_SNAPSHOT_PATH: &str = "metro_routes.snapshot";
const DEFAULT_LISTEN_ADDR: ([u8; 4], u16) = ([127, 0, 0, 1], 3000);

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {var}={value:?}: {reason}")]
pub struct ConfigError {
    pub var: &'static str,
    pub value: String,
    pub reason: &'static str,
}

/// Configuration for the route engine and its HTTP surface.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Load snapshots at startup and save them as routes are fetched.
    pub persistence_enabled: bool,

    /// Snapshot file path.
    pub snapshot_path: PathBuf,

    /// Fetches before an autosave writes.
    pub flush_threshold: usize,

    /// Upstream fare form client settings.
    pub fares: FareFormConfig,

    /// Maximum lookups in flight per batch.
    pub max_concurrent: usize,

    /// Warm the full cache in the background after startup.
    pub warm_on_start: bool,

    /// Abort warm-ups still running after this long.
    pub batch_deadline: Option<Duration>,

    /// HTTP bind address.
    pub listen_addr: SocketAddr,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let fares = FareFormConfig::default();
        Self {
            persistence_enabled: false,
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            flush_threshold: DEFAULT_FLUSH_THRESHOLD,
            max_concurrent: fares.max_concurrent,
            fares,
            warm_on_start: false,
            batch_deadline: None,
            listen_addr: SocketAddr::from(DEFAULT_LISTEN_ADDR),
        }
    }
}

impl EngineConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Read configuration through `lookup`; unset variables keep defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(v) = lookup(ENV_PERSIST) {
            config.persistence_enabled = parse_bool(ENV_PERSIST, &v)?;
        }
        if let Some(v) = lookup(ENV_SNAPSHOT_PATH) {
            if v.trim().is_empty() {
                return Err(invalid(ENV_SNAPSHOT_PATH, &v, "must not be empty"));
            }
            config.snapshot_path = PathBuf::from(v);
        }
        if let Some(v) = lookup(ENV_FLUSH_THRESHOLD) {
            config.flush_threshold = parse_positive(ENV_FLUSH_THRESHOLD, &v)? as usize;
        }
        if let Some(v) = lookup(ENV_FARES_URL) {
            config.fares.url = v;
        }
        if let Some(v) = lookup(ENV_MAX_CONCURRENT) {
            let n = parse_positive(ENV_MAX_CONCURRENT, &v)? as usize;
            config.max_concurrent = n;
            config.fares.max_concurrent = n;
        }
        if let Some(v) = lookup(ENV_TIMEOUT_SECS) {
            config.fares.timeout_secs = parse_positive(ENV_TIMEOUT_SECS, &v)?;
        }
        if let Some(v) = lookup(ENV_WARM_ON_START) {
            config.warm_on_start = parse_bool(ENV_WARM_ON_START, &v)?;
        }
        if let Some(v) = lookup(ENV_BATCH_DEADLINE_SECS) {
            let secs = parse_positive(ENV_BATCH_DEADLINE_SECS, &v)?;
            config.batch_deadline = Some(Duration::from_secs(secs));
        }
        if let Some(v) = lookup(ENV_LISTEN_ADDR) {
            config.listen_addr = v
                .trim()
                .parse()
                .map_err(|_| invalid(ENV_LISTEN_ADDR, &v, "expected host:port"))?;
        }

        Ok(config)
    }

    /// Persistence settings, if enabled.
    pub fn persistence(&self) -> Option<PersistenceConfig> {
        self.persistence_enabled.then(|| {
            PersistenceConfig::new(&self.snapshot_path).with_flush_threshold(self.flush_threshold)
        })
    }

    /// Orchestrator for warm-up batches.
    pub fn orchestrator(&self) -> FetchOrchestrator {
        let orchestrator = FetchOrchestrator::new(self.max_concurrent);
        match self.batch_deadline {
            Some(deadline) => orchestrator.with_deadline(deadline),
            None => orchestrator,
        }
    }
}

fn invalid(var: &'static str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError {
        var,
        value: value.to_string(),
        reason,
    }
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(var, value, "expected a boolean")),
    }
}

fn parse_positive(var: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err(invalid(var, value, "must be at least 1")),
        Ok(n) => Ok(n),
        Err(_) => Err(invalid(var, value, "expected a positive integer")),
    }
}
