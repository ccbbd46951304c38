//! Configuration for the relay.
//!
//! Settings load with the following priority (highest to lowest):
//! 1. Environment variables (`RELAYBOX__<KEY>`)
//! 2. TOML file (path given on the command line, if any)
//! 3. Default values (embedded in the struct)
//!
//! The worker re-reads its `ConfigProvider` on every tick, so endpoint or
//! credential edits apply without restarting the loop.

use crate::delivery::Credentials;
use config::{Environment, File};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

const ENV_PREFIX: &str = "RELAYBOX";
const ENV_SEPARATOR: &str = "__";

pub const DEFAULT_POLL_PERIOD_SECONDS: i64 = 5;
pub const DEFAULT_IDLE_ATTEMPT_THRESHOLD: i64 = 33;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),
}

/// Relay configuration surface.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Receiver URL. Empty means "not configured yet": the worker keeps the
    /// queue intact and logs a configuration failure each tick.
    pub api_endpoint: String,
    pub username: Option<String>,
    pub password: Option<String>,
    pub worker_poll_period_seconds: i64,
    pub worker_idle_attempt_threshold: i64,
    pub data_dir: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            api_endpoint: String::new(),
            username: None,
            password: None,
            worker_poll_period_seconds: DEFAULT_POLL_PERIOD_SECONDS,
            worker_idle_attempt_threshold: DEFAULT_IDLE_ATTEMPT_THRESHOLD,
            data_dir: PathBuf::from("data/relaybox"),
        }
    }
}

impl RelayConfig {
    /// Load configuration from an optional TOML file plus environment
    /// overrides (`RELAYBOX__API_ENDPOINT=...` etc).
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }

        let settings = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Inter-tick delay, clamped so a zero or negative setting never spins.
    pub fn poll_period(&self) -> Duration {
        Duration::from_secs(self.worker_poll_period_seconds.max(1) as u64)
    }

    /// Consecutive empty ticks before the worker stops itself, clamped to at
    /// least one.
    pub fn idle_threshold(&self) -> u32 {
        self.worker_idle_attempt_threshold.max(1).min(u32::MAX as i64) as u32
    }

    /// Basic-auth credentials, present only when a username is configured.
    /// A missing password is treated as empty.
    pub fn credentials(&self) -> Option<Credentials> {
        let username = self.username.as_deref()?.trim();
        if username.is_empty() {
            return None;
        }
        Some(Credentials {
            username: username.to_string(),
            password: self.password.clone().unwrap_or_default(),
        })
    }
}

/// Current-configuration seam for the worker loop, read once per tick.
pub trait ConfigProvider: Send + Sync {
    fn current(&self) -> RelayConfig;
}

/// Re-reads the config file (and environment) on every call. A transient
/// parse error falls back to the last good snapshot so the worker never
/// stalls on a half-edited file.
pub struct FileConfigProvider {
    path: Option<PathBuf>,
    last_good: RwLock<RelayConfig>,
}

impl FileConfigProvider {
    pub fn new(path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let initial = RelayConfig::load(path.as_deref())?;
        Ok(Self {
            path,
            last_good: RwLock::new(initial),
        })
    }
}

impl ConfigProvider for FileConfigProvider {
    fn current(&self) -> RelayConfig {
        match RelayConfig::load(self.path.as_deref()) {
            Ok(config) => {
                *self
                    .last_good
                    .write()
                    .unwrap_or_else(PoisonError::into_inner) = config.clone();
                config
            }
            Err(e) => {
                warn!(error = %e, "Config reload failed, keeping last good snapshot");
                self.last_good
                    .read()
                    .unwrap_or_else(PoisonError::into_inner)
                    .clone()
            }
        }
    }
}

/// Mutable in-memory snapshot, for tests and embedders that manage their own
/// settings store.
pub struct StaticConfigProvider {
    inner: RwLock<RelayConfig>,
}

impl StaticConfigProvider {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    pub fn set(&self, config: RelayConfig) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = config;
    }
}

impl ConfigProvider for StaticConfigProvider {
    fn current(&self) -> RelayConfig {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
