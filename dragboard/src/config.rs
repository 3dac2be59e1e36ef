//! Configuration loading using Figment
//!
//! Sources are merged in precedence order (later sources override earlier ones):
//! 1. Default values
//! 2. An optional configuration file (TOML, YAML or JSON, chosen by extension)
//! 3. Environment variables prefixed with `DRAGBOARD_`; nested keys are
//!    separated by a double underscore, e.g. `DRAGBOARD_SYNC__MAX_ATTEMPTS=5`

use crate::error::{BoardError, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "DRAGBOARD_";

/// What the synchronizer does when the store rejects or times out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure and keep the optimistic local state
    #[default]
    Keep,
    /// Retry retryable failures, then report
    Retry,
    /// Report the failure and move the item back to where it was
    Rollback,
}

/// Position Synchronizer settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Upper bound for one remote call
    pub request_timeout_ms: u64,
    pub failure_policy: FailurePolicy,
    /// Total attempts per instruction under the `retry` policy
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 10_000,
            failure_policy: FailurePolicy::Keep,
            max_attempts: 3,
            retry_backoff_ms: 250,
        }
    }
}

impl SyncConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }

    /// Attempts allowed per instruction under the configured policy
    pub fn attempts(&self) -> u32 {
        match self.failure_policy {
            FailurePolicy::Retry => self.max_attempts,
            FailurePolicy::Keep | FailurePolicy::Rollback => 1,
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_retries(mut self, max_attempts: u32, backoff: Duration) -> Self {
        self.failure_policy = FailurePolicy::Retry;
        self.max_attempts = max_attempts;
        self.retry_backoff_ms = backoff.as_millis() as u64;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.request_timeout_ms == 0 {
            return Err(BoardError::config("sync.request_timeout_ms must be positive"));
        }
        if self.max_attempts == 0 {
            return Err(BoardError::config("sync.max_attempts must be at least 1"));
        }
        Ok(())
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragboardConfig {
    pub sync: SyncConfig,
}

impl DragboardConfig {
    /// Load from defaults and the environment
    pub fn load() -> Result<Self> {
        Self::extract(Self::figment(None))
    }

    /// Load from defaults, `path`, and the environment
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        Self::extract(Self::figment(Some(path.as_ref())))
    }

    /// Build the figment with all sources in precedence order
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            debug!(path = %path.display(), "loading configuration file");
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml") | Some("yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }

        figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.sync.validate()?;
        debug!(?config, "configuration loaded");
        Ok(config)
    }
}
