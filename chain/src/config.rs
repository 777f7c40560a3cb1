//! Configuration options for segment chain operations.
//!
//! This module defines the configuration and options structs that control
//! the behavior of a chain, including storage setup and the retry policy of
//! the append loop.

use std::path::Path;
use std::time::Duration;

use common::StorageConfig;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// Configuration for opening a [`SegmentChain`](crate::SegmentChain).
///
/// # Example
///
/// ```ignore
/// use chain::{Config, SegmentChain};
///
/// let config = Config {
///     stream: "orders".to_string(),
///     ..Default::default()
/// };
/// let chain = SegmentChain::open(config).await?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Container holding the chain's segments. Provisioned on open.
    #[serde(default = "default_container")]
    pub container: String,

    /// Base name of the chain. Segments are named `<stream>.<suffix>`.
    #[serde(default = "default_stream")]
    pub stream: String,

    /// Retry policy of the append loop.
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_container() -> String {
    "segmentchain".to_string()
}

fn default_stream() -> String {
    "stream".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            container: default_container(),
            stream: default_stream(),
            retry: RetryConfig::default(),
        }
    }
}

/// Bounds on the append loop.
///
/// The loop retries an append whenever the store refuses it. With the
/// defaults it retries until some segment accepts the payload, pausing for
/// `backoff_ms` only when a refusal did not move the chain forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of append attempts per call. `None` retries without limit.
    #[serde(default)]
    pub max_attempts: Option<u32>,

    /// Pause before retrying when a refused append did not advance the chain.
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Upper bound on the duration of a single append call, retries included.
    #[serde(default)]
    pub deadline_ms: Option<u64>,
}

fn default_backoff_ms() -> u64 {
    1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            backoff_ms: default_backoff_ms(),
            deadline_ms: None,
        }
    }
}

impl RetryConfig {
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.max_attempts == Some(0) {
            return Err(Error::InvalidInput(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-call options for [`SegmentChain::append_with_options`](crate::SegmentChain::append_with_options).
#[derive(Debug, Clone, Default)]
pub struct AppendOptions {
    /// Overrides [`RetryConfig::deadline_ms`] for this call.
    pub deadline: Option<Duration>,

    /// Aborts the append loop once cancelled.
    ///
    /// A payload whose append was in flight at cancellation time may still
    /// have been accepted by the store.
    pub cancellation: Option<CancellationToken>,
}

/// Loads a chain configuration from a YAML file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config> {
    let contents = std::fs::read_to_string(path.as_ref())
        .map_err(|e| Error::InvalidInput(format!("Failed to read config file: {}", e)))?;

    serde_yaml::from_str(&contents)
        .map_err(|e| Error::InvalidInput(format!("Failed to parse config file: {}", e)))
}
