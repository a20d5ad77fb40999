//! Pipeline configuration types.
//!
//! Worker pool size, watchdog interval and processing cache capacity.
//! Default values are sourced from `crate::constants`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::constants::{DEFAULT_CACHE_CAPACITY, DEFAULT_WATCHDOG_SECS, DEFAULT_WORKERS};

fn default_workers() -> usize {
    DEFAULT_WORKERS
}

fn default_watchdog_secs() -> u64 {
    DEFAULT_WATCHDOG_SECS
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Jobs processed concurrently (default: 2)
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Seconds without progress before a job is failed (0 disables; default: 30)
    #[serde(default = "default_watchdog_secs")]
    pub watchdog_secs: u64,
    /// Whether finished outputs are cached
    #[serde(default = "default_true")]
    pub cache_enabled: bool,
    /// Maximum number of cached outputs (default: 16)
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            watchdog_secs: default_watchdog_secs(),
            cache_enabled: default_true(),
            cache_capacity: default_cache_capacity(),
        }
    }
}

impl PipelineConfig {
    /// Watchdog interval, `None` when disabled.
    pub fn watchdog(&self) -> Option<Duration> {
        (self.watchdog_secs > 0).then(|| Duration::from_secs(self.watchdog_secs))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.workers == 0 {
            return Err("pipeline.workers must be at least 1".to_string());
        }
        if self.cache_enabled && self.cache_capacity == 0 {
            return Err(
                "pipeline.cache_capacity must be at least 1 when the cache is enabled".to_string(),
            );
        }
        Ok(())
    }
}
