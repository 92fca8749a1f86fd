//! Engine Configuration
//!
//! [`EngineConfig`] selects the store strategy, sizes subscriber buffers and
//! optionally enables the background expiry sweeper. Values can be set in
//! code or read from the environment:
//!
//! | Variable                        | Meaning                              |
//! |---------------------------------|--------------------------------------|
//! | `LOCALSTORE_STORE`              | `mutex` (default) or `lockfree`      |
//! | `LOCALSTORE_SUBSCRIBER_BUFFER`  | messages buffered per subscription   |
//! | `LOCALSTORE_SWEEP_INTERVAL_MS`  | enables the sweeper at this interval |

use crate::error::{Error, Result};
use crate::storage::{KvStore, LockFreeStore, MutexStore};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Default number of messages buffered per subscription.
pub const DEFAULT_SUBSCRIBER_BUFFER: usize = 100;

/// Which [`KvStore`] strategy backs the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// Single reader/writer lock, soft delete
    #[default]
    Mutex,
    /// Sharded concurrent map, hard delete
    LockFree,
}

impl StoreKind {
    /// Builds a new, empty store of this kind.
    pub fn build(&self) -> Arc<dyn KvStore> {
        match self {
            StoreKind::Mutex => Arc::new(MutexStore::new()),
            StoreKind::LockFree => Arc::new(LockFreeStore::new()),
        }
    }
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mutex" => Ok(StoreKind::Mutex),
            "lockfree" | "lock-free" => Ok(StoreKind::LockFree),
            other => Err(Error::InvalidOptions(format!(
                "unknown store kind '{}'",
                other
            ))),
        }
    }
}

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Base interval between sweeps (default: 100ms)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 10ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 1s)
    pub max_interval: Duration,

    /// If this fraction of tracked keys are expired, speed up sweeping
    pub speedup_threshold: f64,

    /// If this fraction of tracked keys are expired, slow down sweeping
    pub slowdown_threshold: f64,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,  // Speed up if >25% of keys are expired
            slowdown_threshold: 0.01, // Slow down if <1% of keys are expired
        }
    }
}

impl ExpiryConfig {
    /// Checks that the intervals are non-zero and ordered.
    pub fn validate(&self) -> Result<()> {
        if self.min_interval.is_zero() || self.base_interval.is_zero() {
            return Err(Error::InvalidOptions(
                "sweep intervals must be non-zero".to_string(),
            ));
        }
        if self.min_interval > self.max_interval {
            return Err(Error::InvalidOptions(
                "min_interval exceeds max_interval".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration of a local connector and its engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Store strategy
    pub store: StoreKind,
    /// Messages buffered per subscription before publishes are dropped
    pub subscriber_buffer: usize,
    /// Background sweep settings; `None` keeps expiry purely lazy
    pub expiry: Option<ExpiryConfig>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store: StoreKind::default(),
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            expiry: None,
        }
    }
}

impl EngineConfig {
    pub fn with_store(mut self, store: StoreKind) -> Self {
        self.store = store;
        self
    }

    pub fn with_subscriber_buffer(mut self, size: usize) -> Self {
        self.subscriber_buffer = size;
        self
    }

    pub fn with_expiry(mut self, expiry: ExpiryConfig) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// Reads overrides from `LOCALSTORE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(store) = lookup("LOCALSTORE_STORE") {
            config.store = store.parse()?;
        }

        if let Some(size) = lookup("LOCALSTORE_SUBSCRIBER_BUFFER") {
            config.subscriber_buffer = size.parse().map_err(|_| {
                Error::InvalidOptions(format!("invalid subscriber buffer size '{}'", size))
            })?;
        }

        if let Some(ms) = lookup("LOCALSTORE_SWEEP_INTERVAL_MS") {
            let ms: u64 = ms.parse().map_err(|_| {
                Error::InvalidOptions(format!("invalid sweep interval '{}'", ms))
            })?;
            config.expiry = Some(ExpiryConfig {
                base_interval: Duration::from_millis(ms),
                ..Default::default()
            });
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks the configuration for values the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.subscriber_buffer == 0 {
            return Err(Error::InvalidOptions(
                "subscriber buffer must hold at least one message".to_string(),
            ));
        }
        if let Some(expiry) = &self.expiry {
            expiry.validate()?;
        }
        Ok(())
    }
}
