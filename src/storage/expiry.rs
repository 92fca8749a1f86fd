//! Background Expiry Sweeper
//!
//! Expiry is lazy by default: an expired object is treated as absent when it
//! is read and replaced when it is written. Keys that expire and are never
//! touched again would otherwise linger, so the engine can optionally run a
//! sweeper that walks the TTL index and deletes expired keys.
//!
//! ## Design
//!
//! The sweeper runs as a Tokio task and:
//! 1. Sleeps for a configurable interval (default: 100ms)
//! 2. Wakes up and reads the TTL index
//! 3. Deletes every key whose expiry has passed
//! 4. Adapts its interval to the share of expiring keys
//!
//! The sweeper is off unless [`EngineConfig::expiry`](crate::EngineConfig)
//! is set or [`Engine::start_expiry_sweeper`](crate::Engine::start_expiry_sweeper)
//! is called.

use crate::config::ExpiryConfig;
use crate::error::{Error, Result};
use crate::storage::Keyspace;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper task will be stopped.
#[derive(Debug)]
pub struct ExpirySweeper {
    /// Sender to signal shutdown
    shutdown_tx: watch::Sender<bool>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper as a background task.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOptions`] when called outside a Tokio runtime
    /// or with an invalid configuration.
    pub fn start(keyspace: Keyspace, config: ExpiryConfig) -> Result<Self> {
        config.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            Error::InvalidOptions("the expiry sweeper requires a Tokio runtime".to_string())
        })?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        runtime.spawn(sweeper_loop(keyspace, config, shutdown_rx));

        info!("Background expiry sweeper started");

        Ok(Self { shutdown_tx })
    }

    /// Stops the expiry sweeper.
    ///
    /// This is called automatically when the handle is dropped.
    pub fn stop(&self) {
        if self.shutdown_tx.send(true).is_ok() {
            info!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
async fn sweeper_loop(
    keyspace: Keyspace,
    config: ExpiryConfig,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut current_interval = config.base_interval;

    loop {
        tokio::select! {
            _ = tokio::time::sleep(current_interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("Expiry sweeper received shutdown signal");
                    return;
                }
            }
        }

        let tracked = match keyspace.indexes().ttl_len() {
            Ok(tracked) => tracked as u64,
            Err(e) => {
                warn!(error = %e, "Expiry sweeper could not read the TTL index");
                continue;
            }
        };

        let expired = match keyspace.purge_expired() {
            Ok(expired) => expired,
            Err(e) => {
                warn!(error = %e, "Expiry sweep failed");
                continue;
            }
        };

        // Adjust interval based on expiry rate
        if tracked > 0 {
            let expiry_rate = expired as f64 / tracked as f64;

            if expiry_rate > config.speedup_threshold {
                current_interval = (current_interval / 2).max(config.min_interval);
                debug!(
                    expired = expired,
                    rate = %format!("{:.2}%", expiry_rate * 100.0),
                    new_interval_ms = current_interval.as_millis(),
                    "High expiry rate, speeding up sweeper"
                );
            } else if expiry_rate < config.slowdown_threshold && expired == 0 {
                current_interval = (current_interval * 2).min(config.max_interval);
                trace!(
                    new_interval_ms = current_interval.as_millis(),
                    "Low expiry rate, slowing down sweeper"
                );
            }
        }

        if expired > 0 {
            debug!(
                expired = expired,
                tracked_remaining = tracked.saturating_sub(expired),
                "Expired keys cleaned up"
            );
        }
    }
}
