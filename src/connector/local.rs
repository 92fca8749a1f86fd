//! The local (in-process) connector.

use crate::config::EngineConfig;
use crate::connector::Connector;
use crate::error::{Error, Result};
use crate::pubsub::Broker;
use crate::storage::KvStore;
use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Driver name reported by [`LocalConnector`].
pub const LOCAL_CONNECTOR_KIND: &str = "local";

/// Connector owning an in-memory store and broker.
pub struct LocalConnector {
    store: Arc<dyn KvStore>,
    broker: Arc<Broker>,
    config: EngineConfig,
    connected: AtomicBool,
}

impl std::fmt::Debug for LocalConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalConnector")
            .field("store", &self.config.store)
            .field("entries", &self.store.len())
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl Default for LocalConnector {
    fn default() -> Self {
        let config = EngineConfig::default();
        Self::with_parts(
            config.store.build(),
            Arc::new(Broker::new(config.subscriber_buffer)),
            config,
        )
    }
}

impl LocalConnector {
    /// Builds a connector with a fresh store and broker from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidOptions`] if the configuration is invalid.
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::with_parts(
            config.store.build(),
            Arc::new(Broker::new(config.subscriber_buffer)),
            config,
        ))
    }

    /// Builds a connector around an existing store and broker.
    pub fn from_parts(store: Arc<dyn KvStore>, broker: Arc<Broker>) -> Self {
        Self::with_parts(store, broker, EngineConfig::default())
    }

    fn with_parts(store: Arc<dyn KvStore>, broker: Arc<Broker>, config: EngineConfig) -> Self {
        info!(store = ?config.store, "Local connector created");
        Self {
            store,
            broker,
            config,
            connected: AtomicBool::new(true),
        }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }
}

impl Connector for LocalConnector {
    fn ping(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(Error::ClosedConnection)
        }
    }

    fn disconnect(&self) -> Result<()> {
        if self.connected.swap(false, Ordering::AcqRel) {
            info!("Local connector disconnected");
        }
        Ok(())
    }

    fn kind(&self) -> &'static str {
        LOCAL_CONNECTOR_KIND
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
