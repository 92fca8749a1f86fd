//! The engine facade.
//!
//! [`Engine`] binds a local connector's store and broker together and
//! implements every operation family of the [`api`](crate::api) module on
//! top of them.

use crate::config::ExpiryConfig;
use crate::connector::{Connector, LocalConnector, LOCAL_CONNECTOR_KIND};
use crate::error::{Error, Result};
use crate::pubsub::Broker;
use crate::storage::index::RESERVED_KEY_PREFIX;
use crate::storage::{ExpirySweeper, Keyspace, Object, ObjectType};
use crate::EngineConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::info;

/// Clears every key and all key indexes.
pub trait Flusher {
    fn flush_all(&self) -> Result<()>;
}

/// The embedded storage engine.
///
/// # Thread Safety
///
/// This struct is designed to be wrapped in an `Arc` and shared across
/// threads. Single-key store calls are atomic; read-modify-write operations
/// such as `increment` are not, and concurrent writers to one key can lose
/// updates.
///
/// # Example
///
/// ```
/// use localstore::{Engine, EngineConfig, KeyValueStore};
/// use std::time::Duration;
///
/// let engine = Engine::local(EngineConfig::default()).unwrap();
/// engine.set("a", "1", Duration::ZERO).unwrap();
/// assert_eq!(engine.increment("a").unwrap(), 2);
/// assert_eq!(engine.get("a").unwrap(), "2");
/// ```
pub struct Engine {
    connector: Arc<dyn Connector>,
    keyspace: Keyspace,
    broker: Arc<Broker>,
    sweeper: Mutex<Option<ExpirySweeper>>,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("connector", &self.connector.kind())
            .field("entries", &self.keyspace.store().len())
            .field("sweeping", &self.is_sweeping())
            .finish()
    }
}

impl Engine {
    /// Creates the facade from a connector.
    ///
    /// Starts the expiry sweeper when the connector's configuration asks
    /// for one.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidConnector`] if the connector is not a local driver
    /// - [`Error::InvalidHandlerType`] if it reports itself as local but is
    ///   not a [`LocalConnector`]
    /// - [`Error::InvalidOptions`] if the sweeper cannot be started
    pub fn new(connector: Arc<dyn Connector>) -> Result<Self> {
        if connector.kind() != LOCAL_CONNECTOR_KIND {
            return Err(Error::InvalidConnector(format!(
                "expected a '{}' connector, got '{}'",
                LOCAL_CONNECTOR_KIND,
                connector.kind()
            )));
        }

        let local = connector
            .downcast_ref::<LocalConnector>()
            .ok_or(Error::InvalidHandlerType)?;
        let keyspace = Keyspace::new(Arc::clone(local.store()));
        let broker = Arc::clone(local.broker());
        let expiry = local.config().expiry.clone();

        let engine = Self {
            connector,
            keyspace,
            broker,
            sweeper: Mutex::new(None),
        };

        if let Some(expiry) = expiry {
            engine.start_expiry_sweeper(expiry)?;
        }

        Ok(engine)
    }

    /// Creates a local connector from `config` and an engine over it.
    pub fn local(config: EngineConfig) -> Result<Self> {
        Self::new(Arc::new(LocalConnector::new(config)?))
    }

    pub fn connector(&self) -> &Arc<dyn Connector> {
        &self.connector
    }

    pub fn broker(&self) -> &Arc<Broker> {
        &self.broker
    }

    /// Starts (or restarts) the background expiry sweeper.
    pub fn start_expiry_sweeper(&self, config: ExpiryConfig) -> Result<()> {
        let sweeper = ExpirySweeper::start(self.keyspace.clone(), config)?;
        // Replacing a previous handle drops, and so stops, it
        *self.sweeper.lock() = Some(sweeper);
        Ok(())
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeper.lock().is_some()
    }

    /// Stops the background expiry sweeper, if running.
    pub fn stop(&self) {
        if let Some(sweeper) = self.sweeper.lock().take() {
            sweeper.stop();
        }
    }

    /// Returns the keyspace if the connector is still connected.
    pub(crate) fn keyspace(&self) -> Result<&Keyspace> {
        self.connector.ping()?;
        Ok(&self.keyspace)
    }

    /// Loads a live object, failing if it holds a type other than `expected`.
    pub(crate) fn load_typed(&self, key: &str, expected: ObjectType) -> Result<Option<Object>> {
        match self.keyspace()?.load_live(key)? {
            Some(object) if object.object_type() != expected => Err(Error::KeyMisstype),
            other => Ok(other),
        }
    }
}

impl Flusher for Engine {
    fn flush_all(&self) -> Result<()> {
        self.keyspace()?.flush()?;
        info!("Storage flushed");
        Ok(())
    }
}

/// Rejects empty keys and keys in the reserved index namespace before any
/// storage access.
#[inline]
pub(crate) fn check_key(key: &str) -> Result<()> {
    if key.is_empty() {
        Err(Error::KeyEmpty)
    } else if key.starts_with(RESERVED_KEY_PREFIX) {
        Err(Error::InvalidArgument(format!(
            "keys starting with {:?} are reserved",
            RESERVED_KEY_PREFIX
        )))
    } else {
        Ok(())
    }
}
