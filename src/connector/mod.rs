//! Connector Module
//!
//! A [`Connector`] is the lifecycle handle every storage driver exposes:
//! health check, disconnect, a driver name and a capability downcast. The
//! engine facade is built from a connector, so local and networked drivers
//! can be selected polymorphically and the facade recovers the concrete
//! driver through [`downcast_ref`](trait.Connector.html#method.downcast_ref).
//!
//! ```
//! use localstore::connector::{Connector, LocalConnector};
//! use std::sync::Arc;
//!
//! let connector: Arc<dyn Connector> = Arc::new(LocalConnector::default());
//! assert_eq!(connector.kind(), "local");
//! assert!(connector.downcast_ref::<LocalConnector>().is_some());
//!
//! connector.disconnect().unwrap();
//! assert!(connector.ping().is_err());
//! ```

pub mod local;

use crate::error::Result;
use std::any::Any;

pub use local::{LocalConnector, LOCAL_CONNECTOR_KIND};

/// Lifecycle and capability interface shared by all drivers.
pub trait Connector: Send + Sync + 'static {
    /// Checks that the connection is usable.
    fn ping(&self) -> Result<()>;

    /// Closes the connection; later operations fail with
    /// [`Error::ClosedConnection`](crate::Error::ClosedConnection).
    fn disconnect(&self) -> Result<()>;

    /// Driver name, e.g. `"local"`.
    fn kind(&self) -> &'static str;

    /// Exposes the concrete driver for [`downcast_ref`](#method.downcast_ref).
    fn as_any(&self) -> &dyn Any;
}

impl dyn Connector {
    /// Returns the concrete driver if it is a `T`.
    pub fn downcast_ref<T: Connector>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    /// Checks whether the concrete driver is a `T`.
    pub fn is<T: Connector>(&self) -> bool {
        self.as_any().is::<T>()
    }
}
