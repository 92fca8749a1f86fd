//! Error Types
//!
//! Every fallible operation in localstore returns [`Result<T>`], whose error
//! side is the single [`Error`] enum below. Callers match on the variant to
//! tell validation problems (`KeyEmpty`), absent data (`KeyNotFound`) and type
//! clashes (`KeyMisstype`) apart from lifecycle misuse.

use crate::storage::ObjectType;

/// Errors produced by the storage engine, its stores and the pub/sub broker.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// An empty key was passed to an operation that requires one
    #[error("key is empty")]
    KeyEmpty,

    /// The key is absent, expired or deleted
    #[error("key not found")]
    KeyNotFound,

    /// The key holds a value of a different structural type
    #[error("key holds a value of the wrong type")]
    KeyMisstype,

    /// The connector passed to the engine is not a local connector
    #[error("invalid connector: {0}")]
    InvalidConnector(String),

    /// The connector claims to be local but exposes an unexpected handler
    #[error("invalid handler type for local connector")]
    InvalidHandlerType,

    /// Engine configuration failed validation
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// The connector was disconnected
    #[error("connection closed")]
    ClosedConnection,

    /// The subscription was already closed
    #[error("subscription already closed")]
    SubscriptionClosed,

    /// A blocking receive was cancelled by its token
    #[error("operation cancelled")]
    Cancelled,

    /// An argument could not be interpreted (score bounds, overflow)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A reserved index key holds something other than an index
    #[error("key index '{index}' is corrupted: found {found} value")]
    CorruptIndex {
        /// Name of the affected index
        index: &'static str,
        /// Type actually stored under the index key
        found: ObjectType,
    },
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
