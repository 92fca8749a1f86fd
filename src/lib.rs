//! # localstore - An Embedded In-Memory Redis-Like Engine
//!
//! localstore is a self-contained, thread-safe key-value engine exposing
//! Redis-like primitives without any external database: strings and
//! counters, lists, sets, sorted sets, TTL expiry, key enumeration and an
//! in-process publish/subscribe broker. It is meant as a drop-in substitute
//! for networked drivers in tests and single-process deployments.
//!
//! ## Features
//!
//! - **Typed Objects**: every key holds a tagged value; using a key with the
//!   wrong operation family is an error, never a silent coercion
//! - **Two Store Strategies**: a `RwLock`-guarded map or a lock-free
//!   concurrent map with hard deletes
//! - **Soft Delete**: deleted keys are tombstoned and tracked in a deleted-key
//!   index until rewritten
//! - **TTL Support**: lazy expiry on access plus an optional background sweeper
//! - **Pub/Sub**: bounded, non-blocking fan-out to in-process subscribers
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              localstore                                 │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                          Engine                                 │    │
//! │  │  KeyValueStore · ListStore · SetStore · SortedSetStore ·        │    │
//! │  │  Queue · Flusher                                                │    │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘    │
//! │                 │                              │                        │
//! │                 ▼                              ▼                        │
//! │  ┌──────────────────────────────┐    ┌────────────────────┐             │
//! │  │          Keyspace            │    │      Broker        │             │
//! │  │  ┌────────────┐ ┌──────────┐ │    │  channel → bounded │             │
//! │  │  │  KvStore   │ │  Key     │ │    │  subscriber queues │             │
//! │  │  │ Mutex|Lock │ │ Indexes  │ │    └────────────────────┘             │
//! │  │  │ Free       │ │          │ │                                       │
//! │  │  └────────────┘ └──────────┘ │    ┌────────────────────┐             │
//! │  └──────────────▲───────────────┘    │  LocalConnector    │             │
//! │                 │                    │  ping · disconnect │             │
//! │  ┌──────────────┴───────────────┐    └────────────────────┘             │
//! │  │  ExpirySweeper (optional)    │                                       │
//! │  └──────────────────────────────┘                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use localstore::{Engine, EngineConfig, KeyValueStore, ListStore, StoreKind};
//! use bytes::Bytes;
//! use std::time::Duration;
//!
//! let engine = Engine::local(EngineConfig::default().with_store(StoreKind::LockFree)).unwrap();
//!
//! engine.set("session", "token", Duration::from_secs(60)).unwrap();
//! assert_eq!(engine.get("session").unwrap(), "token");
//!
//! engine.append(false, "jobs", &[Bytes::from("a"), Bytes::from("b")]).unwrap();
//! assert_eq!(engine.pop("jobs", -1).unwrap().len(), 2);
//!
//! assert_eq!(engine.keys("*").unwrap(), vec!["jobs", "session"]);
//! ```
//!
//! ## Module Overview
//!
//! - [`api`]: the engine facade and its operation traits
//! - [`storage`]: object model, stores, key indexes and expiry sweeper
//! - [`pubsub`]: the in-process broker
//! - [`connector`]: connection lifecycle and driver downcast
//! - [`config`]: engine configuration and environment overrides
//! - [`error`]: the crate-wide error type
//!
//! ## Design Highlights
//!
//! ### Indexes as Objects
//!
//! The live, deleted and TTL key indexes are ordinary objects stored under
//! reserved keys in the same store, so any [`storage::KvStore`] works
//! without extra plumbing.
//!
//! ### Lazy + Active Expiry
//!
//! Keys with TTL are expired in two ways:
//! 1. **Lazy**: every read treats an expired object as absent
//! 2. **Active**: an opt-in background task walks the TTL index and deletes
//!    expired keys
//!
//! ### Concurrency
//!
//! Single store calls are atomic. Read-modify-write operations (increments,
//! list and set mutations, index updates) are not, so concurrent writers to
//! one key may lose updates.

pub mod api;
pub mod config;
pub mod connector;
pub mod error;
pub mod pubsub;
pub mod storage;

// Re-export commonly used types for convenience
pub use api::{Engine, Flusher, KeyValueStore, ListStore, Queue, SetStore, SortedSetStore};
pub use config::{EngineConfig, ExpiryConfig, StoreKind};
pub use connector::{Connector, LocalConnector};
pub use error::{Error, Result};
pub use pubsub::{Broker, Message, MessageKind, Subscription};

/// Version of localstore
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
