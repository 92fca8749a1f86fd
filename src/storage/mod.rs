//! Storage Module
//!
//! This module provides the persistence side of localstore: the typed
//! object model, two interchangeable [`KvStore`] strategies, the key indexes
//! layered over them and the optional background expiry sweeper.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Keyspace                             │
//! │   ┌───────────────────────┐   ┌─────────────────────────┐   │
//! │   │  Arc<dyn KvStore>     │   │      KeyIndexes         │   │
//! │   │  MutexStore |         │◄──│  live / deleted / ttl   │   │
//! │   │  LockFreeStore        │   │  (reserved objects)     │   │
//! │   └───────────────────────┘   └─────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │
//!              ┌─────────────┴─────────────┐
//!              │     ExpirySweeper         │
//!              │  (optional Tokio task)    │
//!              └───────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use localstore::storage::{Keyspace, LockFreeStore, Object, Value};
//! use std::sync::Arc;
//!
//! let keyspace = Keyspace::new(Arc::new(LockFreeStore::new()));
//! keyspace.create("name", Object::new(Value::Bytes("alice".into()))).unwrap();
//!
//! let object = keyspace.load_live("name").unwrap().unwrap();
//! assert_eq!(object.value, Value::Bytes("alice".into()));
//! ```

pub mod expiry;
pub mod index;
pub mod keyspace;
pub mod lockfree;
pub mod object;
pub mod store;

// Re-export commonly used types
pub use expiry::ExpirySweeper;
pub use index::{IndexKind, KeyIndexes};
pub use keyspace::Keyspace;
pub use lockfree::LockFreeStore;
pub use object::{IndexMark, KeyIndex, Object, ObjectType, ScoredMember, Value};
pub use store::{Feature, Features, KvStore, MutexStore};
