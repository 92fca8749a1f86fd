//! Key-Value Store Strategies
//!
//! [`KvStore`] is the minimal persistence capability the engine builds on:
//! point reads and writes of whole [`Object`]s plus a flush. Two strategies
//! implement it:
//!
//! - [`MutexStore`]: one reader/writer lock around a `HashMap`; soft delete.
//! - [`LockFreeStore`](super::LockFreeStore): a sharded `DashMap`; hard delete.
//!
//! Neither provides atomicity across keys or across a separate read and
//! write; the engine's composite operations accept that race. In-place
//! mutation through [`KvStore::update`] is atomic for its one key.

use crate::error::Result;
use crate::storage::Object;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// A capability a store may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// `flush_all` clears every key
    FlushAll,
    /// `delete` physically removes entries, so tombstones are not needed
    HardDelete,
}

/// The set of capabilities advertised by a store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Features(HashSet<Feature>);

impl Features {
    pub fn new(features: &[Feature]) -> Self {
        Self(features.iter().copied().collect())
    }

    pub fn contains(&self, feature: Feature) -> bool {
        self.0.contains(&feature)
    }
}

/// Minimal key/value persistence used by the engine.
///
/// Absence is not an error: `get` on a missing key returns `Ok(None)`.
pub trait KvStore: Send + Sync {
    /// Returns a copy of the object stored under `key`.
    fn get(&self, key: &str) -> Result<Option<Object>>;

    /// Stores `object` under `key`, replacing any previous object.
    fn set(&self, key: &str, object: Object) -> Result<()>;

    /// Removes `key`; removing a missing key succeeds.
    fn delete(&self, key: &str) -> Result<()>;

    /// Mutates the entry under `key` in place while holding its lock.
    ///
    /// `f` sees `None` for a missing key. Leaving `Some` stores the object,
    /// leaving `None` removes the entry. `f` must not call back into the
    /// store.
    fn update(&self, key: &str, f: &mut dyn FnMut(&mut Option<Object>)) -> Result<()>;

    /// Runs `f` on the object under `key` without copying it.
    fn inspect(&self, key: &str, f: &mut dyn FnMut(Option<&Object>)) -> Result<()>;

    /// Removes every key.
    fn flush_all(&self) -> Result<()>;

    /// Capabilities of this store.
    fn features(&self) -> Features;

    /// Number of physical entries, tombstones and index objects included.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A `HashMap` guarded by a single reader/writer lock.
#[derive(Debug, Default)]
pub struct MutexStore {
    data: RwLock<HashMap<String, Object>>,
}

impl MutexStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MutexStore {
    fn get(&self, key: &str) -> Result<Option<Object>> {
        Ok(self.data.read().get(key).cloned())
    }

    fn set(&self, key: &str, object: Object) -> Result<()> {
        self.data.write().insert(key.to_string(), object);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.data.write().remove(key);
        Ok(())
    }

    fn update(&self, key: &str, f: &mut dyn FnMut(&mut Option<Object>)) -> Result<()> {
        let mut data = self.data.write();
        let mut slot = data
            .get_mut(key)
            .map(|existing| std::mem::replace(existing, Object::tombstone()));

        f(&mut slot);

        match slot {
            Some(object) => match data.get_mut(key) {
                Some(existing) => *existing = object,
                None => {
                    data.insert(key.to_string(), object);
                }
            },
            None => {
                data.remove(key);
            }
        }
        Ok(())
    }

    fn inspect(&self, key: &str, f: &mut dyn FnMut(Option<&Object>)) -> Result<()> {
        f(self.data.read().get(key));
        Ok(())
    }

    fn flush_all(&self) -> Result<()> {
        self.data.write().clear();
        Ok(())
    }

    fn features(&self) -> Features {
        Features::new(&[Feature::FlushAll])
    }

    fn len(&self) -> usize {
        self.data.read().len()
    }
}
