//! Keyspace: a store together with its key indexes.
//!
//! The engine facade and the expiry sweeper both go through a [`Keyspace`]
//! so that creating, tombstoning and purging a key always keeps the live,
//! deleted and TTL indexes in step with the objects themselves.

use crate::error::Result;
use crate::storage::{Feature, KeyIndexes, KvStore, Object};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, trace};

/// A [`KvStore`] plus the indexes layered over it.
#[derive(Clone)]
pub struct Keyspace {
    store: Arc<dyn KvStore>,
    indexes: KeyIndexes,
    hard_delete: bool,
}

impl Keyspace {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        let hard_delete = store.features().contains(Feature::HardDelete);
        Self {
            indexes: KeyIndexes::new(Arc::clone(&store)),
            store,
            hard_delete,
        }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn indexes(&self) -> &KeyIndexes {
        &self.indexes
    }

    /// Returns the object under `key` if it is neither deleted nor expired.
    pub fn load_live(&self, key: &str) -> Result<Option<Object>> {
        Ok(self.store.get(key)?.filter(Object::is_live))
    }

    /// Writes a freshly created (or replaced) object and registers the key.
    ///
    /// The key becomes live, loses any tombstone entry and its TTL index
    /// entry follows `object.expires_at`.
    pub fn create(&self, key: &str, object: Object) -> Result<()> {
        let expires_at = object.expires_at;
        self.store.set(key, object)?;
        self.indexes.record_live(key)?;
        self.indexes.set_expiry(key, expires_at)?;
        trace!(key = %key, "Key written");
        Ok(())
    }

    /// Writes back a mutated object that was already live.
    pub fn update(&self, key: &str, object: Object) -> Result<()> {
        self.store.set(key, object)
    }

    /// Replaces the expiry of a live object and keeps the TTL index in step.
    pub fn update_expiry(
        &self,
        key: &str,
        mut object: Object,
        expires_at: Option<Instant>,
    ) -> Result<()> {
        object.expires_at = expires_at;
        self.store.set(key, object)?;
        self.indexes.set_expiry(key, expires_at)
    }

    /// Deletes `key`: physically on hard-delete stores, otherwise by
    /// tombstoning it.
    ///
    /// Returns `false` when there was nothing to delete.
    pub fn remove(&self, key: &str) -> Result<bool> {
        match self.store.get(key)? {
            None => return Ok(false),
            Some(object) if object.is_deleted() => return Ok(false),
            Some(_) => {}
        }

        if self.hard_delete {
            self.store.delete(key)?;
        } else {
            self.store.set(key, Object::tombstone())?;
        }
        self.indexes.record_deleted(key, !self.hard_delete)?;

        debug!(key = %key, hard = self.hard_delete, "Key deleted");
        Ok(true)
    }

    /// Deletes every key whose TTL index entry has passed.
    ///
    /// Entries that no longer describe the stored object (the key was
    /// rewritten or removed since) are dropped from the TTL index.
    ///
    /// # Returns
    ///
    /// The number of keys that were deleted.
    pub fn purge_expired(&self) -> Result<u64> {
        let mut purged = 0u64;

        for (key, _) in self.indexes.expired_at(Instant::now())? {
            match self.store.get(&key)? {
                Some(object) if object.is_live() => {
                    self.indexes.set_expiry(&key, object.expires_at)?;
                }
                Some(object) if object.is_expired() => {
                    if self.remove(&key)? {
                        purged += 1;
                    }
                }
                _ => self.indexes.set_expiry(&key, None)?,
            }
        }

        Ok(purged)
    }

    /// Clears the store and resets all indexes.
    pub fn flush(&self) -> Result<()> {
        self.store.flush_all()?;
        self.indexes.reset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{LockFreeStore, MutexStore, Value};
    use std::time::Duration;

    #[test]
    fn test_soft_delete_tombstones() {
        let keyspace = Keyspace::new(Arc::new(MutexStore::new()));
        keyspace
            .create("k", Object::new(Value::Bytes("v".into())))
            .unwrap();

        assert!(keyspace.remove("k").unwrap());
        let raw = keyspace.store().get("k").unwrap().unwrap();
        assert!(raw.is_deleted());
        assert_eq!(raw.value, Value::Deleted);
        assert_eq!(keyspace.indexes().deleted_keys().unwrap(), vec!["k"]);

        // Already tombstoned
        assert!(!keyspace.remove("k").unwrap());
        assert_eq!(keyspace.load_live("k").unwrap(), None);
    }

    #[test]
    fn test_hard_delete_removes_entry() {
        let keyspace = Keyspace::new(Arc::new(LockFreeStore::new()));
        keyspace.create("k", Object::new(Value::Counter(1))).unwrap();

        assert!(keyspace.remove("k").unwrap());
        assert_eq!(keyspace.store().get("k").unwrap(), None);
        assert!(keyspace.indexes().live_keys().unwrap().is_empty());
        assert!(keyspace.indexes().deleted_keys().unwrap().is_empty());
        assert!(!keyspace.remove("k").unwrap());
    }

    #[test]
    fn test_purge_expired() {
        let keyspace = Keyspace::new(Arc::new(MutexStore::new()));
        keyspace
            .create(
                "short",
                Object::with_ttl(Value::Counter(1), Duration::from_millis(10)),
            )
            .unwrap();
        keyspace
            .create(
                "long",
                Object::with_ttl(Value::Counter(2), Duration::from_secs(60)),
            )
            .unwrap();
        keyspace.create("forever", Object::new(Value::Counter(3))).unwrap();

        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(keyspace.purge_expired().unwrap(), 1);
        assert_eq!(keyspace.indexes().ttl_len().unwrap(), 1);
        assert_eq!(
            keyspace.indexes().live_keys().unwrap(),
            vec!["forever", "long"]
        );
        assert_eq!(keyspace.purge_expired().unwrap(), 0);
    }

    #[test]
    fn test_purge_skips_rewritten_keys() {
        let keyspace = Keyspace::new(Arc::new(MutexStore::new()));
        keyspace
            .create(
                "k",
                Object::with_ttl(Value::Counter(1), Duration::from_millis(10)),
            )
            .unwrap();

        // Rewrite without touching the TTL index
        keyspace.update("k", Object::new(Value::Counter(2))).unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(keyspace.purge_expired().unwrap(), 0);
        assert_eq!(keyspace.indexes().ttl_len().unwrap(), 0);
        assert!(keyspace.load_live("k").unwrap().is_some());
    }

    #[test]
    fn test_flush() {
        let keyspace = Keyspace::new(Arc::new(MutexStore::new()));
        keyspace.create("a", Object::new(Value::Counter(1))).unwrap();
        keyspace.create("b", Object::new(Value::Counter(1))).unwrap();
        keyspace.remove("b").unwrap();

        keyspace.flush().unwrap();
        assert!(keyspace.store().is_empty());
        assert!(keyspace.indexes().live_keys().unwrap().is_empty());
        assert!(keyspace.indexes().deleted_keys().unwrap().is_empty());
    }
}
