//! Key Indexes
//!
//! Three indexes are layered over the [`KvStore`], each persisted as an
//! [`Object`] holding a [`Value::Index`] under a reserved key:
//!
//! | Index   | Contents                                  | Used by                 |
//! |---------|-------------------------------------------|-------------------------|
//! | live    | keys written and not deleted since        | `keys`, `delete_scan_match` |
//! | deleted | keys currently tombstoned                 | `keys` (subtracted)     |
//! | ttl     | key -> absolute expiry                    | the expiry sweeper      |
//!
//! Updates mutate the stored map in place under the store's per-key lock, so
//! recording one key costs the same however many keys are indexed. A key
//! write and its index updates are separate store calls; concurrent writers
//! can briefly see them out of step.

use crate::error::{Error, Result};
use crate::storage::{IndexMark, KeyIndex, KvStore, Object, Value};
use std::sync::Arc;
use std::time::Instant;

/// Prefix shared by every key the engine reserves for itself.
pub const RESERVED_KEY_PREFIX: &str = "\u{0}localstore:";

/// Reserved key of the live-key index.
pub const LIVE_INDEX_KEY: &str = "\u{0}localstore:keys";
/// Reserved key of the deleted-key index.
pub const DELETED_INDEX_KEY: &str = "\u{0}localstore:deleted";
/// Reserved key of the TTL index.
pub const TTL_INDEX_KEY: &str = "\u{0}localstore:ttl";

/// Identifies one of the three key indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    Live,
    Deleted,
    Ttl,
}

impl IndexKind {
    /// The reserved store key holding this index.
    pub fn store_key(&self) -> &'static str {
        match self {
            IndexKind::Live => LIVE_INDEX_KEY,
            IndexKind::Deleted => DELETED_INDEX_KEY,
            IndexKind::Ttl => TTL_INDEX_KEY,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            IndexKind::Live => "live",
            IndexKind::Deleted => "deleted",
            IndexKind::Ttl => "ttl",
        }
    }
}

fn corrupt(kind: IndexKind, found: &Object) -> Error {
    Error::CorruptIndex {
        index: kind.name(),
        found: found.object_type(),
    }
}

/// Accessor for the live, deleted and TTL indexes of one store.
#[derive(Clone)]
pub struct KeyIndexes {
    store: Arc<dyn KvStore>,
}

impl KeyIndexes {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Loads a copy of an index; a missing index object is an empty index.
    pub fn load(&self, kind: IndexKind) -> Result<KeyIndex> {
        self.read(kind, KeyIndex::clone)
    }

    /// Runs `f` on an index where it is stored, without copying it.
    fn read<T, F>(&self, kind: IndexKind, mut f: F) -> Result<T>
    where
        F: FnMut(&KeyIndex) -> T,
    {
        let mut outcome = None;
        self.store.inspect(kind.store_key(), &mut |object| {
            outcome = Some(match object {
                None => Ok(f(&KeyIndex::new())),
                Some(Object {
                    value: Value::Index(index),
                    ..
                }) => Ok(f(index)),
                Some(other) => Err(corrupt(kind, other)),
            });
        })?;

        match outcome {
            Some(outcome) => outcome,
            None => Ok(f(&KeyIndex::new())),
        }
    }

    /// Applies `f` to an index in place.
    ///
    /// A missing index is only created when `f` reports a change.
    fn update<F>(&self, kind: IndexKind, mut f: F) -> Result<()>
    where
        F: FnMut(&mut KeyIndex) -> bool,
    {
        let mut outcome = Ok(());
        self.store.update(kind.store_key(), &mut |slot| match slot {
            Some(Object {
                value: Value::Index(index),
                ..
            }) => {
                f(index);
            }
            Some(other) => outcome = Err(corrupt(kind, other)),
            None => {
                let mut index = KeyIndex::new();
                if f(&mut index) {
                    *slot = Some(Object::new(Value::Index(index)));
                }
            }
        })?;
        outcome
    }

    /// Registers `key` as live and erases any tombstone entry for it.
    pub fn record_live(&self, key: &str) -> Result<()> {
        self.update(IndexKind::Live, |index| {
            index.insert(key.to_string(), IndexMark::Present).is_none()
        })?;
        self.update(IndexKind::Deleted, |index| index.remove(key).is_some())
    }

    /// Moves `key` out of the live and TTL indexes.
    ///
    /// With `tombstoned` set the key is recorded in the deleted index; a hard
    /// delete leaves no trace.
    pub fn record_deleted(&self, key: &str, tombstoned: bool) -> Result<()> {
        self.update(IndexKind::Live, |index| index.remove(key).is_some())?;
        if tombstoned {
            self.update(IndexKind::Deleted, |index| {
                index.insert(key.to_string(), IndexMark::Present).is_none()
            })?;
        }
        self.set_expiry(key, None)
    }

    /// Records (or clears, with `None`) the absolute expiry of `key`.
    pub fn set_expiry(&self, key: &str, expires_at: Option<Instant>) -> Result<()> {
        self.update(IndexKind::Ttl, |index| match expires_at {
            Some(at) => index.insert(key.to_string(), IndexMark::Until(at))
                != Some(IndexMark::Until(at)),
            None => index.remove(key).is_some(),
        })
    }

    /// Keys in the live index that are not in the deleted index, sorted.
    pub fn live_keys(&self) -> Result<Vec<String>> {
        let deleted = self.load(IndexKind::Deleted)?;
        let mut keys: Vec<String> = self.read(IndexKind::Live, |live| {
            live.keys()
                .filter(|key| !deleted.contains_key(*key))
                .cloned()
                .collect()
        })?;
        keys.sort();
        Ok(keys)
    }

    /// Keys currently tombstoned, sorted.
    pub fn deleted_keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> =
            self.read(IndexKind::Deleted, |index| index.keys().cloned().collect())?;
        keys.sort();
        Ok(keys)
    }

    /// Entries of the TTL index whose expiry is at or before `now`.
    pub fn expired_at(&self, now: Instant) -> Result<Vec<(String, Instant)>> {
        self.read(IndexKind::Ttl, |index| {
            index
                .iter()
                .filter_map(|(key, mark)| match mark {
                    IndexMark::Until(at) if *at <= now => Some((key.clone(), *at)),
                    _ => None,
                })
                .collect()
        })
    }

    /// Number of entries in the TTL index.
    pub fn ttl_len(&self) -> Result<usize> {
        self.read(IndexKind::Ttl, KeyIndex::len)
    }

    /// Drops all three indexes.
    pub fn reset(&self) -> Result<()> {
        for kind in [IndexKind::Live, IndexKind::Deleted, IndexKind::Ttl] {
            self.store.delete(kind.store_key())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Features, LockFreeStore, MutexStore, ObjectType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn indexes() -> KeyIndexes {
        KeyIndexes::new(Arc::new(MutexStore::new()))
    }

    /// Counts whole-object copies handed out by `get`.
    struct CopyCountingStore {
        inner: LockFreeStore,
        copies: AtomicUsize,
    }

    impl KvStore for CopyCountingStore {
        fn get(&self, key: &str) -> Result<Option<Object>> {
            self.copies.fetch_add(1, Ordering::Relaxed);
            self.inner.get(key)
        }
        fn set(&self, key: &str, object: Object) -> Result<()> {
            self.inner.set(key, object)
        }
        fn delete(&self, key: &str) -> Result<()> {
            self.inner.delete(key)
        }
        fn update(&self, key: &str, f: &mut dyn FnMut(&mut Option<Object>)) -> Result<()> {
            self.inner.update(key, f)
        }
        fn inspect(&self, key: &str, f: &mut dyn FnMut(Option<&Object>)) -> Result<()> {
            self.inner.inspect(key, f)
        }
        fn flush_all(&self) -> Result<()> {
            self.inner.flush_all()
        }
        fn features(&self) -> Features {
            self.inner.features()
        }
        fn len(&self) -> usize {
            self.inner.len()
        }
    }

    #[test]
    fn test_updates_do_not_copy_indexes() {
        let store = Arc::new(CopyCountingStore {
            inner: LockFreeStore::new(),
            copies: AtomicUsize::new(0),
        });
        let indexes = KeyIndexes::new(store.clone());
        let later = Instant::now() + Duration::from_secs(60);

        for i in 0..5_000 {
            let key = format!("key:{}", i);
            indexes.record_live(&key).unwrap();
            indexes.set_expiry(&key, Some(later)).unwrap();
            if i % 2 == 0 {
                indexes.record_deleted(&key, true).unwrap();
            }
        }

        assert_eq!(indexes.ttl_len().unwrap(), 2_500);
        assert!(indexes.expired_at(Instant::now()).unwrap().is_empty());
        assert_eq!(indexes.live_keys().unwrap().len(), 2_500);
        assert_eq!(store.copies.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_index_keys_are_reserved() {
        for kind in [IndexKind::Live, IndexKind::Deleted, IndexKind::Ttl] {
            assert!(kind.store_key().starts_with(RESERVED_KEY_PREFIX));
        }
    }

    #[test]
    fn test_empty_indexes() {
        let indexes = indexes();
        assert!(indexes.live_keys().unwrap().is_empty());
        assert!(indexes.deleted_keys().unwrap().is_empty());
        assert_eq!(indexes.ttl_len().unwrap(), 0);
    }

    #[test]
    fn test_live_deleted_transitions() {
        let indexes = indexes();

        indexes.record_live("a").unwrap();
        indexes.record_live("b").unwrap();
        indexes.record_live("a").unwrap();
        assert_eq!(indexes.live_keys().unwrap(), vec!["a", "b"]);

        indexes.record_deleted("a", true).unwrap();
        assert_eq!(indexes.live_keys().unwrap(), vec!["b"]);
        assert_eq!(indexes.deleted_keys().unwrap(), vec!["a"]);

        // Resurrection
        indexes.record_live("a").unwrap();
        assert_eq!(indexes.live_keys().unwrap(), vec!["a", "b"]);
        assert!(indexes.deleted_keys().unwrap().is_empty());
    }

    #[test]
    fn test_hard_delete_leaves_no_tombstone() {
        let indexes = indexes();
        indexes.record_live("a").unwrap();
        indexes.record_deleted("a", false).unwrap();

        assert!(indexes.live_keys().unwrap().is_empty());
        assert!(indexes.deleted_keys().unwrap().is_empty());
    }

    #[test]
    fn test_ttl_index() {
        let indexes = indexes();
        let now = Instant::now();

        indexes.set_expiry("soon", Some(now)).unwrap();
        indexes
            .set_expiry("later", Some(now + Duration::from_secs(60)))
            .unwrap();
        assert_eq!(indexes.ttl_len().unwrap(), 2);

        let expired = indexes.expired_at(now).unwrap();
        assert_eq!(expired, vec![("soon".to_string(), now)]);

        indexes.set_expiry("soon", None).unwrap();
        assert_eq!(indexes.ttl_len().unwrap(), 1);

        // Deleting a key drops its TTL entry too
        indexes.record_deleted("later", true).unwrap();
        assert_eq!(indexes.ttl_len().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_index() {
        let store = Arc::new(MutexStore::new());
        store
            .set(LIVE_INDEX_KEY, Object::new(Value::Counter(3)))
            .unwrap();

        let indexes = KeyIndexes::new(store.clone());
        let corrupt = Error::CorruptIndex {
            index: "live",
            found: ObjectType::Counter,
        };
        assert_eq!(indexes.live_keys(), Err(corrupt.clone()));
        assert_eq!(indexes.record_live("a"), Err(corrupt));

        // The offending object is left as it was
        assert_eq!(
            store.get(LIVE_INDEX_KEY).unwrap().map(|o| o.value),
            Some(Value::Counter(3))
        );
    }

    #[test]
    fn test_reset() {
        let indexes = indexes();
        indexes.record_live("a").unwrap();
        indexes.record_deleted("b", true).unwrap();
        indexes
            .set_expiry("c", Some(Instant::now() + Duration::from_secs(1)))
            .unwrap();

        indexes.reset().unwrap();
        assert!(indexes.live_keys().unwrap().is_empty());
        assert!(indexes.deleted_keys().unwrap().is_empty());
        assert_eq!(indexes.ttl_len().unwrap(), 0);
    }
}
