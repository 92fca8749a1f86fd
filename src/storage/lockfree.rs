//! Lock-free store backed by a sharded concurrent hashmap.
//!
//! Reads and writes only touch the shard owning the key. Iterating a
//! `DashMap` while removing from it can deadlock on the shard being walked,
//! so `flush_all` snapshots the key set first and removes entries afterwards.

use crate::error::Result;
use crate::storage::{Feature, Features, KvStore, Object};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;

/// A [`KvStore`] over `DashMap` that physically removes deleted keys.
#[derive(Debug, Default)]
pub struct LockFreeStore {
    data: DashMap<String, Object>,
    /// Held only while collecting the key snapshot of a flush
    flush_lock: Mutex<()>,
}

impl LockFreeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for LockFreeStore {
    fn get(&self, key: &str) -> Result<Option<Object>> {
        Ok(self.data.get(key).map(|entry| entry.value().clone()))
    }

    fn set(&self, key: &str, object: Object) -> Result<()> {
        self.data.insert(key.to_string(), object);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.data.remove(key);
        Ok(())
    }

    fn update(&self, key: &str, f: &mut dyn FnMut(&mut Option<Object>)) -> Result<()> {
        match self.data.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                let mut slot = Some(std::mem::replace(occupied.get_mut(), Object::tombstone()));
                f(&mut slot);
                match slot {
                    Some(object) => *occupied.get_mut() = object,
                    None => {
                        occupied.remove();
                    }
                }
            }
            Entry::Vacant(vacant) => {
                let mut slot = None;
                f(&mut slot);
                if let Some(object) = slot {
                    vacant.insert(object);
                }
            }
        }
        Ok(())
    }

    fn inspect(&self, key: &str, f: &mut dyn FnMut(Option<&Object>)) -> Result<()> {
        let entry = self.data.get(key);
        f(entry.as_deref());
        Ok(())
    }

    fn flush_all(&self) -> Result<()> {
        let keys: Vec<String> = {
            let _guard = self.flush_lock.lock();
            self.data.iter().map(|entry| entry.key().clone()).collect()
        };

        trace!(keys = keys.len(), "Flushing lock-free store");

        for key in &keys {
            self.data.remove(key);
        }
        Ok(())
    }

    fn features(&self) -> Features {
        Features::new(&[Feature::FlushAll, Feature::HardDelete])
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
