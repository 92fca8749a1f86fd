//! String and counter operations.

use crate::api::engine::check_key;
use crate::api::Engine;
use crate::error::{Error, Result};
use crate::storage::{Object, ObjectType, Value};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::trace;

/// String/counter get-set, expiry and key enumeration.
///
/// A zero `ttl` always means "never expires".
pub trait KeyValueStore {
    /// Returns the value of a live string or counter key.
    fn get(&self, key: &str) -> Result<String>;

    /// Stores `value`, replacing whatever `key` held.
    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Stores `value` only if `key` is absent, deleted or expired.
    fn set_if_not_exist(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    fn delete(&self, key: &str) -> Result<()>;

    fn increment(&self, key: &str) -> Result<i64>;

    fn decrement(&self, key: &str) -> Result<i64>;

    fn exists(&self, key: &str) -> Result<bool>;

    fn expire(&self, key: &str, ttl: Duration) -> Result<()>;

    /// Remaining seconds to live; `-1` without expiry, `-2` when missing.
    fn ttl(&self, key: &str) -> Result<i64>;

    /// Deletes the keys that currently exist and returns how many there were.
    fn delete_keys(&self, keys: &[&str]) -> Result<i64>;

    /// Live keys starting with `pattern` minus one trailing `*`, sorted.
    fn keys(&self, pattern: &str) -> Result<Vec<String>>;

    fn delete_scan_match(&self, pattern: &str) -> Result<i64>;

    /// Positional lookup; keys that cannot be read yield `None`.
    fn get_multi(&self, keys: &[&str]) -> Result<Vec<Option<String>>>;

    fn get_keys_and_values_with_filter(&self, pattern: &str) -> Result<HashMap<String, String>>;

    fn get_keys_and_values(&self) -> Result<HashMap<String, String>> {
        self.get_keys_and_values_with_filter("*")
    }
}

impl Engine {
    /// Adds `delta` to a counter, creating it at `delta` if absent.
    ///
    /// Decimal strings are coerced; any other type is a
    /// [`Error::KeyMisstype`]. An existing expiry is preserved.
    pub fn increment_by(&self, key: &str, delta: i64) -> Result<i64> {
        check_key(key)?;
        let keyspace = self.keyspace()?;

        let Some(mut object) = keyspace.load_live(key)? else {
            keyspace.create(key, Object::new(Value::Counter(delta)))?;
            return Ok(delta);
        };

        let current = match &object.value {
            Value::Counter(n) => *n,
            Value::Bytes(s) => s.parse::<i64>().map_err(|_| Error::KeyMisstype)?,
            _ => return Err(Error::KeyMisstype),
        };

        let next = current
            .checked_add(delta)
            .ok_or_else(|| Error::InvalidArgument("increment would overflow".to_string()))?;

        object.value = Value::Counter(next);
        keyspace.update(key, object)?;
        Ok(next)
    }

    /// Returns the type of a live key, or `None` if it is not live.
    pub fn key_type(&self, key: &str) -> Result<Option<ObjectType>> {
        check_key(key)?;
        Ok(self
            .keyspace()?
            .load_live(key)?
            .map(|object| object.object_type()))
    }
}

impl KeyValueStore for Engine {
    fn get(&self, key: &str) -> Result<String> {
        check_key(key)?;
        let object = self
            .keyspace()?
            .load_live(key)?
            .ok_or(Error::KeyNotFound)?;

        match object.value {
            Value::Bytes(s) => Ok(s),
            Value::Counter(n) => Ok(n.to_string()),
            _ => Err(Error::KeyMisstype),
        }
    }

    fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        check_key(key)?;
        self.keyspace()?
            .create(key, Object::with_ttl(Value::Bytes(value.to_string()), ttl))
    }

    fn set_if_not_exist(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        check_key(key)?;
        let keyspace = self.keyspace()?;

        if keyspace.load_live(key)?.is_some() {
            return Ok(false);
        }

        keyspace.create(key, Object::with_ttl(Value::Bytes(value.to_string()), ttl))?;
        Ok(true)
    }

    fn delete(&self, key: &str) -> Result<()> {
        check_key(key)?;
        self.keyspace()?.remove(key)?;
        Ok(())
    }

    fn increment(&self, key: &str) -> Result<i64> {
        self.increment_by(key, 1)
    }

    fn decrement(&self, key: &str) -> Result<i64> {
        self.increment_by(key, -1)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        match self.get(key) {
            Ok(_) => Ok(true),
            Err(Error::KeyNotFound) | Err(Error::KeyMisstype) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn expire(&self, key: &str, ttl: Duration) -> Result<()> {
        check_key(key)?;
        let keyspace = self.keyspace()?;

        let Some(object) = keyspace.load_live(key)? else {
            return Ok(());
        };

        let expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
        keyspace.update_expiry(key, object, expires_at)
    }

    fn ttl(&self, key: &str) -> Result<i64> {
        check_key(key)?;

        let Some(object) = self.keyspace()?.load_live(key)? else {
            return Ok(-2);
        };

        Ok(object
            .remaining_ttl()
            .map(|remaining| remaining.as_secs_f64().round() as i64)
            .unwrap_or(-1))
    }

    fn delete_keys(&self, keys: &[&str]) -> Result<i64> {
        if keys.is_empty() {
            return Err(Error::KeyEmpty);
        }
        for key in keys {
            check_key(key)?;
        }

        let keyspace = self.keyspace()?;
        let mut deleted = 0;
        for key in keys {
            if keyspace.load_live(key)?.is_some() && keyspace.remove(key)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    fn keys(&self, pattern: &str) -> Result<Vec<String>> {
        let keyspace = self.keyspace()?;
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);

        let mut keys = Vec::new();
        for key in keyspace.indexes().live_keys()? {
            if key.starts_with(prefix) && keyspace.load_live(&key)?.is_some() {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn delete_scan_match(&self, pattern: &str) -> Result<i64> {
        let keyspace = self.keyspace()?;

        let mut deleted = 0;
        for key in self.keys(pattern)? {
            if keyspace.remove(&key)? {
                deleted += 1;
            }
        }

        trace!(pattern = %pattern, deleted = deleted, "Deleted keys by pattern");
        Ok(deleted)
    }

    fn get_multi(&self, keys: &[&str]) -> Result<Vec<Option<String>>> {
        self.keyspace()?;
        Ok(keys.iter().map(|key| self.get(key).ok()).collect())
    }

    fn get_keys_and_values_with_filter(&self, pattern: &str) -> Result<HashMap<String, String>> {
        let mut values = HashMap::new();
        for key in self.keys(pattern)? {
            match self.get(&key) {
                Ok(value) => {
                    values.insert(key, value);
                }
                Err(e) => trace!(key = %key, error = %e, "Skipping unreadable key"),
            }
        }
        Ok(values)
    }
}
