//! List operations.
//!
//! Lists are double-ended sequences of binary values. Indices follow the
//! engine's own clamping rules rather than Redis' exactly; see
//! [`ListStore::range`] and [`ListStore::pop`].

use crate::api::engine::check_key;
use crate::api::Engine;
use crate::error::{Error, Result};
use crate::storage::{Object, ObjectType, Value};
use bytes::Bytes;
use std::collections::VecDeque;

pub trait ListStore {
    /// Pushes each value to the head in order, so `a b c` ends up as `c b a`.
    ///
    /// `pipelined` is accepted for interface parity and has no effect.
    fn prepend(&self, pipelined: bool, key: &str, values: &[Bytes]) -> Result<()>;

    /// Pushes values to the tail in order.
    fn append(&self, pipelined: bool, key: &str, values: &[Bytes]) -> Result<()>;

    /// Removes elements equal to `element`.
    ///
    /// `count > 0` scans head to tail, `count < 0` tail to head, and
    /// `count == 0` removes every match. Returns the number removed.
    fn remove(&self, key: &str, count: i64, element: &[u8]) -> Result<i64>;

    /// Returns the inclusive range `[start, stop]`.
    ///
    /// A negative `start` clamps to 0, a negative `stop` means the end of the
    /// list, and `stop` past the end clamps to the last element.
    fn range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>>;

    /// Number of elements; 0 for missing or non-list keys.
    fn length(&self, key: &str) -> Result<i64>;

    /// Removes and returns the prefix `[0, stop]`; a negative `stop` pops
    /// everything.
    fn pop(&self, key: &str, stop: i64) -> Result<Vec<Bytes>>;
}

impl Engine {
    fn push(&self, key: &str, values: &[Bytes], front: bool) -> Result<()> {
        check_key(key)?;
        let keyspace = self.keyspace()?;

        let (mut object, existed) = match self.load_typed(key, ObjectType::List)? {
            Some(object) => (object, true),
            None => (Object::new(Value::List(VecDeque::new())), false),
        };
        let Value::List(list) = &mut object.value else {
            return Err(Error::KeyMisstype);
        };

        for value in values {
            if front {
                list.push_front(value.clone());
            } else {
                list.push_back(value.clone());
            }
        }

        if existed {
            keyspace.update(key, object)
        } else {
            keyspace.create(key, object)
        }
    }

    fn load_list(&self, key: &str) -> Result<Option<(Object, VecDeque<Bytes>)>> {
        check_key(key)?;
        match self.load_typed(key, ObjectType::List)? {
            Some(mut object) => match std::mem::replace(&mut object.value, Value::Deleted) {
                Value::List(list) => Ok(Some((object, list))),
                _ => Err(Error::KeyMisstype),
            },
            None => Ok(None),
        }
    }
}

impl ListStore for Engine {
    fn prepend(&self, _pipelined: bool, key: &str, values: &[Bytes]) -> Result<()> {
        self.push(key, values, true)
    }

    fn append(&self, _pipelined: bool, key: &str, values: &[Bytes]) -> Result<()> {
        self.push(key, values, false)
    }

    fn remove(&self, key: &str, count: i64, element: &[u8]) -> Result<i64> {
        let Some((mut object, mut list)) = self.load_list(key)? else {
            return Ok(0);
        };

        let max_remove = if count == 0 {
            usize::MAX
        } else {
            count.unsigned_abs() as usize
        };
        let mut removed = 0usize;

        if count >= 0 {
            let mut i = 0;
            while i < list.len() && removed < max_remove {
                if list[i].as_ref() == element {
                    list.remove(i);
                    removed += 1;
                } else {
                    i += 1;
                }
            }
        } else {
            let mut i = list.len();
            while i > 0 && removed < max_remove {
                i -= 1;
                if list[i].as_ref() == element {
                    list.remove(i);
                    removed += 1;
                }
            }
        }

        if removed > 0 {
            object.value = Value::List(list);
            self.keyspace()?.update(key, object)?;
        }
        Ok(removed as i64)
    }

    fn range(&self, key: &str, start: i64, stop: i64) -> Result<Vec<Bytes>> {
        let Some((_, list)) = self.load_list(key)? else {
            return Ok(Vec::new());
        };

        let len = list.len() as i64;
        let start = start.max(0);
        let stop = if stop < 0 || stop >= len { len - 1 } else { stop };

        if start >= len || start > stop {
            return Ok(Vec::new());
        }

        Ok(list
            .into_iter()
            .skip(start as usize)
            .take((stop - start + 1) as usize)
            .collect())
    }

    fn length(&self, key: &str) -> Result<i64> {
        check_key(key)?;
        match self.keyspace()?.load_live(key)? {
            Some(Object {
                value: Value::List(list),
                ..
            }) => Ok(list.len() as i64),
            _ => Ok(0),
        }
    }

    fn pop(&self, key: &str, stop: i64) -> Result<Vec<Bytes>> {
        let Some((mut object, mut list)) = self.load_list(key)? else {
            return Ok(Vec::new());
        };

        let take = if stop < 0 {
            list.len()
        } else {
            (stop as usize).saturating_add(1).min(list.len())
        };
        let popped: Vec<Bytes> = list.drain(..take).collect();

        if !popped.is_empty() {
            object.value = Value::List(list);
            self.keyspace()?.update(key, object)?;
        }
        Ok(popped)
    }
}
