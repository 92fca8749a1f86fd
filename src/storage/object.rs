//! Stored Objects
//!
//! Every key in a [`KvStore`](super::KvStore) maps to an [`Object`]: a typed
//! [`Value`] plus expiry and tombstone metadata.
//!
//! ## Lifecycle
//!
//! ```text
//!   absent ──write──> live ──delete──> tombstoned ──write──> live
//!                      │
//!                      └──time passes──> expired ──write──> live
//! ```
//!
//! Expiry is evaluated lazily: an Object whose `expires_at` lies in the past
//! is treated as absent by every read and overwritten by every write.

use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::time::{Duration, Instant};

/// The structural type of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectType {
    /// Plain string value
    Bytes,
    /// 64-bit signed counter
    Counter,
    /// Double-ended list of byte strings
    List,
    /// Unordered set of members
    Set,
    /// Members ordered by score
    SortedSet,
    /// Internal key index
    Index,
    /// Soft-deleted tombstone
    Deleted,
}

impl ObjectType {
    /// Returns the lowercase name used in logs and errors.
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectType::Bytes => "bytes",
            ObjectType::Counter => "counter",
            ObjectType::List => "list",
            ObjectType::Set => "set",
            ObjectType::SortedSet => "sortedset",
            ObjectType::Index => "index",
            ObjectType::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A sorted-set member together with its score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredMember {
    pub member: String,
    pub score: f64,
}

impl ScoredMember {
    pub fn new(member: impl Into<String>, score: f64) -> Self {
        Self {
            member: member.into(),
            score,
        }
    }
}

/// An entry in a key index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexMark {
    /// The key is a member of the index
    Present,
    /// The key expires at the given instant (TTL index)
    Until(Instant),
}

/// Mapping from user key to index mark, stored under a reserved key.
pub type KeyIndex = HashMap<String, IndexMark>;

/// The payload of an [`Object`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Bytes(String),
    Counter(i64),
    List(VecDeque<Bytes>),
    Set(Vec<String>),
    /// Kept sorted by `(score, member)`
    SortedSet(Vec<ScoredMember>),
    Index(KeyIndex),
    /// Tombstone; the previous value has been dropped
    Deleted,
}

impl Value {
    /// Returns the structural type of this value.
    pub fn object_type(&self) -> ObjectType {
        match self {
            Value::Bytes(_) => ObjectType::Bytes,
            Value::Counter(_) => ObjectType::Counter,
            Value::List(_) => ObjectType::List,
            Value::Set(_) => ObjectType::Set,
            Value::SortedSet(_) => ObjectType::SortedSet,
            Value::Index(_) => ObjectType::Index,
            Value::Deleted => ObjectType::Deleted,
        }
    }
}

/// A stored value with optional expiry and tombstone state.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    /// The actual value stored
    pub value: Value,
    /// When this object expires (None = never expires)
    pub expires_at: Option<Instant>,
    /// When this object was soft-deleted (None = not deleted)
    pub deleted_at: Option<Instant>,
}

impl Object {
    /// Creates a new object without expiry.
    pub fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
            deleted_at: None,
        }
    }

    /// Creates a new object that expires after `ttl`.
    ///
    /// A zero `ttl` means the object never expires.
    pub fn with_ttl(value: Value, ttl: Duration) -> Self {
        let mut object = Self::new(value);
        object.set_ttl(ttl);
        object
    }

    /// Creates a tombstone stamped with the current time.
    pub fn tombstone() -> Self {
        Self {
            value: Value::Deleted,
            expires_at: None,
            deleted_at: Some(Instant::now()),
        }
    }

    /// Returns the structural type of the stored value.
    #[inline]
    pub fn object_type(&self) -> ObjectType {
        self.value.object_type()
    }

    /// Sets the expiry relative to now; zero clears it.
    pub fn set_ttl(&mut self, ttl: Duration) {
        self.expires_at = if ttl.is_zero() {
            None
        } else {
            Some(Instant::now() + ttl)
        };
    }

    /// Checks if this object has expired.
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.expires_at
            .map(|exp| Instant::now() >= exp)
            .unwrap_or(false)
    }

    /// Checks if this object is a tombstone.
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// A live object is neither deleted nor expired.
    #[inline]
    pub fn is_live(&self) -> bool {
        !self.is_deleted() && !self.is_expired()
    }

    /// Returns the remaining TTL, or None if no expiry.
    pub fn remaining_ttl(&self) -> Option<Duration> {
        self.expires_at
            .map(|exp| exp.saturating_duration_since(Instant::now()))
    }
}
