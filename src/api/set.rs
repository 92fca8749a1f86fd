//! Unordered set operations.

use crate::api::engine::check_key;
use crate::api::Engine;
use crate::error::{Error, Result};
use crate::storage::{Object, ObjectType, Value};

/// Set operations. Members are unique; adding an existing member is a no-op.
pub trait SetStore {
    fn add_member(&self, key: &str, member: &str) -> Result<()>;

    /// Removes every occurrence of `member`.
    fn remove_member(&self, key: &str, member: &str) -> Result<()>;

    fn is_member(&self, key: &str, member: &str) -> Result<bool>;

    /// Members in insertion order; empty for a missing key.
    fn members(&self, key: &str) -> Result<Vec<String>>;
}

impl Engine {
    fn load_set(&self, key: &str) -> Result<Option<(Object, Vec<String>)>> {
        check_key(key)?;
        match self.load_typed(key, ObjectType::Set)? {
            Some(mut object) => match std::mem::replace(&mut object.value, Value::Deleted) {
                Value::Set(members) => Ok(Some((object, members))),
                _ => Err(Error::KeyMisstype),
            },
            None => Ok(None),
        }
    }
}

impl SetStore for Engine {
    fn add_member(&self, key: &str, member: &str) -> Result<()> {
        let loaded = self.load_set(key)?;
        let keyspace = self.keyspace()?;

        match loaded {
            Some((mut object, mut members)) => {
                if members.iter().any(|m| m == member) {
                    return Ok(());
                }
                members.push(member.to_string());
                object.value = Value::Set(members);
                keyspace.update(key, object)
            }
            None => keyspace.create(key, Object::new(Value::Set(vec![member.to_string()]))),
        }
    }

    fn remove_member(&self, key: &str, member: &str) -> Result<()> {
        let Some((mut object, mut members)) = self.load_set(key)? else {
            return Ok(());
        };

        let before = members.len();
        members.retain(|m| m != member);
        if members.len() == before {
            return Ok(());
        }

        object.value = Value::Set(members);
        self.keyspace()?.update(key, object)
    }

    fn is_member(&self, key: &str, member: &str) -> Result<bool> {
        Ok(self
            .load_set(key)?
            .is_some_and(|(_, members)| members.iter().any(|m| m == member)))
    }

    fn members(&self, key: &str) -> Result<Vec<String>> {
        Ok(self
            .load_set(key)?
            .map(|(_, members)| members)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::KeyValueStore;
    use crate::config::EngineConfig;
    use std::time::Duration;

    fn engine() -> Engine {
        Engine::local(EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_add_and_members() {
        let engine = engine();
        engine.add_member("tags", "rust").unwrap();
        engine.add_member("tags", "redis").unwrap();
        engine.add_member("tags", "rust").unwrap();

        assert_eq!(engine.members("tags").unwrap(), vec!["rust", "redis"]);
        assert!(engine.is_member("tags", "redis").unwrap());
        assert!(!engine.is_member("tags", "go").unwrap());
        assert_eq!(engine.key_type("tags").unwrap(), Some(ObjectType::Set));
    }

    #[test]
    fn test_missing_key() {
        let engine = engine();
        assert!(engine.members("nope").unwrap().is_empty());
        assert!(!engine.is_member("nope", "x").unwrap());
        engine.remove_member("nope", "x").unwrap();
        assert_eq!(engine.members(""), Err(Error::KeyEmpty));
    }

    #[test]
    fn test_remove_member() {
        let engine = engine();
        engine.add_member("s", "a").unwrap();
        engine.add_member("s", "b").unwrap();

        engine.remove_member("s", "a").unwrap();
        assert_eq!(engine.members("s").unwrap(), vec!["b"]);

        engine.remove_member("s", "b").unwrap();
        assert!(engine.members("s").unwrap().is_empty());
    }

    #[test]
    fn test_type_mismatch() {
        let engine = engine();
        engine.set("str", "v", Duration::ZERO).unwrap();

        assert_eq!(engine.add_member("str", "a"), Err(Error::KeyMisstype));
        assert_eq!(engine.is_member("str", "a"), Err(Error::KeyMisstype));
        assert_eq!(engine.get("str").unwrap(), "v");
    }

    #[test]
    fn test_expired_set_is_replaced() {
        let engine = engine();
        engine.add_member("s", "old").unwrap();
        engine.expire("s", Duration::from_millis(10)).unwrap();
        std::thread::sleep(Duration::from_millis(30));

        assert!(engine.members("s").unwrap().is_empty());
        engine.add_member("s", "new").unwrap();
        assert_eq!(engine.members("s").unwrap(), vec!["new"]);
        assert_eq!(engine.ttl("s").unwrap(), -1);
    }
}
