//! Sorted set operations.
//!
//! Members are kept ordered by `(score, member)` after every mutation, which
//! lets score-range scans stop at the first member past the upper bound.

use crate::api::engine::check_key;
use crate::api::Engine;
use crate::error::{Error, Result};
use crate::storage::{Object, ObjectType, ScoredMember, Value};
use std::str::FromStr;

/// One end of a score range.
///
/// Parses the Redis `ZRANGEBYSCORE` forms: a number, `-inf`, `+inf` or `inf`,
/// each optionally prefixed with `(` to make the bound exclusive.
///
/// ```
/// use localstore::api::ScoreBound;
///
/// let bound: ScoreBound = "(10".parse().unwrap();
/// assert!(bound.exclusive);
/// assert_eq!(bound.value, 10.0);
///
/// assert!("-inf".parse::<ScoreBound>().unwrap().value.is_infinite());
/// assert!("ten".parse::<ScoreBound>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreBound {
    pub value: f64,
    pub exclusive: bool,
}

impl ScoreBound {
    /// Checks `score` against this bound used as a minimum.
    pub fn admits_from_below(&self, score: f64) -> bool {
        if self.exclusive {
            score > self.value
        } else {
            score >= self.value
        }
    }

    /// Checks `score` against this bound used as a maximum.
    pub fn admits_from_above(&self, score: f64) -> bool {
        if self.exclusive {
            score < self.value
        } else {
            score <= self.value
        }
    }
}

impl FromStr for ScoreBound {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (exclusive, raw) = match s.strip_prefix('(') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let value = match raw.to_ascii_lowercase().as_str() {
            "-inf" => f64::NEG_INFINITY,
            "+inf" | "inf" => f64::INFINITY,
            other => other
                .parse::<f64>()
                .ok()
                .filter(|v| !v.is_nan())
                .ok_or_else(|| Error::InvalidArgument(format!("invalid score bound '{}'", s)))?,
        };

        Ok(Self { value, exclusive })
    }
}

pub trait SortedSetStore {
    /// Inserts `member` or updates its score.
    ///
    /// Returns 1 if the member was added and 0 if it already existed.
    fn add_scored_member(&self, key: &str, member: &str, score: f64) -> Result<i64>;

    /// Members with `min <= score <= max` (bounds as in [`ScoreBound`]), in
    /// score order.
    fn get_members_by_score_range(
        &self,
        key: &str,
        min: &str,
        max: &str,
    ) -> Result<Vec<ScoredMember>>;

    /// Removes the members a [`get_members_by_score_range`] call with the same
    /// bounds would return, and returns how many there were.
    ///
    /// [`get_members_by_score_range`]: SortedSetStore::get_members_by_score_range
    fn remove_members_by_score_range(&self, key: &str, min: &str, max: &str) -> Result<i64>;

    /// The whole sorted set, in score order.
    fn scored_members(&self, key: &str) -> Result<Vec<ScoredMember>>;

    /// Removes `member`; returns whether it was present.
    fn remove_scored_member(&self, key: &str, member: &str) -> Result<bool>;
}

fn sort_members(members: &mut [ScoredMember]) {
    members.sort_by(|a, b| {
        a.score
            .total_cmp(&b.score)
            .then_with(|| a.member.cmp(&b.member))
    });
}

/// Indices of the members within `[min, max]`, given a sorted slice.
fn positions_in_range(members: &[ScoredMember], min: ScoreBound, max: ScoreBound) -> Vec<usize> {
    let mut positions = Vec::new();
    for (i, entry) in members.iter().enumerate() {
        if !max.admits_from_above(entry.score) {
            break;
        }
        if min.admits_from_below(entry.score) {
            positions.push(i);
        }
    }
    positions
}

impl Engine {
    fn load_sorted_set(&self, key: &str) -> Result<Option<(Object, Vec<ScoredMember>)>> {
        check_key(key)?;
        match self.load_typed(key, ObjectType::SortedSet)? {
            Some(mut object) => match std::mem::replace(&mut object.value, Value::Deleted) {
                Value::SortedSet(members) => Ok(Some((object, members))),
                _ => Err(Error::KeyMisstype),
            },
            None => Ok(None),
        }
    }
}

impl SortedSetStore for Engine {
    fn add_scored_member(&self, key: &str, member: &str, score: f64) -> Result<i64> {
        check_key(key)?;
        if score.is_nan() {
            return Err(Error::InvalidArgument("score is not a number".to_string()));
        }

        let loaded = self.load_sorted_set(key)?;
        let keyspace = self.keyspace()?;

        let Some((mut object, mut members)) = loaded else {
            let members = vec![ScoredMember::new(member, score)];
            keyspace.create(key, Object::new(Value::SortedSet(members)))?;
            return Ok(1);
        };

        let added = match members.iter_mut().find(|m| m.member == member) {
            Some(existing) => {
                existing.score = score;
                0
            }
            None => {
                members.push(ScoredMember::new(member, score));
                1
            }
        };
        sort_members(&mut members);

        object.value = Value::SortedSet(members);
        keyspace.update(key, object)?;
        Ok(added)
    }

    fn get_members_by_score_range(
        &self,
        key: &str,
        min: &str,
        max: &str,
    ) -> Result<Vec<ScoredMember>> {
        check_key(key)?;
        let (min, max) = (min.parse::<ScoreBound>()?, max.parse::<ScoreBound>()?);

        let Some((_, members)) = self.load_sorted_set(key)? else {
            return Ok(Vec::new());
        };

        Ok(positions_in_range(&members, min, max)
            .into_iter()
            .map(|i| members[i].clone())
            .collect())
    }

    fn remove_members_by_score_range(&self, key: &str, min: &str, max: &str) -> Result<i64> {
        check_key(key)?;
        let (min, max) = (min.parse::<ScoreBound>()?, max.parse::<ScoreBound>()?);

        let Some((mut object, members)) = self.load_sorted_set(key)? else {
            return Ok(0);
        };

        let positions = positions_in_range(&members, min, max);
        if positions.is_empty() {
            return Ok(0);
        }

        let removed = positions.len() as i64;
        let kept = members
            .into_iter()
            .enumerate()
            .filter(|(i, _)| positions.binary_search(i).is_err())
            .map(|(_, m)| m)
            .collect();

        object.value = Value::SortedSet(kept);
        self.keyspace()?.update(key, object)?;
        Ok(removed)
    }

    fn scored_members(&self, key: &str) -> Result<Vec<ScoredMember>> {
        Ok(self
            .load_sorted_set(key)?
            .map(|(_, members)| members)
            .unwrap_or_default())
    }

    fn remove_scored_member(&self, key: &str, member: &str) -> Result<bool> {
        let Some((mut object, mut members)) = self.load_sorted_set(key)? else {
            return Ok(false);
        };

        let Some(position) = members.iter().position(|m| m.member == member) else {
            return Ok(false);
        };
        members.remove(position);

        object.value = Value::SortedSet(members);
        self.keyspace()?.update(key, object)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{KeyValueStore, SetStore};
    use crate::config::EngineConfig;
    use std::time::Duration;

    fn engine() -> Engine {
        Engine::local(EngineConfig::default()).unwrap()
    }

    fn names(members: &[ScoredMember]) -> Vec<&str> {
        members.iter().map(|m| m.member.as_str()).collect()
    }

    #[test]
    fn test_parse_bounds() {
        assert_eq!(
            "5".parse::<ScoreBound>().unwrap(),
            ScoreBound {
                value: 5.0,
                exclusive: false
            }
        );
        assert_eq!(
            "(1.5".parse::<ScoreBound>().unwrap(),
            ScoreBound {
                value: 1.5,
                exclusive: true
            }
        );
        assert_eq!("+inf".parse::<ScoreBound>().unwrap().value, f64::INFINITY);
        assert_eq!("inf".parse::<ScoreBound>().unwrap().value, f64::INFINITY);
        assert_eq!("-inf".parse::<ScoreBound>().unwrap().value, f64::NEG_INFINITY);
        assert!("(-inf".parse::<ScoreBound>().unwrap().exclusive);

        assert!(matches!(
            "abc".parse::<ScoreBound>(),
            Err(Error::InvalidArgument(_))
        ));
        assert!("nan".parse::<ScoreBound>().is_err());
        assert!("".parse::<ScoreBound>().is_err());
    }

    #[test]
    fn test_add_and_update() {
        let engine = engine();
        assert_eq!(engine.add_scored_member("z", "alice", 10.0).unwrap(), 1);
        assert_eq!(engine.add_scored_member("z", "alice", 30.0).unwrap(), 0);
        assert_eq!(engine.add_scored_member("z", "bob", 20.0).unwrap(), 1);

        let members = engine.scored_members("z").unwrap();
        assert_eq!(names(&members), vec!["bob", "alice"]);
        assert_eq!(members[1].score, 30.0);
        assert_eq!(engine.key_type("z").unwrap(), Some(ObjectType::SortedSet));
    }

    #[test]
    fn test_ties_order_by_member() {
        let engine = engine();
        engine.add_scored_member("z", "c", 1.0).unwrap();
        engine.add_scored_member("z", "a", 1.0).unwrap();
        engine.add_scored_member("z", "b", 0.5).unwrap();

        assert_eq!(names(&engine.scored_members("z").unwrap()), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_exclusive_bounds() {
        let engine = engine();
        engine.add_scored_member("z", "ten", 10.0).unwrap();
        engine.add_scored_member("z", "fifteen", 15.0).unwrap();
        engine.add_scored_member("z", "twenty", 20.0).unwrap();
        engine.add_scored_member("z", "thirty", 30.0).unwrap();

        let range = engine.get_members_by_score_range("z", "(10", "20").unwrap();
        assert_eq!(names(&range), vec!["fifteen", "twenty"]);

        let range = engine.get_members_by_score_range("z", "10", "(20").unwrap();
        assert_eq!(names(&range), vec!["ten", "fifteen"]);

        let range = engine.get_members_by_score_range("z", "-inf", "+inf").unwrap();
        assert_eq!(range.len(), 4);

        assert!(engine
            .get_members_by_score_range("z", "31", "inf")
            .unwrap()
            .is_empty());
        assert!(engine
            .get_members_by_score_range("missing", "-inf", "inf")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_invalid_bounds() {
        let engine = engine();
        engine.add_scored_member("z", "a", 1.0).unwrap();

        assert!(matches!(
            engine.get_members_by_score_range("z", "low", "10"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.remove_members_by_score_range("z", "0", "(high"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            engine.add_scored_member("z", "b", f64::NAN),
            Err(Error::InvalidArgument(_))
        ));
        assert_eq!(engine.scored_members("z").unwrap().len(), 1);
    }

    #[test]
    fn test_remove_by_score_range() {
        let engine = engine();
        for (member, score) in [("a", 1.0), ("b", 2.0), ("c", 3.0), ("d", 4.0)] {
            engine.add_scored_member("z", member, score).unwrap();
        }

        assert_eq!(engine.remove_members_by_score_range("z", "(1", "3").unwrap(), 2);
        assert_eq!(names(&engine.scored_members("z").unwrap()), vec!["a", "d"]);
        assert_eq!(engine.remove_members_by_score_range("z", "5", "6").unwrap(), 0);
        assert_eq!(
            engine.remove_members_by_score_range("missing", "-inf", "inf").unwrap(),
            0
        );
    }

    #[test]
    fn test_remove_scored_member() {
        let engine = engine();
        engine.add_scored_member("z", "a", 1.0).unwrap();
        engine.add_scored_member("z", "b", 2.0).unwrap();

        assert!(engine.remove_scored_member("z", "a").unwrap());
        assert!(!engine.remove_scored_member("z", "a").unwrap());
        assert_eq!(names(&engine.scored_members("z").unwrap()), vec!["b"]);
    }

    #[test]
    fn test_type_mismatch() {
        let engine = engine();
        engine.add_member("set", "x").unwrap();
        engine.set("str", "v", Duration::ZERO).unwrap();

        assert_eq!(
            engine.add_scored_member("set", "a", 1.0),
            Err(Error::KeyMisstype)
        );
        assert_eq!(engine.scored_members("str"), Err(Error::KeyMisstype));
        assert_eq!(engine.add_scored_member("", "a", 1.0), Err(Error::KeyEmpty));
    }

    #[test]
    fn test_empty_key_checked_before_arguments() {
        let engine = engine();
        assert_eq!(
            engine.add_scored_member("", "a", f64::NAN),
            Err(Error::KeyEmpty)
        );
        assert_eq!(
            engine.get_members_by_score_range("", "low", "high"),
            Err(Error::KeyEmpty)
        );
        assert_eq!(
            engine.remove_members_by_score_range("", "(", "nan"),
            Err(Error::KeyEmpty)
        );
    }
}
