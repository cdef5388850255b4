//! Recent rolls that a later roll may oppose.
//!
//! The host caches an eligible roll under the id of the message that
//! announced it. A roll that replies to that message is compared against it.
//! Entries expire after a fixed time and the cache is bounded.

use std::cmp::Reverse;

use chrono::{DateTime, Duration, Utc};
use rk_mechanics::{LruCache, TierKind};
use serde::{Deserialize, Serialize};

/// Default lifetime of a cached roll.
pub const DEFAULT_TTL_SECS: u64 = 600;

/// Default number of cached rolls per channel.
pub const DEFAULT_CAPACITY: usize = 64;

/// A roll that can be opposed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedRoll {
    /// Who rolled.
    pub user_id: String,
    /// How they were shown: card name, else user name.
    pub who: String,
    /// The tested entry.
    pub entry: String,
    /// Name of the tier reached.
    pub tier: String,
    /// Outcome class of the tier.
    pub kind: TierKind,
    /// Position of the tier in its ladder. Within one outcome class an
    /// earlier tier is the better one.
    #[serde(default)]
    pub tier_index: usize,
    /// The entry value before difficulty.
    pub base_value: i64,
    /// The d100 result.
    pub roll: i64,
    /// When the roll was made.
    pub rolled_at: DateTime<Utc>,
}

/// Result of opposing two rolls, from the later roller's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Contest {
    /// The later roll wins.
    Win,
    /// The earlier roll wins.
    Lose,
    /// Same tier and the same base value.
    Draw,
}

impl CachedRoll {
    /// Compare `self` (the later roll) against `earlier`: tier first, then
    /// the higher base value.
    pub fn contest(&self, earlier: &CachedRoll) -> Contest {
        let key = |r: &CachedRoll| (r.kind.rank(), Reverse(r.tier_index), r.base_value);
        match key(self).cmp(&key(earlier)) {
            std::cmp::Ordering::Greater => Contest::Win,
            std::cmp::Ordering::Less => Contest::Lose,
            std::cmp::Ordering::Equal => Contest::Draw,
        }
    }
}

/// Bounded, expiring map from message id to roll.
#[derive(Debug, Clone)]
pub struct OpposedCache {
    entries: LruCache<String, CachedRoll>,
    ttl: Duration,
}

impl Default for OpposedCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL_SECS)
    }
}

impl OpposedCache {
    /// A cache of `capacity` rolls that live `ttl_secs` seconds.
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX);
        Self {
            entries: LruCache::new(capacity),
            ttl: Duration::try_seconds(secs).unwrap_or(Duration::MAX),
        }
    }

    /// Cache `roll` under `message_id`.
    pub fn insert(&mut self, message_id: impl Into<String>, roll: CachedRoll) {
        self.entries.insert(message_id.into(), roll);
    }

    /// The roll cached under `message_id`, if it has not expired at `now`.
    pub fn peek(&self, message_id: &str, now: DateTime<Utc>) -> Option<&CachedRoll> {
        self.entries
            .peek(message_id)
            .filter(|r| now.signed_duration_since(r.rolled_at) <= self.ttl)
    }

    /// Drop every roll that has expired at `now`.
    pub fn purge_expired(&mut self, now: DateTime<Utc>) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, r| now.signed_duration_since(r.rolled_at) <= ttl);
    }

    /// Number of cached rolls, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roll(kind: TierKind, base: i64, at: DateTime<Utc>) -> CachedRoll {
        CachedRoll {
            user_id: "u1".into(),
            who: "Alice".into(),
            entry: "侦察".into(),
            tier: kind.to_string(),
            kind,
            tier_index: 0,
            base_value: base,
            roll: 30,
            rolled_at: at,
        }
    }

    #[test]
    fn tier_beats_base_value() {
        let now = Utc::now();
        let later = roll(TierKind::Best, 20, now);
        let earlier = roll(TierKind::Success, 80, now);
        assert_eq!(later.contest(&earlier), Contest::Win);
        assert_eq!(earlier.contest(&later), Contest::Lose);
    }

    #[test]
    fn same_tier_compares_base_then_draws() {
        let now = Utc::now();
        let a = roll(TierKind::Success, 60, now);
        let b = roll(TierKind::Success, 50, now);
        assert_eq!(a.contest(&b), Contest::Win);
        assert_eq!(a.contest(&a.clone()), Contest::Draw);
    }

    #[test]
    fn extreme_success_beats_regular_success() {
        let now = Utc::now();
        let extreme = CachedRoll {
            tier: "极难成功".into(),
            tier_index: 2,
            ..roll(TierKind::Success, 60, now)
        };
        let regular = CachedRoll {
            tier: "成功".into(),
            tier_index: 4,
            ..roll(TierKind::Success, 70, now)
        };
        assert_eq!(extreme.contest(&regular), Contest::Win);
        assert_eq!(regular.contest(&extreme), Contest::Lose);
    }

    #[test]
    fn entries_expire() {
        let start = Utc::now();
        let mut cache = OpposedCache::new(8, 600);
        cache.insert("m1", roll(TierKind::Success, 50, start));
        assert!(cache.peek("m1", start + Duration::seconds(600)).is_some());
        assert!(cache.peek("m1", start + Duration::seconds(601)).is_none());
        cache.purge_expired(start + Duration::seconds(601));
        assert!(cache.is_empty());
    }

    #[test]
    fn bounded_by_capacity() {
        let now = Utc::now();
        let mut cache = OpposedCache::new(2, 600);
        for id in ["m1", "m2", "m3"] {
            cache.insert(id, roll(TierKind::Fail, 10, now));
        }
        assert_eq!(cache.len(), 2);
        assert!(cache.peek("m1", now).is_none());
    }
}
