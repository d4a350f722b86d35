// Memoized matchup results keyed by (batter, pitcher, as-of date).

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use dashmap::DashMap;

use crate::model::PlayerKey;
use crate::report::MatchupScoreResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub batter: PlayerKey,
    pub pitcher: PlayerKey,
    pub as_of: NaiveDate,
}

impl CacheKey {
    pub fn new(batter: &PlayerKey, pitcher: &PlayerKey, as_of: NaiveDate) -> Self {
        CacheKey {
            batter: batter.clone(),
            pitcher: pitcher.clone(),
            as_of,
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    result: Arc<MatchupScoreResult>,
    stored_at: Instant,
}

/// Concurrent result cache with a fixed time-to-live.
///
/// Scoring is deterministic, so two threads racing on the same key store
/// identical values and the later insert simply wins.
#[derive(Debug)]
pub struct ResultCache {
    entries: DashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl ResultCache {
    pub fn new(ttl: Duration) -> Self {
        ResultCache {
            entries: DashMap::new(),
            ttl,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<MatchupScoreResult>> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`. Expired entries are removed.
    pub fn get_at(&self, key: &CacheKey, now: Instant) -> Option<Arc<MatchupScoreResult>> {
        let hit = self.entries.get(key).map(|entry| {
            if now.saturating_duration_since(entry.stored_at) < self.ttl {
                Some(Arc::clone(&entry.result))
            } else {
                None
            }
        })?;
        if hit.is_none() {
            self.entries.remove(key);
        }
        hit
    }

    pub fn insert(&self, key: CacheKey, result: Arc<MatchupScoreResult>) {
        self.insert_at(key, result, Instant::now());
    }

    pub fn insert_at(&self, key: CacheKey, result: Arc<MatchupScoreResult>, now: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                result,
                stored_at: now,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
