use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::record::SeasonWindow;

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    fetched_at: Instant,
}

/// In-process memo of live extractions keyed by season window.
#[derive(Debug, Clone)]
pub struct ResultCache<T> {
    ttl: Duration,
    entries: HashMap<SeasonWindow, CacheEntry<T>>,
}

impl<T: Clone> ResultCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    /// Fresh value for `key`; expired entries are dropped on the way.
    pub fn get(&mut self, key: &SeasonWindow, now: Instant) -> Option<T> {
        let entry = self.entries.get(key)?;
        if now.saturating_duration_since(entry.fetched_at) >= self.ttl {
            self.entries.remove(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn insert(&mut self, key: SeasonWindow, value: T, now: Instant) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: now,
            },
        );
    }

    pub fn age(&self, key: &SeasonWindow, now: Instant) -> Option<Duration> {
        self.entries
            .get(key)
            .map(|entry| now.saturating_duration_since(entry.fetched_at))
    }

    pub fn invalidate(&mut self, key: &SeasonWindow) {
        self.entries.remove(key);
    }
}
