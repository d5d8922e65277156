//! In-memory TTL table of avatar URLs.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use chrono::Utc;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use avatar_core::constants::DEFAULT_CACHE_TTL_SECONDS;
use avatar_core::types::{CacheEntry, CacheSnapshot, PlayerId};

/// Cache configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL in seconds
    pub ttl_seconds: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
        }
    }
}

/// In-memory cache of resolved avatar URLs.
///
/// Expiry is lazy: an expired entry stays in the table and is simply
/// skipped by `get` until a fresh resolution overwrites it, or until
/// `purge_expired` is called explicitly.
pub struct AvatarCache {
    entries: RwLock<HashMap<PlayerId, CacheEntry>>,
    ttl: Duration,
}

impl AvatarCache {
    /// Creates a new cache with default configuration.
    pub fn new() -> Self {
        Self::with_config(CacheConfig::default())
    }

    /// Creates a cache with custom configuration.
    pub fn with_config(config: CacheConfig) -> Self {
        Self::with_ttl(Duration::from_secs(config.ttl_seconds))
    }

    /// Creates a cache with an explicit TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the configured TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Gets the cached URL for a player.
    ///
    /// Returns None if not cached or expired.
    pub fn get(&self, id: PlayerId) -> Option<String> {
        let entries = self.entries.read();
        entries
            .get(&id)
            .filter(|e| e.is_fresh(self.ttl))
            .map(|e| e.url.clone())
    }

    /// Caches a URL stamped with the current time, replacing any previous entry.
    pub fn insert(&self, id: PlayerId, url: impl Into<String>) {
        self.insert_entry(id, CacheEntry::new(url));
    }

    /// Caches a prepared entry.
    pub fn insert_entry(&self, id: PlayerId, entry: CacheEntry) {
        self.entries.write().insert(id, entry);
    }

    /// Removes a cached entry. Returns true if one was present.
    pub fn remove(&self, id: PlayerId) -> bool {
        self.entries.write().remove(&id).is_some()
    }

    /// Clears all cached entries.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Removes all expired entries, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, e| e.is_fresh_at(now, self.ttl));
        before - entries.len()
    }

    /// Returns the number of cached entries, expired ones included.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        let now = Utc::now();
        let entries = self.entries.read();
        let expired = entries
            .values()
            .filter(|e| !e.is_fresh_at(now, self.ttl))
            .count();
        CacheStats {
            total_entries: entries.len(),
            expired_entries: expired,
            valid_entries: entries.len().saturating_sub(expired),
            ttl_seconds: self.ttl.as_secs(),
        }
    }

    /// Exports every entry, expired ones included, for persistence.
    ///
    /// Expired entries are filtered on the way back in by `restore`.
    pub fn snapshot(&self) -> CacheSnapshot {
        let entries = self.entries.read();
        let table: BTreeMap<String, CacheEntry> = entries
            .iter()
            .map(|(id, e)| (id.as_key(), e.clone()))
            .collect();
        CacheSnapshot::new(table)
    }

    /// Loads entries from a snapshot, discarding expired or malformed ones.
    ///
    /// Returns the number of entries restored.
    pub fn restore(&self, snapshot: CacheSnapshot) -> usize {
        let now = Utc::now();
        let mut entries = self.entries.write();
        let mut restored = 0;

        for (key, entry) in snapshot.entries {
            let Ok(id) = PlayerId::parse(&key) else {
                debug!(key, "Skipping snapshot entry with invalid key");
                continue;
            };
            if !entry.is_fresh_at(now, self.ttl) {
                continue;
            }
            entries.insert(id, entry);
            restored += 1;
        }

        restored
    }
}

impl Default for AvatarCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Total entries (including expired)
    pub total_entries: usize,
    /// Expired entries
    pub expired_entries: usize,
    /// Valid (non-expired) entries
    pub valid_entries: usize,
    /// Configured TTL in seconds
    pub ttl_seconds: u64,
}
