//! Domain types for avatar resolution.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::constants::SNAPSHOT_VERSION;
use crate::error::{AvatarError, Result};

// ═══════════════════════════════════════════════════════════════════════════════
// PLAYER ID
// ═══════════════════════════════════════════════════════════════════════════════

/// A validated, strictly positive player identifier.
///
/// Upstream data sometimes carries placeholder ids (`0`, `-1`, blanks); those
/// are rejected here so they never reach the network or the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct PlayerId(u64);

impl PlayerId {
    /// Parses an identifier from text.
    ///
    /// Surrounding whitespace is ignored. Empty, non-numeric, zero, and
    /// negative inputs are rejected with `InvalidIdentifier`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AvatarError::InvalidIdentifier(raw.to_string()));
        }

        let value: i128 = trimmed
            .parse()
            .map_err(|_| AvatarError::InvalidIdentifier(raw.to_string()))?;

        u64::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| AvatarError::InvalidIdentifier(raw.to_string()))
    }

    /// Parses an optional identifier; `None` is invalid.
    pub fn parse_opt(raw: Option<&str>) -> Result<Self> {
        match raw {
            Some(raw) => Self::parse(raw),
            None => Err(AvatarError::InvalidIdentifier(String::new())),
        }
    }

    /// Wraps a raw number, returning `None` for zero.
    pub fn new(value: u64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    /// Returns the numeric value.
    pub fn get(&self) -> u64 {
        self.0
    }

    /// Returns the canonical string form used as the cache key.
    pub fn as_key(&self) -> String {
        self.0.to_string()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlayerId {
    type Err = AvatarError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<u64> for PlayerId {
    type Error = AvatarError;

    fn try_from(value: u64) -> Result<Self> {
        Self::new(value).ok_or_else(|| AvatarError::InvalidIdentifier(value.to_string()))
    }
}

impl TryFrom<i64> for PlayerId {
    type Error = AvatarError;

    fn try_from(value: i64) -> Result<Self> {
        u64::try_from(value)
            .ok()
            .and_then(Self::new)
            .ok_or_else(|| AvatarError::InvalidIdentifier(value.to_string()))
    }
}

impl From<PlayerId> for u64 {
    fn from(id: PlayerId) -> Self {
        id.0
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CACHE ENTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// A resolved avatar URL and the moment it was fetched.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Resolved image URL
    pub url: String,
    /// When the proxy returned this URL
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry stamped with the current time.
    pub fn new(url: impl Into<String>) -> Self {
        Self::fetched_at(url, Utc::now())
    }

    /// Creates an entry with an explicit fetch time.
    pub fn fetched_at(url: impl Into<String>, fetched_at: DateTime<Utc>) -> Self {
        Self {
            url: url.into(),
            fetched_at,
        }
    }

    /// Returns true while `now - fetched_at < ttl`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            // TTL beyond chrono's range never expires
            return true;
        };
        now.signed_duration_since(self.fetched_at) < ttl
    }

    /// Returns true if the entry is still within `ttl` right now.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(Utc::now(), ttl)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SNAPSHOT
// ═══════════════════════════════════════════════════════════════════════════════

/// Serialized form of the whole cache table, as kept in durable storage.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSnapshot {
    /// Format version
    pub version: u32,
    /// Cache key → entry
    pub entries: BTreeMap<String, CacheEntry>,
}

impl CacheSnapshot {
    /// Creates a snapshot at the current format version.
    pub fn new(entries: BTreeMap<String, CacheEntry>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            entries,
        }
    }

    /// Serializes to the JSON blob written to storage.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parses a stored blob, rejecting unknown versions.
    pub fn from_json(blob: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(blob)
            .map_err(|e| AvatarError::Storage(format!("Corrupt cache snapshot: {}", e)))?;

        if snapshot.version != SNAPSHOT_VERSION {
            return Err(AvatarError::Storage(format!(
                "Unsupported cache snapshot version: expected {}, got {}",
                SNAPSHOT_VERSION, snapshot.version
            )));
        }

        Ok(snapshot)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("156", 156 ; "plain")]
    #[test_case("  42\n", 42 ; "surrounding whitespace")]
    #[test_case("007", 7 ; "leading zeros")]
    #[test_case("+9", 9 ; "explicit plus")]
    fn test_parse_valid(raw: &str, expected: u64) {
        let id = PlayerId::parse(raw).unwrap();
        assert_eq!(id.get(), expected);
        assert_eq!(id.as_key(), expected.to_string());
    }

    #[test_case("" ; "empty")]
    #[test_case("   " ; "blank")]
    #[test_case("0" ; "zero")]
    #[test_case("-5" ; "negative")]
    #[test_case("-1" ; "minus one")]
    #[test_case("abc" ; "non numeric")]
    #[test_case("1.5" ; "fractional")]
    #[test_case("99999999999999999999999" ; "overflow")]
    fn test_parse_invalid(raw: &str) {
        let err = PlayerId::parse(raw).unwrap_err();
        assert!(matches!(err, AvatarError::InvalidIdentifier(_)));
    }

    #[test]
    fn test_parse_opt_none_is_invalid() {
        assert!(PlayerId::parse_opt(None).is_err());
        assert_eq!(PlayerId::parse_opt(Some("12")).unwrap().get(), 12);
    }

    #[test]
    fn test_try_from_numbers() {
        assert!(PlayerId::try_from(0u64).is_err());
        assert!(PlayerId::try_from(-3i64).is_err());
        assert_eq!(PlayerId::try_from(77i64).unwrap().to_string(), "77");
    }

    #[test]
    fn test_player_id_serde_rejects_zero() {
        assert!(serde_json::from_str::<PlayerId>("0").is_err());
        let id: PlayerId = serde_json::from_str("12").unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "12");
    }

    #[test]
    fn test_entry_freshness() {
        let ttl = Duration::from_secs(3600);
        let now = Utc::now();

        let fresh = CacheEntry::fetched_at("https://cdn/x.png", now - chrono::Duration::minutes(59));
        assert!(fresh.is_fresh_at(now, ttl));

        let boundary = CacheEntry::fetched_at("https://cdn/x.png", now - chrono::Duration::hours(1));
        assert!(!boundary.is_fresh_at(now, ttl));
    }

    #[test]
    fn test_snapshot_json() {
        let mut entries = BTreeMap::new();
        entries.insert("156".to_string(), CacheEntry::new("https://cdn/x.png"));
        let snapshot = CacheSnapshot::new(entries);

        let blob = snapshot.to_json().unwrap();
        assert!(blob.contains("\"fetched_at\""));
        assert_eq!(CacheSnapshot::from_json(&blob).unwrap(), snapshot);
    }

    #[test]
    fn test_snapshot_rejects_bad_blobs() {
        assert!(CacheSnapshot::from_json("not json").unwrap_err().is_storage_error());
        assert!(CacheSnapshot::from_json(r#"{"version":99,"entries":{}}"#)
            .unwrap_err()
            .is_storage_error());
    }
}
