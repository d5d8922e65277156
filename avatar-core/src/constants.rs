//! Defaults for avatar resolution.

/// Default time-to-live of a resolved avatar URL (1 hour).
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 3600;

/// Key under which the serialized cache table is kept in durable storage.
pub const DEFAULT_STORAGE_KEY: &str = "avatar-cache";

/// Query parameter carrying the player id on proxy requests.
pub const PROXY_QUERY_PARAM: &str = "userId";

/// Default proxy endpoint used when nothing is configured.
pub const DEFAULT_PROXY_URL: &str = "http://localhost:3000/api/roblox-avatar";

/// Version tag written into persisted snapshots.
pub const SNAPSHOT_VERSION: u32 = 1;
