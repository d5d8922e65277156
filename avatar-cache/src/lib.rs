//! TTL cache for resolved avatar URLs.
//!
//! In-memory table with lazy expiry and snapshot import/export for
//! durable storage.

mod cache;

pub use cache::{AvatarCache, CacheConfig, CacheStats};
