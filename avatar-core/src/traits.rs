//! Seams between the resolver and its collaborators.
//!
//! The resolver only ever talks to these traits, so tests can swap in
//! counting fakes and the CLI can pick a storage backend at runtime.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::PlayerId;

// ═══════════════════════════════════════════════════════════════════════════════
// AVATAR SOURCE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Something that can turn a player id into an avatar URL over the network.
///
/// Implementations report a missing avatar as `AvatarError::NotFound` and any
/// other failure with the matching transport variant.
#[async_trait]
pub trait AvatarSource: Send + Sync {
    /// Fetches the avatar image URL for `id`.
    async fn fetch_avatar_url(&self, id: PlayerId) -> Result<String>;
}

// ═══════════════════════════════════════════════════════════════════════════════
// KEY-VALUE STORE TRAIT
// ═══════════════════════════════════════════════════════════════════════════════

/// Durable string-keyed storage for whole serialized blobs.
///
/// Only whole-value get/set is needed; the resolver keeps its entire cache
/// table under one key.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Replaces the value stored under `key`.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}
