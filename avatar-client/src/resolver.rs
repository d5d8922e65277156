//! Coalescing avatar resolver.
//!
//! Each lookup goes through three layers, in order:
//!
//! 1. the TTL cache, answered without I/O;
//! 2. the in-flight map, so concurrent lookups for one player share a request;
//! 3. a new proxy request, spawned as its own task.
//!
//! Every failure degrades to `None`: avatars are decorative, and callers
//! render initials instead.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use avatar_cache::{AvatarCache, CacheStats};
use avatar_core::constants::DEFAULT_STORAGE_KEY;
use avatar_core::traits::{AvatarSource, KeyValueStore};
use avatar_core::types::{CacheSnapshot, PlayerId};
use avatar_store::{FileStore, MemoryStore};

use crate::config::ResolverConfig;
use crate::proxy::ProxyClient;

type PendingResolution = Shared<BoxFuture<'static, Option<String>>>;

struct Inner {
    source: Arc<dyn AvatarSource>,
    store: Arc<dyn KeyValueStore>,
    storage_key: String,
    cache: AvatarCache,
    /// player → shared in-flight request; at most one per player
    pending: Mutex<HashMap<PlayerId, PendingResolution>>,
    /// Serializes snapshot+write so an older snapshot never lands last
    persist_lock: tokio::sync::Mutex<()>,
}

/// Resolves player ids to avatar URLs with caching and request coalescing.
///
/// Cheap to clone; clones share the same cache and in-flight map. Build one
/// per application and hand clones to whatever renders avatars.
///
/// # Example
///
/// ```rust,ignore
/// let resolver = AvatarResolver::new(Arc::new(proxy), Arc::new(MemoryStore::new())).await;
/// let url = resolver.resolve("156").await;
/// ```
#[derive(Clone)]
pub struct AvatarResolver {
    inner: Arc<Inner>,
}

impl AvatarResolver {
    /// Creates a resolver with the default TTL and storage key.
    ///
    /// Loads any persisted cache table from `store` before returning.
    pub async fn new(source: Arc<dyn AvatarSource>, store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_cache(AvatarCache::new(), DEFAULT_STORAGE_KEY, source, store).await
    }

    /// Creates a resolver around a preconfigured cache.
    pub async fn with_cache(
        cache: AvatarCache,
        storage_key: impl Into<String>,
        source: Arc<dyn AvatarSource>,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let resolver = Self {
            inner: Arc::new(Inner {
                source,
                store,
                storage_key: storage_key.into(),
                cache,
                pending: Mutex::new(HashMap::new()),
                persist_lock: tokio::sync::Mutex::new(()),
            }),
        };
        resolver.inner.load().await;
        resolver
    }

    /// Builds the proxy client and store described by `config`.
    ///
    /// Only an invalid proxy configuration is an error. If the cache
    /// directory cannot be opened the resolver keeps its cache in memory.
    pub async fn from_config(config: ResolverConfig) -> avatar_core::Result<Self> {
        let source: Arc<dyn AvatarSource> = Arc::new(ProxyClient::with_config(config.proxy)?);

        let store: Arc<dyn KeyValueStore> = match &config.cache_dir {
            Some(dir) => match FileStore::new(dir).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    warn!(dir = ?dir, error = %e, "Cache directory unavailable, keeping avatars in memory");
                    Arc::new(MemoryStore::new())
                }
            },
            None => Arc::new(MemoryStore::new()),
        };

        Ok(Self::with_cache(
            AvatarCache::with_config(config.cache),
            config.storage_key,
            source,
            store,
        )
        .await)
    }

    /// Resolves a raw player id to an avatar URL.
    ///
    /// Invalid ids (blank, non-numeric, zero, negative) return `None`
    /// without touching the cache or the network.
    #[instrument(skip(self))]
    pub async fn resolve(&self, id: &str) -> Option<String> {
        match PlayerId::parse(id) {
            Ok(id) => self.resolve_id(id).await,
            Err(e) => {
                debug!(error = %e, "Skipping invalid player id");
                None
            }
        }
    }

    /// Resolves a validated player id to an avatar URL.
    pub async fn resolve_id(&self, id: PlayerId) -> Option<String> {
        let resolution = {
            let mut pending = self.inner.pending.lock();

            // Checked under the pending lock: a settling request writes the
            // cache before it leaves the map, so one of the two always hits.
            if let Some(url) = self.inner.cache.get(id) {
                debug!(%id, "Cache hit");
                return Some(url);
            }

            match pending.get(&id) {
                Some(existing) => {
                    debug!(%id, "Joining in-flight resolution");
                    existing.clone()
                }
                None => {
                    debug!(%id, "Cache miss, fetching");
                    let resolution = self.start(id);
                    pending.insert(id, resolution.clone());
                    resolution
                }
            }
        };

        resolution.await
    }

    /// Returns the cached URL for a player without any I/O.
    pub fn cached(&self, id: &str) -> Option<String> {
        PlayerId::parse(id).ok().and_then(|id| self.inner.cache.get(id))
    }

    /// Drops one player's cached URL, or the whole cache when `id` is `None`.
    ///
    /// The table is re-persisted either way. Requests already in flight are
    /// left alone and will still cache their result.
    #[instrument(skip(self))]
    pub async fn invalidate(&self, id: Option<&str>) {
        match id {
            Some(raw) => match PlayerId::parse(raw) {
                Ok(id) => {
                    let removed = self.inner.cache.remove(id);
                    debug!(%id, removed, "Invalidated avatar");
                }
                Err(e) => debug!(error = %e, "Ignoring invalidate for invalid player id"),
            },
            None => {
                self.inner.cache.clear();
                debug!("Cleared avatar cache");
            }
        }

        self.inner.persist().await;
    }

    /// Removes expired entries and re-persists. Returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let purged = self.inner.cache.purge_expired();
        if purged > 0 {
            info!(purged, "Purged expired avatars");
        }
        self.inner.persist().await;
        purged
    }

    /// Number of requests currently in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Returns cache and in-flight statistics.
    pub fn stats(&self) -> ResolverStats {
        ResolverStats {
            cache: self.inner.cache.stats(),
            in_flight: self.in_flight(),
        }
    }

    /// Spawns the network request so it runs to completion even if every
    /// caller goes away.
    fn start(&self, id: PlayerId) -> PendingResolution {
        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(async move { inner.fetch_and_settle(id).await });

        async move {
            match task.await {
                Ok(url) => url,
                Err(e) => {
                    warn!(%id, error = %e, "Avatar resolution task failed");
                    None
                }
            }
        }
        .boxed()
        .shared()
    }
}

impl Inner {
    async fn fetch_and_settle(&self, id: PlayerId) -> Option<String> {
        let pending = PendingGuard {
            pending: &self.pending,
            id,
        };

        match self.source.fetch_avatar_url(id).await {
            Ok(url) => {
                self.cache.insert(id, url.clone());
                drop(pending);
                self.persist().await;
                info!(%id, "Resolved avatar");
                Some(url)
            }
            Err(e) if e.is_not_found() => {
                debug!(%id, error = %e, "No avatar for player");
                None
            }
            Err(e) => {
                warn!(%id, error = %e, "Avatar resolution failed");
                None
            }
        }
    }

    async fn load(&self) {
        match self.store.get(&self.storage_key).await {
            Ok(Some(blob)) => match CacheSnapshot::from_json(&blob) {
                Ok(snapshot) => {
                    let stored = snapshot.len();
                    let restored = self.cache.restore(snapshot);
                    info!(stored, restored, "Loaded avatar cache");
                }
                Err(e) => warn!(error = %e, "Discarding unreadable avatar cache"),
            },
            Ok(None) => debug!("No persisted avatar cache"),
            Err(e) => warn!(error = %e, "Failed to read avatar cache, starting empty"),
        }
    }

    async fn persist(&self) {
        let _guard = self.persist_lock.lock().await;

        let blob = match self.cache.snapshot().to_json() {
            Ok(blob) => blob,
            Err(e) => {
                warn!(error = %e, "Failed to serialize avatar cache");
                return;
            }
        };

        if let Err(e) = self.store.set(&self.storage_key, &blob).await {
            warn!(error = %e, "Failed to persist avatar cache, continuing in memory");
        }
    }
}

/// Removes a player's in-flight entry when the request settles, including
/// when the task panics.
struct PendingGuard<'a> {
    pending: &'a Mutex<HashMap<PlayerId, PendingResolution>>,
    id: PlayerId,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.pending.lock().remove(&self.id);
    }
}

/// Resolver statistics.
#[derive(Clone, Debug, Serialize)]
pub struct ResolverStats {
    /// Cache table statistics
    pub cache: CacheStats,
    /// Requests currently in flight
    pub in_flight: usize,
}
