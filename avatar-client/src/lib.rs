//! # Avatar Client
//!
//! Resolves player ids to avatar image URLs through a backend proxy.
//!
//! [`AvatarResolver`] layers three things over the raw [`ProxyClient`]:
//! a TTL cache, coalescing of concurrent lookups for the same player, and
//! persistence of the cache table to a [`KeyValueStore`].
//!
//! ## Example
//!
//! ```rust,ignore
//! let resolver = AvatarResolver::from_config(ResolverConfig::from_env()).await?;
//!
//! match resolver.resolve("156").await {
//!     Some(url) => render_image(&url),
//!     None => render_initials(),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod proxy;
mod resolver;

pub use config::ResolverConfig;
pub use proxy::{ProxyClient, ProxyConfig};
pub use resolver::{AvatarResolver, ResolverStats};

pub use avatar_cache::{CacheConfig, CacheStats};
pub use avatar_core::traits::{AvatarSource, KeyValueStore};
