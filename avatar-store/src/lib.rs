//! # Avatar Store
//!
//! Durable key-value storage for the serialized avatar cache.
//!
//! This crate provides two backends:
//!
//! - **Memory**: process-local storage for tests and ephemeral runs
//! - **File**: one file per key in a directory, written atomically
//!
//! ## Example
//!
//! ```rust,ignore
//! use avatar_store::{FileStore, KeyValueStore};
//!
//! let store = FileStore::new("/var/cache/avatars").await?;
//! store.set("avatar-cache", &blob).await?;
//! let blob = store.get("avatar-cache").await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// Re-export the trait from core
pub use avatar_core::traits::KeyValueStore;
