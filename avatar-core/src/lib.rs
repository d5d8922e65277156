//! # Avatar Core
//!
//! Core types, errors, and traits shared by the avatar resolution crates.
//!
//! - **Types**: player identifiers, cache entries, persisted snapshots
//! - **Errors**: the `AvatarError` taxonomy
//! - **Constants**: defaults for TTL, storage key, and proxy query parameter
//! - **Traits**: the avatar source and durable store seams
//!
//! ## Example
//!
//! ```rust
//! use avatar_core::PlayerId;
//!
//! let id = PlayerId::parse(" 156 ").unwrap();
//! assert_eq!(id.as_key(), "156");
//! assert!(PlayerId::parse("-5").is_err());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use constants::*;
pub use error::{AvatarError, Result};
pub use traits::*;
pub use types::*;
