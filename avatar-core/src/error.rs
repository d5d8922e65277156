//! Error types for avatar resolution.
//!
//! None of these cross the resolver boundary: `AvatarResolver::resolve`
//! converts every failure into `None` plus a log line. They exist so the
//! layers underneath (proxy client, stores, snapshot codec) can report
//! precisely what went wrong.

use thiserror::Error;

/// Result type alias using `AvatarError`.
pub type Result<T> = std::result::Result<T, AvatarError>;

/// Main error type for avatar operations.
#[derive(Debug, Error)]
pub enum AvatarError {
    // ═══════════════════════════════════════════════════════════════════════════
    // INPUT ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Identifier was absent, blank, non-numeric, or not positive.
    #[error("Invalid player identifier: {0:?}")]
    InvalidIdentifier(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // PROXY ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// The proxy reported that the player has no avatar.
    #[error("Avatar not found for player {id}{}", suffix(.message))]
    NotFound {
        /// Canonical player id
        id: String,
        /// Optional message from the proxy's error body
        message: Option<String>,
    },

    /// Network-level failure talking to the proxy.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The proxy answered with a status other than 200 or 404.
    #[error("Unexpected proxy status {status}: {body}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Response body, possibly empty
        body: String,
    },

    /// The proxy answered 200 but the payload carried no usable URL.
    #[error("Malformed proxy response: {0}")]
    MalformedResponse(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Durable store read/write failed or held a corrupt blob.
    #[error("Storage error: {0}")]
    Storage(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // CONFIGURATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn suffix(message: &Option<String>) -> String {
    message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
}

impl AvatarError {
    /// Returns true if retrying the same lookup later may succeed.
    ///
    /// A not-found is recoverable too: the player can set an avatar later.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AvatarError::Transport(_)
                | AvatarError::UnexpectedStatus { .. }
                | AvatarError::NotFound { .. }
        )
    }

    /// Returns true if this error came from durable storage.
    pub fn is_storage_error(&self) -> bool {
        matches!(
            self,
            AvatarError::Storage(_) | AvatarError::Io(_) | AvatarError::Json(_)
        )
    }

    /// Returns true if this is the proxy's explicit not-found answer.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AvatarError::NotFound { .. })
    }
}
