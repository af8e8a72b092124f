//! Error types for Guardpost.
//!
//! This module defines the `GuardError` enum which represents all failure
//! modes of the access-control and presence subsystems. Permission errors
//! always fail closed; presence errors are absorbed at the adapter boundary
//! and never propagate to callers.

use thiserror::Error;

/// The main error type for Guardpost operations.
#[derive(Debug, Error)]
pub enum GuardError {
    // ==================== Session Errors ====================
    /// No authenticated identity is available.
    ///
    /// Guards resolve to `Denied` immediately when they see this; there is
    /// no retry.
    #[error("No authenticated session available")]
    SessionUnavailable,

    // ==================== Permission Store Errors ====================
    /// Fetching permission records from the upstream store failed.
    ///
    /// The affected evaluation fails closed: the guard reports `Denied`,
    /// the error is logged, and no distinct message reaches the end user.
    #[error("Failed to fetch permission records: {message}")]
    RecordFetchFailed { message: String },

    // ==================== Presence Errors ====================
    /// A presence operation was attempted before the channel was joined or
    /// before the local identity was known.
    #[error("Presence channel unavailable: {reason}")]
    ChannelUnavailable { reason: String },

    /// The underlying transport failed during `track` or delivery.
    #[error("Presence transport error: {message}")]
    Transport { message: String },

    // ==================== Internal Errors ====================
    /// Serialization/deserialization failed.
    #[error("Serialization error: {message}")]
    Serialization { message: String },
}

impl GuardError {
    /// Creates a new record fetch error.
    pub fn fetch(message: impl Into<String>) -> Self {
        Self::RecordFetchFailed {
            message: message.into(),
        }
    }

    /// Creates a new channel unavailable error.
    pub fn channel(reason: impl Into<String>) -> Self {
        Self::ChannelUnavailable {
            reason: reason.into(),
        }
    }

    /// Creates a new transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Returns true if this error may be absorbed without interrupting the
    /// caller (presence errors are best-effort by design).
    pub fn is_absorbable(&self) -> bool {
        matches!(
            self,
            Self::ChannelUnavailable { .. } | Self::Transport { .. }
        )
    }
}

/// A Result type alias using GuardError.
pub type GuardResult<T> = Result<T, GuardError>;

impl From<serde_json::Error> for GuardError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: err.to_string(),
        }
    }
}
