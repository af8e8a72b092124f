//! The presence channel adapter.
//!
//! A thin wrapper over a joined [`ChannelHandle`] that publishes and
//! receives [`TypingState`] values. Presence must never block or crash
//! message composition: `track` on an unjoined channel or with an unknown
//! identity is a no-op, and transport failures are caught, logged, and
//! swallowed with no retry. Callers observe the result as a
//! [`TrackOutcome`], which they are free to ignore.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;

use crate::state::TypingState;
use crate::transport::{ChannelHandle, PresenceTransport};

/// Why a `track` call did not reach the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The channel has not been joined yet.
    NotJoined,
    /// The local identity is unknown.
    NoIdentity,
    /// The transport accepted the call but delivery failed.
    Transport,
}

/// The observable, ignorable result of a `track` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The transport acknowledged the update.
    Sent,
    /// The update silently did not happen.
    Skipped(SkipReason),
}

impl TrackOutcome {
    /// Returns true if the transport acknowledged the update.
    pub fn is_sent(&self) -> bool {
        matches!(self, Self::Sent)
    }
}

/// A presence channel bound to one conversation topic.
#[derive(Clone)]
pub struct PresenceChannel {
    handle: Option<Arc<dyn ChannelHandle>>,
    local_user: Option<String>,
}

impl PresenceChannel {
    /// Joins `topic` on the transport.
    ///
    /// A join failure yields a detached channel: every subsequent `track`
    /// is a no-op rather than an error, and the next conversation open
    /// simply tries again.
    pub async fn join(
        transport: &dyn PresenceTransport,
        topic: &str,
        local_user: impl Into<String>,
    ) -> Self {
        match transport.join(topic).await {
            Ok(handle) => Self {
                handle: Some(handle),
                local_user: Some(local_user.into()),
            },
            Err(err) => {
                tracing::warn!(topic, error = %err, "presence channel join failed; staying detached");
                Self::detached()
            }
        }
    }

    /// A channel that was never joined. All operations are no-ops.
    pub fn detached() -> Self {
        Self {
            handle: None,
            local_user: None,
        }
    }

    /// Wraps an already-joined handle.
    pub fn from_handle(handle: Arc<dyn ChannelHandle>, local_user: impl Into<String>) -> Self {
        Self {
            handle: Some(handle),
            local_user: Some(local_user.into()),
        }
    }

    /// A joined channel whose local identity is not yet known; `track` is
    /// a no-op until an identity exists.
    pub fn without_identity(handle: Arc<dyn ChannelHandle>) -> Self {
        Self {
            handle: Some(handle),
            local_user: None,
        }
    }

    /// Returns true if the channel is joined.
    pub fn is_joined(&self) -> bool {
        self.handle.is_some()
    }

    /// Publishes a typing state, awaiting the transport acknowledgment.
    ///
    /// Never errors and never panics; the outcome says whether the update
    /// actually went out.
    pub async fn track(&self, state: &TypingState) -> TrackOutcome {
        let Some(handle) = &self.handle else {
            tracing::trace!("presence track skipped; channel not joined");
            return TrackOutcome::Skipped(SkipReason::NotJoined);
        };
        if self.local_user.is_none() {
            tracing::trace!("presence track skipped; local identity unknown");
            return TrackOutcome::Skipped(SkipReason::NoIdentity);
        }

        match handle.track(state.to_value()).await {
            Ok(()) => TrackOutcome::Sent,
            Err(err) => {
                tracing::warn!(error = %err, "presence track failed; update dropped");
                TrackOutcome::Skipped(SkipReason::Transport)
            }
        }
    }

    /// Subscribes to remote typing states. `None` if not joined.
    pub fn subscribe(&self) -> Option<TypingUpdates> {
        self.handle
            .as_ref()
            .map(|h| TypingUpdates { rx: h.updates() })
    }

    /// Leaves the underlying channel, if joined.
    pub async fn leave(&self) {
        if let Some(handle) = &self.handle {
            handle.leave().await;
        }
    }
}

/// A validated stream of remote [`TypingState`] updates.
///
/// Malformed payloads are dropped at this boundary; a lagged receiver skips
/// ahead (typing indicators are self-correcting on the next broadcast).
pub struct TypingUpdates {
    rx: broadcast::Receiver<Value>,
}

impl TypingUpdates {
    /// Receives the next valid typing state, or `None` once the channel
    /// is closed.
    pub async fn recv(&mut self) -> Option<TypingState> {
        loop {
            match self.rx.recv().await {
                Ok(value) => match TypingState::from_value(value) {
                    Some(state) => return Some(state),
                    None => tracing::trace!("dropping malformed presence payload"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "presence receiver lagged; skipping ahead");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

// Tests for this module live in tests/; they use MemoryHub from
// guardpost_adapter_memory, which cannot be a unit-test dependency here
// because that crate depends on guardpost_presence.
