//! The typing-status wire payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A typing-status broadcast, scoped to one peer pair.
///
/// A `TypingState` is only meaningful for the pair `(user_id, typing_to)`;
/// a participant may be in several conversations at once, so receivers must
/// discard broadcasts not addressed to the conversation they are viewing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypingState {
    /// The participant this state describes.
    pub user_id: String,
    /// Whether that participant is currently typing.
    pub typing: bool,
    /// The recipient the state applies to.
    pub typing_to: String,
    /// When the sender produced this broadcast. ISO-8601 on the wire.
    pub last_typing_update: DateTime<Utc>,
}

impl TypingState {
    /// Creates a state stamped with the current time.
    pub fn new(user_id: impl Into<String>, typing_to: impl Into<String>, typing: bool) -> Self {
        Self {
            user_id: user_id.into(),
            typing,
            typing_to: typing_to.into(),
            last_typing_update: Utc::now(),
        }
    }

    /// Validates a raw channel payload into a typed state.
    ///
    /// Returns `None` for malformed payloads; the caller drops them.
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }

    /// Serializes for the wire.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Returns true if this broadcast is addressed from `peer` to
    /// `local_user`, the only case a viewer of that conversation may fold
    /// into its indicator.
    pub fn is_from_peer(&self, local_user: &str, peer: &str) -> bool {
        self.typing_to == local_user && self.user_id == peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let state = TypingState::new("alice", "bob", true);
        let value = state.to_value();

        assert_eq!(value["user_id"], "alice");
        assert_eq!(value["typing"], true);
        assert_eq!(value["typing_to"], "bob");
        // ISO-8601 timestamp string.
        assert!(value["last_typing_update"].is_string());
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        assert!(TypingState::from_value(serde_json::json!({"user_id": "alice"})).is_none());
        assert!(TypingState::from_value(Value::Null).is_none());
        assert!(
            TypingState::from_value(serde_json::json!({
                "user_id": "alice",
                "typing": "yes",
                "typing_to": "bob",
                "last_typing_update": "2026-01-01T00:00:00Z"
            }))
            .is_none()
        );
    }

    #[test]
    fn test_peer_pair_scoping() {
        let state = TypingState::new("alice", "bob", true);

        assert!(state.is_from_peer("bob", "alice"));
        // Wrong recipient: a viewer who is not bob must ignore it.
        assert!(!state.is_from_peer("carol", "alice"));
        // Wrong sender for the viewed conversation.
        assert!(!state.is_from_peer("bob", "carol"));
    }
}
