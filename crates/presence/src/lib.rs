//! # Guardpost Presence
//!
//! A best-effort, eventually-consistent typing-status protocol for direct
//! messaging. Typing indicators are ephemeral: state is lost on disconnect,
//! updates may be dropped silently, and every failure is absorbed before it
//! can interrupt message composition.
//!
//! - [`transport`]: the consumed pub/sub channel primitive, as traits.
//! - [`state`]: the `TypingState` wire payload, validated at the boundary.
//! - [`channel`]: the thin adapter over a joined channel; `track` yields a
//!   [`TrackOutcome`](channel::TrackOutcome) instead of raising errors.
//! - [`typing`]: the per-conversation controller that debounces local
//!   keystrokes into broadcasts and folds remote broadcasts into an
//!   indicator with staleness expiry.

pub mod channel;
pub mod state;
pub mod transport;
pub mod typing;

pub use channel::{PresenceChannel, SkipReason, TrackOutcome, TypingUpdates};
pub use state::TypingState;
pub use transport::{ChannelHandle, PresenceTransport};
pub use typing::{TypingConfig, TypingController};
