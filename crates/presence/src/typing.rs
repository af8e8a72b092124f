//! The typing status controller.
//!
//! Owns per-conversation typing state for one peer pair. Local keystrokes
//! are debounced into channel broadcasts: `typing=true` goes out on the
//! first keystroke after an idle period, `typing=false` after the idle
//! timeout elapses or immediately on message send. Remote broadcasts are
//! folded into a single boolean indicator that expires locally if the peer
//! stops refreshing it (the transport gives no leave notification).

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::channel::PresenceChannel;
use crate::state::TypingState;

/// Tunables for the typing protocol. Parameters, not protocol constants.
#[derive(Debug, Clone, Copy)]
pub struct TypingConfig {
    /// How long after the last keystroke a `typing=false` broadcast goes
    /// out.
    pub idle_timeout: Duration,
    /// How long a remote `typing=true` stays displayable without a refresh
    /// before it is treated as `typing=false`.
    pub stale_after: Duration,
}

impl Default for TypingConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(3),
            stale_after: Duration::from_secs(5),
        }
    }
}

struct LocalState {
    /// Whether our last broadcast said `typing=true`.
    sent_typing: bool,
    /// When the peer last reported `typing=true`, if it has not been
    /// cleared since.
    peer_typing_since: Option<Instant>,
    idle_task: Option<JoinHandle<()>>,
    listen_task: Option<JoinHandle<()>>,
}

struct Shared {
    local_user: String,
    peer: String,
    channel: PresenceChannel,
    config: TypingConfig,
    state: Mutex<LocalState>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            if let Some(task) = state.idle_task.take() {
                task.abort();
            }
            if let Some(task) = state.listen_task.take() {
                task.abort();
            }
        }
    }
}

/// Translates local "user is typing" signals into outbound broadcasts and
/// folds inbound broadcasts into an indicator.
///
/// Cheap to clone; clones share state. Broadcast failures never surface
/// here: a failed update silently did not happen and the next keystroke
/// self-corrects.
#[derive(Clone)]
pub struct TypingController {
    shared: Arc<Shared>,
}

impl TypingController {
    /// Creates a controller for the conversation between `local_user` and
    /// `peer` over the given channel.
    pub fn new(
        local_user: impl Into<String>,
        peer: impl Into<String>,
        channel: PresenceChannel,
        config: TypingConfig,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                local_user: local_user.into(),
                peer: peer.into(),
                channel,
                config,
                state: Mutex::new(LocalState {
                    sent_typing: false,
                    peer_typing_since: None,
                    idle_task: None,
                    listen_task: None,
                }),
            }),
        }
    }

    /// Signals a local keystroke.
    ///
    /// Broadcasts `typing=true` only on the first keystroke after idle and
    /// (re)arms the idle timer. Arming aborts the previous timer task, so a
    /// later `typing=false` can never be overtaken by a superseded queued
    /// broadcast.
    pub async fn input_activity(&self) {
        let first_keystroke = {
            let mut state = self.shared.state.lock().expect("typing state poisoned");
            if let Some(task) = state.idle_task.take() {
                task.abort();
            }
            let first = !state.sent_typing;
            state.sent_typing = true;
            first
        };

        if first_keystroke {
            self.broadcast(true).await;
        }

        let controller = self.clone();
        let idle_timeout = self.shared.config.idle_timeout;
        let task = tokio::spawn(async move {
            tokio::time::sleep(idle_timeout).await;
            controller.idle_elapsed().await;
        });
        self.shared
            .state
            .lock()
            .expect("typing state poisoned")
            .idle_task = Some(task);
    }

    /// Signals that a message was sent: the idle timer is cancelled and
    /// `typing=false` goes out immediately.
    pub async fn message_sent(&self) {
        {
            let mut state = self.shared.state.lock().expect("typing state poisoned");
            if let Some(task) = state.idle_task.take() {
                task.abort();
            }
            state.sent_typing = false;
        }
        self.broadcast(false).await;
    }

    async fn idle_elapsed(&self) {
        {
            let mut state = self.shared.state.lock().expect("typing state poisoned");
            state.idle_task = None;
            if !state.sent_typing {
                return;
            }
            state.sent_typing = false;
        }
        self.broadcast(false).await;
    }

    async fn broadcast(&self, typing: bool) {
        let state = TypingState::new(&self.shared.local_user, &self.shared.peer, typing);
        // Outcome is observable but ignorable; composition is never
        // interrupted by a dropped update.
        let _outcome = self.shared.channel.track(&state).await;
    }

    /// Folds a remote broadcast into the indicator.
    ///
    /// Updates only apply when addressed from the conversation peer to the
    /// local user; everything else on the channel is ignored.
    pub fn apply_remote(&self, remote: TypingState) {
        if !remote.is_from_peer(&self.shared.local_user, &self.shared.peer) {
            tracing::trace!(
                user_id = %remote.user_id,
                typing_to = %remote.typing_to,
                "ignoring typing state for another peer pair"
            );
            return;
        }

        let mut state = self.shared.state.lock().expect("typing state poisoned");
        state.peer_typing_since = if remote.typing {
            Some(Instant::now())
        } else {
            None
        };
    }

    /// Whether the peer's typing indicator should currently display.
    ///
    /// A remote `typing=true` expires after `stale_after` without a
    /// refresh, so an ungraceful peer disconnect cannot leave the
    /// indicator stuck.
    pub fn peer_typing(&self) -> bool {
        let state = self.shared.state.lock().expect("typing state poisoned");
        state
            .peer_typing_since
            .map(|since| since.elapsed() < self.shared.config.stale_after)
            .unwrap_or(false)
    }

    /// Spawns the pump task that feeds channel updates into this
    /// controller. Does nothing on a detached channel.
    pub fn listen(&self) {
        let Some(mut updates) = self.shared.channel.subscribe() else {
            tracing::debug!("typing listener not started; channel not joined");
            return;
        };

        let controller = self.clone();
        let task = tokio::spawn(async move {
            while let Some(state) = updates.recv().await {
                controller.apply_remote(state);
            }
        });
        self.shared
            .state
            .lock()
            .expect("typing state poisoned")
            .listen_task = Some(task);
    }

    /// Leaves the conversation: cancels the pending idle broadcast, stops
    /// the listener, and leaves the channel.
    pub async fn leave(&self) {
        {
            let mut state = self.shared.state.lock().expect("typing state poisoned");
            if let Some(task) = state.idle_task.take() {
                task.abort();
            }
            if let Some(task) = state.listen_task.take() {
                task.abort();
            }
        }
        self.shared.channel.leave().await;
    }
}

// Tests for this module live in tests/; they use MemoryHub from
// guardpost_adapter_memory, which cannot be a unit-test dependency here
// because that crate depends on guardpost_presence.
