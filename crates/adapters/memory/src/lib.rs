//! # Guardpost Memory Adapter
//!
//! In-memory implementations of the Guardpost capability traits, primarily
//! intended for testing and development:
//!
//! - [`MemoryStore`]: a HashMap-backed permission record store with an
//!   injectable failure for fail-closed tests.
//! - [`MemoryHub`] / channels: an in-process pub/sub transport over
//!   `tokio::sync::broadcast`.
//! - [`StaticSession`]: a `watch`-backed session provider with
//!   `sign_in`/`sign_out` transitions.
//!
//! All data is lost when the process exits.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{RwLock, broadcast, watch};

use guardpost_core::error::{GuardError, GuardResult};
use guardpost_core::traits::{PermissionStore, SessionProvider};
use guardpost_core::types::{PermissionRecord, SessionUser};
use guardpost_presence::transport::{ChannelHandle, PresenceTransport};

/// In-memory storage keyed by role id.
type Records = Arc<RwLock<HashMap<String, Vec<PermissionRecord>>>>;

/// In-memory permission record store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Records,
    failing: Arc<AtomicBool>,
    latency_ms: Arc<AtomicU64>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a permission record.
    pub async fn insert(&self, record: PermissionRecord) {
        let mut records = self.records.write().await;
        records.entry(record.role_id.clone()).or_default().push(record);
    }

    /// Makes every subsequent fetch fail, for fail-closed tests.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delays every subsequent fetch, for tests that race a fetch against
    /// a session change.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Clears all stored records.
    pub async fn clear(&self) {
        self.records.write().await.clear();
    }

    /// Returns the number of records stored across all roles.
    pub async fn record_count(&self) -> usize {
        self.records.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl PermissionStore for MemoryStore {
    async fn fetch_records_for_role(&self, role_id: &str) -> GuardResult<Vec<PermissionRecord>> {
        let latency_ms = self.latency_ms.load(Ordering::SeqCst);
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }

        if self.failing.load(Ordering::SeqCst) {
            return Err(GuardError::fetch("simulated store failure"));
        }

        let records = self.records.read().await;
        Ok(records.get(role_id).cloned().unwrap_or_default())
    }
}

/// Capacity of each topic's broadcast buffer. Typing traffic is tiny;
/// laggards skip ahead rather than block.
const TOPIC_CAPACITY: usize = 64;

/// An in-process pub/sub hub.
///
/// Each topic is one `broadcast` channel shared by every joined handle.
#[derive(Clone, Default)]
pub struct MemoryHub {
    topics: Arc<RwLock<HashMap<String, broadcast::Sender<Value>>>>,
    fail_next: Arc<AtomicBool>,
}

impl MemoryHub {
    /// Creates a hub with no topics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `track` on any channel fail, for transport error
    /// tests. Subsequent calls succeed again.
    pub fn fail_next_track(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl PresenceTransport for MemoryHub {
    async fn join(&self, topic: &str) -> GuardResult<Arc<dyn ChannelHandle>> {
        let mut topics = self.topics.write().await;
        let sender = topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(TOPIC_CAPACITY).0)
            .clone();

        Ok(Arc::new(MemoryChannel {
            sender,
            fail_next: Arc::clone(&self.fail_next),
        }))
    }
}

/// A joined in-memory channel.
struct MemoryChannel {
    sender: broadcast::Sender<Value>,
    fail_next: Arc<AtomicBool>,
}

#[async_trait]
impl ChannelHandle for MemoryChannel {
    async fn track(&self, payload: Value) -> GuardResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(GuardError::transport("simulated transport failure"));
        }

        // No receivers is not a failure; presence is fire-and-forget.
        let _ = self.sender.send(payload);
        Ok(())
    }

    fn updates(&self) -> broadcast::Receiver<Value> {
        self.sender.subscribe()
    }

    async fn leave(&self) {
        // Nothing to tear down; receivers close when senders drop.
    }
}

/// A session provider backed by a `watch` channel.
///
/// Tests and development flows drive it with `sign_in`/`sign_out`; guards
/// observe the transitions through `subscribe`.
pub struct StaticSession {
    tx: watch::Sender<Option<SessionUser>>,
}

impl StaticSession {
    /// Creates a provider with the given initial session.
    pub fn new(initial: Option<SessionUser>) -> Self {
        Self {
            tx: watch::Sender::new(initial),
        }
    }

    /// Creates a provider with an authenticated user.
    pub fn signed_in(user: SessionUser) -> Self {
        Self::new(Some(user))
    }

    /// Creates a provider with no authenticated user.
    pub fn anonymous() -> Self {
        Self::new(None)
    }

    /// Replaces the session with an authenticated user.
    pub fn sign_in(&self, user: SessionUser) {
        self.tx.send_replace(Some(user));
    }

    /// Clears the session.
    pub fn sign_out(&self) {
        self.tx.send_replace(None);
    }
}

#[async_trait]
impl SessionProvider for StaticSession {
    async fn current_user(&self) -> Option<SessionUser> {
        self.tx.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<Option<SessionUser>> {
        self.tx.subscribe()
    }
}
