//! The consumed pub/sub channel primitive.
//!
//! Guardpost does not implement a transport; the application provides one
//! (a realtime service client, a message broker, or the in-memory hub from
//! `guardpost_adapter_memory` in tests).

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::broadcast;

use guardpost_core::error::GuardResult;

/// Joins transient pub/sub topics.
#[async_trait]
pub trait PresenceTransport: Send + Sync {
    /// Joins the named topic and returns a handle to it.
    async fn join(&self, topic: &str) -> GuardResult<Arc<dyn ChannelHandle>>;
}

/// A joined pub/sub channel.
///
/// Payloads are raw JSON values at this level; typed validation happens in
/// the presence adapter, not the transport.
#[async_trait]
pub trait ChannelHandle: Send + Sync {
    /// Publishes a payload to the channel and awaits the transport's
    /// acknowledgment.
    async fn track(&self, payload: Value) -> GuardResult<()>;

    /// Subscribes to payloads published on the channel.
    ///
    /// Updates are delivered in arrival order per channel; no ordering is
    /// guaranteed across channels.
    fn updates(&self) -> broadcast::Receiver<Value>;

    /// Leaves the channel. Subsequent receivers see the stream close.
    async fn leave(&self);
}
