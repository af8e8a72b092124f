//! Capability traits consumed by Guardpost.
//!
//! The surrounding application provides these as explicit handles; the
//! access and presence subsystems never reach for process-wide globals.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::GuardResult;
use crate::types::{PermissionRecord, SessionUser};

/// Provides the current authenticated identity, if any.
///
/// Guards subscribe to change notifications so they can reset and
/// re-evaluate when the session changes (sign-in, sign-out, role change).
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Returns the current authenticated user, or `None` for anonymous.
    async fn current_user(&self) -> Option<SessionUser>;

    /// Subscribes to session changes.
    ///
    /// The receiver yields the new session value whenever it changes.
    fn subscribe(&self) -> watch::Receiver<Option<SessionUser>>;
}

/// Read access to the persisted permission records.
///
/// Records are created and updated by an administrative process outside
/// this core; Guardpost only ever reads them.
#[async_trait]
pub trait PermissionStore: Send + Sync {
    /// Fetches all permission records relevant to the given role.
    async fn fetch_records_for_role(&self, role_id: &str) -> GuardResult<Vec<PermissionRecord>>;
}
