//! The access guard.
//!
//! Wraps a protected UI region. The guard owns the permission snapshot
//! lifecycle: it fetches records for the current session's role, consults
//! the policy engine, and maps the decision to a renderable view. Every
//! error path fails closed.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use guardpost_core::traits::{PermissionStore, SessionProvider};
use guardpost_core::types::{Decision, PermissionType, Role};

use crate::policy::{RecordSnapshot, evaluate};

/// What the caller should render for a guarded region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardView {
    /// The snapshot is still loading; render a placeholder.
    Loading,
    /// Access granted; render the protected content.
    Content,
    /// Page-level denial; navigate away from the protected route.
    Redirect { to: String },
    /// Feature-level denial; omit the feature's UI without navigating.
    Hidden,
}

/// A shared, replace-only holder for the session's record snapshot.
///
/// Multiple guards for the same session may share one cell; mutation only
/// happens via wholesale fetch-and-replace. The cell carries the epoch
/// counter that invalidates in-flight fetches, so a reset by any guard
/// discards the pending fetch of every guard sharing the cell.
#[derive(Clone, Default)]
pub struct SnapshotCell {
    inner: Arc<RwLock<RecordSnapshot>>,
    /// Bumped on reset; a fetch started under an older epoch is discarded.
    epoch: Arc<AtomicU64>,
}

impl SnapshotCell {
    /// Creates an empty (not yet fetched) cell.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current snapshot.
    pub async fn get(&self) -> RecordSnapshot {
        self.inner.read().await.clone()
    }

    /// Returns the current epoch. Observe it before starting a fetch and
    /// pass it back to [`install`](SnapshotCell::install).
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Replaces the snapshot if no reset happened since `epoch` was
    /// observed. Returns false if the result was discarded as stale.
    pub async fn install(&self, epoch: u64, snapshot: RecordSnapshot) -> bool {
        let mut current = self.inner.write().await;
        if self.epoch.load(Ordering::Acquire) != epoch {
            return false;
        }
        *current = snapshot;
        true
    }

    /// Clears the snapshot back to not-fetched and invalidates any fetch
    /// still in flight.
    pub async fn reset(&self) {
        let mut current = self.inner.write().await;
        self.epoch.fetch_add(1, Ordering::AcqRel);
        *current = RecordSnapshot::NotLoaded;
    }
}

/// Gates a route or feature behind a `(resource_name, permission_type)`
/// declared by the caller.
///
/// State machine: `Loading -> {Allowed, Denied}`. Re-entry to `Loading`
/// happens only through [`reset`](AccessGuard::reset), driven by a session
/// change.
pub struct AccessGuard {
    resource_name: String,
    permission_type: PermissionType,
    redirect_to: String,
    session: Arc<dyn SessionProvider>,
    store: Arc<dyn PermissionStore>,
    snapshot: SnapshotCell,
}

impl AccessGuard {
    /// Creates a page-level guard. Denial redirects to `/` unless
    /// overridden with [`redirect_to`](AccessGuard::redirect_to).
    pub fn page(
        resource_name: impl Into<String>,
        session: Arc<dyn SessionProvider>,
        store: Arc<dyn PermissionStore>,
    ) -> Self {
        Self::new(resource_name, PermissionType::PageAccess, session, store)
    }

    /// Creates a feature-level guard. Denial hides the feature.
    pub fn feature(
        resource_name: impl Into<String>,
        session: Arc<dyn SessionProvider>,
        store: Arc<dyn PermissionStore>,
    ) -> Self {
        Self::new(resource_name, PermissionType::FeatureAccess, session, store)
    }

    fn new(
        resource_name: impl Into<String>,
        permission_type: PermissionType,
        session: Arc<dyn SessionProvider>,
        store: Arc<dyn PermissionStore>,
    ) -> Self {
        Self {
            resource_name: resource_name.into(),
            permission_type,
            redirect_to: "/".to_string(),
            session,
            store,
            snapshot: SnapshotCell::new(),
        }
    }

    /// Sets the navigation target for a page-level denial.
    pub fn redirect_to(mut self, to: impl Into<String>) -> Self {
        self.redirect_to = to.into();
        self
    }

    /// Shares a snapshot cell with other guards for the same session.
    pub fn with_snapshot(mut self, snapshot: SnapshotCell) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// The resource this guard protects.
    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    async fn current_role(&self) -> Option<Role> {
        self.session.current_user().await.and_then(|u| u.role)
    }

    /// Evaluates the policy engine against the current snapshot.
    pub async fn decision(&self) -> Decision {
        let role = self.current_role().await;
        let snapshot = self.snapshot.get().await;
        evaluate(role.as_ref(), &self.resource_name, self.permission_type, &snapshot)
    }

    /// Fetches records for the current role, installs the snapshot, and
    /// returns the resulting decision.
    ///
    /// A fetch failure installs an empty snapshot: the guard reports
    /// `Denied`, never an error. If [`reset`](AccessGuard::reset) ran while
    /// the fetch was in flight (on this guard or any guard sharing the
    /// snapshot cell), the result is discarded on arrival.
    pub async fn refresh(&self) -> Decision {
        let epoch = self.snapshot.epoch();

        let Some(role) = self.current_role().await else {
            return Decision::Denied;
        };

        let snapshot = match self.store.fetch_records_for_role(&role.id).await {
            Ok(records) => RecordSnapshot::loaded(records),
            Err(err) => {
                tracing::error!(
                    role = %role.id,
                    resource = %self.resource_name,
                    error = %err,
                    "permission record fetch failed; failing closed"
                );
                RecordSnapshot::empty()
            }
        };

        if !self.snapshot.install(epoch, snapshot).await {
            tracing::debug!(
                resource = %self.resource_name,
                "session changed during fetch; discarding result"
            );
        }

        self.decision().await
    }

    /// Resets the guard to `Loading` and invalidates any in-flight fetch.
    pub async fn reset(&self) {
        self.snapshot.reset().await;
    }

    /// Maps the current decision to a renderable view.
    pub async fn view(&self) -> GuardView {
        match self.decision().await {
            Decision::Loading => GuardView::Loading,
            Decision::Allowed => GuardView::Content,
            Decision::Denied => match self.permission_type {
                PermissionType::PageAccess => GuardView::Redirect {
                    to: self.redirect_to.clone(),
                },
                PermissionType::FeatureAccess => GuardView::Hidden,
            },
        }
    }

    /// Spawns a task that resets and re-evaluates the guard whenever the
    /// session changes. Abort the handle when the guarded region unmounts.
    pub fn watch_session(self: Arc<Self>) -> JoinHandle<()> {
        let mut rx = self.session.subscribe();
        tokio::spawn(async move {
            while rx.changed().await.is_ok() {
                self.reset().await;
                self.refresh().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use guardpost_adapter_memory::{MemoryStore, StaticSession};
    use guardpost_core::types::{PermissionRecord, SessionUser};
    use std::time::Duration;

    fn staff_user() -> SessionUser {
        SessionUser::new("u1").with_role(Role::new("staff", "Staff"))
    }

    fn booking_record() -> PermissionRecord {
        PermissionRecord::new("staff", "bookings", PermissionType::PageAccess)
    }

    #[tokio::test]
    async fn test_active_record_renders_content() {
        let store = Arc::new(MemoryStore::new());
        store.insert(booking_record()).await;
        let session = Arc::new(StaticSession::signed_in(staff_user()));

        let guard = AccessGuard::page("bookings", session, store);
        assert_eq!(guard.decision().await, Decision::Loading);
        assert_eq!(guard.refresh().await, Decision::Allowed);
        assert_eq!(guard.view().await, GuardView::Content);
    }

    #[tokio::test]
    async fn test_inactive_record_redirects() {
        let store = Arc::new(MemoryStore::new());
        store.insert(booking_record().inactive()).await;
        let session = Arc::new(StaticSession::signed_in(staff_user()));

        let guard = AccessGuard::page("bookings", session, store).redirect_to("/denied");
        guard.refresh().await;
        assert_eq!(
            guard.view().await,
            GuardView::Redirect {
                to: "/denied".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_feature_denial_hides_without_navigating() {
        let store = Arc::new(MemoryStore::new());
        let session = Arc::new(StaticSession::signed_in(staff_user()));

        let guard = AccessGuard::feature("export_csv", session, store);
        guard.refresh().await;
        assert_eq!(guard.view().await, GuardView::Hidden);
    }

    #[tokio::test]
    async fn test_fetch_failure_fails_closed() {
        let store = Arc::new(MemoryStore::new());
        store.insert(booking_record()).await;
        store.set_failing(true);
        let session = Arc::new(StaticSession::signed_in(staff_user()));

        let guard = AccessGuard::page("bookings", session, store);
        assert_eq!(guard.refresh().await, Decision::Denied);
        // Terminal for this evaluation: still denied, not loading.
        assert_eq!(guard.decision().await, Decision::Denied);
    }

    #[tokio::test]
    async fn test_anonymous_is_denied_immediately() {
        let store = Arc::new(MemoryStore::new());
        store.insert(booking_record()).await;
        let session = Arc::new(StaticSession::anonymous());

        let guard = AccessGuard::page("bookings", session, store);
        assert_eq!(guard.refresh().await, Decision::Denied);
    }

    #[tokio::test]
    async fn test_reset_returns_to_loading_and_reevaluates() {
        let store = Arc::new(MemoryStore::new());
        store.insert(booking_record()).await;
        let session = Arc::new(StaticSession::signed_in(staff_user()));

        let guard = AccessGuard::page("bookings", Arc::clone(&session) as _, store);
        assert_eq!(guard.refresh().await, Decision::Allowed);

        session.sign_out();
        guard.reset().await;
        assert_eq!(guard.refresh().await, Decision::Denied);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_in_flight_fetch() {
        let store = Arc::new(MemoryStore::new());
        store.insert(booking_record()).await;
        store.set_latency(Duration::from_millis(100));
        let session = Arc::new(StaticSession::signed_in(staff_user()));

        let guard = Arc::new(AccessGuard::page("bookings", session, store));
        let inflight = tokio::spawn({
            let guard = Arc::clone(&guard);
            async move { guard.refresh().await }
        });

        // Let the fetch suspend inside the store, then reset mid-flight.
        tokio::time::sleep(Duration::from_millis(10)).await;
        guard.reset().await;

        // The late result is discarded on arrival: the guard stays in
        // `Loading` instead of installing a pre-reset snapshot.
        assert_eq!(inflight.await.unwrap(), Decision::Loading);
        assert_eq!(guard.decision().await, Decision::Loading);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shared_cell_reset_invalidates_peer_fetch() {
        let store = Arc::new(MemoryStore::new());
        store.insert(booking_record()).await;
        store.set_latency(Duration::from_millis(100));
        let session = Arc::new(StaticSession::signed_in(staff_user()));
        let cell = SnapshotCell::new();

        let page = Arc::new(
            AccessGuard::page("bookings", Arc::clone(&session) as _, Arc::clone(&store) as _)
                .with_snapshot(cell.clone()),
        );
        let feature = AccessGuard::feature(
            "export_csv",
            Arc::clone(&session) as _,
            Arc::clone(&store) as _,
        )
        .with_snapshot(cell.clone());

        let inflight = tokio::spawn({
            let page = Arc::clone(&page);
            async move { page.refresh().await }
        });
        tokio::time::sleep(Duration::from_millis(10)).await;

        // A reset issued through any guard sharing the cell invalidates
        // the fetch the other guard still has in flight.
        feature.reset().await;

        assert_eq!(inflight.await.unwrap(), Decision::Loading);
        assert_eq!(page.decision().await, Decision::Loading);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_session_watcher_reevaluates_on_sign_out() {
        let store = Arc::new(MemoryStore::new());
        store.insert(booking_record()).await;
        let session = Arc::new(StaticSession::signed_in(staff_user()));

        let guard = Arc::new(AccessGuard::page(
            "bookings",
            Arc::clone(&session) as _,
            store,
        ));
        assert_eq!(guard.refresh().await, Decision::Allowed);

        let watcher = Arc::clone(&guard).watch_session();
        session.sign_out();
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(guard.decision().await, Decision::Denied);
        watcher.abort();
    }

    #[tokio::test]
    async fn test_guards_share_a_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store.insert(booking_record()).await;
        store
            .insert(PermissionRecord::new(
                "staff",
                "export_csv",
                PermissionType::FeatureAccess,
            ))
            .await;
        let session = Arc::new(StaticSession::signed_in(staff_user()));
        let cell = SnapshotCell::new();

        let page = AccessGuard::page("bookings", Arc::clone(&session) as _, Arc::clone(&store) as _)
            .with_snapshot(cell.clone());
        let feature =
            AccessGuard::feature("export_csv", Arc::clone(&session) as _, Arc::clone(&store) as _)
                .with_snapshot(cell.clone());

        // One fetch serves both guards.
        page.refresh().await;
        assert_eq!(feature.decision().await, Decision::Allowed);
    }
}
