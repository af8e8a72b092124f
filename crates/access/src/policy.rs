//! The permission policy engine.
//!
//! A pure mapping from `(role, resource, permission type)` to a
//! [`Decision`], given the snapshot of permission records currently loaded
//! for the session. The engine performs no I/O and raises no errors; a
//! failed upstream fetch is represented by the guard as an empty loaded
//! snapshot, which denies everything (fail-closed).

use std::sync::Arc;

use guardpost_core::types::{Decision, PermissionRecord, PermissionType, Role};

/// The permission records loaded for the current session.
///
/// `NotLoaded` is distinct from "fetched, empty": a snapshot that has not
/// been fetched yet evaluates to `Loading`, while an empty loaded snapshot
/// evaluates to `Denied`. Snapshots are replaced wholesale on refresh and
/// shared read-only across guards, never edited in place.
#[derive(Debug, Clone, Default)]
pub enum RecordSnapshot {
    /// No fetch has completed yet.
    #[default]
    NotLoaded,
    /// The records fetched for the session's role.
    Loaded(Arc<[PermissionRecord]>),
}

impl RecordSnapshot {
    /// Creates a loaded snapshot from fetched records.
    pub fn loaded(records: Vec<PermissionRecord>) -> Self {
        Self::Loaded(Arc::from(records))
    }

    /// Creates a loaded, empty snapshot. Used to fail closed after a fetch
    /// error: every evaluation against it denies.
    pub fn empty() -> Self {
        Self::Loaded(Arc::from(Vec::new()))
    }

    /// Returns true if a fetch has completed.
    pub fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded(_))
    }

    /// Returns the loaded records, if any.
    pub fn records(&self) -> Option<&[PermissionRecord]> {
        match self {
            Self::NotLoaded => None,
            Self::Loaded(records) => Some(records),
        }
    }
}

/// Evaluates a permission gate against the loaded records.
///
/// - An absent role is always `Denied`, fetched or not.
/// - A `NotLoaded` snapshot is `Loading`.
/// - Otherwise, any active record matching `(role.id, resource_name,
///   permission_type)` grants access; duplicates are permissive.
pub fn evaluate(
    role: Option<&Role>,
    resource_name: &str,
    permission_type: PermissionType,
    snapshot: &RecordSnapshot,
) -> Decision {
    let Some(role) = role else {
        return Decision::Denied;
    };

    let Some(records) = snapshot.records() else {
        return Decision::Loading;
    };

    let granted = records
        .iter()
        .any(|r| r.grants(&role.id, resource_name, permission_type));

    if granted {
        Decision::Allowed
    } else {
        Decision::Denied
    }
}
