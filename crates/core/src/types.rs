//! Core data types for Guardpost.
//!
//! This module defines the permission record model consumed by the policy
//! engine, the `Decision` it produces, and the session identity types the
//! session provider exposes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A role assigned to an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role identifier.
    pub id: String,
    /// Human-readable name.
    pub name: String,
}

impl Role {
    /// Creates a new role.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The authenticated identity exposed by the session provider.
///
/// An unauthenticated visitor is represented as the absence of a
/// `SessionUser`, not as a user with an empty id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// Unique identifier for the user.
    pub id: String,
    /// The user's role, if one has been assigned.
    pub role: Option<Role>,
}

impl SessionUser {
    /// Creates a new session user without a role.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role: None,
        }
    }

    /// Sets the user's role.
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }
}

/// Classification of a permission gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionType {
    /// Gates an entire route.
    PageAccess,
    /// Gates a sub-feature within an accessible page.
    FeatureAccess,
}

impl std::fmt::Display for PermissionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PageAccess => write!(f, "page_access"),
            Self::FeatureAccess => write!(f, "feature_access"),
        }
    }
}

/// A permission record as stored by the administrative process.
///
/// Records are read-only from the policy engine's perspective. Inactive
/// records are treated as absent; for a given
/// `(role_id, resource_name, permission_type)` any active record grants
/// access (the engine is permissive on duplicates).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionRecord {
    /// Opaque unique identifier.
    pub id: String,
    /// The role this record applies to.
    pub role_id: String,
    /// The protected route or feature (e.g. "bookings").
    pub resource_name: String,
    /// Whether this record gates a page or a feature.
    pub permission_type: PermissionType,
    /// Inactive records are ignored by the engine (soft disable).
    pub is_active: bool,
    /// Optional human-readable text, not used in decisions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// When the record was created. Audit-only.
    pub created_at: DateTime<Utc>,
    /// When the record was last updated. Audit-only.
    pub updated_at: DateTime<Utc>,
}

impl PermissionRecord {
    /// Creates a new active permission record with a generated id.
    pub fn new(
        role_id: impl Into<String>,
        resource_name: impl Into<String>,
        permission_type: PermissionType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role_id: role_id.into(),
            resource_name: resource_name.into(),
            permission_type,
            is_active: true,
            description: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Marks this record inactive (soft disable).
    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Returns true if this record actively grants the given gate.
    pub fn grants(
        &self,
        role_id: &str,
        resource_name: &str,
        permission_type: PermissionType,
    ) -> bool {
        self.is_active
            && self.role_id == role_id
            && self.resource_name == resource_name
            && self.permission_type == permission_type
    }
}

/// The outcome of a permission evaluation.
///
/// Transient: recomputed on every evaluation, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The record snapshot has not been fetched yet.
    Loading,
    /// An active matching record exists.
    Allowed,
    /// No active matching record, or no authenticated role.
    Denied,
}

impl Decision {
    /// Returns true if access is granted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Self::Allowed)
    }

    /// Returns true if the evaluation is still pending its snapshot.
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Loading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_type_serde() {
        let json = serde_json::to_string(&PermissionType::PageAccess).unwrap();
        assert_eq!(json, "\"page_access\"");

        let parsed: PermissionType = serde_json::from_str("\"feature_access\"").unwrap();
        assert_eq!(parsed, PermissionType::FeatureAccess);
    }

    #[test]
    fn test_record_grants() {
        let record = PermissionRecord::new("staff", "bookings", PermissionType::PageAccess);

        assert!(record.grants("staff", "bookings", PermissionType::PageAccess));
        assert!(!record.grants("staff", "bookings", PermissionType::FeatureAccess));
        assert!(!record.grants("admin", "bookings", PermissionType::PageAccess));

        let disabled = record.inactive();
        assert!(!disabled.grants("staff", "bookings", PermissionType::PageAccess));
    }

    #[test]
    fn test_session_user_role() {
        let user = SessionUser::new("u1").with_role(Role::new("staff", "Staff"));
        assert_eq!(user.role.as_ref().unwrap().id, "staff");
    }
}
