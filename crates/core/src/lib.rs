//! # Guardpost Core
//!
//! Core types and capability traits for Guardpost, an embeddable
//! access-control layer with a lightweight realtime presence protocol.
//!
//! This crate defines the data model (permission records, decisions,
//! session identities) and the traits the surrounding application must
//! provide: a session provider and a permission record store. The actual
//! policy evaluation lives in `guardpost_access`; the presence protocol
//! lives in `guardpost_presence`.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{GuardError, GuardResult};
pub use traits::{PermissionStore, SessionProvider};
pub use types::{Decision, PermissionRecord, PermissionType, Role, SessionUser};
