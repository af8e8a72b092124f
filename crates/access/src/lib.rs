//! # Guardpost Access
//!
//! Role-based access control for routes and features. Two pieces:
//!
//! - [`policy`]: the pure permission policy engine, a deterministic
//!   function from `(role, resource, permission type, record snapshot)` to
//!   a [`Decision`](guardpost_core::Decision). No I/O.
//! - [`guard`]: the stateful access guard that owns the snapshot lifecycle,
//!   consults the engine, and maps decisions to renderable views. Fails
//!   closed on every error path.

pub mod guard;
pub mod policy;

pub use guard::{AccessGuard, GuardView, SnapshotCell};
pub use policy::{RecordSnapshot, evaluate};
