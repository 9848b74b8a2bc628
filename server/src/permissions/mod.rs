//! Permission system types and utilities.
//!
//! Roles carry a [`Permissions`] bitfield; a player's effective permissions
//! are the union over their active roles, with the administrator bit
//! implying everything.

pub mod bitfield;
pub mod resolver;

pub use bitfield::{has_permission, list_permissions, Permissions, UnknownPermissionBits};
pub use resolver::{can_manage_role, compute_permissions, highest_position, PermissionError};
