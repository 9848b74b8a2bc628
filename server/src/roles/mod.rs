//! Roles: named, positioned permission bundles and their process-wide cache.

pub mod cache;
pub mod handlers;
pub mod models;
pub mod registry;

pub use cache::{RoleCache, RoleSet};
pub use models::{
    CreateRoleRequest, GrantRoleRequest, Role, RoleId, UpdateRoleRequest, DEFAULT_ADMIN_ROLE,
};
pub use registry::{NewRole, RoleRefreshJob, RoleRegistry};
