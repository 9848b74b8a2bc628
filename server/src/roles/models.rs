//! Role models.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::permissions::Permissions;

/// Name of the role seeded into an empty registry.
pub const DEFAULT_ADMIN_ROLE: &str = "admin";

static HEX_COLOR: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^#[0-9a-fA-F]{6}$").expect("valid regex"));

/// Immutable role identifier. Grants reference roles by id, so renames
/// never touch player records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleId(pub Uuid);

impl RoleId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named bundle of permission bits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    /// Unique among stored roles.
    pub name: String,
    /// Lower position = higher precedence.
    pub position: i32,
    pub permissions: Permissions,
    pub color: Option<String>,
    /// Whether holders may display this role's icon.
    pub has_icon: bool,
    /// External subscription SKU that entitles players to this role.
    pub sku: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Role {
    /// Build a new role with the given name, position and permissions.
    #[must_use]
    pub fn new(name: impl Into<String>, position: i32, permissions: Permissions, now: DateTime<Utc>) -> Self {
        Self {
            id: RoleId::new(),
            name: name.into(),
            position,
            permissions,
            color: None,
            has_icon: false,
            sku: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// The role seeded into an empty store.
    #[must_use]
    pub fn default_admin(now: DateTime<Utc>) -> Self {
        Self::new(DEFAULT_ADMIN_ROLE, 0, Permissions::ADMINISTRATOR, now)
    }
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRoleRequest {
    pub name: String,
    /// Raw bitfield; unknown bits are rejected.
    #[serde(default)]
    pub permissions: u64,
    #[validate(regex(path = *HEX_COLOR, message = "Color must be a #rrggbb hex value"))]
    pub color: Option<String>,
    #[serde(default)]
    pub has_icon: bool,
    #[validate(length(min = 1, max = 64, message = "SKU must be 1-64 characters"))]
    pub sku: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRoleRequest {
    #[validate(regex(path = *HEX_COLOR, message = "Color must be a #rrggbb hex value"))]
    pub color: Option<String>,
    pub has_icon: Option<bool>,
    #[validate(length(min = 1, max = 64, message = "SKU must be 1-64 characters"))]
    pub sku: Option<String>,
    pub position: Option<i32>,
}

/// Grant a role to a player.
#[derive(Debug, Clone, Deserialize)]
pub struct GrantRoleRequest {
    pub role: RoleId,
    #[serde(default)]
    pub reason: String,
    /// Relative duration in milliseconds.
    pub duration_ms: Option<i64>,
    /// Absolute expiry; wins over `duration_ms`.
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub auto_remove: bool,
}

const fn default_visible() -> bool {
    true
}

impl GrantRoleRequest {
    /// Indefinite, visible grant with no reason.
    #[must_use]
    pub const fn new(role: RoleId) -> Self {
        Self {
            role,
            reason: String::new(),
            duration_ms: None,
            expires_at: None,
            visible: true,
            auto_remove: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_admin_role() {
        let role = Role::default_admin(Utc::now());
        assert_eq!(role.name, DEFAULT_ADMIN_ROLE);
        assert_eq!(role.position, 0);
        assert_eq!(role.permissions, Permissions::ADMINISTRATOR);
    }

    #[test]
    fn test_color_validation() {
        let mut req = CreateRoleRequest {
            name: "vip".to_string(),
            permissions: 0,
            color: Some("#ffaa00".to_string()),
            has_icon: false,
            sku: None,
        };
        assert!(req.validate().is_ok());

        req.color = Some("orange".to_string());
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_grant_request_defaults() {
        let id = RoleId::new();
        let json = format!(r#"{{"role":"{id}"}}"#);
        let req: GrantRoleRequest = serde_json::from_str(&json).unwrap();
        assert!(req.visible);
        assert!(!req.auto_remove);
        assert!(req.reason.is_empty());
    }

    #[test]
    fn test_empty_sku_rejected() {
        let req = UpdateRoleRequest {
            sku: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_err());
    }
}
