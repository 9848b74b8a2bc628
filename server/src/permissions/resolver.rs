//! Permission resolution logic.
//!
//! Computes effective permissions from a set of roles and checks role
//! management against the actor's own rank and bits.

use super::bitfield::Permissions;
use crate::error::CoreError;
use crate::roles::Role;

/// OR the bitfields of `roles`.
///
/// Roles are visited by position (lower number = higher rank) so the
/// result does not depend on grant order.
pub fn compute_permissions<'a>(roles: impl IntoIterator<Item = &'a Role>) -> Permissions {
    let mut sorted: Vec<&Role> = roles.into_iter().collect();
    sorted.sort_by_key(|r| r.position);

    sorted
        .into_iter()
        .fold(Permissions::empty(), |acc, role| acc | role.permissions)
}

/// Highest rank (lowest position) among `roles`, `i32::MAX` when empty.
pub fn highest_position<'a>(roles: impl IntoIterator<Item = &'a Role>) -> i32 {
    roles.into_iter().map(|r| r.position).min().unwrap_or(i32::MAX)
}

/// Check if an actor can manage a target role.
///
/// Rules:
/// 1. Must have `MANAGE_ROLES` permission
/// 2. Non-administrators cannot touch roles at or above their own rank
/// 3. Non-administrators cannot hand out permissions they don't have
pub fn can_manage_role(
    actor_permissions: Permissions,
    actor_highest_position: i32,
    target_role_position: Option<i32>,
    new_permissions: Option<Permissions>,
) -> Result<(), PermissionError> {
    if !actor_permissions.has(Permissions::MANAGE_ROLES) {
        return Err(PermissionError::MissingPermission(Permissions::MANAGE_ROLES));
    }
    if actor_permissions.has(Permissions::ADMINISTRATOR) {
        return Ok(());
    }

    if let Some(target) = target_role_position {
        if target <= actor_highest_position {
            return Err(PermissionError::RoleHierarchy {
                actor_position: actor_highest_position,
                target_position: target,
            });
        }
    }

    if let Some(new_perms) = new_permissions {
        let escalation = new_perms.escalation_over(actor_permissions);
        if !escalation.is_empty() {
            return Err(PermissionError::CannotEscalate(escalation));
        }
    }

    Ok(())
}

/// Permission check errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PermissionError {
    #[error("Missing permission: {0:?}")]
    MissingPermission(Permissions),

    #[error("Cannot modify role at position {target_position} (your position: {actor_position})")]
    RoleHierarchy {
        actor_position: i32,
        target_position: i32,
    },

    #[error("Cannot grant permissions you don't have: {0:?}")]
    CannotEscalate(Permissions),
}

impl From<PermissionError> for CoreError {
    fn from(err: PermissionError) -> Self {
        match err {
            PermissionError::MissingPermission(p) => Self::MissingPermission(p),
            PermissionError::RoleHierarchy { .. } => Self::NotAuthorized("role_hierarchy"),
            PermissionError::CannotEscalate(_) => Self::NotAuthorized("cannot_escalate"),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn role(position: i32, permissions: Permissions) -> Role {
        Role::new(format!("r{position}"), position, permissions, Utc::now())
    }

    #[test]
    fn test_compute_permissions_is_union() {
        let roles = [
            role(5, Permissions::CREATE_NOTES),
            role(2, Permissions::MANAGE_BANS),
        ];
        assert_eq!(
            compute_permissions(&roles),
            Permissions::CREATE_NOTES | Permissions::MANAGE_BANS
        );
        assert_eq!(compute_permissions(&[]), Permissions::empty());
    }

    #[test]
    fn test_mod_plus_admin_has_manage_bans() {
        let roles = [
            role(5, Permissions::CREATE_NOTES),
            role(0, Permissions::ADMINISTRATOR),
        ];
        let perms = compute_permissions(&roles);
        assert!(perms.has(Permissions::MANAGE_BANS));
        assert!(!Permissions::CREATE_NOTES.has(Permissions::MANAGE_BANS));
    }

    #[test]
    fn test_highest_position() {
        let roles = [role(5, Permissions::empty()), role(2, Permissions::empty())];
        assert_eq!(highest_position(&roles), 2);
        assert_eq!(highest_position(&[]), i32::MAX);
    }

    // === can_manage_role ===

    #[test]
    fn test_requires_manage_roles() {
        assert_eq!(
            can_manage_role(Permissions::CREATE_NOTES, 3, None, None),
            Err(PermissionError::MissingPermission(Permissions::MANAGE_ROLES))
        );
    }

    #[test]
    fn test_cannot_touch_higher_role() {
        let actor = Permissions::MANAGE_ROLES;
        assert_eq!(
            can_manage_role(actor, 3, Some(3), None),
            Err(PermissionError::RoleHierarchy {
                actor_position: 3,
                target_position: 3
            })
        );
        assert!(can_manage_role(actor, 3, Some(4), None).is_ok());
    }

    #[test]
    fn test_cannot_escalate() {
        let actor = Permissions::MANAGE_ROLES | Permissions::CREATE_NOTES;
        assert_eq!(
            can_manage_role(actor, 3, None, Some(Permissions::MANAGE_BANS)),
            Err(PermissionError::CannotEscalate(Permissions::MANAGE_BANS))
        );
        assert!(can_manage_role(actor, 3, None, Some(Permissions::CREATE_NOTES)).is_ok());
    }

    #[test]
    fn test_administrator_bypasses_rank_and_escalation() {
        assert!(can_manage_role(
            Permissions::ADMINISTRATOR,
            0,
            Some(0),
            Some(Permissions::all())
        )
        .is_ok());
    }
}
