//! Role administration and grants.
//!
//! Every operation here needs `MANAGE_ROLES`. A non-administrator may only
//! act on roles ranked below their own highest role and may never hand out
//! bits they do not hold themselves.

use chrono::{DateTime, Utc};
use gt_common::PlayerId;
use tracing::info;

use super::cache::RoleSet;
use super::models::{CreateRoleRequest, GrantRoleRequest, Role, RoleId, UpdateRoleRequest};
use super::registry::NewRole;
use crate::error::CoreError;
use crate::notify::NotifyEvent;
use crate::permissions::{can_manage_role, highest_position, Permissions};
use crate::players::{GrantRequest, RoleGrant};
use crate::session::{require_account, require_self_or_permission, Session};
use crate::state::AppState;
use crate::validation::{check_duration, check_length, check_reason, validate_request};

/// Acting staff member resolved against the current role set.
struct RoleActor {
    id: PlayerId,
    permissions: Permissions,
    highest_position: i32,
}

fn role_actor(session: &Session, roles: &RoleSet, now: DateTime<Utc>) -> Result<RoleActor, CoreError> {
    let id = require_account(session)?;
    let (permissions, highest) = session.player.as_ref().map_or(
        (Permissions::empty(), i32::MAX),
        |p| {
            (
                p.permissions(roles, now),
                highest_position(p.active_roles(roles, now).map(|(_, r)| r)),
            )
        },
    );
    Ok(RoleActor {
        id,
        permissions,
        highest_position: highest,
    })
}

impl RoleActor {
    fn check(&self, target_position: Option<i32>, granting: Option<Permissions>) -> Result<(), CoreError> {
        can_manage_role(self.permissions, self.highest_position, target_position, granting)?;
        Ok(())
    }
}

fn check_role_name(state: &AppState, name: &str) -> Result<String, CoreError> {
    check_length("role_name_length", name, 1, state.config.role_name_max_length)?;
    Ok(name.trim().to_string())
}

fn existing_role(roles: &RoleSet, id: RoleId) -> Result<Role, CoreError> {
    roles.get(id).cloned().ok_or(CoreError::NotFound("role"))
}

// ============================================================================
// Role CRUD
// ============================================================================

#[tracing::instrument(skip(state, session), fields(name = %request.name))]
pub async fn create_role(state: &AppState, session: &Session, request: CreateRoleRequest) -> Result<Role, CoreError> {
    validate_request(&request, "role_request")?;
    let name = check_role_name(state, &request.name)?;
    let permissions = Permissions::from_raw(request.permissions)?;

    let actor = role_actor(session, &state.roles.snapshot(), state.now())?;
    actor.check(None, Some(permissions))?;

    let role = state
        .roles
        .create(NewRole {
            name,
            permissions,
            color: request.color,
            has_icon: request.has_icon,
            sku: request.sku,
        })
        .await?;

    info!(role = %role.id, staff = %actor.id, position = role.position, "Role created");
    state.notify(NotifyEvent::RoleCreated {
        role: role.id,
        staff: actor.id,
        name: role.name.clone(),
        permissions,
    });
    Ok(role)
}

#[tracing::instrument(skip(state, session))]
pub async fn rename_role(state: &AppState, session: &Session, id: RoleId, name: &str) -> Result<Role, CoreError> {
    let name = check_role_name(state, name)?;
    let roles = state.roles.snapshot();
    let current = existing_role(&roles, id)?;
    role_actor(session, &roles, state.now())?.check(Some(current.position), None)?;

    let role = state.roles.rename(id, name).await?;
    info!(role = %id, from = %current.name, to = %role.name, "Role renamed");
    notify_updated(state, session, id);
    Ok(role)
}

#[tracing::instrument(skip(state, session))]
pub async fn set_role_permissions(
    state: &AppState,
    session: &Session,
    id: RoleId,
    raw: u64,
) -> Result<Role, CoreError> {
    let permissions = Permissions::from_raw(raw)?;
    let roles = state.roles.snapshot();
    let current = existing_role(&roles, id)?;
    role_actor(session, &roles, state.now())?.check(Some(current.position), Some(permissions))?;

    let role = state.roles.set_permissions(id, permissions).await?;
    info!(role = %id, permissions = permissions.bits(), "Role permissions changed");
    notify_updated(state, session, id);
    Ok(role)
}

#[tracing::instrument(skip(state, session, update))]
pub async fn update_role(
    state: &AppState,
    session: &Session,
    id: RoleId,
    update: UpdateRoleRequest,
) -> Result<Role, CoreError> {
    validate_request(&update, "role_request")?;
    let roles = state.roles.snapshot();
    let current = existing_role(&roles, id)?;
    let actor = role_actor(session, &roles, state.now())?;
    actor.check(Some(current.position), None)?;
    if let Some(position) = update.position {
        // Cannot move a role above oneself either
        actor.check(Some(position), None)?;
    }

    let role = state.roles.update(id, update).await?;
    notify_updated(state, session, id);
    Ok(role)
}

#[tracing::instrument(skip(state, session))]
pub async fn delete_role(state: &AppState, session: &Session, id: RoleId) -> Result<(), CoreError> {
    let roles = state.roles.snapshot();
    let current = existing_role(&roles, id)?;
    let actor = role_actor(session, &roles, state.now())?;
    actor.check(Some(current.position), None)?;

    let role = state.roles.delete(id).await?;
    info!(role = %id, name = %role.name, staff = %actor.id, "Role deleted");
    state.notify(NotifyEvent::RoleDeleted {
        role: id,
        staff: actor.id,
        name: role.name,
    });
    Ok(())
}

fn notify_updated(state: &AppState, session: &Session, role: RoleId) {
    if let Some(staff) = session.account_id {
        state.notify(NotifyEvent::RoleUpdated { role, staff });
    }
}

// ============================================================================
// Grants
// ============================================================================

/// Grant or extend a role on `target`, creating the record if needed.
///
/// Returns the resulting expiry (`None` = indefinite).
#[tracing::instrument(skip(state, session, request), fields(role = %request.role))]
pub async fn grant_role(
    state: &AppState,
    session: &Session,
    target: PlayerId,
    request: GrantRoleRequest,
) -> Result<Option<DateTime<Utc>>, CoreError> {
    let now = state.now();
    check_reason(&request.reason, state.config.reason_max_length)?;
    let duration = check_duration(request.duration_ms)?;
    if request.expires_at.is_some_and(|at| at <= now) {
        return Err(CoreError::Validation("expiry_past"));
    }

    let roles = state.roles.snapshot();
    let role = existing_role(&roles, request.role)?;
    let actor = role_actor(session, &roles, now)?;
    actor.check(Some(role.position), Some(role.permissions))?;

    let mut grant = GrantRequest::new(request.role, request.reason).auto_remove(request.auto_remove);
    if let Some(duration) = duration {
        grant = grant.duration(duration);
    }
    if let Some(at) = request.expires_at {
        grant = grant.expires_at(at);
    }
    if !request.visible {
        grant = grant.hidden();
    }

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_or_create_player(&target).await?;
    let expires_at = player.add_role(&roles, grant, now)?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %actor.id, role = %role.id, expires_at = ?expires_at, "Role granted");
    state.notify(NotifyEvent::RoleGranted {
        player: target,
        staff: Some(actor.id),
        role: role.id,
        expires_at,
    });
    Ok(expires_at)
}

/// Soft-revoke a role; the grant stays in the player's history.
#[tracing::instrument(skip(state, session))]
pub async fn revoke_role(state: &AppState, session: &Session, target: PlayerId, role: RoleId) -> Result<(), CoreError> {
    let now = state.now();
    let roles = state.roles.snapshot();
    let actor = role_actor(session, &roles, now)?;
    // A deleted role has no rank left to protect
    actor.check(roles.get(role).map(|r| r.position), None)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    if !player.remove_role(role, now) {
        return Err(CoreError::NotFound("role_grant"));
    }
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %actor.id, role = %role, "Role revoked");
    state.notify(NotifyEvent::RoleRevoked {
        player: target,
        staff: Some(actor.id),
        role,
    });
    Ok(())
}

/// Expire the auto-remove grants tied to an ended subscription.
///
/// Called by the entitlement sync, not by a player session. Unknown players
/// have nothing to revoke.
#[tracing::instrument(skip(state))]
pub async fn revoke_sku_entitlement(state: &AppState, target: PlayerId, sku: &str) -> Result<Vec<RoleId>, CoreError> {
    let now = state.now();
    let roles = state.roles.snapshot();

    let _guard = state.player_locks.lock(target).await;
    let Some(mut player) = state.players.find_player(&target).await? else {
        return Ok(Vec::new());
    };
    let revoked = player.revoke_sku(&roles, sku, now);
    if revoked.is_empty() {
        return Ok(revoked);
    }
    state.save_player(&mut player).await?;

    for role in &revoked {
        info!(player = %target, role = %role, sku, "Entitlement ended, role revoked");
        state.notify(NotifyEvent::RoleRevoked {
            player: target,
            staff: None,
            role: *role,
        });
    }
    Ok(revoked)
}

// ============================================================================
// History
// ============================================================================

/// All grants of `target`, active or not. Owners see their own history.
pub async fn grant_history(state: &AppState, session: &Session, target: PlayerId) -> Result<Vec<RoleGrant>, CoreError> {
    let roles = state.roles.snapshot();
    require_self_or_permission(session, &target, &roles, Permissions::VIEW_HISTORY, state.now())?;
    let player = state.load_player(&target).await?;
    Ok(player.grant_history().to_vec())
}

/// Whether `target` ever held `role`, including expired and revoked grants.
pub async fn has_ever_held(state: &AppState, session: &Session, target: PlayerId, role: RoleId) -> Result<bool, CoreError> {
    let roles = state.roles.snapshot();
    require_self_or_permission(session, &target, &roles, Permissions::VIEW_HISTORY, state.now())?;
    match state.players.find_player(&target).await? {
        Some(player) => Ok(player.has_ever_held(role)),
        None => Ok(false),
    }
}
