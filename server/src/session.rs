//! Session and Identity
//!
//! A [`Session`] is the resolved identity of a request: who is calling,
//! their player record if they have one, and whether they act on
//! themselves. Permission checks are free functions over the session so the
//! player record stays independent of request concerns.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gt_common::PlayerId;

use crate::error::CoreError;
use crate::permissions::Permissions;
use crate::players::Player;
use crate::roles::RoleSet;
use crate::store::PlayerStore;
use crate::util::sha256_hex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub account_id: Option<PlayerId>,
    pub player: Option<Player>,
    /// The account is the target of the request.
    pub is_self: bool,
}

impl Session {
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Verified account without a player record yet.
    #[must_use]
    pub fn account(id: PlayerId, target: Option<&PlayerId>) -> Self {
        Self {
            account_id: Some(id),
            player: None,
            is_self: target.is_some_and(|t| *t == id),
        }
    }

    #[must_use]
    pub fn for_player(player: Player, target: Option<&PlayerId>) -> Self {
        let id = player.id;
        Self {
            account_id: Some(id),
            player: Some(player),
            is_self: target.is_some_and(|t| *t == id),
        }
    }
}

/// Turns an opaque credential into a [`Session`].
#[async_trait]
pub trait SessionResolver: Send + Sync {
    async fn resolve(&self, credential: &str, target: Option<&PlayerId>) -> Result<Session, CoreError>;
}

/// Resolves API keys issued through `create_api_key`.
pub struct ApiKeySessionResolver {
    players: Arc<dyn PlayerStore>,
}

impl ApiKeySessionResolver {
    #[must_use]
    pub fn new(players: Arc<dyn PlayerStore>) -> Self {
        Self { players }
    }
}

#[async_trait]
impl SessionResolver for ApiKeySessionResolver {
    async fn resolve(&self, credential: &str, target: Option<&PlayerId>) -> Result<Session, CoreError> {
        let digest = sha256_hex(credential.trim());
        let player = self
            .players
            .find_player_by_api_key(&digest)
            .await?
            .ok_or(CoreError::NotAuthorized("invalid_credential"))?;
        Ok(Session::for_player(player, target))
    }
}

// ============================================================================
// Permission Checks
// ============================================================================

/// Effective permissions of the session's player; empty without a record.
#[must_use]
pub fn session_permissions(session: &Session, roles: &RoleSet, now: DateTime<Utc>) -> Permissions {
    session
        .player
        .as_ref()
        .map_or(Permissions::empty(), |p| p.permissions(roles, now))
}

/// The caller's account id, or `NotAuthorized` for anonymous sessions.
pub fn require_account(session: &Session) -> Result<PlayerId, CoreError> {
    session
        .account_id
        .ok_or(CoreError::NotAuthorized("no_session"))
}

/// Require `permission` and return the acting account.
pub fn require_permission(
    session: &Session,
    roles: &RoleSet,
    permission: Permissions,
    now: DateTime<Utc>,
) -> Result<PlayerId, CoreError> {
    let actor = require_account(session)?;
    if !session_permissions(session, roles, now).has(permission) {
        return Err(CoreError::MissingPermission(permission));
    }
    Ok(actor)
}

/// Allow the account owner, otherwise require `permission`.
pub fn require_self_or_permission(
    session: &Session,
    target: &PlayerId,
    roles: &RoleSet,
    permission: Permissions,
    now: DateTime<Utc>,
) -> Result<PlayerId, CoreError> {
    let actor = require_account(session)?;
    if actor == *target {
        return Ok(actor);
    }
    require_permission(session, roles, permission, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::players::GrantRequest;
    use crate::roles::Role;

    fn staff_session(permissions: Permissions) -> (Session, RoleSet, DateTime<Utc>) {
        let now = Utc::now();
        let role = Role::new("staff", 1, permissions, now);
        let id = role.id;
        let roles = RoleSet::new(vec![role]);
        let mut player = Player::new(PlayerId::new_random(), now);
        player.add_role(&roles, GrantRequest::new(id, ""), now).unwrap();
        (Session::for_player(player, None), roles, now)
    }

    #[test]
    fn test_is_self_compares_target() {
        let id = PlayerId::new_random();
        assert!(Session::account(id, Some(&id)).is_self);
        assert!(!Session::account(id, Some(&PlayerId::new_random())).is_self);
        assert!(!Session::account(id, None).is_self);
    }

    #[test]
    fn test_anonymous_is_rejected() {
        let roles = RoleSet::default();
        assert_eq!(
            require_permission(&Session::anonymous(), &roles, Permissions::empty(), Utc::now()),
            Err(CoreError::NotAuthorized("no_session"))
        );
    }

    #[test]
    fn test_require_permission() {
        let (session, roles, now) = staff_session(Permissions::CREATE_NOTES);
        assert!(require_permission(&session, &roles, Permissions::CREATE_NOTES, now).is_ok());
        assert_eq!(
            require_permission(&session, &roles, Permissions::DELETE_NOTES, now),
            Err(CoreError::MissingPermission(Permissions::DELETE_NOTES))
        );
    }

    #[test]
    fn test_account_without_record_has_no_permissions() {
        let session = Session::account(PlayerId::new_random(), None);
        assert!(session_permissions(&session, &RoleSet::default(), Utc::now()).is_empty());
    }

    #[test]
    fn test_self_or_permission() {
        let (session, roles, now) = staff_session(Permissions::empty());
        let own = session.account_id.unwrap();
        assert!(require_self_or_permission(&session, &own, &roles, Permissions::MANAGE_CONNECTIONS, now).is_ok());
        assert!(require_self_or_permission(
            &session,
            &PlayerId::new_random(),
            &roles,
            Permissions::MANAGE_CONNECTIONS,
            now
        )
        .is_err());
    }
}
