//! Role grant management on a player record.
//!
//! Every method takes the current [`RoleSet`] snapshot and the time
//! explicitly; nothing here touches storage or the clock.

use chrono::{DateTime, Duration, Utc};

use super::models::{Player, RoleGrant};
use crate::permissions::{compute_permissions, Permissions};
use crate::roles::{Role, RoleId, RoleSet};

/// Separator used when an extension appends to an existing reason.
pub const REASON_SEPARATOR: &str = "; ";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GrantError {
    #[error("Role does not exist")]
    UnknownRole,

    #[error("Role is already held indefinitely")]
    AlreadyPermanent,

    #[error("Grant expiry is outside the representable range")]
    ExpiryOutOfRange,
}

/// Terms of a role grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRequest {
    pub role: RoleId,
    pub reason: String,
    pub auto_remove: bool,
    pub visible: bool,
    /// Absolute expiry; wins over `duration`.
    pub expires_at: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
}

impl GrantRequest {
    /// Indefinite, visible, manually managed grant.
    #[must_use]
    pub fn new(role: RoleId, reason: impl Into<String>) -> Self {
        Self {
            role,
            reason: reason.into(),
            auto_remove: false,
            visible: true,
            expires_at: None,
            duration: None,
        }
    }

    #[must_use]
    pub const fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    #[must_use]
    pub const fn expires_at(mut self, at: DateTime<Utc>) -> Self {
        self.expires_at = Some(at);
        self
    }

    #[must_use]
    pub const fn auto_remove(mut self, auto_remove: bool) -> Self {
        self.auto_remove = auto_remove;
        self
    }

    #[must_use]
    pub const fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    /// Absolute expiry, or `base + duration` when only a duration is given.
    fn resolve_expiry(&self, base: DateTime<Utc>) -> Result<Option<DateTime<Utc>>, GrantError> {
        if let Some(at) = self.expires_at {
            return Ok(Some(at));
        }
        self.duration
            .map(|d| base.checked_add_signed(d).ok_or(GrantError::ExpiryOutOfRange))
            .transpose()
    }
}

impl Player {
    /// Grant or extend a role.
    ///
    /// Returns the resulting expiry (`None` = indefinite).
    pub fn add_role(
        &mut self,
        roles: &RoleSet,
        request: GrantRequest,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, GrantError> {
        if !roles.contains(request.role) {
            return Err(GrantError::UnknownRole);
        }

        let Some(index) = self.roles.iter().position(|g| g.role == request.role) else {
            let expires_at = request.resolve_expiry(now)?;
            self.roles.push(RoleGrant {
                role: request.role,
                reason: request.reason,
                auto_remove: request.auto_remove,
                visible: request.visible,
                added_at: now,
                expires_at,
            });
            return Ok(expires_at);
        };
        let grant = &mut self.roles[index];

        if !grant.is_active(now) {
            let expires_at = request.resolve_expiry(now)?;
            grant.reason = request.reason;
            grant.auto_remove = request.auto_remove;
            grant.visible = request.visible;
            grant.added_at = now;
            grant.expires_at = expires_at;
            return Ok(expires_at);
        }

        // Active and indefinite: terms can only change through remove + add
        let Some(previous) = grant.expires_at else {
            return Err(GrantError::AlreadyPermanent);
        };
        let expires_at = request.resolve_expiry(previous)?;

        if !request.reason.is_empty() {
            if grant.reason.is_empty() {
                grant.reason = request.reason;
            } else {
                grant.reason = format!("{}{REASON_SEPARATOR}{}", grant.reason, request.reason);
            }
        }
        grant.auto_remove = request.auto_remove;
        grant.expires_at = expires_at;
        Ok(expires_at)
    }

    /// Soft-revoke a grant by expiring it now.
    ///
    /// The grant stays on the record for history. An already expired grant
    /// keeps its earlier expiry.
    pub fn remove_role(&mut self, role: RoleId, now: DateTime<Utc>) -> bool {
        let Some(grant) = self.roles.iter_mut().find(|g| g.role == role) else {
            return false;
        };
        grant.expires_at = Some(grant.expires_at.map_or(now, |at| at.min(now)));
        true
    }

    /// Grants whose role still exists and which have not expired.
    pub fn active_roles<'a>(
        &'a self,
        roles: &'a RoleSet,
        now: DateTime<Utc>,
    ) -> impl Iterator<Item = (&'a RoleGrant, &'a Role)> + 'a {
        self.roles
            .iter()
            .filter(move |g| g.is_active(now))
            .filter_map(move |g| roles.get(g.role).map(|r| (g, r)))
    }

    /// Union of the permission bits of every active role.
    #[must_use]
    pub fn permissions(&self, roles: &RoleSet, now: DateTime<Utc>) -> Permissions {
        compute_permissions(self.active_roles(roles, now).map(|(_, role)| role))
    }

    /// Check a permission, administrator included.
    #[must_use]
    pub fn has_permission(
        &self,
        roles: &RoleSet,
        permission: Permissions,
        now: DateTime<Utc>,
    ) -> bool {
        self.permissions(roles, now).has(permission)
    }

    /// Role whose icon is displayed: the lowest position among active roles
    /// that carry a distinct icon.
    #[must_use]
    pub fn display_icon_role<'a>(&'a self, roles: &'a RoleSet, now: DateTime<Utc>) -> Option<&'a Role> {
        self.active_roles(roles, now)
            .map(|(_, role)| role)
            .filter(|role| role.has_icon)
            .min_by_key(|role| role.position)
    }

    /// Active, visible roles ordered by position.
    #[must_use]
    pub fn visible_roles<'a>(&'a self, roles: &'a RoleSet, now: DateTime<Utc>) -> Vec<&'a Role> {
        let mut visible: Vec<&Role> = self
            .active_roles(roles, now)
            .filter(|(grant, _)| grant.visible)
            .map(|(_, role)| role)
            .collect();
        visible.sort_by_key(|role| role.position);
        visible
    }

    /// Every grant ever made, active or not, including grants of deleted roles.
    #[must_use]
    pub fn grant_history(&self) -> &[RoleGrant] {
        &self.roles
    }

    /// Whether the player was ever granted `role`, regardless of expiry.
    #[must_use]
    pub fn has_ever_held(&self, role: RoleId) -> bool {
        self.roles.iter().any(|g| g.role == role)
    }

    /// Expire every active auto-remove grant whose role carries `sku`.
    ///
    /// Returns the roles that were expired.
    pub fn revoke_sku(&mut self, roles: &RoleSet, sku: &str, now: DateTime<Utc>) -> Vec<RoleId> {
        let mut revoked = Vec::new();
        for grant in &mut self.roles {
            let matches_sku = roles
                .get(grant.role)
                .and_then(|r| r.sku.as_deref())
                .is_some_and(|s| s == sku);
            if grant.auto_remove && matches_sku && grant.is_active(now) {
                grant.expires_at = Some(now);
                revoked.push(grant.role);
            }
        }
        revoked
    }
}
