//! Role Registry
//!
//! Owns the role store and the process-wide [`RoleCache`]. Every mutation
//! writes to the store first and then triggers an immediate refresh, so a
//! caller sees its own change as soon as the call returns. Permission checks
//! only ever read the cache.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use super::cache::{RoleCache, RoleSet};
use super::models::{Role, RoleId, UpdateRoleRequest};
use crate::clock::Clock;
use crate::error::CoreError;
use crate::permissions::Permissions;
use crate::store::{RoleStore, StoreError};

pub struct RoleRegistry {
    store: Arc<dyn RoleStore>,
    cache: RoleCache,
    clock: Arc<dyn Clock>,
}

/// Fields of a role to be created. The position is assigned by the registry.
#[derive(Debug, Clone, Default)]
pub struct NewRole {
    pub name: String,
    pub permissions: Permissions,
    pub color: Option<String>,
    pub has_icon: bool,
    pub sku: Option<String>,
}

impl RoleRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn RoleStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            cache: RoleCache::new(),
            clock,
        }
    }

    /// Current cached role set.
    #[must_use]
    pub fn snapshot(&self) -> Arc<RoleSet> {
        self.cache.snapshot()
    }

    /// Reload every role from the store and swap the cache.
    ///
    /// Seeds the default admin role when the store holds none. On store
    /// failure the previous snapshot stays in place and the error is
    /// returned.
    pub async fn refresh(&self) -> Result<Arc<RoleSet>, CoreError> {
        let ticket = self.cache.begin_refresh();
        let mut roles = self.store.list_roles().await?;

        if roles.is_empty() {
            let admin = Role::default_admin(self.clock.now());
            match self.store.insert_role(&admin).await {
                Ok(()) => {
                    info!(role = %admin.id, "Seeded default admin role");
                    roles.push(admin);
                }
                // Seeded concurrently; read what won
                Err(StoreError::Duplicate(_)) => roles = self.store.list_roles().await?,
                Err(e) => return Err(e.into()),
            }
        }

        let count = roles.len();
        if self.cache.install(ticket, roles) {
            debug!(roles = count, "Role cache refreshed");
        }
        Ok(self.cache.snapshot())
    }

    /// One more than the highest stored position, 0 for an empty store.
    pub async fn next_position(&self) -> Result<i32, CoreError> {
        let roles = self.store.list_roles().await?;
        Ok(roles.iter().map(|r| r.position).max().map_or(0, |max| max + 1))
    }

    pub async fn create(&self, new: NewRole) -> Result<Role, CoreError> {
        let position = self.next_position().await?;
        let mut role = Role::new(new.name, position, new.permissions, self.clock.now());
        role.color = new.color;
        role.has_icon = new.has_icon;
        role.sku = new.sku;

        self.store.insert_role(&role).await?;
        self.refresh().await?;
        Ok(role)
    }

    /// Rename a role. Grants hold the id, so no player record changes.
    pub async fn rename(&self, id: RoleId, name: String) -> Result<Role, CoreError> {
        self.modify(id, |role| role.name = name).await
    }

    pub async fn set_permissions(&self, id: RoleId, permissions: Permissions) -> Result<Role, CoreError> {
        self.modify(id, |role| role.permissions = permissions).await
    }

    pub async fn update(&self, id: RoleId, update: UpdateRoleRequest) -> Result<Role, CoreError> {
        self.modify(id, |role| {
            if let Some(color) = update.color {
                role.color = Some(color);
            }
            if let Some(has_icon) = update.has_icon {
                role.has_icon = has_icon;
            }
            if let Some(sku) = update.sku {
                role.sku = Some(sku);
            }
            if let Some(position) = update.position {
                role.position = position;
            }
        })
        .await
    }

    /// Delete a role. Outstanding grants of it become inert.
    pub async fn delete(&self, id: RoleId) -> Result<Role, CoreError> {
        let role = self
            .store
            .find_role(id)
            .await?
            .ok_or(CoreError::NotFound("role"))?;
        if !self.store.delete_role(id).await? {
            return Err(CoreError::NotFound("role"));
        }
        self.refresh().await?;
        Ok(role)
    }

    async fn modify(&self, id: RoleId, change: impl FnOnce(&mut Role) + Send) -> Result<Role, CoreError> {
        let mut role = self
            .store
            .find_role(id)
            .await?
            .ok_or(CoreError::NotFound("role"))?;
        change(&mut role);
        role.updated_at = self.clock.now();

        self.store.save_role(&role).await?;
        self.refresh().await?;
        Ok(role)
    }
}

// ============================================================================
// Periodic Refresh
// ============================================================================

/// Background job that refreshes the role cache on a fixed interval.
pub struct RoleRefreshJob {
    registry: Arc<RoleRegistry>,
    period: Duration,
}

impl RoleRefreshJob {
    #[must_use]
    pub const fn new(registry: Arc<RoleRegistry>, period: Duration) -> Self {
        Self { registry, period }
    }

    /// Run forever. The first tick fires immediately.
    pub async fn run(self) {
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            if let Err(e) = self.registry.refresh().await {
                error!(error = %e, "Periodic role cache refresh failed");
            }
        }
    }

    /// Spawn [`Self::run`] on the current runtime.
    pub fn spawn(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn registry() -> (Arc<MemoryStore>, RoleRegistry) {
        let store = Arc::new(MemoryStore::new());
        let registry = RoleRegistry::new(store.clone(), Arc::new(ManualClock::new(Utc::now())));
        (store, registry)
    }

    #[tokio::test]
    async fn test_refresh_seeds_admin_into_empty_store() {
        let (store, registry) = registry();
        let roles = registry.refresh().await.unwrap();

        assert_eq!(roles.len(), 1);
        let admin = roles.iter().next().unwrap();
        assert_eq!(admin.name, "admin");
        assert_eq!(admin.permissions, Permissions::ADMINISTRATOR);
        assert_eq!(store.list_roles().await.unwrap().len(), 1);

        // Second refresh does not seed again
        registry.refresh().await.unwrap();
        assert_eq!(store.list_roles().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_next_position() {
        let (_, registry) = registry();
        assert_eq!(registry.next_position().await.unwrap(), 0);
        registry.refresh().await.unwrap();
        assert_eq!(registry.next_position().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_next_position_fails_closed() {
        let (store, registry) = registry();
        store.set_offline(true);
        assert!(matches!(
            registry.next_position().await,
            Err(CoreError::Unavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_create_is_visible_immediately() {
        let (_, registry) = registry();
        registry.refresh().await.unwrap();

        let vip = registry
            .create(NewRole {
                name: "vip".into(),
                permissions: Permissions::CUSTOM_ICONS,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(vip.position, 1);
        assert!(registry.snapshot().contains(vip.id));
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_previous_snapshot() {
        let (store, registry) = registry();
        registry.refresh().await.unwrap();

        store.set_offline(true);
        assert!(registry.refresh().await.is_err());
        assert_eq!(registry.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_rename_keeps_id_and_permissions() {
        let (_, registry) = registry();
        registry.refresh().await.unwrap();
        let helper = registry
            .create(NewRole {
                name: "helper".into(),
                permissions: Permissions::CREATE_NOTES,
                ..Default::default()
            })
            .await
            .unwrap();

        registry.rename(helper.id, "support".into()).await.unwrap();

        let snapshot = registry.snapshot();
        let renamed = snapshot.get(helper.id).unwrap();
        assert_eq!(renamed.name, "support");
        assert_eq!(renamed.permissions, Permissions::CREATE_NOTES);
        assert!(snapshot.by_name("helper").is_none());
    }

    #[tokio::test]
    async fn test_delete_unknown_role() {
        let (_, registry) = registry();
        assert_eq!(
            registry.delete(RoleId::new()).await.unwrap_err(),
            CoreError::NotFound("role")
        );
    }
}
