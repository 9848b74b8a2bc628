//! In-memory store backed by `DashMap`.
//!
//! Used by tests and by the binary. Uniqueness of role names and gift codes
//! is enforced through secondary indexes updated with the entry API, so two
//! concurrent inserts of the same name cannot both succeed.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use gt_common::PlayerId;

use super::{GiftCodeStore, PlayerStore, ReportStore, RoleStore, StoreError, StoreResult};
use crate::gift_codes::{GiftCode, GiftCodeId};
use crate::moderation::{Report, ReportId};
use crate::players::Player;
use crate::roles::{Role, RoleId};

#[derive(Debug, Default)]
pub struct MemoryStore {
    players: DashMap<PlayerId, Player>,
    roles: DashMap<RoleId, Role>,
    role_names: DashMap<String, RoleId>,
    gift_codes: DashMap<GiftCodeId, GiftCode>,
    gift_code_index: DashMap<String, GiftCodeId>,
    reports: DashMap<ReportId, Report>,
    offline: AtomicBool,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate an unreachable backend. Every call fails while offline.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Release);
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::Acquire) {
            return Err(StoreError::Unavailable("memory store is offline".into()));
        }
        Ok(())
    }

    /// Point `key` at `id` in a uniqueness index.
    fn reserve<K, V>(index: &DashMap<K, V>, key: K, id: V, what: &'static str) -> StoreResult<()>
    where
        K: Eq + std::hash::Hash,
        V: PartialEq + Copy,
    {
        match index.entry(key) {
            Entry::Occupied(e) if *e.get() != id => Err(StoreError::Duplicate(what)),
            Entry::Occupied(_) => Ok(()),
            Entry::Vacant(e) => {
                e.insert(id);
                Ok(())
            }
        }
    }
}

#[async_trait]
impl PlayerStore for MemoryStore {
    async fn find_player(&self, id: &PlayerId) -> StoreResult<Option<Player>> {
        self.check_online()?;
        Ok(self.players.get(id).map(|p| p.value().clone()))
    }

    async fn find_player_by_api_key(&self, digest: &str) -> StoreResult<Option<Player>> {
        self.check_online()?;
        Ok(self
            .players
            .iter()
            .find(|p| p.api_keys.iter().any(|k| k.digest == digest))
            .map(|p| p.value().clone()))
    }

    async fn save_player(&self, player: &mut Player) -> StoreResult<()> {
        self.check_online()?;
        match self.players.entry(player.id) {
            Entry::Occupied(mut e) => {
                let found = e.get().version;
                if found != player.version {
                    return Err(StoreError::VersionConflict {
                        expected: player.version,
                        found,
                    });
                }
                player.version += 1;
                e.insert(player.clone());
            }
            Entry::Vacant(e) => {
                if player.version != 0 {
                    return Err(StoreError::VersionConflict {
                        expected: player.version,
                        found: 0,
                    });
                }
                player.version = 1;
                e.insert(player.clone());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl RoleStore for MemoryStore {
    async fn list_roles(&self) -> StoreResult<Vec<Role>> {
        self.check_online()?;
        Ok(self.roles.iter().map(|r| r.value().clone()).collect())
    }

    async fn find_role(&self, id: RoleId) -> StoreResult<Option<Role>> {
        self.check_online()?;
        Ok(self.roles.get(&id).map(|r| r.value().clone()))
    }

    async fn insert_role(&self, role: &Role) -> StoreResult<()> {
        self.check_online()?;
        Self::reserve(&self.role_names, role.name.clone(), role.id, "role name")?;
        self.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn save_role(&self, role: &Role) -> StoreResult<()> {
        self.check_online()?;
        let previous_name = self.roles.get(&role.id).map(|r| r.name.clone());
        Self::reserve(&self.role_names, role.name.clone(), role.id, "role name")?;
        if let Some(old) = previous_name.filter(|old| *old != role.name) {
            self.role_names.remove_if(&old, |_, id| *id == role.id);
        }
        self.roles.insert(role.id, role.clone());
        Ok(())
    }

    async fn delete_role(&self, id: RoleId) -> StoreResult<bool> {
        self.check_online()?;
        let Some((_, role)) = self.roles.remove(&id) else {
            return Ok(false);
        };
        self.role_names.remove_if(&role.name, |_, owner| *owner == id);
        Ok(true)
    }
}

#[async_trait]
impl GiftCodeStore for MemoryStore {
    async fn list_gift_codes(&self) -> StoreResult<Vec<GiftCode>> {
        self.check_online()?;
        let mut codes: Vec<GiftCode> = self.gift_codes.iter().map(|c| c.value().clone()).collect();
        codes.sort_by_key(|c| c.created_at);
        Ok(codes)
    }

    async fn find_gift_code(&self, id: GiftCodeId) -> StoreResult<Option<GiftCode>> {
        self.check_online()?;
        Ok(self.gift_codes.get(&id).map(|c| c.value().clone()))
    }

    async fn find_gift_code_by_code(&self, code: &str) -> StoreResult<Option<GiftCode>> {
        self.check_online()?;
        let Some(id) = self.gift_code_index.get(code).map(|id| *id.value()) else {
            return Ok(None);
        };
        Ok(self.gift_codes.get(&id).map(|c| c.value().clone()))
    }

    async fn insert_gift_code(&self, code: &GiftCode) -> StoreResult<()> {
        self.check_online()?;
        Self::reserve(&self.gift_code_index, code.code.clone(), code.id, "gift code")?;
        self.gift_codes.insert(code.id, code.clone());
        Ok(())
    }

    async fn save_gift_code(&self, code: &GiftCode) -> StoreResult<()> {
        self.check_online()?;
        Self::reserve(&self.gift_code_index, code.code.clone(), code.id, "gift code")?;
        self.gift_codes.insert(code.id, code.clone());
        Ok(())
    }

    async fn delete_gift_code(&self, id: GiftCodeId) -> StoreResult<bool> {
        self.check_online()?;
        let Some((_, code)) = self.gift_codes.remove(&id) else {
            return Ok(false);
        };
        self.gift_code_index.remove_if(&code.code, |_, owner| *owner == id);
        Ok(true)
    }
}

#[async_trait]
impl ReportStore for MemoryStore {
    async fn find_report(&self, id: ReportId) -> StoreResult<Option<Report>> {
        self.check_online()?;
        Ok(self.reports.get(&id).map(|r| r.value().clone()))
    }

    async fn find_reports_between(
        &self,
        reporter: &PlayerId,
        reported: &PlayerId,
    ) -> StoreResult<Vec<Report>> {
        self.check_online()?;
        Ok(self
            .reports
            .iter()
            .filter(|r| r.reporter == *reporter && r.reported == *reported)
            .map(|r| r.value().clone())
            .collect())
    }

    async fn list_reports(&self) -> StoreResult<Vec<Report>> {
        self.check_online()?;
        let mut reports: Vec<Report> = self.reports.iter().map(|r| r.value().clone()).collect();
        reports.sort_by_key(|r| r.created_at);
        Ok(reports)
    }

    async fn insert_report(&self, report: &Report) -> StoreResult<()> {
        self.check_online()?;
        match self.reports.entry(report.id) {
            Entry::Occupied(_) => Err(StoreError::Duplicate("report")),
            Entry::Vacant(e) => {
                e.insert(report.clone());
                Ok(())
            }
        }
    }

    async fn save_report(&self, report: &Report) -> StoreResult<()> {
        self.check_online()?;
        self.reports.insert(report.id, report.clone());
        Ok(())
    }
}
