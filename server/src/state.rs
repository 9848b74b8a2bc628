//! Shared application state handed to every operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use gt_common::PlayerId;

use crate::clock::Clock;
use crate::config::Config;
use crate::error::CoreError;
use crate::locks::KeyedLocks;
use crate::notify::{dispatch, Notifier, NotifyEvent};
use crate::players::Player;
use crate::roles::RoleRegistry;
use crate::store::{GiftCodeStore, MemoryStore, PlayerStore, ReportStore, RoleStore};

/// Persistence backends, one per aggregate.
#[derive(Clone)]
pub struct Stores {
    pub players: Arc<dyn PlayerStore>,
    pub roles: Arc<dyn RoleStore>,
    pub gift_codes: Arc<dyn GiftCodeStore>,
    pub reports: Arc<dyn ReportStore>,
}

impl Stores {
    /// Back every aggregate with the same in-memory store.
    #[must_use]
    pub fn memory(store: &Arc<MemoryStore>) -> Self {
        Self {
            players: store.clone(),
            roles: store.clone(),
            gift_codes: store.clone(),
            reports: store.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub players: Arc<dyn PlayerStore>,
    pub gift_codes: Arc<dyn GiftCodeStore>,
    pub reports: Arc<dyn ReportStore>,
    /// Role store plus the process-wide role cache
    pub roles: Arc<RoleRegistry>,
    pub notifier: Arc<dyn Notifier>,
    /// Serialises load → mutate → save per player
    pub player_locks: Arc<KeyedLocks<PlayerId>>,
    /// Serialises redemptions per gift code
    pub code_locks: Arc<KeyedLocks<String>>,
    pub clock: Arc<dyn Clock>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Create new application state. The role cache starts empty; call
    /// `roles.refresh()` before serving.
    #[must_use]
    pub fn new(stores: Stores, notifier: Arc<dyn Notifier>, clock: Arc<dyn Clock>, config: Config) -> Self {
        Self {
            players: stores.players,
            gift_codes: stores.gift_codes,
            reports: stores.reports,
            roles: Arc::new(RoleRegistry::new(stores.roles, clock.clone())),
            notifier,
            player_locks: Arc::new(KeyedLocks::new()),
            code_locks: Arc::new(KeyedLocks::new()),
            clock,
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Load an existing record.
    pub async fn load_player(&self, id: &PlayerId) -> Result<Player, CoreError> {
        self.players
            .find_player(id)
            .await?
            .ok_or(CoreError::NotFound("player"))
    }

    /// Load a record, or start a fresh unsaved one.
    pub async fn load_or_create_player(&self, id: &PlayerId) -> Result<Player, CoreError> {
        Ok(self
            .players
            .find_player(id)
            .await?
            .unwrap_or_else(|| Player::new(*id, self.now())))
    }

    pub async fn save_player(&self, player: &mut Player) -> Result<(), CoreError> {
        self.players.save_player(player).await.map_err(|e| {
            tracing::error!(player = %player.id, error = %e, "Failed to save player");
            CoreError::from(e)
        })
    }

    /// Hand an event to the notifier without waiting for it.
    pub fn notify(&self, event: NotifyEvent) {
        dispatch(&self.notifier, event);
    }
}
