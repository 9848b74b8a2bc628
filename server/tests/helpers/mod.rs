//! Reusable helpers for integration tests.
//!
//! [`TestApp`] wires an [`AppState`] over the in-memory store with a manual
//! clock and a notifier that records every event, so tests can drive the
//! public operations and inspect what was persisted and announced.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use gt_common::PlayerId;
use gt_server::clock::ManualClock;
use gt_server::config::Config;
use gt_server::notify::{Notifier, NotifyError, NotifyEvent};
use gt_server::permissions::Permissions;
use gt_server::players::{GrantRequest, Player};
use gt_server::roles::{NewRole, Role, RoleId, DEFAULT_ADMIN_ROLE};
use gt_server::session::Session;
use gt_server::state::{AppState, Stores};
use gt_server::store::{MemoryStore, PlayerStore};

// ============================================================================
// Recording Notifier
// ============================================================================

#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotifyEvent>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        self.events.lock().unwrap().push(event.clone());
        Ok(())
    }
}

// ============================================================================
// Test App
// ============================================================================

pub struct TestApp {
    pub state: AppState,
    pub store: Arc<MemoryStore>,
    pub clock: Arc<ManualClock>,
    notifier: Arc<RecordingNotifier>,
}

impl TestApp {
    /// Fresh state with the default admin role seeded.
    pub async fn new() -> Self {
        Self::with_config(Config::default_for_test()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(start_time()));
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(Stores::memory(&store), notifier.clone(), clock.clone(), config);
        state.roles.refresh().await.expect("seed roles");
        Self {
            state,
            store,
            clock,
            notifier,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.state.now()
    }

    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    pub fn admin_role(&self) -> RoleId {
        self.state
            .roles
            .snapshot()
            .by_name(DEFAULT_ADMIN_ROLE)
            .expect("admin role seeded")
            .id
    }

    /// Create a role directly through the registry, bypassing role admin checks.
    pub async fn create_role(&self, name: &str, permissions: Permissions) -> Role {
        self.state
            .roles
            .create(NewRole {
                name: name.to_string(),
                permissions,
                ..Default::default()
            })
            .await
            .expect("create role")
    }

    /// Persist a new player holding `roles` indefinitely.
    pub async fn player_with_roles(&self, roles: &[RoleId]) -> PlayerId {
        let id = PlayerId::new_random();
        let mut player = Player::new(id, self.now());
        let snapshot = self.state.roles.snapshot();
        for role in roles {
            player
                .add_role(&snapshot, GrantRequest::new(*role, "test setup"), self.now())
                .expect("grant role");
        }
        self.store.save_player(&mut player).await.expect("save player");
        id
    }

    pub async fn admin(&self) -> PlayerId {
        self.player_with_roles(&[self.admin_role()]).await
    }

    /// Player holding a fresh role with exactly `permissions`.
    pub async fn staff(&self, name: &str, permissions: Permissions) -> PlayerId {
        let role = self.create_role(name, permissions).await;
        self.player_with_roles(&[role.id]).await
    }

    /// Session for `id` as the request would resolve it, record included.
    pub async fn session(&self, id: PlayerId) -> Session {
        self.session_targeting(id, None).await
    }

    pub async fn session_targeting(&self, id: PlayerId, target: Option<&PlayerId>) -> Session {
        match self.store.find_player(&id).await.expect("find player") {
            Some(player) => Session::for_player(player, target),
            None => Session::account(id, target),
        }
    }

    pub async fn player(&self, id: PlayerId) -> Player {
        self.store
            .find_player(&id)
            .await
            .expect("find player")
            .expect("player exists")
    }

    /// Events delivered so far. Delivery is spawned, so let it run first.
    pub async fn events(&self) -> Vec<NotifyEvent> {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        self.notifier.events.lock().unwrap().clone()
    }

    pub async fn event_kinds(&self) -> Vec<&'static str> {
        self.events().await.iter().map(NotifyEvent::kind).collect()
    }
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap()
}
