//! Player record and its ledgers.

use chrono::{DateTime, Datelike, Utc};
use gt_common::{PlayerIcon, PlayerId, TagPosition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::RoleId;

// ============================================================================
// Player
// ============================================================================

/// The aggregate root for everything known about one account.
///
/// Records are created lazily and never deleted. Every ledger is
/// append-only: lifting a ban or a lock closes the entry, it does not
/// remove it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub tag: Option<String>,
    #[serde(default)]
    pub position: TagPosition,
    #[serde(default)]
    pub icon: PlayerIcon,
    #[serde(default)]
    pub referrals: ReferralLedger,
    #[serde(default)]
    pub roles: Vec<RoleGrant>,
    #[serde(default)]
    pub api_keys: Vec<ApiKey>,
    #[serde(default)]
    pub notes: Vec<Note>,
    #[serde(default)]
    pub bans: Vec<Ban>,
    #[serde(default)]
    pub clears: Vec<Clear>,
    #[serde(default)]
    pub locks: Vec<Lock>,
    #[serde(default)]
    pub watchlist: Vec<WatchPeriod>,
    #[serde(default)]
    pub connections: Connections,
    pub created_at: DateTime<Utc>,
    /// Optimistic concurrency counter. Zero means "never saved".
    #[serde(default)]
    pub version: u64,
}

impl Player {
    /// A fresh, unsaved record.
    #[must_use]
    pub fn new(id: PlayerId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            tag: None,
            position: TagPosition::default(),
            icon: PlayerIcon::default(),
            referrals: ReferralLedger::default(),
            roles: Vec::new(),
            api_keys: Vec::new(),
            notes: Vec::new(),
            bans: Vec::new(),
            clears: Vec::new(),
            locks: Vec::new(),
            watchlist: Vec::new(),
            connections: Connections::default(),
            created_at: now,
            version: 0,
        }
    }

    /// Whether this record was ever persisted.
    #[must_use]
    pub const fn is_persisted(&self) -> bool {
        self.version > 0
    }
}

/// `None` expiry means indefinite.
fn open_at(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    expires_at.is_none_or(|at| at > now)
}

// ============================================================================
// Role Grants
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    pub role: RoleId,
    pub reason: String,
    /// Expire the grant when the backing entitlement ends.
    pub auto_remove: bool,
    /// Shown in the player's public role list.
    pub visible: bool,
    pub added_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl RoleGrant {
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        open_at(self.expires_at, now)
    }
}

// ============================================================================
// Moderation Ledger
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ban {
    pub id: Uuid,
    pub reason: String,
    pub staff: PlayerId,
    pub banned_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    pub appeal: Appeal,
}

impl Ban {
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        open_at(self.expires_at, now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appeal {
    pub appealable: bool,
    pub appealed: bool,
    pub reason: Option<String>,
    pub appealed_at: Option<DateTime<Utc>>,
}

impl Appeal {
    #[must_use]
    pub const fn new(appealable: bool) -> Self {
        Self {
            appealable,
            appealed: false,
            reason: None,
            appealed_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub content: String,
    pub author: PlayerId,
    pub created_at: DateTime<Utc>,
}

/// Content removed from a player by staff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ClearedContent {
    Tag(String),
    Icon(PlayerIcon),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clear {
    pub id: Uuid,
    pub removed: ClearedContent,
    pub reason: String,
    pub staff: PlayerId,
    pub cleared_at: DateTime<Utc>,
}

/// Account lock preventing tag changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lock {
    pub id: Uuid,
    pub reason: String,
    pub staff: PlayerId,
    pub locked_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Lock {
    #[must_use]
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        open_at(self.expires_at, now)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchPeriod {
    pub id: Uuid,
    pub reason: String,
    pub staff: PlayerId,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl WatchPeriod {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

// ============================================================================
// Referrals
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Referral {
    pub player: PlayerId,
    pub referred_at: DateTime<Utc>,
}

/// Referrals this player made, plus who referred them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferralLedger {
    pub referred_by: Option<PlayerId>,
    pub entries: Vec<Referral>,
    /// Referrals made in the calendar month of `period_start`.
    pub current_period: u32,
    pub period_start: Option<DateTime<Utc>>,
}

impl ReferralLedger {
    /// Record a referral, rolling the period counter over on a new month.
    pub fn push(&mut self, player: PlayerId, now: DateTime<Utc>) {
        let same_month = self
            .period_start
            .is_some_and(|start| start.year() == now.year() && start.month() == now.month());
        if !same_month {
            self.current_period = 0;
            self.period_start = Some(now);
        }
        self.current_period += 1;
        self.entries.push(Referral {
            player,
            referred_at: now,
        });
    }

    /// Counter value as seen at `now`.
    #[must_use]
    pub fn current_period_count(&self, now: DateTime<Utc>) -> u32 {
        match self.period_start {
            Some(start) if start.year() == now.year() && start.month() == now.month() => {
                self.current_period
            }
            _ => 0,
        }
    }
}

// ============================================================================
// API Keys & Connections
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKey {
    pub id: Uuid,
    pub name: String,
    /// Hex SHA-256 of the plaintext key.
    pub digest: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connections {
    pub discord: Option<DiscordConnection>,
    pub email: Option<EmailConnection>,
}

impl Connections {
    /// Address to send notifications to, if one is verified.
    #[must_use]
    pub fn verified_email(&self) -> Option<&str> {
        self.email
            .as_ref()
            .filter(|e| e.verified)
            .map(|e| e.address.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordConnection {
    pub id: String,
    pub linked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailConnection {
    pub address: String,
    pub verified: bool,
    /// Hex SHA-256 of the pending verification code.
    pub code_digest: Option<String>,
    pub linked_at: DateTime<Utc>,
}
