//! Persistence interface.
//!
//! One async trait per aggregate. The core only relies on find/insert/save/
//! delete semantics; [`MemoryStore`] is the in-process implementation.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;
use gt_common::PlayerId;

use crate::gift_codes::{GiftCode, GiftCodeId};
use crate::moderation::{Report, ReportId};
use crate::players::Player;
use crate::roles::{Role, RoleId};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Stale write: expected version {expected}, found {found}")]
    VersionConflict { expected: u64, found: u64 },

    #[error("Duplicate {0}")]
    Duplicate(&'static str),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait PlayerStore: Send + Sync {
    async fn find_player(&self, id: &PlayerId) -> StoreResult<Option<Player>>;

    /// Look up the owner of an API key by the key's digest.
    async fn find_player_by_api_key(&self, digest: &str) -> StoreResult<Option<Player>>;

    /// Insert or update, checking `player.version` against the stored one.
    ///
    /// A record with version 0 is inserted and must not exist yet. On
    /// success the version is bumped in place.
    async fn save_player(&self, player: &mut Player) -> StoreResult<()>;
}

#[async_trait]
pub trait RoleStore: Send + Sync {
    async fn list_roles(&self) -> StoreResult<Vec<Role>>;

    async fn find_role(&self, id: RoleId) -> StoreResult<Option<Role>>;

    /// Fails with [`StoreError::Duplicate`] if the name is taken.
    async fn insert_role(&self, role: &Role) -> StoreResult<()>;

    /// Fails with [`StoreError::Duplicate`] if renamed onto a taken name.
    async fn save_role(&self, role: &Role) -> StoreResult<()>;

    async fn delete_role(&self, id: RoleId) -> StoreResult<bool>;
}

#[async_trait]
pub trait GiftCodeStore: Send + Sync {
    async fn list_gift_codes(&self) -> StoreResult<Vec<GiftCode>>;

    async fn find_gift_code(&self, id: GiftCodeId) -> StoreResult<Option<GiftCode>>;

    async fn find_gift_code_by_code(&self, code: &str) -> StoreResult<Option<GiftCode>>;

    /// Fails with [`StoreError::Duplicate`] if the code is taken.
    async fn insert_gift_code(&self, code: &GiftCode) -> StoreResult<()>;

    async fn save_gift_code(&self, code: &GiftCode) -> StoreResult<()>;

    async fn delete_gift_code(&self, id: GiftCodeId) -> StoreResult<bool>;
}

#[async_trait]
pub trait ReportStore: Send + Sync {
    async fn find_report(&self, id: ReportId) -> StoreResult<Option<Report>>;

    /// Reports filed by `reporter` against `reported`.
    async fn find_reports_between(
        &self,
        reporter: &PlayerId,
        reported: &PlayerId,
    ) -> StoreResult<Vec<Report>>;

    /// All reports, oldest first.
    async fn list_reports(&self) -> StoreResult<Vec<Report>>;

    async fn insert_report(&self, report: &Report) -> StoreResult<()>;

    async fn save_report(&self, report: &Report) -> StoreResult<()>;
}
