//! Player records: tag state, role grants and moderation ledgers.

pub mod bans;
pub mod grants;
pub mod handlers;
pub mod ledger;
pub mod models;
pub mod settings;

pub use bans::{AppealError, BanError, LockError, WatchError};
pub use grants::{GrantError, GrantRequest};
pub use ledger::{ApiKeyError, ClearError, ConnectionError};
pub use models::{
    ApiKey, Appeal, Ban, Clear, ClearedContent, Connections, Lock, Note, Player, Referral,
    ReferralLedger, RoleGrant, WatchPeriod,
};
