//! Core Error Taxonomy
//!
//! Every guarded operation fails with a [`CoreError`]. Errors carry a
//! symbolic key for localisation; rendering user-facing text is left to the
//! front-end.

use crate::gift_codes::RedeemError;
use crate::permissions::{Permissions, UnknownPermissionBits};
use crate::players::{
    ApiKeyError, AppealError, BanError, ClearError, ConnectionError, GrantError, LockError,
    WatchError,
};
use crate::store::StoreError;

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotAuthorized,
    NotFound,
    Conflict,
    ValidationFailed,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("Missing permission {0:?}")]
    MissingPermission(Permissions),

    #[error("Not authorized: {0}")]
    NotAuthorized(&'static str),

    #[error("Not found: {0}")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(&'static str),

    /// Symbolic key of the failed check, e.g. `tag_length`.
    #[error("Validation failed: {0}")]
    Validation(&'static str),

    #[error("Unavailable: {0}")]
    Unavailable(String),
}

impl CoreError {
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingPermission(_) | Self::NotAuthorized(_) => ErrorKind::NotAuthorized,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Validation(_) => ErrorKind::ValidationFailed,
            Self::Unavailable(_) => ErrorKind::Unavailable,
        }
    }

    /// Localisation key, e.g. `error.conflict.already_banned`.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::MissingPermission(p) => match p.action_name() {
                Some(name) => format!("error.not_authorized.missing_permission.{name}"),
                None => "error.not_authorized.missing_permission".to_string(),
            },
            Self::NotAuthorized(reason) => format!("error.not_authorized.{reason}"),
            Self::NotFound(what) => format!("error.not_found.{what}"),
            Self::Conflict(what) => format!("error.conflict.{what}"),
            Self::Validation(what) => format!("error.validation_failed.{what}"),
            Self::Unavailable(_) => "error.unavailable".to_string(),
        }
    }
}

// ============================================================================
// Conversions
// ============================================================================

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => {
                tracing::error!(error = %msg, "Store unavailable");
                Self::Unavailable(msg)
            }
            StoreError::VersionConflict { .. } => Self::Conflict("concurrent_modification"),
            StoreError::Duplicate("role name") => Self::Conflict("role_name_taken"),
            StoreError::Duplicate("gift code") => Self::Conflict("gift_code_taken"),
            StoreError::Duplicate(_) => Self::Conflict("duplicate"),
        }
    }
}

impl From<UnknownPermissionBits> for CoreError {
    fn from(_: UnknownPermissionBits) -> Self {
        Self::Validation("unknown_permission_bits")
    }
}

impl From<GrantError> for CoreError {
    fn from(err: GrantError) -> Self {
        match err {
            GrantError::UnknownRole => Self::NotFound("role"),
            GrantError::AlreadyPermanent => Self::Conflict("role_already_permanent"),
            GrantError::ExpiryOutOfRange => Self::Validation("expiry_out_of_range"),
        }
    }
}

impl From<BanError> for CoreError {
    fn from(err: BanError) -> Self {
        match err {
            BanError::AlreadyBanned => Self::Conflict("already_banned"),
            BanError::NotBanned => Self::Conflict("not_banned"),
        }
    }
}

impl From<AppealError> for CoreError {
    fn from(err: AppealError) -> Self {
        match err {
            AppealError::NotBanned => Self::Conflict("not_banned"),
            AppealError::NotAppealable => Self::Conflict("not_appealable"),
            AppealError::AlreadyAppealed => Self::Conflict("already_appealed"),
            AppealError::ReasonLength { .. } => Self::Validation("appeal_length"),
        }
    }
}

impl From<LockError> for CoreError {
    fn from(err: LockError) -> Self {
        match err {
            LockError::AlreadyLocked => Self::Conflict("already_locked"),
            LockError::NotLocked => Self::Conflict("not_locked"),
        }
    }
}

impl From<WatchError> for CoreError {
    fn from(err: WatchError) -> Self {
        match err {
            WatchError::AlreadyWatched => Self::Conflict("already_watched"),
            WatchError::NotWatched => Self::Conflict("not_watched"),
        }
    }
}

impl From<ClearError> for CoreError {
    fn from(_: ClearError) -> Self {
        Self::Conflict("nothing_to_clear")
    }
}

impl From<ApiKeyError> for CoreError {
    fn from(err: ApiKeyError) -> Self {
        match err {
            ApiKeyError::LimitReached(_) => Self::Conflict("api_key_limit"),
            ApiKeyError::DuplicateName => Self::Conflict("api_key_name_taken"),
        }
    }
}

impl From<ConnectionError> for CoreError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::AlreadyLinked("discord") => Self::Conflict("discord_already_linked"),
            ConnectionError::AlreadyLinked(_) => Self::Conflict("email_already_linked"),
            ConnectionError::NotLinked("discord") => Self::NotFound("discord_connection"),
            ConnectionError::NotLinked(_) => Self::NotFound("email_connection"),
            ConnectionError::AlreadyVerified => Self::Conflict("email_already_verified"),
            ConnectionError::InvalidCode => Self::Validation("verification_code"),
        }
    }
}

impl From<RedeemError> for CoreError {
    fn from(err: RedeemError) -> Self {
        match err {
            RedeemError::Invalid => Self::Conflict("gift_code_invalid"),
            RedeemError::AlreadyRedeemed => Self::Conflict("gift_code_already_redeemed"),
            RedeemError::Grant(grant) => grant.into(),
        }
    }
}
