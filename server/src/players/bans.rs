//! Ban, lock and watchlist state machines.
//!
//! Only the most recent entry of each ledger is authoritative. Lifting a ban
//! or lock sets its expiry to now; closing a watch period stamps its end.
//! Entries are never removed.

use chrono::{DateTime, Utc};
use gt_common::PlayerId;
use uuid::Uuid;

use super::models::{Appeal, Ban, Lock, Player, WatchPeriod};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BanError {
    #[error("Player is already banned")]
    AlreadyBanned,

    #[error("Player is not banned")]
    NotBanned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AppealError {
    #[error("Player is not banned")]
    NotBanned,

    #[error("Ban cannot be appealed")]
    NotAppealable,

    #[error("Ban was already appealed")]
    AlreadyAppealed,

    #[error("Appeal reason must be {min}-{max} characters")]
    ReasonLength { min: usize, max: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    #[error("Player is already locked")]
    AlreadyLocked,

    #[error("Player is not locked")]
    NotLocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WatchError {
    #[error("Player is already on the watchlist")]
    AlreadyWatched,

    #[error("Player is not on the watchlist")]
    NotWatched,
}

impl Player {
    // === Bans ===

    /// The latest ban, if it is still in force.
    #[must_use]
    pub fn active_ban(&self, now: DateTime<Utc>) -> Option<&Ban> {
        self.bans.last().filter(|b| b.is_active(now))
    }

    #[must_use]
    pub fn is_banned(&self, now: DateTime<Utc>) -> bool {
        self.active_ban(now).is_some()
    }

    pub fn ban(
        &mut self,
        reason: impl Into<String>,
        staff: PlayerId,
        appealable: bool,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<&Ban, BanError> {
        if self.is_banned(now) {
            return Err(BanError::AlreadyBanned);
        }
        self.bans.push(Ban {
            id: Uuid::new_v4(),
            reason: reason.into(),
            staff,
            banned_at: now,
            expires_at,
            appeal: Appeal::new(appealable),
        });
        Ok(&self.bans[self.bans.len() - 1])
    }

    pub fn unban(&mut self, now: DateTime<Utc>) -> Result<(), BanError> {
        match self.bans.last_mut() {
            Some(ban) if ban.is_active(now) => {
                ban.expires_at = Some(now);
                Ok(())
            }
            _ => Err(BanError::NotBanned),
        }
    }

    /// Appeal the active ban once.
    ///
    /// `bounds` are the inclusive (min, max) reason lengths in characters.
    pub fn appeal(
        &mut self,
        reason: &str,
        bounds: (usize, usize),
        now: DateTime<Utc>,
    ) -> Result<(), AppealError> {
        let ban = match self.bans.last_mut() {
            Some(ban) if ban.is_active(now) => ban,
            _ => return Err(AppealError::NotBanned),
        };
        if !ban.appeal.appealable {
            return Err(AppealError::NotAppealable);
        }
        if ban.appeal.appealed {
            return Err(AppealError::AlreadyAppealed);
        }

        let (min, max) = bounds;
        let reason = reason.trim();
        let len = reason.chars().count();
        if len < min || len > max {
            return Err(AppealError::ReasonLength { min, max });
        }

        ban.appeal.appealed = true;
        ban.appeal.reason = Some(reason.to_string());
        ban.appeal.appealed_at = Some(now);
        Ok(())
    }

    // === Locks ===

    #[must_use]
    pub fn active_lock(&self, now: DateTime<Utc>) -> Option<&Lock> {
        self.locks.last().filter(|l| l.is_active(now))
    }

    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.active_lock(now).is_some()
    }

    pub fn lock(
        &mut self,
        reason: impl Into<String>,
        staff: PlayerId,
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<(), LockError> {
        if self.is_locked(now) {
            return Err(LockError::AlreadyLocked);
        }
        self.locks.push(Lock {
            id: Uuid::new_v4(),
            reason: reason.into(),
            staff,
            locked_at: now,
            expires_at,
        });
        Ok(())
    }

    pub fn unlock(&mut self, now: DateTime<Utc>) -> Result<(), LockError> {
        match self.locks.last_mut() {
            Some(lock) if lock.is_active(now) => {
                lock.expires_at = Some(now);
                Ok(())
            }
            _ => Err(LockError::NotLocked),
        }
    }

    // === Watchlist ===

    #[must_use]
    pub fn is_watched(&self) -> bool {
        self.watchlist.last().is_some_and(WatchPeriod::is_open)
    }

    pub fn watch(
        &mut self,
        reason: impl Into<String>,
        staff: PlayerId,
        now: DateTime<Utc>,
    ) -> Result<(), WatchError> {
        if self.is_watched() {
            return Err(WatchError::AlreadyWatched);
        }
        self.watchlist.push(WatchPeriod {
            id: Uuid::new_v4(),
            reason: reason.into(),
            staff,
            started_at: now,
            ended_at: None,
        });
        Ok(())
    }

    pub fn unwatch(&mut self, now: DateTime<Utc>) -> Result<(), WatchError> {
        match self.watchlist.last_mut() {
            Some(period) if period.is_open() => {
                period.ended_at = Some(now);
                Ok(())
            }
            _ => Err(WatchError::NotWatched),
        }
    }
}
