//! Staff moderation actions on player records.
//!
//! Every action has the same shape: permission check, input validation,
//! then load → mutate → save under the target's lock, then an audit event.
//! Nothing is written before all checks pass.

use chrono::{DateTime, Utc};
use gt_common::PlayerId;
use tracing::info;
use uuid::Uuid;

use super::types::{BanRequest, LockRequest};
use crate::error::CoreError;
use crate::notify::NotifyEvent;
use crate::permissions::Permissions;
use crate::players::{Note, Player};
use crate::session::{require_account, require_permission, Session};
use crate::state::AppState;
use crate::validation::{check_length, check_reason};

/// Resolve the acting staff member and reject self-targeting.
fn staff_for(
    state: &AppState,
    session: &Session,
    target: &PlayerId,
    permission: Permissions,
) -> Result<PlayerId, CoreError> {
    let staff = require_permission(session, &state.roles.snapshot(), permission, state.now())?;
    if staff == *target {
        return Err(CoreError::Validation("self_target"));
    }
    Ok(staff)
}

pub(crate) fn check_expiry(expires_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Result<(), CoreError> {
    if expires_at.is_some_and(|at| at <= now) {
        return Err(CoreError::Validation("expiry_past"));
    }
    Ok(())
}

// ============================================================================
// Transitions
// ============================================================================
//
// Record-level steps shared with report resolution. The caller holds the
// player lock and saves afterwards.

pub(crate) fn apply_ban(
    player: &mut Player,
    staff: PlayerId,
    request: &BanRequest,
    now: DateTime<Utc>,
) -> Result<NotifyEvent, CoreError> {
    player.ban(request.reason.trim(), staff, request.appealable, request.expires_at, now)?;
    Ok(NotifyEvent::PlayerBanned {
        player: player.id,
        staff,
        reason: request.reason.trim().to_string(),
        expires_at: request.expires_at,
        email: player.connections.verified_email().map(str::to_string),
    })
}

pub(crate) fn apply_lock(
    player: &mut Player,
    staff: PlayerId,
    request: &LockRequest,
    now: DateTime<Utc>,
) -> Result<NotifyEvent, CoreError> {
    player.lock(request.reason.trim(), staff, request.expires_at, now)?;
    Ok(NotifyEvent::PlayerLocked {
        player: player.id,
        staff,
        reason: request.reason.trim().to_string(),
    })
}

pub(crate) fn apply_watch(
    player: &mut Player,
    staff: PlayerId,
    reason: &str,
    now: DateTime<Utc>,
) -> Result<NotifyEvent, CoreError> {
    player.watch(reason.trim(), staff, now)?;
    Ok(NotifyEvent::WatchStarted {
        player: player.id,
        staff,
        reason: reason.trim().to_string(),
    })
}

// ============================================================================
// Bans
// ============================================================================

#[tracing::instrument(skip(state, session, request))]
pub async fn ban_player(state: &AppState, session: &Session, target: PlayerId, request: BanRequest) -> Result<(), CoreError> {
    let now = state.now();
    let staff = staff_for(state, session, &target, Permissions::MANAGE_BANS)?;
    check_reason(&request.reason, state.config.reason_max_length)?;
    check_expiry(request.expires_at, now)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_or_create_player(&target).await?;
    let event = apply_ban(&mut player, staff, &request, now)?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %staff, expires_at = ?request.expires_at, "Player banned");
    state.notify(event);
    Ok(())
}

#[tracing::instrument(skip(state, session))]
pub async fn unban_player(state: &AppState, session: &Session, target: PlayerId) -> Result<(), CoreError> {
    let now = state.now();
    let staff = staff_for(state, session, &target, Permissions::MANAGE_BANS)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    player.unban(now)?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %staff, "Player unbanned");
    state.notify(NotifyEvent::PlayerUnbanned {
        player: target,
        staff,
        email: player.connections.verified_email().map(str::to_string),
    });
    Ok(())
}

/// Appeal the caller's own active ban.
#[tracing::instrument(skip(state, session, reason))]
pub async fn appeal_ban(state: &AppState, session: &Session, reason: &str) -> Result<(), CoreError> {
    let target = require_account(session)?;
    let bounds = (state.config.appeal_min_length, state.config.appeal_max_length);

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    player.appeal(reason, bounds, state.now())?;
    state.save_player(&mut player).await?;

    info!(player = %target, "Ban appealed");
    state.notify(NotifyEvent::BanAppealed {
        player: target,
        reason: reason.trim().to_string(),
    });
    Ok(())
}

// ============================================================================
// Notes
// ============================================================================

#[tracing::instrument(skip(state, session, content))]
pub async fn create_note(state: &AppState, session: &Session, target: PlayerId, content: &str) -> Result<Note, CoreError> {
    let staff = require_permission(session, &state.roles.snapshot(), Permissions::CREATE_NOTES, state.now())?;
    check_length("note_length", content, 1, state.config.note_max_length)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    let note = player.add_note(content.trim(), staff, state.now()).clone();
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %staff, note = %note.id, "Note created");
    state.notify(NotifyEvent::NoteCreated {
        player: target,
        staff,
        content: note.content.clone(),
    });
    Ok(note)
}

#[tracing::instrument(skip(state, session))]
pub async fn delete_note(state: &AppState, session: &Session, target: PlayerId, note: Uuid) -> Result<(), CoreError> {
    let staff = require_permission(session, &state.roles.snapshot(), Permissions::DELETE_NOTES, state.now())?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    player.remove_note(note).ok_or(CoreError::NotFound("note"))?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %staff, note = %note, "Note deleted");
    state.notify(NotifyEvent::NoteDeleted { player: target, staff });
    Ok(())
}

// ============================================================================
// Clears
// ============================================================================

#[tracing::instrument(skip(state, session))]
pub async fn clear_tag(state: &AppState, session: &Session, target: PlayerId, reason: &str) -> Result<String, CoreError> {
    let staff = require_permission(session, &state.roles.snapshot(), Permissions::MANAGE_TAGS, state.now())?;
    check_reason(reason, state.config.reason_max_length)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    let removed = player.clear_tag(reason.trim(), staff, state.now())?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %staff, "Tag cleared");
    state.notify(NotifyEvent::TagCleared {
        player: target,
        staff,
        removed: removed.clone(),
        reason: reason.trim().to_string(),
    });
    Ok(removed)
}

#[tracing::instrument(skip(state, session))]
pub async fn clear_icon(state: &AppState, session: &Session, target: PlayerId, reason: &str) -> Result<(), CoreError> {
    let staff = require_permission(session, &state.roles.snapshot(), Permissions::MANAGE_TAGS, state.now())?;
    check_reason(reason, state.config.reason_max_length)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    player.clear_icon(reason.trim(), staff, state.now())?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %staff, "Icon cleared");
    state.notify(NotifyEvent::IconCleared {
        player: target,
        staff,
        reason: reason.trim().to_string(),
    });
    Ok(())
}

// ============================================================================
// Locks
// ============================================================================

#[tracing::instrument(skip(state, session, request))]
pub async fn lock_player(state: &AppState, session: &Session, target: PlayerId, request: LockRequest) -> Result<(), CoreError> {
    let now = state.now();
    let staff = staff_for(state, session, &target, Permissions::MANAGE_LOCKS)?;
    check_reason(&request.reason, state.config.reason_max_length)?;
    check_expiry(request.expires_at, now)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_or_create_player(&target).await?;
    let event = apply_lock(&mut player, staff, &request, now)?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %staff, "Player locked");
    state.notify(event);
    Ok(())
}

#[tracing::instrument(skip(state, session))]
pub async fn unlock_player(state: &AppState, session: &Session, target: PlayerId) -> Result<(), CoreError> {
    let staff = staff_for(state, session, &target, Permissions::MANAGE_LOCKS)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    player.unlock(state.now())?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %staff, "Player unlocked");
    state.notify(NotifyEvent::PlayerUnlocked { player: target, staff });
    Ok(())
}

// ============================================================================
// Watchlist
// ============================================================================

#[tracing::instrument(skip(state, session))]
pub async fn watch_player(state: &AppState, session: &Session, target: PlayerId, reason: &str) -> Result<(), CoreError> {
    let now = state.now();
    let staff = staff_for(state, session, &target, Permissions::MANAGE_WATCHLIST)?;
    check_reason(reason, state.config.reason_max_length)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_or_create_player(&target).await?;
    let event = apply_watch(&mut player, staff, reason, now)?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %staff, "Player added to watchlist");
    state.notify(event);
    Ok(())
}

#[tracing::instrument(skip(state, session))]
pub async fn unwatch_player(state: &AppState, session: &Session, target: PlayerId) -> Result<(), CoreError> {
    let staff = staff_for(state, session, &target, Permissions::MANAGE_WATCHLIST)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    player.unwatch(state.now())?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %staff, "Player removed from watchlist");
    state.notify(NotifyEvent::WatchEnded { player: target, staff });
    Ok(())
}
