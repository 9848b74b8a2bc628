//! Owner-facing player operations: tag settings, referrals, API keys and
//! connections.
//!
//! Each mutation runs under the player's lock as load → mutate → save.
//! Records are created on first use.

use gt_common::{IconType, PlayerIcon, PlayerId, TagPosition};
use tracing::info;
use uuid::Uuid;

use super::models::{ApiKey, Player};
use super::settings::{
    normalize_icon, validate_tag, CreateApiKeyRequest, LinkDiscordRequest, LinkEmailRequest,
};
use crate::error::CoreError;
use crate::notify::NotifyEvent;
use crate::permissions::Permissions;
use crate::session::{require_account, require_self_or_permission, session_permissions, Session};
use crate::state::AppState;
use crate::validation::validate_request;

/// Reject settings changes from banned or locked players.
fn ensure_may_edit(player: &Player, state: &AppState) -> Result<(), CoreError> {
    let now = state.now();
    if player.is_banned(now) {
        return Err(CoreError::Conflict("player_banned"));
    }
    if player.is_locked(now) {
        return Err(CoreError::Conflict("player_locked"));
    }
    Ok(())
}

fn notify_if_watched(state: &AppState, player: &Player, old: Option<String>) {
    if player.is_watched() && old != player.tag {
        info!(player = %player.id, "Watched player changed tag");
        state.notify(NotifyEvent::WatchedTagChange {
            player: player.id,
            old,
            new: player.tag.clone(),
        });
    }
}

// ============================================================================
// Tag Settings
// ============================================================================

/// Set the caller's tag, or another player's with `MANAGE_TAGS`.
#[tracing::instrument(skip(state, session))]
pub async fn set_tag(state: &AppState, session: &Session, target: PlayerId, tag: &str) -> Result<Player, CoreError> {
    let now = state.now();
    let roles = state.roles.snapshot();
    require_self_or_permission(session, &target, &roles, Permissions::MANAGE_TAGS, now)?;

    let bypass = session_permissions(session, &roles, now).has(Permissions::BYPASS_VALIDATION);
    let tag = validate_tag(
        tag,
        state.config.tag_min_length,
        state.config.tag_max_length,
        bypass,
    )?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_or_create_player(&target).await?;
    ensure_may_edit(&player, state)?;

    let old = player.tag.replace(tag);
    state.save_player(&mut player).await?;

    notify_if_watched(state, &player, old);
    Ok(player)
}

/// Remove the caller's own tag.
#[tracing::instrument(skip(state, session))]
pub async fn reset_tag(state: &AppState, session: &Session) -> Result<Player, CoreError> {
    let target = require_account(session)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    ensure_may_edit(&player, state)?;

    let old = player.tag.take();
    if old.is_none() {
        return Err(CoreError::Conflict("no_tag"));
    }
    state.save_player(&mut player).await?;

    notify_if_watched(state, &player, old);
    Ok(player)
}

#[tracing::instrument(skip(state, session))]
pub async fn set_position(state: &AppState, session: &Session, position: TagPosition) -> Result<Player, CoreError> {
    let target = require_account(session)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_or_create_player(&target).await?;
    ensure_may_edit(&player, state)?;

    player.position = position;
    state.save_player(&mut player).await?;
    Ok(player)
}

/// Choose an icon. Custom icons need `CUSTOM_ICONS`; the role icon needs an
/// active role that carries one.
#[tracing::instrument(skip(state, session))]
pub async fn set_icon(state: &AppState, session: &Session, icon: PlayerIcon) -> Result<Player, CoreError> {
    let now = state.now();
    let target = require_account(session)?;
    let icon = normalize_icon(icon)?;
    let roles = state.roles.snapshot();

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_or_create_player(&target).await?;
    ensure_may_edit(&player, state)?;

    match icon.kind {
        IconType::Custom if !player.has_permission(&roles, Permissions::CUSTOM_ICONS, now) => {
            return Err(CoreError::MissingPermission(Permissions::CUSTOM_ICONS));
        }
        IconType::Role if player.display_icon_role(&roles, now).is_none() => {
            return Err(CoreError::Conflict("no_icon_role"));
        }
        _ => {}
    }

    player.icon = icon;
    state.save_player(&mut player).await?;
    Ok(player)
}

// ============================================================================
// Referrals
// ============================================================================

/// Record that the caller was referred by `referrer`.
///
/// Both records are saved separately; the referred player is saved first so
/// a failure never credits a referral twice.
#[tracing::instrument(skip(state, session))]
pub async fn record_referral(state: &AppState, session: &Session, referrer: PlayerId) -> Result<(), CoreError> {
    let now = state.now();
    let referred = require_account(session)?;
    if referred == referrer {
        return Err(CoreError::Validation("self_referral"));
    }

    let _guards = state.player_locks.lock_pair(referred, referrer).await;
    let mut player = state.load_or_create_player(&referred).await?;
    if player.referrals.referred_by.is_some() {
        return Err(CoreError::Conflict("already_referred"));
    }
    let mut referring = state.load_or_create_player(&referrer).await?;

    player.referrals.referred_by = Some(referrer);
    state.save_player(&mut player).await?;

    referring.referrals.push(referred, now);
    state.save_player(&mut referring).await?;

    info!(player = %referred, referrer = %referrer, "Referral recorded");
    Ok(())
}

// ============================================================================
// API Keys
// ============================================================================

/// Create an API key. The plaintext is returned once and never stored.
#[tracing::instrument(skip(state, session, request))]
pub async fn create_api_key(
    state: &AppState,
    session: &Session,
    request: CreateApiKeyRequest,
) -> Result<(ApiKey, String), CoreError> {
    validate_request(&request, "api_key_name")?;
    let target = require_account(session)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_or_create_player(&target).await?;
    let (key, plaintext) = player.add_api_key(request.name.trim(), state.config.max_api_keys, state.now())?;
    state.save_player(&mut player).await?;

    info!(player = %target, key = %key.id, "API key created");
    Ok((key, plaintext))
}

#[tracing::instrument(skip(state, session))]
pub async fn delete_api_key(state: &AppState, session: &Session, id: Uuid) -> Result<(), CoreError> {
    let target = require_account(session)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    player
        .remove_api_key(id)
        .ok_or(CoreError::NotFound("api_key"))?;
    state.save_player(&mut player).await?;

    info!(player = %target, key = %id, "API key deleted");
    Ok(())
}

// ============================================================================
// Connections
// ============================================================================

#[tracing::instrument(skip(state, session))]
pub async fn link_discord(state: &AppState, session: &Session, request: LinkDiscordRequest) -> Result<(), CoreError> {
    validate_request(&request, "discord_id")?;
    let target = require_account(session)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_or_create_player(&target).await?;
    player.link_discord(request.id, state.now())?;
    state.save_player(&mut player).await
}

/// Unlink Discord from `target`; staff need `MANAGE_CONNECTIONS`.
#[tracing::instrument(skip(state, session))]
pub async fn unlink_discord(state: &AppState, session: &Session, target: PlayerId) -> Result<(), CoreError> {
    let roles = state.roles.snapshot();
    let actor = require_self_or_permission(session, &target, &roles, Permissions::MANAGE_CONNECTIONS, state.now())?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    player.unlink_discord()?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %actor, "Discord unlinked");
    Ok(())
}

/// Attach an email address. Returns the verification code for delivery.
#[tracing::instrument(skip(state, session, request))]
pub async fn link_email(state: &AppState, session: &Session, request: LinkEmailRequest) -> Result<String, CoreError> {
    validate_request(&request, "email_address")?;
    let target = require_account(session)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_or_create_player(&target).await?;
    let code = player.link_email(request.address.trim().to_ascii_lowercase(), state.now())?;
    state.save_player(&mut player).await?;
    Ok(code)
}

#[tracing::instrument(skip(state, session, code))]
pub async fn verify_email(state: &AppState, session: &Session, code: &str) -> Result<(), CoreError> {
    let target = require_account(session)?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    player.verify_email(code)?;
    state.save_player(&mut player).await
}

/// Unlink the email of `target`; staff need `MANAGE_CONNECTIONS`.
#[tracing::instrument(skip(state, session))]
pub async fn unlink_email(state: &AppState, session: &Session, target: PlayerId) -> Result<(), CoreError> {
    let roles = state.roles.snapshot();
    let actor = require_self_or_permission(session, &target, &roles, Permissions::MANAGE_CONNECTIONS, state.now())?;

    let _guard = state.player_locks.lock(target).await;
    let mut player = state.load_player(&target).await?;
    player.unlink_email()?;
    state.save_player(&mut player).await?;

    info!(player = %target, staff = %actor, "Email unlinked");
    Ok(())
}
