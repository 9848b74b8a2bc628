//! Gift code creation, redemption and administration.

use tracing::info;

use super::models::{
    CreateGiftCodeRequest, GiftCode, GiftCodeId, GiftCodeSummary, GiftGrant, Redemption,
};
use crate::error::CoreError;
use crate::notify::NotifyEvent;
use crate::permissions::Permissions;
use crate::players::{GrantError, GrantRequest};
use crate::session::{require_account, require_permission, session_permissions, Session};
use crate::state::AppState;
use crate::util::random_code;
use crate::validation::{check_duration, check_length};

/// Bounds for codes chosen by staff.
const CUSTOM_CODE_MIN: usize = 4;
const CUSTOM_CODE_MAX: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RedeemError {
    #[error("Gift code is exhausted or expired")]
    Invalid,

    #[error("Gift code was already redeemed by this player")]
    AlreadyRedeemed,

    #[error(transparent)]
    Grant(#[from] GrantError),
}

fn check_custom_code(code: &str) -> Result<String, CoreError> {
    let code = code.trim();
    check_length("gift_code_format", code, CUSTOM_CODE_MIN, CUSTOM_CODE_MAX)?;
    if !code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(CoreError::Validation("gift_code_format"));
    }
    Ok(code.to_string())
}

/// Create a gift code. The returned value carries the full code; listings
/// only ever show it masked.
#[tracing::instrument(skip(state, session, request), fields(name = %request.name))]
pub async fn create_gift_code(
    state: &AppState,
    session: &Session,
    request: CreateGiftCodeRequest,
) -> Result<GiftCode, CoreError> {
    let now = state.now();
    let roles = state.roles.snapshot();
    let staff = require_permission(session, &roles, Permissions::MANAGE_GIFT_CODES, now)?;

    check_length("gift_code_name_length", &request.name, 1, 64)?;
    if request.max_uses == 0 {
        return Err(CoreError::Validation("max_uses"));
    }
    check_duration(request.duration_ms)?;
    if request.expires_at.is_some_and(|at| at <= now) {
        return Err(CoreError::Validation("expiry_past"));
    }

    let role = roles.get(request.role).ok_or(CoreError::NotFound("role"))?;
    let actor_permissions = session_permissions(session, &roles, now);
    if !role.permissions.escalation_over(actor_permissions).is_empty() {
        return Err(CoreError::NotAuthorized("cannot_escalate"));
    }

    let code = match request.code.as_deref() {
        Some(code) => check_custom_code(code)?,
        None => random_code(state.config.gift_code_length),
    };

    let gift = GiftCode {
        id: GiftCodeId::new(),
        name: request.name.trim().to_string(),
        code,
        uses: Vec::new(),
        max_uses: request.max_uses,
        grant: GiftGrant {
            role: role.id,
            duration_ms: request.duration_ms,
        },
        created_by: staff,
        created_at: now,
        expires_at: request.expires_at,
    };
    state.gift_codes.insert_gift_code(&gift).await?;

    info!(code = %gift.id, staff = %staff, role = %role.id, max_uses = gift.max_uses, "Gift code created");
    state.notify(NotifyEvent::GiftCodeCreated {
        code: gift.id,
        staff,
        role: role.id,
    });
    Ok(gift)
}

/// Redeem `code` for the calling player.
///
/// The player record is saved before the use is appended to the code. If
/// the second save fails the player keeps the role without the use being
/// counted; the reverse order could consume a use without granting anything.
#[tracing::instrument(skip(state, session, code))]
pub async fn redeem_gift_code(state: &AppState, session: &Session, code: &str) -> Result<Redemption, CoreError> {
    let now = state.now();
    let player_id = require_account(session)?;
    let code = code.trim();

    let _code_guard = state.code_locks.lock(code.to_string()).await;
    let mut gift = state
        .gift_codes
        .find_gift_code_by_code(code)
        .await?
        .ok_or(CoreError::NotFound("gift_code"))?;

    if !gift.is_valid(now) {
        return Err(RedeemError::Invalid.into());
    }
    if gift.was_redeemed_by(&player_id) {
        return Err(RedeemError::AlreadyRedeemed.into());
    }

    let mut grant = GrantRequest::new(gift.grant.role, format!("Gift code: {}", gift.name));
    if let Some(duration) = gift.grant.duration() {
        grant = grant.duration(duration);
    }

    let _player_guard = state.player_locks.lock(player_id).await;
    let mut player = state.load_or_create_player(&player_id).await?;
    let expires_at = player
        .add_role(&state.roles.snapshot(), grant, now)
        .map_err(RedeemError::from)?;
    state.save_player(&mut player).await?;

    gift.uses.push(player_id);
    state.gift_codes.save_gift_code(&gift).await?;

    info!(code = %gift.id, player = %player_id, role = %gift.grant.role, "Gift code redeemed");
    state.notify(NotifyEvent::GiftCodeRedeemed {
        code: gift.id,
        player: player_id,
        role: gift.grant.role,
    });
    Ok(Redemption {
        role: gift.grant.role,
        expires_at,
    })
}

/// All gift codes with their codes masked.
pub async fn list_gift_codes(state: &AppState, session: &Session) -> Result<Vec<GiftCodeSummary>, CoreError> {
    require_permission(session, &state.roles.snapshot(), Permissions::MANAGE_GIFT_CODES, state.now())?;
    let codes = state.gift_codes.list_gift_codes().await?;
    Ok(codes.iter().map(GiftCodeSummary::from).collect())
}

#[tracing::instrument(skip(state, session))]
pub async fn delete_gift_code(state: &AppState, session: &Session, id: GiftCodeId) -> Result<(), CoreError> {
    let staff = require_permission(session, &state.roles.snapshot(), Permissions::MANAGE_GIFT_CODES, state.now())?;
    if !state.gift_codes.delete_gift_code(id).await? {
        return Err(CoreError::NotFound("gift_code"));
    }
    info!(code = %id, staff = %staff, "Gift code deleted");
    Ok(())
}

