//! Player reports.
//!
//! A report freezes the reported player's tag at filing time. Reviewers
//! resolve it by recording actions; non-dismiss actions apply the matching
//! moderation transition to the player first.

use gt_common::PlayerId;
use tracing::info;

use super::handlers::{apply_ban, apply_lock, apply_watch, check_expiry};
use super::types::{
    BanRequest, ListReportsQuery, LockRequest, Report, ReportAction, ReportActionRecord,
    ReportContext, ReportId, ResolveReportRequest,
};
use crate::error::CoreError;
use crate::notify::NotifyEvent;
use crate::permissions::Permissions;
use crate::session::{require_account, require_permission, Session};
use crate::state::AppState;
use crate::validation::{check_length, check_reason};

/// File a report against `target`'s current tag.
#[tracing::instrument(skip(state, session, reason))]
pub async fn create_report(
    state: &AppState,
    session: &Session,
    target: PlayerId,
    reason: &str,
) -> Result<Report, CoreError> {
    let now = state.now();
    let reporter = require_account(session)?;
    if reporter == target {
        return Err(CoreError::Validation("self_target"));
    }
    check_length("report_reason_length", reason, 1, state.config.reason_max_length)?;

    // Held across the duplicate check and the insert
    let _guard = state.player_locks.lock(target).await;
    let player = state.load_player(&target).await?;

    if player.has_permission(&state.roles.snapshot(), Permissions::REPORT_IMMUNITY, now) {
        return Err(CoreError::NotAuthorized("report_immune"));
    }
    if player.is_banned(now) {
        return Err(CoreError::Conflict("player_banned"));
    }
    let Some(tag) = player.tag.clone() else {
        return Err(CoreError::Validation("no_tag"));
    };

    let duplicate = state
        .reports
        .find_reports_between(&reporter, &target)
        .await?
        .iter()
        .any(|r| !r.is_resolved() && r.context.tag == tag);
    if duplicate {
        return Err(CoreError::Conflict("duplicate_report"));
    }

    let report = Report {
        id: ReportId::new(),
        reported: target,
        reporter,
        reason: reason.trim().to_string(),
        context: ReportContext {
            tag: tag.clone(),
            position: player.position,
            icon: player.icon.clone(),
        },
        actions: Vec::new(),
        created_at: now,
        updated_at: now,
    };
    state.reports.insert_report(&report).await?;

    info!(report = %report.id, player = %target, reporter = %reporter, "Report created");
    state.notify(NotifyEvent::ReportCreated {
        report: report.id,
        reported: target,
        reporter,
        tag,
    });
    Ok(report)
}

/// Permission needed on top of `MANAGE_REPORTS` for an action.
const fn action_permission(action: &ReportAction) -> Permissions {
    match action {
        ReportAction::Ban { .. } => Permissions::MANAGE_BANS,
        ReportAction::Lock { .. } => Permissions::MANAGE_LOCKS,
        ReportAction::Watch => Permissions::MANAGE_WATCHLIST,
        ReportAction::Dismiss => Permissions::empty(),
    }
}

/// Record an action on a report, applying it to the reported player first.
#[tracing::instrument(skip(state, session, request), fields(action = request.action.name()))]
pub async fn resolve_report(
    state: &AppState,
    session: &Session,
    id: ReportId,
    request: ResolveReportRequest,
) -> Result<Report, CoreError> {
    let now = state.now();
    let roles = state.roles.snapshot();
    let staff = require_permission(session, &roles, Permissions::MANAGE_REPORTS, now)?;
    require_permission(session, &roles, action_permission(&request.action), now)?;
    if let Some(comment) = &request.comment {
        check_reason(comment, state.config.reason_max_length)?;
    }
    if let ReportAction::Ban { expires_at, .. } | ReportAction::Lock { expires_at } = &request.action {
        check_expiry(*expires_at, now)?;
    }

    let target = state
        .reports
        .find_report(id)
        .await?
        .ok_or(CoreError::NotFound("report"))?
        .reported;
    if staff == target {
        return Err(CoreError::Validation("self_target"));
    }

    let _guard = state.player_locks.lock(target).await;
    // Re-read under the lock so concurrent resolutions append in order
    let mut report = state
        .reports
        .find_report(id)
        .await?
        .ok_or(CoreError::NotFound("report"))?;

    let reason = request
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(report.reason.as_str())
        .to_string();

    let transition = match &request.action {
        ReportAction::Dismiss => None,
        action => {
            let mut player = state.load_or_create_player(&target).await?;
            let event = match action {
                ReportAction::Ban {
                    appealable,
                    expires_at,
                } => apply_ban(
                    &mut player,
                    staff,
                    &BanRequest {
                        reason,
                        appealable: *appealable,
                        expires_at: *expires_at,
                    },
                    now,
                )?,
                ReportAction::Lock { expires_at } => apply_lock(
                    &mut player,
                    staff,
                    &LockRequest {
                        reason,
                        expires_at: *expires_at,
                    },
                    now,
                )?,
                _ => apply_watch(&mut player, staff, &reason, now)?,
            };
            state.save_player(&mut player).await?;
            Some(event)
        }
    };

    report.actions.push(ReportActionRecord {
        action: request.action.clone(),
        comment: request.comment.map(|c| c.trim().to_string()),
        staff,
        at: now,
    });
    report.updated_at = now;
    state.reports.save_report(&report).await?;

    info!(report = %id, player = %target, staff = %staff, action = request.action.name(), "Report resolved");
    if let Some(event) = transition {
        state.notify(event);
    }
    state.notify(NotifyEvent::ReportResolved {
        report: id,
        staff,
        action: request.action.name(),
    });
    Ok(report)
}

pub async fn get_report(state: &AppState, session: &Session, id: ReportId) -> Result<Report, CoreError> {
    require_permission(session, &state.roles.snapshot(), Permissions::MANAGE_REPORTS, state.now())?;
    state
        .reports
        .find_report(id)
        .await?
        .ok_or(CoreError::NotFound("report"))
}

/// Reports oldest first, optionally only unresolved ones.
pub async fn list_reports(state: &AppState, session: &Session, query: ListReportsQuery) -> Result<Vec<Report>, CoreError> {
    require_permission(session, &state.roles.snapshot(), Permissions::MANAGE_REPORTS, state.now())?;
    let mut reports = state.reports.list_reports().await?;
    if query.open_only {
        reports.retain(|r| !r.is_resolved());
    }
    Ok(reports)
}
