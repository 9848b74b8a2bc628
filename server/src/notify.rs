//! Audit and Notification Dispatch
//!
//! Fire-and-forget delivery of moderation events to an external sink
//! (mod-log channel, email, chat platform). A failing sink never fails the
//! operation that produced the event.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gt_common::PlayerId;
use serde::Serialize;
use tracing::{info, warn};

use crate::gift_codes::GiftCodeId;
use crate::moderation::ReportId;
use crate::permissions::Permissions;
use crate::roles::RoleId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotifyEvent {
    PlayerBanned {
        player: PlayerId,
        staff: PlayerId,
        reason: String,
        expires_at: Option<DateTime<Utc>>,
        /// Verified address to inform, if any.
        email: Option<String>,
    },
    PlayerUnbanned {
        player: PlayerId,
        staff: PlayerId,
        email: Option<String>,
    },
    BanAppealed {
        player: PlayerId,
        reason: String,
    },
    PlayerLocked {
        player: PlayerId,
        staff: PlayerId,
        reason: String,
    },
    PlayerUnlocked {
        player: PlayerId,
        staff: PlayerId,
    },
    WatchStarted {
        player: PlayerId,
        staff: PlayerId,
        reason: String,
    },
    WatchEnded {
        player: PlayerId,
        staff: PlayerId,
    },
    /// A watched player changed their tag.
    WatchedTagChange {
        player: PlayerId,
        old: Option<String>,
        new: Option<String>,
    },
    NoteCreated {
        player: PlayerId,
        staff: PlayerId,
        content: String,
    },
    NoteDeleted {
        player: PlayerId,
        staff: PlayerId,
    },
    TagCleared {
        player: PlayerId,
        staff: PlayerId,
        removed: String,
        reason: String,
    },
    IconCleared {
        player: PlayerId,
        staff: PlayerId,
        reason: String,
    },
    ReportCreated {
        report: ReportId,
        reported: PlayerId,
        reporter: PlayerId,
        tag: String,
    },
    ReportResolved {
        report: ReportId,
        staff: PlayerId,
        action: &'static str,
    },
    RoleGranted {
        player: PlayerId,
        staff: Option<PlayerId>,
        role: RoleId,
        expires_at: Option<DateTime<Utc>>,
    },
    RoleRevoked {
        player: PlayerId,
        staff: Option<PlayerId>,
        role: RoleId,
    },
    RoleCreated {
        role: RoleId,
        staff: PlayerId,
        name: String,
        permissions: Permissions,
    },
    RoleUpdated {
        role: RoleId,
        staff: PlayerId,
    },
    RoleDeleted {
        role: RoleId,
        staff: PlayerId,
        name: String,
    },
    GiftCodeCreated {
        code: GiftCodeId,
        staff: PlayerId,
        role: RoleId,
    },
    GiftCodeRedeemed {
        code: GiftCodeId,
        player: PlayerId,
        role: RoleId,
    },
}

impl NotifyEvent {
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::PlayerBanned { .. } => "player_banned",
            Self::PlayerUnbanned { .. } => "player_unbanned",
            Self::BanAppealed { .. } => "ban_appealed",
            Self::PlayerLocked { .. } => "player_locked",
            Self::PlayerUnlocked { .. } => "player_unlocked",
            Self::WatchStarted { .. } => "watch_started",
            Self::WatchEnded { .. } => "watch_ended",
            Self::WatchedTagChange { .. } => "watched_tag_change",
            Self::NoteCreated { .. } => "note_created",
            Self::NoteDeleted { .. } => "note_deleted",
            Self::TagCleared { .. } => "tag_cleared",
            Self::IconCleared { .. } => "icon_cleared",
            Self::ReportCreated { .. } => "report_created",
            Self::ReportResolved { .. } => "report_resolved",
            Self::RoleGranted { .. } => "role_granted",
            Self::RoleRevoked { .. } => "role_revoked",
            Self::RoleCreated { .. } => "role_created",
            Self::RoleUpdated { .. } => "role_updated",
            Self::RoleDeleted { .. } => "role_deleted",
            Self::GiftCodeCreated { .. } => "gift_code_created",
            Self::GiftCodeRedeemed { .. } => "gift_code_redeemed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Notification sink unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to encode event: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &NotifyEvent) -> Result<(), NotifyError>;
}

/// Writes every event to the log as structured JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, event: &NotifyEvent) -> Result<(), NotifyError> {
        let payload = serde_json::to_string(event)?;
        info!(target: "gt_server::audit", kind = event.kind(), payload = %payload, "Audit event");
        Ok(())
    }
}

/// Send `event` without waiting for the sink.
///
/// Failures are logged and dropped.
pub fn dispatch(notifier: &Arc<dyn Notifier>, event: NotifyEvent) {
    let notifier = Arc::clone(notifier);
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&event).await {
            warn!(kind = event.kind(), error = %e, "Failed to deliver notification");
        }
    });
}
