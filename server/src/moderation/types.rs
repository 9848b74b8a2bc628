//! Moderation Types

use std::fmt;

use chrono::{DateTime, Utc};
use gt_common::{PlayerIcon, PlayerId, TagPosition};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Reports
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReportId(pub Uuid);

impl ReportId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ReportId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The reported player's tag as it was when the report was filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportContext {
    pub tag: String,
    pub position: TagPosition,
    pub icon: PlayerIcon,
}

/// Action a reviewer takes on a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportAction {
    Ban {
        appealable: bool,
        expires_at: Option<DateTime<Utc>>,
    },
    Watch,
    Lock {
        expires_at: Option<DateTime<Utc>>,
    },
    Dismiss,
}

impl ReportAction {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ban { .. } => "ban",
            Self::Watch => "watch",
            Self::Lock { .. } => "lock",
            Self::Dismiss => "dismiss",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportActionRecord {
    pub action: ReportAction,
    pub comment: Option<String>,
    pub staff: PlayerId,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    pub id: ReportId,
    pub reported: PlayerId,
    pub reporter: PlayerId,
    pub reason: String,
    pub context: ReportContext,
    #[serde(default)]
    pub actions: Vec<ReportActionRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Report {
    /// A report is resolved once any action was recorded.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        !self.actions.is_empty()
    }
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct BanRequest {
    pub reason: String,
    #[serde(default = "default_appealable")]
    pub appealable: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

const fn default_appealable() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LockRequest {
    pub reason: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResolveReportRequest {
    pub action: ReportAction,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListReportsQuery {
    #[serde(default)]
    pub open_only: bool,
}
