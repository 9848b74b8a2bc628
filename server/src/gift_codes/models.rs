//! Gift code model.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use gt_common::PlayerId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::roles::RoleId;

/// Visible prefix length when a code is listed.
const MASK_VISIBLE: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GiftCodeId(pub Uuid);

impl GiftCodeId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GiftCodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GiftCodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role granted on redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftGrant {
    pub role: RoleId,
    /// Grant duration in milliseconds; `None` grants indefinitely.
    pub duration_ms: Option<i64>,
}

impl GiftGrant {
    #[must_use]
    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::milliseconds)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftCode {
    pub id: GiftCodeId,
    pub name: String,
    /// Redemption code, unique across all gift codes.
    pub code: String,
    /// Players who redeemed, in order.
    #[serde(default)]
    pub uses: Vec<PlayerId>,
    pub max_uses: u32,
    pub grant: GiftGrant,
    pub created_by: PlayerId,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl GiftCode {
    /// Redeemable: uses remain and not expired.
    #[must_use]
    pub fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.uses.len() < self.max_uses as usize && self.expires_at.is_none_or(|at| at > now)
    }

    #[must_use]
    pub fn was_redeemed_by(&self, player: &PlayerId) -> bool {
        self.uses.contains(player)
    }

    /// Listing form of the code.
    #[must_use]
    pub fn masked_code(&self) -> String {
        let visible: String = self.code.chars().take(MASK_VISIBLE).collect();
        let hidden = self.code.chars().count().saturating_sub(MASK_VISIBLE);
        format!("{visible}{}", "*".repeat(hidden))
    }
}

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGiftCodeRequest {
    pub name: String,
    /// Generated when absent.
    pub code: Option<String>,
    pub max_uses: u32,
    pub role: RoleId,
    pub duration_ms: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

/// A gift code with its redemption code masked.
#[derive(Debug, Clone, Serialize)]
pub struct GiftCodeSummary {
    pub id: GiftCodeId,
    pub name: String,
    pub code: String,
    pub uses: usize,
    pub max_uses: u32,
    pub grant: GiftGrant,
    pub created_by: PlayerId,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl From<&GiftCode> for GiftCodeSummary {
    fn from(code: &GiftCode) -> Self {
        Self {
            id: code.id,
            name: code.name.clone(),
            code: code.masked_code(),
            uses: code.uses.len(),
            max_uses: code.max_uses,
            grant: code.grant.clone(),
            created_by: code.created_by,
            created_at: code.created_at,
            expires_at: code.expires_at,
        }
    }
}

/// Outcome of a successful redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Redemption {
    pub role: RoleId,
    pub expires_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(max_uses: u32, expires_at: Option<DateTime<Utc>>) -> GiftCode {
        GiftCode {
            id: GiftCodeId::new(),
            name: "welcome".to_string(),
            code: "WELCOME10".to_string(),
            uses: Vec::new(),
            max_uses,
            grant: GiftGrant {
                role: RoleId::new(),
                duration_ms: None,
            },
            created_by: PlayerId::new_random(),
            created_at: Utc::now(),
            expires_at,
        }
    }

    #[test]
    fn test_exhausted_code_is_invalid() {
        let now = Utc::now();
        let mut gift = code(1, None);
        assert!(gift.is_valid(now));
        gift.uses.push(PlayerId::new_random());
        assert!(!gift.is_valid(now));
    }

    #[test]
    fn test_expired_code_is_invalid() {
        let now = Utc::now();
        let gift = code(10, Some(now));
        assert!(!gift.is_valid(now));
        assert!(gift.is_valid(now - Duration::seconds(1)));
    }

    #[test]
    fn test_zero_use_code_is_never_valid() {
        assert!(!code(0, None).is_valid(Utc::now()));
    }

    #[test]
    fn test_masked_code() {
        assert_eq!(code(1, None).masked_code(), "WELC*****");
    }

    #[test]
    fn test_duration_from_millis() {
        let grant = GiftGrant {
            role: RoleId::new(),
            duration_ms: Some(3_600_000),
        };
        assert_eq!(grant.duration(), Some(Duration::hours(1)));
    }
}
