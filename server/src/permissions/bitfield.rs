//! Player permissions using bitflags.
//!
//! Permissions are organized into categories:
//! - Global (bits 0-3): Administrator and personal capabilities
//! - Moderation (bits 4-10): Guarded transitions on player records
//! - Management (bits 11-14): Roles, gift codes, connections and history

use bitflags::bitflags;

bitflags! {
    /// Permissions carried by a role, represented as a 64-bit bitfield.
    ///
    /// Stored as a plain unsigned integer; bit positions are part of the
    /// persisted format and must never be reordered.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
    #[serde(transparent)]
    pub struct Permissions: u64 {
        // === Global (bits 0-3) ===
        /// Implies every other permission
        const ADMINISTRATOR      = 1 << 0;
        /// Skip tag length bounds when setting a tag
        const BYPASS_VALIDATION  = 1 << 1;
        /// Use uploaded custom icons
        const CUSTOM_ICONS       = 1 << 2;
        /// Cannot be reported by other players
        const REPORT_IMMUNITY    = 1 << 3;

        // === Moderation (bits 4-10) ===
        /// Clear another player's tag or icon
        const MANAGE_TAGS        = 1 << 4;
        /// Ban and unban players
        const MANAGE_BANS        = 1 << 5;
        /// Lock and unlock player accounts
        const MANAGE_LOCKS       = 1 << 6;
        /// Add and remove players from the watchlist
        const MANAGE_WATCHLIST   = 1 << 7;
        /// Create notes on players
        const CREATE_NOTES       = 1 << 8;
        /// Delete notes from players
        const DELETE_NOTES       = 1 << 9;
        /// Review and resolve reports
        const MANAGE_REPORTS     = 1 << 10;

        // === Management (bits 11-14) ===
        /// Create, edit, delete, grant and revoke roles
        const MANAGE_ROLES       = 1 << 11;
        /// Create, list and delete gift codes
        const MANAGE_GIFT_CODES  = 1 << 12;
        /// Unlink external connections of other players
        const MANAGE_CONNECTIONS = 1 << 13;
        /// View full moderation and grant history
        const VIEW_HISTORY       = 1 << 14;
    }
}

/// Test `permission` against `bitfield`.
///
/// True when every bit of `permission` is set, or, unless
/// `ignore_administrator` is set, when the bitfield carries the
/// administrator bit. The administrator test recurses with
/// `ignore_administrator = true`, so it terminates after one level.
#[must_use]
pub const fn has_permission(
    bitfield: Permissions,
    permission: Permissions,
    ignore_administrator: bool,
) -> bool {
    if bitfield.bits() & permission.bits() == permission.bits() {
        return true;
    }
    !ignore_administrator && has_permission(bitfield, Permissions::ADMINISTRATOR, true)
}

/// Every catalog permission granted by `bitfield`.
#[must_use]
pub fn list_permissions(bitfield: Permissions) -> Vec<Permissions> {
    Permissions::all()
        .iter()
        .filter(|p| has_permission(bitfield, *p, false))
        .collect()
}

impl Permissions {
    /// Check if this bitfield grants `permission`, administrator included.
    #[must_use]
    pub const fn has(self, permission: Self) -> bool {
        has_permission(self, permission, false)
    }

    /// Check the bits only, without the administrator short-circuit.
    #[must_use]
    pub const fn has_exact(self, permission: Self) -> bool {
        has_permission(self, permission, true)
    }

    /// Parse a raw stored or user-supplied value.
    ///
    /// Unlike [`Permissions::from_bits_truncate`], unknown bits are rejected
    /// so a malformed bitfield never silently loses information.
    pub fn from_raw(value: u64) -> Result<Self, UnknownPermissionBits> {
        Self::from_bits(value).ok_or(UnknownPermissionBits(value & !Self::all().bits()))
    }

    /// Bits this actor could not hand out: anything outside its own
    /// effective permissions. Administrators can hand out everything.
    #[must_use]
    pub const fn escalation_over(self, actor: Self) -> Self {
        if actor.has(Self::ADMINISTRATOR) {
            return Self::empty();
        }
        self.difference(actor)
    }

    /// Name used in audit payloads and localisation keys.
    ///
    /// Only single catalog flags have a name.
    #[must_use]
    pub fn action_name(self) -> Option<&'static str> {
        ACTION_NAMES
            .iter()
            .find(|(perm, _)| *perm == self)
            .map(|(_, name)| *name)
    }
}

const ACTION_NAMES: &[(Permissions, &str)] = &[
    (Permissions::ADMINISTRATOR, "administrator"),
    (Permissions::BYPASS_VALIDATION, "bypass_validation"),
    (Permissions::CUSTOM_ICONS, "custom_icons"),
    (Permissions::REPORT_IMMUNITY, "report_immunity"),
    (Permissions::MANAGE_TAGS, "manage_tags"),
    (Permissions::MANAGE_BANS, "manage_bans"),
    (Permissions::MANAGE_LOCKS, "manage_locks"),
    (Permissions::MANAGE_WATCHLIST, "manage_watchlist"),
    (Permissions::CREATE_NOTES, "create_notes"),
    (Permissions::DELETE_NOTES, "delete_notes"),
    (Permissions::MANAGE_REPORTS, "manage_reports"),
    (Permissions::MANAGE_ROLES, "manage_roles"),
    (Permissions::MANAGE_GIFT_CODES, "manage_gift_codes"),
    (Permissions::MANAGE_CONNECTIONS, "manage_connections"),
    (Permissions::VIEW_HISTORY, "view_history"),
];

impl Default for Permissions {
    fn default() -> Self {
        Self::empty()
    }
}

/// A raw bitfield carried bits outside the permission catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission bits: {0:#x}")]
pub struct UnknownPermissionBits(pub u64);
