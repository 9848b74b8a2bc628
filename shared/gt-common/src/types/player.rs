//! Player Tag Types

use serde::{Deserialize, Serialize};

/// Where the tag is rendered relative to the player's name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagPosition {
    /// Above the name.
    #[default]
    Above,
    /// Below the name.
    Below,
    /// Right of the name.
    Right,
    /// Left of the name.
    Left,
}

/// Icon shown next to the tag.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IconType {
    /// No icon.
    #[default]
    None,
    /// Icon of the highest-priority role that carries one.
    Role,
    Crown,
    Diamond,
    Heart,
    Star,
    Potion,
    /// Uploaded image, identified by its content hash.
    Custom,
}

impl IconType {
    /// Whether this icon type needs an uploaded image hash.
    #[must_use]
    pub const fn requires_hash(self) -> bool {
        matches!(self, Self::Custom)
    }
}

/// Icon descriptor stored on a player.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PlayerIcon {
    #[serde(rename = "type")]
    pub kind: IconType,
    pub hash: Option<String>,
}

impl PlayerIcon {
    #[must_use]
    pub const fn new(kind: IconType, hash: Option<String>) -> Self {
        Self { kind, hash }
    }

    #[must_use]
    pub const fn is_none(&self) -> bool {
        matches!(self.kind, IconType::None)
    }
}
