//! Player Identifier

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Canonical account identifier of a player.
///
/// Internally and on the wire the identifier uses the hyphen-free form
/// (`0f1e2d3c...`). The hyphenated form is only produced at presentation
/// boundaries through [`PlayerId::hyphenated`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayerId(Uuid);

/// Error returned when an identifier is not a valid account UUID.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid player identifier: {0}")]
pub struct ParsePlayerIdError(String);

impl PlayerId {
    /// Wrap an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Generate a random identifier (tests and fixtures).
    #[must_use]
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }

    /// The underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Hyphenated presentation form.
    #[must_use]
    pub fn hyphenated(&self) -> String {
        self.0.as_hyphenated().to_string()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.as_simple())
    }
}

impl FromStr for PlayerId {
    type Err = ParsePlayerIdError;

    /// Accepts both the hyphenated and the hyphen-free form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ParsePlayerIdError(s.to_string()))
    }
}

impl TryFrom<String> for PlayerId {
    type Error = ParsePlayerIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlayerId> for String {
    fn from(id: PlayerId) -> Self {
        id.to_string()
    }
}
