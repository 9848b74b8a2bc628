//! Notes, clears, API keys and external connections.

use chrono::{DateTime, Utc};
use gt_common::{PlayerIcon, PlayerId};
use uuid::Uuid;

use super::models::{
    ApiKey, Clear, ClearedContent, DiscordConnection, EmailConnection, Note, Player,
};
use crate::util::{random_code, sha256_hex};

/// Prefix of every plaintext API key.
pub const API_KEY_PREFIX: &str = "gt_";

const API_KEY_RANDOM_LENGTH: usize = 40;
const EMAIL_CODE_LENGTH: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ClearError {
    #[error("Nothing to clear")]
    NothingToClear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ApiKeyError {
    #[error("Maximum of {0} API keys reached")]
    LimitReached(usize),

    #[error("An API key with this name already exists")]
    DuplicateName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ConnectionError {
    #[error("A {0} account is already linked")]
    AlreadyLinked(&'static str),

    #[error("No {0} account is linked")]
    NotLinked(&'static str),

    #[error("Email is already verified")]
    AlreadyVerified,

    #[error("Verification code does not match")]
    InvalidCode,
}

impl Player {
    // === Notes ===

    pub fn add_note(&mut self, content: impl Into<String>, author: PlayerId, now: DateTime<Utc>) -> &Note {
        self.notes.push(Note {
            id: Uuid::new_v4(),
            content: content.into(),
            author,
            created_at: now,
        });
        &self.notes[self.notes.len() - 1]
    }

    pub fn remove_note(&mut self, id: Uuid) -> Option<Note> {
        let index = self.notes.iter().position(|n| n.id == id)?;
        Some(self.notes.remove(index))
    }

    // === Clears ===

    /// Remove the tag, recording the removed text in the clear ledger.
    pub fn clear_tag(
        &mut self,
        reason: impl Into<String>,
        staff: PlayerId,
        now: DateTime<Utc>,
    ) -> Result<String, ClearError> {
        let removed = self.tag.take().ok_or(ClearError::NothingToClear)?;
        self.clears.push(Clear {
            id: Uuid::new_v4(),
            removed: ClearedContent::Tag(removed.clone()),
            reason: reason.into(),
            staff,
            cleared_at: now,
        });
        Ok(removed)
    }

    /// Reset the icon, recording the removed descriptor in the clear ledger.
    pub fn clear_icon(
        &mut self,
        reason: impl Into<String>,
        staff: PlayerId,
        now: DateTime<Utc>,
    ) -> Result<PlayerIcon, ClearError> {
        if self.icon.is_none() {
            return Err(ClearError::NothingToClear);
        }
        let removed = std::mem::take(&mut self.icon);
        self.clears.push(Clear {
            id: Uuid::new_v4(),
            removed: ClearedContent::Icon(removed.clone()),
            reason: reason.into(),
            staff,
            cleared_at: now,
        });
        Ok(removed)
    }

    // === API Keys ===

    /// Create a key and return it with its plaintext. Only the digest is kept.
    pub fn add_api_key(
        &mut self,
        name: impl Into<String>,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<(ApiKey, String), ApiKeyError> {
        let name = name.into();
        if self.api_keys.len() >= limit {
            return Err(ApiKeyError::LimitReached(limit));
        }
        if self.api_keys.iter().any(|k| k.name == name) {
            return Err(ApiKeyError::DuplicateName);
        }

        let plaintext = format!("{API_KEY_PREFIX}{}", random_code(API_KEY_RANDOM_LENGTH));
        let key = ApiKey {
            id: Uuid::new_v4(),
            name,
            digest: sha256_hex(&plaintext),
            created_at: now,
        };
        self.api_keys.push(key.clone());
        Ok((key, plaintext))
    }

    pub fn remove_api_key(&mut self, id: Uuid) -> Option<ApiKey> {
        let index = self.api_keys.iter().position(|k| k.id == id)?;
        Some(self.api_keys.remove(index))
    }

    // === Connections ===

    pub fn link_discord(&mut self, id: impl Into<String>, now: DateTime<Utc>) -> Result<(), ConnectionError> {
        if self.connections.discord.is_some() {
            return Err(ConnectionError::AlreadyLinked("discord"));
        }
        self.connections.discord = Some(DiscordConnection {
            id: id.into(),
            linked_at: now,
        });
        Ok(())
    }

    pub fn unlink_discord(&mut self) -> Result<DiscordConnection, ConnectionError> {
        self.connections
            .discord
            .take()
            .ok_or(ConnectionError::NotLinked("discord"))
    }

    /// Attach an unverified address. Returns the plaintext verification code.
    pub fn link_email(&mut self, address: impl Into<String>, now: DateTime<Utc>) -> Result<String, ConnectionError> {
        if self.connections.email.is_some() {
            return Err(ConnectionError::AlreadyLinked("email"));
        }
        let code = random_code(EMAIL_CODE_LENGTH);
        self.connections.email = Some(EmailConnection {
            address: address.into(),
            verified: false,
            code_digest: Some(sha256_hex(&code)),
            linked_at: now,
        });
        Ok(code)
    }

    pub fn verify_email(&mut self, code: &str) -> Result<(), ConnectionError> {
        let email = self
            .connections
            .email
            .as_mut()
            .ok_or(ConnectionError::NotLinked("email"))?;
        if email.verified {
            return Err(ConnectionError::AlreadyVerified);
        }
        if email.code_digest.as_deref() != Some(sha256_hex(code.trim()).as_str()) {
            return Err(ConnectionError::InvalidCode);
        }
        email.verified = true;
        email.code_digest = None;
        Ok(())
    }

    pub fn unlink_email(&mut self) -> Result<EmailConnection, ConnectionError> {
        self.connections
            .email
            .take()
            .ok_or(ConnectionError::NotLinked("email"))
    }
}
