//! Tag content rules and owner-facing request types.

use std::sync::LazyLock;

use gt_common::{IconType, PlayerIcon};
use serde::Deserialize;
use validator::Validate;

use crate::error::CoreError;
use crate::util::is_hex_digest;

/// Length of a custom icon content hash (hex SHA-256).
pub const ICON_HASH_LENGTH: usize = 64;

/// Legacy `&x` codes, `&#rrggbb` and `<#rrggbb>` colour codes.
static COLOR_CODE: LazyLock<regex::Regex> = LazyLock::new(|| {
    regex::Regex::new(r"(?i)&#[0-9a-f]{6}|<#[0-9a-f]{6}>|&[0-9a-fk-or]").expect("valid regex")
});

/// Tag text with colour codes removed.
#[must_use]
pub fn strip_color_codes(tag: &str) -> String {
    COLOR_CODE.replace_all(tag, "").into_owned()
}

/// Visible characters of a tag.
#[must_use]
pub fn visible_length(tag: &str) -> usize {
    strip_color_codes(tag).chars().count()
}

/// Normalise a tag and check it against the configured bounds.
///
/// With `bypass` only emptiness is rejected.
pub fn validate_tag(tag: &str, min: usize, max: usize, bypass: bool) -> Result<String, CoreError> {
    let tag = tag.trim();
    if tag.chars().any(char::is_control) {
        return Err(CoreError::Validation("tag_control_chars"));
    }
    let visible = visible_length(tag);
    if visible == 0 {
        return Err(CoreError::Validation("tag_empty"));
    }
    if !bypass && (visible < min || visible > max) {
        return Err(CoreError::Validation("tag_length"));
    }
    Ok(tag.to_string())
}

/// Check an icon descriptor's shape. Hashes are only kept for custom icons.
pub fn normalize_icon(icon: PlayerIcon) -> Result<PlayerIcon, CoreError> {
    if !icon.kind.requires_hash() {
        return Ok(PlayerIcon::new(icon.kind, None));
    }
    match icon.hash {
        Some(hash) if is_hex_digest(&hash, ICON_HASH_LENGTH) => {
            Ok(PlayerIcon::new(IconType::Custom, Some(hash.to_ascii_lowercase())))
        }
        _ => Err(CoreError::Validation("icon_hash")),
    }
}

// ============================================================================
// Request Types
// ============================================================================

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateApiKeyRequest {
    #[validate(length(min = 1, max = 32, message = "Name must be 1-32 characters"))]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LinkEmailRequest {
    #[validate(email(message = "Invalid email address"))]
    pub address: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LinkDiscordRequest {
    /// Discord snowflake.
    #[validate(length(min = 15, max = 20), custom(function = "validate_snowflake"))]
    pub id: String,
}

fn validate_snowflake(id: &str) -> Result<(), validator::ValidationError> {
    if id.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(validator::ValidationError::new("snowflake"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_codes_do_not_count() {
        assert_eq!(visible_length("&cHello"), 5);
        assert_eq!(visible_length("&#ff0000Hi<#00ff00>!"), 3);
        assert_eq!(strip_color_codes("&lBold&r"), "Bold");
    }

    #[test]
    fn test_tag_bounds() {
        assert_eq!(validate_tag("  Hello ", 2, 32, false).unwrap(), "Hello");
        assert!(validate_tag("H", 2, 32, false).is_err());
        assert!(validate_tag(&"x".repeat(33), 2, 32, false).is_err());
        // Colour codes push the raw length over the limit but not the visible one
        assert!(validate_tag(&format!("&a{}", "x".repeat(32)), 2, 32, false).is_ok());
    }

    #[test]
    fn test_bypass_skips_length_only() {
        assert!(validate_tag("H", 2, 32, true).is_ok());
        assert!(validate_tag(&"x".repeat(100), 2, 32, true).is_ok());
        assert!(validate_tag("&c", 2, 32, true).is_err());
        assert!(validate_tag("a\u{7}b", 2, 32, true).is_err());
    }

    #[test]
    fn test_normalize_icon() {
        let crown = normalize_icon(PlayerIcon::new(IconType::Crown, Some("junk".into()))).unwrap();
        assert_eq!(crown.hash, None);

        let hash = "AB".repeat(32);
        let custom = normalize_icon(PlayerIcon::new(IconType::Custom, Some(hash))).unwrap();
        assert_eq!(custom.hash.unwrap(), "ab".repeat(32));

        assert!(normalize_icon(PlayerIcon::new(IconType::Custom, None)).is_err());
        assert!(normalize_icon(PlayerIcon::new(IconType::Custom, Some("abc".into()))).is_err());
    }

    #[test]
    fn test_discord_snowflake_validation() {
        let ok = LinkDiscordRequest { id: "123456789012345678".into() };
        assert!(ok.validate().is_ok());
        let bad = LinkDiscordRequest { id: "12345678901234567x".into() };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_email_validation() {
        assert!(LinkEmailRequest { address: "p@example.com".into() }.validate().is_ok());
        assert!(LinkEmailRequest { address: "nope".into() }.validate().is_err());
    }
}
