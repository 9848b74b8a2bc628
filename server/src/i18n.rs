//! Localisation seam.
//!
//! The core raises errors by key; a front-end turns keys into text.

use crate::error::CoreError;

pub trait Translator: Send + Sync {
    fn translate(&self, key: &str, language: &str) -> String;
}

/// Returns keys unchanged. Used when no string tables are loaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyTranslator;

impl Translator for KeyTranslator {
    fn translate(&self, key: &str, _language: &str) -> String {
        key.to_string()
    }
}

impl CoreError {
    /// Render this error through `translator`.
    pub fn localize(&self, translator: &dyn Translator, language: &str) -> String {
        translator.translate(&self.key(), language)
    }
}
