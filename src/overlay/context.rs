//! Per-request translation state.
//!
//! The active language and the auto-translate toggle belong to one logical
//! unit of work (usually one HTTP request). They are carried as a value and
//! passed to every read, so concurrent requests never see each other's
//! language.

use crate::config::TranslatorConfig;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationContext {
    default_language_code: String,
    active_language_code: Option<String>,
    auto_translate: bool,
}

impl TranslationContext {
    /// Start from the configured defaults.
    pub fn new(config: &TranslatorConfig) -> Self {
        Self {
            default_language_code: config.default_language_code.clone(),
            active_language_code: config.active_language_code.clone(),
            auto_translate: config.auto_translate_attributes,
        }
    }

    pub fn activate_language(&mut self, language_code: impl Into<String>) {
        self.active_language_code = Some(language_code.into());
    }

    /// The active language, or the default language when none was activated.
    pub fn active_language_code(&self) -> &str {
        self.active_language_code
            .as_deref()
            .unwrap_or(&self.default_language_code)
    }

    pub fn default_language_code(&self) -> &str {
        &self.default_language_code
    }

    pub fn is_default_language(&self, language_code: &str) -> bool {
        self.default_language_code == language_code
    }

    pub fn auto_translates(&self) -> bool {
        self.auto_translate
    }

    pub fn enable_auto_translation(&mut self) {
        self.auto_translate = true;
    }

    pub fn disable_auto_translation(&mut self) {
        self.auto_translate = false;
    }

    /// Builder-style variant of [`activate_language`](Self::activate_language).
    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.activate_language(language_code);
        self
    }

    /// Builder-style variant of [`enable_auto_translation`](Self::enable_auto_translation).
    pub fn auto_translating(mut self) -> Self {
        self.enable_auto_translation();
        self
    }
}
