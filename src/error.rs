//! Error types for the translation overlay.
//!
//! Missing translations are never errors: lookups fall back to the base value,
//! existence checks return `false` and stats report zero. Only configuration
//! problems, invalid record fields and store failures surface here.

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, TranslatorError>;

#[derive(Debug, Error)]
pub enum TranslatorError {
    /// The configured translation table (or another config value) does not
    /// satisfy the contract the overlay needs.
    #[error("invalid translator configuration: {0}")]
    InvalidConfiguration(String),

    /// No entity type is registered under the given tag.
    #[error("unknown entity type `{0}`")]
    UnknownEntityType(String),

    /// A translation record field failed validation before being written.
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    /// An object or array was written to an attribute that is not cast as JSON.
    #[error("attribute `{0}` is not cast as json and cannot hold a structured value")]
    UncastStructuredValue(String),

    /// Store failures propagate unchanged.
    #[error(transparent)]
    Store(#[from] rusqlite::Error),

    #[error("value encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl TranslatorError {
    pub(crate) fn model_is_not_valid(table: &str, missing: &[&str]) -> Self {
        Self::InvalidConfiguration(format!(
            "the translation table `{}` does not satisfy the translation contract (missing columns: {})",
            table,
            missing.join(", ")
        ))
    }
}
