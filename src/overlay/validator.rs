//! Field validation for translation records.
//!
//! Language codes and attribute keys are checked before anything is written.
//! Attribute keys double as column names on the owner table, so they must be
//! plain SQL identifiers.

use crate::error::{Result, TranslatorError};
use regex::Regex;
use std::sync::OnceLock;

/// Validator for translation record fields.
pub struct FieldValidator;

// Cached patterns
static LANGUAGE_CODE_REGEX: OnceLock<Regex> = OnceLock::new();
static IDENTIFIER_REGEX: OnceLock<Regex> = OnceLock::new();

/// Longest attribute key accepted.
const MAX_KEY_LENGTH: usize = 64;

impl FieldValidator {
    /// Validate a language code such as `en`, `da`, `pt-BR` or `zh_Hant`.
    pub fn validate_language_code(code: &str) -> Result<()> {
        let regex = LANGUAGE_CODE_REGEX.get_or_init(|| {
            Regex::new(r"^[a-z]{2,3}([-_][A-Za-z0-9]{2,8})*$").expect("Invalid language code regex")
        });

        if regex.is_match(code) {
            Ok(())
        } else {
            Err(TranslatorError::InvalidField {
                field: "language_code",
                reason: format!("'{}' is not a language code", code),
            })
        }
    }

    /// Validate an attribute key.
    pub fn validate_attribute_key(key: &str) -> Result<()> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(TranslatorError::InvalidField {
                field: "attribute_key",
                reason: format!("'{}' is longer than {} characters", key, MAX_KEY_LENGTH),
            });
        }
        if !Self::is_identifier(key) {
            return Err(TranslatorError::InvalidField {
                field: "attribute_key",
                reason: format!("'{}' is not an identifier", key),
            });
        }
        Ok(())
    }

    /// Check whether `name` is safe to splice into SQL as a table or column name.
    pub fn is_identifier(name: &str) -> bool {
        let regex = IDENTIFIER_REGEX.get_or_init(|| {
            Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("Invalid identifier regex")
        });
        regex.is_match(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Language Code Tests ====================

    #[test]
    fn test_language_code_two_letters() {
        assert!(FieldValidator::validate_language_code("en").is_ok());
        assert!(FieldValidator::validate_language_code("da").is_ok());
    }

    #[test]
    fn test_language_code_with_region() {
        assert!(FieldValidator::validate_language_code("pt-BR").is_ok());
        assert!(FieldValidator::validate_language_code("zh_Hant").is_ok());
    }

    #[test]
    fn test_language_code_rejects_empty() {
        assert!(FieldValidator::validate_language_code("").is_err());
    }

    #[test]
    fn test_language_code_rejects_uppercase_primary() {
        assert!(FieldValidator::validate_language_code("EN").is_err());
    }

    #[test]
    fn test_language_code_rejects_injection() {
        let err = FieldValidator::validate_language_code("en' OR 1=1 --").unwrap_err();
        assert!(err.to_string().contains("language_code"));
    }

    // ==================== Attribute Key Tests ====================

    #[test]
    fn test_attribute_key_valid() {
        assert!(FieldValidator::validate_attribute_key("name").is_ok());
        assert!(FieldValidator::validate_attribute_key("meta_description2").is_ok());
        assert!(FieldValidator::validate_attribute_key("_internal").is_ok());
    }

    #[test]
    fn test_attribute_key_rejects_leading_digit() {
        assert!(FieldValidator::validate_attribute_key("1name").is_err());
    }

    #[test]
    fn test_attribute_key_rejects_spaces() {
        assert!(FieldValidator::validate_attribute_key("first name").is_err());
    }

    #[test]
    fn test_attribute_key_rejects_too_long() {
        let key = "a".repeat(MAX_KEY_LENGTH + 1);
        let err = FieldValidator::validate_attribute_key(&key).unwrap_err();
        assert!(err.to_string().contains("longer than"));
    }

    #[test]
    fn test_is_identifier() {
        assert!(FieldValidator::is_identifier("translations"));
        assert!(!FieldValidator::is_identifier("translations;"));
        assert!(!FieldValidator::is_identifier(""));
    }
}
