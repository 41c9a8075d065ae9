use crate::error::TranslatorError;
use crate::overlay::validator::FieldValidator;
use anyhow::{Context, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorConfig {
    // Languages
    pub default_language_code: String,
    pub active_language_code: Option<String>,

    // Behaviour
    pub auto_translate_attributes: bool,
    pub soft_deletes: bool,

    // HTTP
    pub language_parameter: String,

    // Storage
    pub table_name: String,
    pub database_path: String,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            default_language_code: "en".to_string(),
            active_language_code: None,
            auto_translate_attributes: false,
            soft_deletes: false,
            language_parameter: "lang".to_string(),
            table_name: "translations".to_string(),
            database_path: "translator.db".to_string(),
        }
    }
}

impl TranslatorConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let config = Self {
            // Languages
            default_language_code: std::env::var("TRANSLATOR_DEFAULT_LANGUAGE_CODE")
                .unwrap_or(defaults.default_language_code),
            active_language_code: std::env::var("TRANSLATOR_ACTIVE_LANGUAGE_CODE")
                .ok()
                .filter(|code| !code.trim().is_empty()),

            // Behaviour
            auto_translate_attributes: parse_flag("TRANSLATOR_AUTO_TRANSLATE_ATTRIBUTES")?,
            soft_deletes: parse_flag("TRANSLATOR_SOFT_DELETES")?,

            // HTTP
            language_parameter: std::env::var("TRANSLATOR_LANGUAGE_PARAMETER")
                .unwrap_or(defaults.language_parameter),

            // Storage
            table_name: std::env::var("TRANSLATOR_TABLE_NAME").unwrap_or(defaults.table_name),
            database_path: std::env::var("TRANSLATOR_DATABASE_PATH")
                .unwrap_or(defaults.database_path),
        };

        config.validate().context("Invalid translator configuration")?;
        Ok(config)
    }

    /// Reject values the overlay cannot work with before any query runs.
    pub fn validate(&self) -> std::result::Result<(), TranslatorError> {
        let invalid = |reason: String| Err(TranslatorError::InvalidConfiguration(reason));

        if FieldValidator::validate_language_code(&self.default_language_code).is_err() {
            return invalid(format!(
                "default_language_code `{}` is not a language code",
                self.default_language_code
            ));
        }
        if let Some(active) = &self.active_language_code {
            if FieldValidator::validate_language_code(active).is_err() {
                return invalid(format!("active_language_code `{}` is not a language code", active));
            }
        }
        if !FieldValidator::is_identifier(&self.table_name) {
            return invalid(format!("table_name `{}` is not a valid identifier", self.table_name));
        }
        if self.language_parameter.trim().is_empty() {
            return invalid("language_parameter must not be empty".to_string());
        }
        Ok(())
    }
}

fn parse_flag(name: &str) -> Result<bool> {
    match std::env::var(name) {
        Ok(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" | "" => Ok(false),
            other => anyhow::bail!("{} must be a boolean, got '{}'", name, other),
        },
        Err(_) => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 7] = [
        "TRANSLATOR_DEFAULT_LANGUAGE_CODE",
        "TRANSLATOR_ACTIVE_LANGUAGE_CODE",
        "TRANSLATOR_AUTO_TRANSLATE_ATTRIBUTES",
        "TRANSLATOR_SOFT_DELETES",
        "TRANSLATOR_LANGUAGE_PARAMETER",
        "TRANSLATOR_TABLE_NAME",
        "TRANSLATOR_DATABASE_PATH",
    ];

    fn clear_env() {
        for var in VARS {
            std::env::remove_var(var);
        }
    }

    #[test]
    fn test_default_values() {
        let config = TranslatorConfig::default();
        assert_eq!(config.default_language_code, "en");
        assert_eq!(config.active_language_code, None);
        assert!(!config.auto_translate_attributes);
        assert!(!config.soft_deletes);
        assert_eq!(config.language_parameter, "lang");
        assert_eq!(config.table_name, "translations");
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = TranslatorConfig::from_env().expect("Should load defaults");
        assert_eq!(config, TranslatorConfig::default());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("TRANSLATOR_DEFAULT_LANGUAGE_CODE", "da");
        std::env::set_var("TRANSLATOR_ACTIVE_LANGUAGE_CODE", "de");
        std::env::set_var("TRANSLATOR_AUTO_TRANSLATE_ATTRIBUTES", "true");
        std::env::set_var("TRANSLATOR_SOFT_DELETES", "1");
        std::env::set_var("TRANSLATOR_TABLE_NAME", "labels");

        let config = TranslatorConfig::from_env().expect("Should load overrides");
        clear_env();

        assert_eq!(config.default_language_code, "da");
        assert_eq!(config.active_language_code.as_deref(), Some("de"));
        assert!(config.auto_translate_attributes);
        assert!(config.soft_deletes);
        assert_eq!(config.table_name, "labels");
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_flag() {
        clear_env();
        std::env::set_var("TRANSLATOR_SOFT_DELETES", "sometimes");
        let result = TranslatorConfig::from_env();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_rejects_bad_table_name() {
        clear_env();
        std::env::set_var("TRANSLATOR_TABLE_NAME", "translations; DROP TABLE x");
        let result = TranslatorConfig::from_env();
        clear_env();
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_bad_default_language() {
        let config = TranslatorConfig {
            default_language_code: "English".to_string(),
            ..TranslatorConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(err, TranslatorError::InvalidConfiguration(_)));
    }
}
