//! Per-field localization overlay for persisted entities.
//!
//! Entities keep their default-language values in their own rows. Overrides
//! for other languages live in a shared translation table keyed by
//! (owner type, owner id, language code, attribute key).
//!
//! ```rust,ignore
//! use entity_translator::{server, EntityRegistry, Translator, TranslatorConfig};
//!
//! let registry = EntityRegistry::new().with(server::product_descriptor())?;
//! let translator = Translator::new(TranslatorConfig::from_env()?, registry)?;
//! ```

pub mod config;
pub mod db;
pub mod entity;
pub mod error;
pub mod middleware;
pub mod overlay;
pub mod server;

pub use config::TranslatorConfig;
pub use entity::{AttributeCast, AttributeMap, Entity, EntityDescriptor, EntityRegistry, OwnerRef, Translatable};
pub use error::{Result, TranslatorError};
pub use overlay::{TranslationContext, TranslationLedger, TranslationRecord, Translator};
