//! The translation overlay engine.
//!
//! Base rows keep the default-language values. Every other language lives in
//! the translation table as one record per (owner, language, attribute).
//!
//! # Architecture
//!
//! - `context`: per-request active language and auto-translate toggle
//! - `ledger`: translation records and the eagerly loaded per-owner ledger
//! - `resolver`: reads (resolve, existence, staleness, value maps)
//! - `writer`: writes (single attribute, batches, create/update + translate)
//! - `lifecycle`: cascading delete/restore and observer registration
//! - `stats`: translation stats columns for owner queries
//! - `metrics`: lookup and write counters
//! - `validator`: record field validation
//!
//! # Example
//!
//! ```rust,ignore
//! let translator = Translator::new(config, registry)?;
//! let ctx = translator.context().with_language("da").auto_translating();
//!
//! let mut product = translator.create_and_translate("product", "en", &data)?;
//! translator.update_and_translate(&mut product, "da", &danish)?;
//! let name = translator.resolve(&product, "name", &ctx)?;
//! ```

pub mod context;
pub mod ledger;
pub mod lifecycle;
pub mod metrics;
pub mod resolver;
pub mod stats;
pub mod validator;
pub mod writer;

pub use context::TranslationContext;
pub use ledger::{TranslationLedger, TranslationRecord};
pub use lifecycle::{LifecycleEvent, LifecycleObserver};
pub use metrics::{MetricsReport, OverlayMetrics};
pub use stats::{SelectQuery, TranslationStats};
pub use validator::FieldValidator;

use crate::config::TranslatorConfig;
use crate::db::Database;
use crate::entity::{Entity, EntityRegistry};
use crate::error::Result;
use tracing::info;

/// Entry point to the overlay: configuration, store, entity registry,
/// metrics and lifecycle observers.
pub struct Translator {
    config: TranslatorConfig,
    db: Database,
    registry: EntityRegistry,
    metrics: OverlayMetrics,
    observers: Vec<Box<dyn LifecycleObserver>>,
}

impl Translator {
    /// Open the configured database and create tables for every registered
    /// entity type.
    pub fn new(config: TranslatorConfig, registry: EntityRegistry) -> Result<Self> {
        config.validate()?;
        let db = Database::open(&config.database_path, &config.table_name)?;
        Self::with_database(config, db, registry)
    }

    /// Build a translator over an already opened database.
    pub fn with_database(
        config: TranslatorConfig,
        db: Database,
        registry: EntityRegistry,
    ) -> Result<Self> {
        config.validate()?;
        for descriptor in registry.list_all() {
            db.ensure_entity_table(descriptor)?;
        }

        info!(
            "Translator ready: default language {}, {} entity types, table {}",
            config.default_language_code,
            registry.list_all().len(),
            db.translation_table_name()
        );

        Ok(Self {
            config,
            db,
            registry,
            metrics: OverlayMetrics::new(),
            observers: Vec::new(),
        })
    }

    /// A fresh per-request context seeded from the configuration.
    pub fn context(&self) -> TranslationContext {
        TranslationContext::new(&self.config)
    }

    /// Get the configuration this translator was built with.
    pub fn config(&self) -> &TranslatorConfig {
        &self.config
    }

    /// Get the underlying store.
    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Get the registered entity types.
    pub fn registry(&self) -> &EntityRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &OverlayMetrics {
        &self.metrics
    }

    /// Check if `language_code` is the configured default language.
    pub fn is_default_language(&self, language_code: &str) -> bool {
        self.config.default_language_code == language_code
    }

    /// Whether delete cascades tombstone translation records.
    pub fn soft_deletes(&self) -> bool {
        self.config.soft_deletes
    }

    /// Load an entity (excluding soft-deleted rows) without its ledger.
    pub fn find(&self, entity_type: &str, id: i64) -> Result<Option<Entity>> {
        let descriptor = self.registry.require(entity_type)?;
        self.db.find_entity(descriptor, id)
    }

    /// Find an entity, including soft-deleted rows.
    pub fn find_with_trashed(&self, entity_type: &str, id: i64) -> Result<Option<Entity>> {
        let descriptor = self.registry.require(entity_type)?;
        self.db.find_entity_with_trashed(descriptor, id)
    }

    /// Load an entity together with its translation ledger.
    pub fn find_with_translations(&self, entity_type: &str, id: i64) -> Result<Option<Entity>> {
        let Some(mut entity) = self.find(entity_type, id)? else {
            return Ok(None);
        };
        self.load_translations(&mut entity)?;
        Ok(Some(entity))
    }
}
