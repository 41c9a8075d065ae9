//! Owning entities and the capabilities the overlay needs from them.
//!
//! The overlay never inspects concrete entity types. Anything that can name
//! itself as an `(owner_type, owner_id)` pair, list its translatable attributes
//! and hand out base values implements [`Translatable`] and can be resolved,
//! translated and cascaded.
//!
//! [`Entity`] is the row type the bundled SQLite store produces for any
//! registered [`EntityDescriptor`].

mod registry;
pub mod value;

pub use registry::{EntityDescriptor, EntityRegistry};
pub use value::AttributeCast;

use crate::overlay::TranslationLedger;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Attribute name → value, in insertion order.
pub type AttributeMap = Map<String, Value>;

/// Polymorphic owner key of a translation record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OwnerRef {
    pub owner_type: String,
    pub owner_id: i64,
}

impl OwnerRef {
    pub fn new(owner_type: impl Into<String>, owner_id: i64) -> Self {
        Self {
            owner_type: owner_type.into(),
            owner_id,
        }
    }
}

impl fmt::Display for OwnerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.owner_type, self.owner_id)
    }
}

/// Capability set an owning entity exposes to the overlay.
pub trait Translatable {
    fn owner(&self) -> OwnerRef;

    /// Attributes that may carry localized overrides.
    fn translatable_attributes(&self) -> &[String];

    fn attribute_cast(&self, _attribute: &str) -> AttributeCast {
        AttributeCast::String
    }

    /// Base (default-language) value; `Null` when the attribute is unknown.
    fn base_value(&self, attribute: &str) -> Value;

    fn base_attributes(&self) -> AttributeMap;

    /// Whether the entity type tombstones rows instead of removing them.
    fn soft_deletable(&self) -> bool {
        false
    }

    /// The eagerly loaded ledger, if any.
    fn translations(&self) -> Option<&TranslationLedger>;

    fn translations_mut(&mut self) -> Option<&mut TranslationLedger>;

    fn set_translations(&mut self, ledger: TranslationLedger);

    fn should_be_translated(&self, attribute: &str) -> bool {
        self.translatable_attributes()
            .iter()
            .any(|candidate| candidate == attribute)
    }
}

/// A row of a registered entity table.
#[derive(Debug, Clone)]
pub struct Entity {
    descriptor: Arc<EntityDescriptor>,
    id: i64,
    attributes: AttributeMap,
    translatable_override: Option<Vec<String>>,
    translations: Option<TranslationLedger>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Entity {
    pub(crate) fn from_row(
        descriptor: Arc<EntityDescriptor>,
        id: i64,
        attributes: AttributeMap,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            descriptor,
            id,
            attributes,
            translatable_override: None,
            translations: None,
            created_at,
            updated_at,
            deleted_at,
        }
    }

    /// Primary key of the row.
    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn descriptor(&self) -> &Arc<EntityDescriptor> {
        &self.descriptor
    }

    /// Whether the row is soft-deleted.
    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Replace the translatable set for this instance only.
    pub fn translatable(mut self, attributes: &[&str]) -> Self {
        self.translatable_override = Some(attributes.iter().map(|a| a.to_string()).collect());
        self
    }

    /// Columns a non-default-language update may write to the base row.
    pub fn updatable_attributes(&self) -> Vec<String> {
        self.descriptor
            .columns()
            .iter()
            .filter(|column| !self.should_be_translated(column))
            .cloned()
            .collect()
    }

    /// Take over freshly read row state while keeping the loaded ledger.
    pub(crate) fn refresh_from(&mut self, fresh: Entity) {
        self.attributes = fresh.attributes;
        self.created_at = fresh.created_at;
        self.updated_at = fresh.updated_at;
        self.deleted_at = fresh.deleted_at;
    }

    pub(crate) fn set_deleted_at(&mut self, deleted_at: Option<DateTime<Utc>>) {
        self.deleted_at = deleted_at;
    }
}

impl Translatable for Entity {
    fn owner(&self) -> OwnerRef {
        OwnerRef::new(self.descriptor.type_tag(), self.id)
    }

    fn translatable_attributes(&self) -> &[String] {
        match &self.translatable_override {
            Some(attributes) => attributes,
            None => self.descriptor.translatable_attributes(),
        }
    }

    fn attribute_cast(&self, attribute: &str) -> AttributeCast {
        self.descriptor.cast(attribute)
    }

    fn base_value(&self, attribute: &str) -> Value {
        self.attributes.get(attribute).cloned().unwrap_or(Value::Null)
    }

    fn base_attributes(&self) -> AttributeMap {
        let mut map = AttributeMap::new();
        map.insert("id".to_string(), Value::from(self.id));
        for (key, value) in &self.attributes {
            map.insert(key.clone(), value.clone());
        }
        map.insert(
            "created_at".to_string(),
            Value::String(self.created_at.to_rfc3339()),
        );
        map.insert(
            "updated_at".to_string(),
            Value::String(self.updated_at.to_rfc3339()),
        );
        if self.descriptor.soft_deletes() {
            map.insert(
                "deleted_at".to_string(),
                self.deleted_at
                    .map(|at| Value::String(at.to_rfc3339()))
                    .unwrap_or(Value::Null),
            );
        }
        map
    }

    fn soft_deletable(&self) -> bool {
        self.descriptor.soft_deletes()
    }

    fn translations(&self) -> Option<&TranslationLedger> {
        self.translations.as_ref()
    }

    fn translations_mut(&mut self) -> Option<&mut TranslationLedger> {
        self.translations.as_mut()
    }

    fn set_translations(&mut self, ledger: TranslationLedger) {
        self.translations = Some(ledger);
    }
}
