//! Entity registry: maps an owner type tag to what the overlay knows about it.
//!
//! Translation records only store the type tag of their owner. The registry
//! turns that tag back into the table, columns, casts, translatable set and
//! soft-delete capability of the entity type.

use crate::entity::AttributeCast;
use crate::error::{Result, TranslatorError};
use crate::overlay::validator::FieldValidator;
use std::collections::HashMap;
use std::sync::Arc;

/// Columns every entity table carries and descriptors may not redeclare.
const RESERVED_COLUMNS: [&str; 4] = ["id", "created_at", "updated_at", "deleted_at"];

/// Static description of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    /// Tag stored in `owner_type` (e.g. "product")
    type_tag: String,

    /// Owner table name (e.g. "products")
    table: String,

    /// Fillable columns, in declaration order
    columns: Vec<String>,

    /// Per-column casts; missing entries are plain strings
    casts: HashMap<String, AttributeCast>,

    /// Attributes that accept localized overrides
    translatable: Vec<String>,

    /// Whether rows are tombstoned instead of removed
    soft_deletes: bool,
}

impl EntityDescriptor {
    /// Start a descriptor for `type_tag` stored in `table`.
    pub fn new(type_tag: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            type_tag: type_tag.into(),
            table: table.into(),
            columns: Vec::new(),
            casts: HashMap::new(),
            translatable: Vec::new(),
            soft_deletes: false,
        }
    }

    /// Declare a column and its cast.
    pub fn column(mut self, name: impl Into<String>, cast: AttributeCast) -> Self {
        let name = name.into();
        if !self.columns.contains(&name) {
            self.columns.push(name.clone());
        }
        self.casts.insert(name, cast);
        self
    }

    /// Mark attributes as translatable.
    pub fn translatable(mut self, attributes: &[&str]) -> Self {
        self.translatable = attributes.iter().map(|a| a.to_string()).collect();
        self
    }

    /// Tombstone rows on delete instead of removing them.
    pub fn soft_deletable(mut self) -> Self {
        self.soft_deletes = true;
        self
    }

    pub fn type_tag(&self) -> &str {
        &self.type_tag
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn translatable_attributes(&self) -> &[String] {
        &self.translatable
    }

    /// Cast of `attribute`; undeclared attributes are plain strings.
    pub fn cast(&self, attribute: &str) -> AttributeCast {
        self.casts.get(attribute).copied().unwrap_or_default()
    }

    pub fn soft_deletes(&self) -> bool {
        self.soft_deletes
    }

    /// Check that every name is a usable identifier and that translatable
    /// attributes exist as base columns (the default language lives there).
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| {
            Err(TranslatorError::InvalidConfiguration(format!(
                "entity `{}`: {}",
                self.type_tag, reason
            )))
        };

        if self.type_tag.trim().is_empty() {
            return invalid("type tag must not be empty".to_string());
        }
        if !FieldValidator::is_identifier(&self.table) {
            return invalid(format!("table `{}` is not a valid identifier", self.table));
        }
        for column in &self.columns {
            if FieldValidator::validate_attribute_key(column).is_err() {
                return invalid(format!("column `{}` is not a valid identifier", column));
            }
            if RESERVED_COLUMNS.contains(&column.as_str()) {
                return invalid(format!("column `{}` is reserved", column));
            }
        }
        for attribute in &self.translatable {
            if !self.columns.contains(attribute) {
                return invalid(format!(
                    "translatable attribute `{}` is not a declared column",
                    attribute
                ));
            }
        }
        Ok(())
    }
}

/// Registry of entity types known to the translator.
#[derive(Debug, Clone, Default)]
pub struct EntityRegistry {
    entities: Vec<Arc<EntityDescriptor>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity type, rejecting invalid descriptors and duplicate tags.
    pub fn register(&mut self, descriptor: EntityDescriptor) -> Result<Arc<EntityDescriptor>> {
        descriptor.validate()?;

        if self.get_by_type(descriptor.type_tag()).is_some() {
            return Err(TranslatorError::InvalidConfiguration(format!(
                "entity type `{}` is already registered",
                descriptor.type_tag()
            )));
        }

        let descriptor = Arc::new(descriptor);
        self.entities.push(Arc::clone(&descriptor));
        Ok(descriptor)
    }

    /// Builder-style registration.
    pub fn with(mut self, descriptor: EntityDescriptor) -> Result<Self> {
        self.register(descriptor)?;
        Ok(self)
    }

    /// Get a descriptor by its type tag.
    pub fn get_by_type(&self, type_tag: &str) -> Option<&Arc<EntityDescriptor>> {
        self.entities
            .iter()
            .find(|descriptor| descriptor.type_tag() == type_tag)
    }

    /// Look up a descriptor or fail with `UnknownEntityType`.
    pub fn require(&self, type_tag: &str) -> Result<&Arc<EntityDescriptor>> {
        self.get_by_type(type_tag)
            .ok_or_else(|| TranslatorError::UnknownEntityType(type_tag.to_string()))
    }

    /// List all registered descriptors.
    pub fn list_all(&self) -> Vec<&Arc<EntityDescriptor>> {
        self.entities.iter().collect()
    }

    /// Check if a type tag is registered.
    pub fn is_registered(&self, type_tag: &str) -> bool {
        self.get_by_type(type_tag).is_some()
    }
}
