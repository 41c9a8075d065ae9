//! Overlay writes.
//!
//! The base row always holds the default language. Every other language goes
//! to the translation table, one upserted record per attribute. Writing an
//! empty value clears the override.

use crate::entity::value::{self, is_empty_value};
use crate::entity::{AttributeCast, AttributeMap, Entity, Translatable};
use crate::error::Result;
use crate::overlay::{
    FieldValidator, LifecycleEvent, TranslationLedger, TranslationRecord, Translator,
};
use serde_json::Value;
use tracing::debug;

impl Translator {
    /// Write one override. Returns `None` when the attribute is not
    /// translatable or the value is empty (any existing record is removed).
    pub fn write_attribute<T: Translatable + ?Sized>(
        &self,
        owner: &mut T,
        language_code: &str,
        attribute: &str,
        value: &Value,
    ) -> Result<Option<TranslationRecord>> {
        if !owner.should_be_translated(attribute) {
            debug!("Skipping {} on {}: not translatable", attribute, owner.owner());
            return Ok(None);
        }

        FieldValidator::validate_language_code(language_code)?;
        FieldValidator::validate_attribute_key(attribute)?;

        let owner_ref = owner.owner();

        if is_empty_value(value) {
            if self
                .database()
                .delete_translation(&owner_ref, language_code, attribute)?
            {
                self.metrics().record_deleted(1);
            }
            if let Some(ledger) = owner.translations_mut() {
                ledger.remove(language_code, attribute);
            }
            return Ok(None);
        }

        let encoded = value::encode(owner.attribute_cast(attribute), attribute, value)?;
        let record = self
            .database()
            .upsert_translation(&owner_ref, language_code, attribute, &encoded)?;
        self.metrics().record_written();

        if let Some(ledger) = owner.translations_mut() {
            ledger.upsert(record.clone());
        }
        Ok(Some(record))
    }

    /// Write every translatable entry of `data`, in input order. Cleared
    /// entries are left out of the result.
    pub fn write_many<T: Translatable + ?Sized>(
        &self,
        owner: &mut T,
        language_code: &str,
        data: &AttributeMap,
    ) -> Result<Vec<TranslationRecord>> {
        let mut records = Vec::new();
        for (attribute, value) in data {
            if !owner.should_be_translated(attribute) {
                continue;
            }
            if let Some(record) = self.write_attribute(owner, language_code, attribute, value)? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Create the base row from all of `data`, then write the translatable
    /// entries as `language_code` overrides.
    pub fn create_and_translate(
        &self,
        entity_type: &str,
        language_code: &str,
        data: &AttributeMap,
    ) -> Result<Entity> {
        let descriptor = self.registry().require(entity_type)?;
        FieldValidator::validate_language_code(language_code)?;
        check_overrides(
            data,
            |attribute| descriptor.translatable_attributes().iter().any(|a| a == attribute),
            |attribute| descriptor.cast(attribute),
        )?;

        let mut entity = self.database().insert_entity(descriptor, data)?;
        entity.set_translations(TranslationLedger::default());
        self.dispatch(&LifecycleEvent::Created(entity.owner()))?;

        self.write_many(&mut entity, language_code, data)?;
        Ok(entity)
    }

    /// Update the base row and the overrides for `language_code`.
    ///
    /// In the default language the base row takes all of `data`. In any other
    /// language only non-translatable columns reach the base row.
    pub fn update_and_translate(
        &self,
        entity: &mut Entity,
        language_code: &str,
        data: &AttributeMap,
    ) -> Result<Vec<TranslationRecord>> {
        FieldValidator::validate_language_code(language_code)?;
        check_overrides(
            data,
            |attribute| entity.should_be_translated(attribute),
            |attribute| entity.attribute_cast(attribute),
        )?;

        if self.is_default_language(language_code) {
            self.database().update_entity(entity, data)?;
        } else {
            let updatable = entity.updatable_attributes();
            let base: AttributeMap = data
                .iter()
                .filter(|(key, _)| updatable.contains(key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect();
            self.database().update_entity(entity, &base)?;
        }
        self.dispatch(&LifecycleEvent::Updated(entity.owner()))?;

        self.write_many(entity, language_code, data)
    }
}

/// Validate and encode every override in `data` without writing anything, so
/// a rejected value leaves the base row untouched.
fn check_overrides(
    data: &AttributeMap,
    translatable: impl Fn(&str) -> bool,
    cast: impl Fn(&str) -> AttributeCast,
) -> Result<()> {
    for (attribute, value) in data {
        if !translatable(attribute) || is_empty_value(value) {
            continue;
        }
        FieldValidator::validate_attribute_key(attribute)?;
        value::encode(cast(attribute), attribute, value)?;
    }
    Ok(())
}
