//! Attribute resolution: which value does a reader see?
//!
//! Lookups go through the owner's loaded ledger when there is one and fall
//! back to a scoped store query otherwise. Both paths return the same answer;
//! they only differ in cost.

use crate::entity::{AttributeMap, Translatable};
use crate::error::Result;
use crate::overlay::{TranslationContext, TranslationLedger, TranslationRecord, Translator};
use serde_json::Value;

impl Translator {
    /// The value a reader sees for `attribute` under `ctx`.
    ///
    /// The base value is returned when auto-translation is off, the attribute
    /// is not translatable, the active language is the default language, or no
    /// override exists.
    pub fn resolve<T: Translatable + ?Sized>(
        &self,
        owner: &T,
        attribute: &str,
        ctx: &TranslationContext,
    ) -> Result<Value> {
        if !ctx.auto_translates() {
            return Ok(owner.base_value(attribute));
        }

        let language_code = ctx.active_language_code();
        if !owner.should_be_translated(attribute) || ctx.is_default_language(language_code) {
            return Ok(owner.base_value(attribute));
        }

        match self.translation_value(owner, language_code, attribute)? {
            Some(value) => Ok(value),
            None => {
                self.metrics().record_fallback();
                Ok(owner.base_value(attribute))
            }
        }
    }

    /// Base attributes with the active language's overrides merged in.
    pub fn to_map<T: Translatable + ?Sized>(
        &self,
        owner: &T,
        ctx: &TranslationContext,
    ) -> Result<AttributeMap> {
        let mut map = owner.base_attributes();
        let language_code = ctx.active_language_code();

        if !ctx.auto_translates() || ctx.is_default_language(language_code) {
            return Ok(map);
        }

        for (attribute, value) in self.translated_values(owner, language_code)? {
            map.insert(attribute, value);
        }
        Ok(map)
    }

    /// Every translatable attribute that has an override in `language_code`,
    /// decoded, in declaration order.
    pub fn translated_values<T: Translatable + ?Sized>(
        &self,
        owner: &T,
        language_code: &str,
    ) -> Result<AttributeMap> {
        let mut values = AttributeMap::new();
        for attribute in owner.translatable_attributes() {
            if let Some(value) = self.translation_value(owner, language_code, attribute)? {
                values.insert(attribute.clone(), value);
            }
        }
        Ok(values)
    }

    /// The decoded override for (language, attribute), if one exists.
    pub fn translation_value<T: Translatable + ?Sized>(
        &self,
        owner: &T,
        language_code: &str,
        attribute: &str,
    ) -> Result<Option<Value>> {
        self.find_record(owner, language_code, attribute)?
            .map(|record| record.decoded(owner.attribute_cast(attribute)))
            .transpose()
    }

    /// Whether a live override exists for a translatable attribute.
    pub fn has_translation<T: Translatable + ?Sized>(
        &self,
        owner: &T,
        language_code: &str,
        attribute: &str,
    ) -> Result<bool> {
        if !owner.should_be_translated(attribute) {
            return Ok(false);
        }

        if let Some(ledger) = owner.translations() {
            self.metrics().record_ledger_hit();
            return Ok(ledger.contains(language_code, attribute));
        }

        self.metrics().record_store_lookup();
        self.database()
            .translation_exists(&owner.owner(), language_code, attribute)
    }

    /// Whether the `language_code` override is older than the default-language
    /// override of the same attribute.
    ///
    /// Only explicit default-language records count as the reference point;
    /// edits to the base row are not compared.
    pub fn is_outdated<T: Translatable + ?Sized>(
        &self,
        owner: &T,
        language_code: &str,
        attribute: &str,
    ) -> Result<bool> {
        if self.is_default_language(language_code) {
            return Ok(false);
        }

        let default_language = &self.config().default_language_code;
        let Some(reference) = self.find_record(owner, default_language, attribute)? else {
            return Ok(false);
        };
        let Some(target) = self.find_record(owner, language_code, attribute)? else {
            return Ok(false);
        };

        Ok(target.updated_at < reference.updated_at)
    }

    /// Eager-load the owner's ledger.
    pub fn load_translations<T: Translatable + ?Sized>(&self, owner: &mut T) -> Result<()> {
        let records = self.database().load_translations(&owner.owner())?;
        owner.set_translations(TranslationLedger::new(records));
        Ok(())
    }

    /// Ledger-first record lookup.
    pub(crate) fn find_record<T: Translatable + ?Sized>(
        &self,
        owner: &T,
        language_code: &str,
        attribute: &str,
    ) -> Result<Option<TranslationRecord>> {
        if let Some(ledger) = owner.translations() {
            self.metrics().record_ledger_hit();
            return Ok(ledger.find(language_code, attribute).cloned());
        }

        self.metrics().record_store_lookup();
        self.database()
            .find_translation(&owner.owner(), language_code, attribute)
    }
}
