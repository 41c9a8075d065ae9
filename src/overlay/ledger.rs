//! Translation records and the in-memory ledger of one owner's records.

use crate::entity::value::{self, AttributeCast};
use crate::entity::OwnerRef;
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

/// One localized override: (owner, language, attribute) → value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationRecord {
    pub id: i64,
    pub owner_type: String,
    pub owner_id: i64,
    pub language_code: String,
    pub attribute_key: String,
    /// Stored text; JSON-encoded when the attribute is cast as JSON.
    pub value: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TranslationRecord {
    /// The owner this record overrides.
    pub fn owner(&self) -> OwnerRef {
        OwnerRef::new(self.owner_type.clone(), self.owner_id)
    }

    /// Whether this record is the override for `attribute_key` in `language_code`.
    pub fn matches(&self, language_code: &str, attribute_key: &str) -> bool {
        self.language_code == language_code && self.attribute_key == attribute_key
    }

    /// Decode the stored text with the attribute's cast.
    pub fn decoded(&self, cast: AttributeCast) -> Result<Value> {
        value::decode(cast, &self.value)
    }
}

/// The live (non-deleted) translation records of a single owner, eagerly
/// loaded so lookups don't hit the store.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslationLedger {
    records: Vec<TranslationRecord>,
}

impl TranslationLedger {
    /// Build a ledger from stored records. Tombstoned records are dropped.
    pub fn new(records: Vec<TranslationRecord>) -> Self {
        let records = records
            .into_iter()
            .filter(|record| record.deleted_at.is_none())
            .collect();
        Self { records }
    }

    /// Look up the override for one (language, attribute) pair.
    pub fn find(&self, language_code: &str, attribute_key: &str) -> Option<&TranslationRecord> {
        self.records
            .iter()
            .find(|record| record.matches(language_code, attribute_key))
    }

    /// Check if an override exists for the pair.
    pub fn contains(&self, language_code: &str, attribute_key: &str) -> bool {
        self.find(language_code, attribute_key).is_some()
    }

    /// All records in `language_code`, in load order.
    pub fn for_language<'a>(
        &'a self,
        language_code: &'a str,
    ) -> impl Iterator<Item = &'a TranslationRecord> + 'a {
        self.records
            .iter()
            .filter(move |record| record.language_code == language_code)
    }

    /// Replace the record with the same (language, attribute) or append it.
    pub fn upsert(&mut self, record: TranslationRecord) {
        match self
            .records
            .iter_mut()
            .find(|existing| existing.matches(&record.language_code, &record.attribute_key))
        {
            Some(existing) => *existing = record,
            None => self.records.push(record),
        }
    }

    /// Drop the record for the pair, returning it if it was present.
    pub fn remove(&mut self, language_code: &str, attribute_key: &str) -> Option<TranslationRecord> {
        let position = self
            .records
            .iter()
            .position(|record| record.matches(language_code, attribute_key))?;
        Some(self.records.remove(position))
    }

    /// Forget every record, e.g. after a delete cascade.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Number of live records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over every live record.
    pub fn iter(&self) -> impl Iterator<Item = &TranslationRecord> {
        self.records.iter()
    }
}
