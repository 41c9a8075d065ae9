//! Translation statistics as an addition to an owner query.
//!
//! [`SelectQuery`] is a small SELECT builder over one owner table. The stats
//! scope appends three projected columns and leaves every existing part of the
//! query (selection, filters, ordering, pagination) as it was.

use crate::entity::{EntityDescriptor, Translatable};
use crate::error::Result;
use crate::overlay::Translator;
use rusqlite::types::Value as SqlValue;

pub const TRANSLATIONS_COUNT: &str = "translations_count";
pub const TRANSLATIONS_PERCENTAGE: &str = "translations_percentage";
pub const TRANSLATIONS_LAST_MODIFIED_AT: &str = "translations_last_modified_at";

/// A projected expression with its positional bindings.
#[derive(Debug, Clone, PartialEq)]
struct Projection {
    sql: String,
    bindings: Vec<SqlValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
    from: String,
    columns: Vec<Projection>,
    filters: Vec<Projection>,
    order_by: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl SelectQuery {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            from: table.into(),
            columns: Vec::new(),
            filters: Vec::new(),
            order_by: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// Query over the table of a registered entity type.
    pub fn for_entity(descriptor: &EntityDescriptor) -> Self {
        Self::from(descriptor.table())
    }

    pub fn select(mut self, column: impl Into<String>) -> Self {
        self.columns.push(Projection {
            sql: column.into(),
            bindings: Vec::new(),
        });
        self
    }

    pub fn select_raw(mut self, sql: impl Into<String>, bindings: Vec<SqlValue>) -> Self {
        self.columns.push(Projection {
            sql: sql.into(),
            bindings,
        });
        self
    }

    /// Add a WHERE condition; conditions are AND-ed.
    pub fn filter(mut self, sql: impl Into<String>, bindings: Vec<SqlValue>) -> Self {
        self.filters.push(Projection {
            sql: sql.into(),
            bindings,
        });
        self
    }

    pub fn order_by(mut self, clause: impl Into<String>) -> Self {
        self.order_by.push(clause.into());
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn table(&self) -> &str {
        &self.from
    }

    pub fn has_columns(&self) -> bool {
        !self.columns.is_empty()
    }

    /// Render SQL and bindings in placeholder order.
    pub fn to_sql(&self) -> (String, Vec<SqlValue>) {
        let mut bindings = Vec::new();

        let columns = if self.columns.is_empty() {
            format!("{}.*", self.from)
        } else {
            self.columns
                .iter()
                .map(|column| {
                    bindings.extend(column.bindings.iter().cloned());
                    column.sql.as_str()
                })
                .collect::<Vec<_>>()
                .join(", ")
        };

        let mut sql = format!("SELECT {} FROM {}", columns, self.from);

        if !self.filters.is_empty() {
            let conditions = self
                .filters
                .iter()
                .map(|filter| {
                    bindings.extend(filter.bindings.iter().cloned());
                    format!("({})", filter.sql)
                })
                .collect::<Vec<_>>()
                .join(" AND ");
            sql.push_str(&format!(" WHERE {}", conditions));
        }

        if !self.order_by.is_empty() {
            sql.push_str(&format!(" ORDER BY {}", self.order_by.join(", ")));
        }

        match (self.limit, self.offset) {
            (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset)),
            (Some(limit), None) => sql.push_str(&format!(" LIMIT {}", limit)),
            // SQLite needs a LIMIT before OFFSET
            (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {}", offset)),
            (None, None) => {}
        }

        (sql, bindings)
    }
}

/// Append the translation stats columns for `language_code` to `query`.
///
/// `translations_count` only counts records of the descriptor's translatable
/// attributes, so it never exceeds the attribute total. An entity type with no
/// translatable attributes reports 0 and 0%.
pub fn with_translation_stats(
    query: SelectQuery,
    descriptor: &EntityDescriptor,
    translation_table: &str,
    language_code: &str,
) -> SelectQuery {
    let owner = query.table().to_string();
    let attributes = descriptor.translatable_attributes();
    let total = attributes.len();

    // Keep the base selection: `owner.*` when nothing was selected yet.
    let query = if query.has_columns() {
        query
    } else {
        query.select(format!("{}.*", owner))
    };

    let scope = format!(
        "{t}.owner_type = ? AND {t}.owner_id = {o}.id AND {t}.language_code = ? AND {t}.deleted_at IS NULL",
        t = translation_table,
        o = owner
    );
    let scope_bindings = vec![
        SqlValue::Text(descriptor.type_tag().to_string()),
        SqlValue::Text(language_code.to_string()),
    ];

    let (count_sql, count_bindings) = if total == 0 {
        ("0".to_string(), Vec::new())
    } else {
        let placeholders = vec!["?"; total].join(", ");
        let mut bindings = scope_bindings.clone();
        bindings.extend(attributes.iter().map(|a| SqlValue::Text(a.clone())));
        (
            format!(
                "(SELECT COUNT(*) FROM {t} WHERE {scope} AND {t}.attribute_key IN ({placeholders}))",
                t = translation_table,
                scope = scope,
                placeholders = placeholders
            ),
            bindings,
        )
    };

    let percentage_sql = if total == 0 {
        "0.0".to_string()
    } else {
        format!("{} * 100.0 / {}", count_sql, total)
    };

    query
        .select_raw(format!("{} AS {}", count_sql, TRANSLATIONS_COUNT), count_bindings.clone())
        .select_raw(
            format!("{} AS {}", percentage_sql, TRANSLATIONS_PERCENTAGE),
            count_bindings,
        )
        .select_raw(
            format!(
                "(SELECT MAX({t}.updated_at) FROM {t} WHERE {scope}) AS {column}",
                t = translation_table,
                scope = scope,
                column = TRANSLATIONS_LAST_MODIFIED_AT
            ),
            scope_bindings,
        )
}

impl Translator {
    /// Stats scope for a registered entity type. Fails with
    /// `InvalidConfiguration` when the side table does not fit the record
    /// layout.
    pub fn stats_scope(
        &self,
        query: SelectQuery,
        entity_type: &str,
        language_code: &str,
    ) -> Result<SelectQuery> {
        let descriptor = self.registry().require(entity_type)?;
        self.database().ensure_translation_model()?;
        Ok(with_translation_stats(
            query,
            descriptor,
            self.database().translation_table_name(),
            language_code,
        ))
    }

    /// Stats for a single owner in `language_code`.
    pub fn translation_stats<T: Translatable + ?Sized>(
        &self,
        owner: &T,
        language_code: &str,
    ) -> Result<TranslationStats> {
        let owner_ref = owner.owner();
        let attributes = owner.translatable_attributes();
        let total = attributes.len();

        let mut count = 0;
        for attribute in attributes {
            if self.has_translation(owner, language_code, attribute)? {
                count += 1;
            }
        }

        let last_modified_at = self
            .database()
            .last_modified_at(&owner_ref, language_code)?;

        Ok(TranslationStats {
            translations_count: count,
            translations_percentage: percentage(count, total),
            translations_last_modified_at: last_modified_at,
        })
    }
}

/// Stats for one owner in one language.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct TranslationStats {
    pub translations_count: usize,
    pub translations_percentage: f64,
    pub translations_last_modified_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64 * 100.0
    }
}
