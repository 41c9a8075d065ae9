use crate::entity::value::{self, AttributeCast};
use crate::entity::{AttributeMap, Entity, EntityDescriptor, OwnerRef};
use crate::error::{Result, TranslatorError};
use crate::overlay::stats::SelectQuery;
use crate::overlay::validator::FieldValidator;
use crate::overlay::TranslationRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use serde_json::{Number, Value};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, warn};

/// Columns the translation table must expose: the owner relation, the
/// language filter, the key/value pair and the timestamps.
const REQUIRED_TRANSLATION_COLUMNS: [&str; 8] = [
    "owner_type",
    "owner_id",
    "language_code",
    "attribute_key",
    "value",
    "created_at",
    "updated_at",
    "deleted_at",
];

const RECORD_COLUMNS: &str =
    "id, owner_type, owner_id, language_code, attribute_key, value, created_at, updated_at, deleted_at";

/// Shared SQLite handle holding the translation table and the owner tables.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    table: String,
    model_checked: Arc<OnceLock<()>>,
}

impl Database {
    /// Open (or create) the database and make sure the translation table exists.
    pub fn open(database_path: &str, table: &str) -> Result<Self> {
        let conn = Connection::open(database_path)?;
        Self::with_connection(conn, table)
    }

    /// In-memory database, used by unit tests.
    pub fn open_in_memory(table: &str) -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self> {
        if !FieldValidator::is_identifier(table) {
            return Err(TranslatorError::InvalidConfiguration(format!(
                "translation table `{}` is not a valid identifier",
                table
            )));
        }

        conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {t} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    owner_type TEXT NOT NULL,
                    owner_id INTEGER NOT NULL,
                    language_code TEXT NOT NULL,
                    attribute_key TEXT NOT NULL,
                    value TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    deleted_at TEXT
                )",
                t = table
            ),
            [],
        )?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            table: table.to_string(),
            model_checked: Arc::new(OnceLock::new()),
        };

        // A pre-existing table with the wrong shape is reported when the
        // overlay first touches it, not here.
        let missing = db.missing_translation_columns(&db.conn())?;
        if missing.is_empty() {
            db.create_translation_indexes()?;
        } else {
            warn!(
                "Translation table {} is missing columns: {}",
                table,
                missing.join(", ")
            );
        }

        Ok(db)
    }

    fn create_translation_indexes(&self) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            &format!(
                "CREATE UNIQUE INDEX IF NOT EXISTS {t}_owner_language_key_unique
                 ON {t} (owner_type, owner_id, language_code, attribute_key)
                 WHERE deleted_at IS NULL",
                t = self.table
            ),
            [],
        )?;
        conn.execute(
            &format!(
                "CREATE INDEX IF NOT EXISTS {t}_owner_index ON {t} (owner_type, owner_id)",
                t = self.table
            ),
            [],
        )?;
        Ok(())
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Name of the configured translation table.
    pub fn translation_table_name(&self) -> &str {
        &self.table
    }

    /// Column names of `table`, in schema order.
    pub fn table_columns(&self, table: &str) -> Result<Vec<String>> {
        Self::columns_of(&self.conn(), table)
    }

    fn columns_of(conn: &Connection, table: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
        let columns = stmt
            .query_map(params![table], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(columns)
    }

    fn missing_translation_columns(&self, conn: &Connection) -> Result<Vec<&'static str>> {
        let columns = Self::columns_of(conn, &self.table)?;
        Ok(REQUIRED_TRANSLATION_COLUMNS
            .iter()
            .filter(|required| !columns.iter().any(|column| column == *required))
            .copied()
            .collect())
    }

    /// Verify the configured translation table satisfies the translation
    /// contract. The check runs once per database handle; failures are
    /// reported every time.
    pub fn ensure_translation_model(&self) -> Result<()> {
        let conn = self.conn();
        self.translation_table(&conn).map(|_| ())
    }

    fn translation_table(&self, conn: &Connection) -> Result<&str> {
        if self.model_checked.get().is_some() {
            return Ok(&self.table);
        }

        let missing = self.missing_translation_columns(conn)?;
        if !missing.is_empty() {
            warn!("Translation table {} failed the contract check", self.table);
            return Err(TranslatorError::model_is_not_valid(&self.table, &missing));
        }

        let _ = self.model_checked.set(());
        Ok(&self.table)
    }

    // ==================== Translation Records ====================

    /// Find the live record for (owner, language, attribute).
    pub fn find_translation(
        &self,
        owner: &OwnerRef,
        language_code: &str,
        attribute_key: &str,
    ) -> Result<Option<TranslationRecord>> {
        let conn = self.conn();
        let table = self.translation_table(&conn)?;

        let record = conn
            .query_row(
                &format!(
                    "SELECT {columns} FROM {t}
                     WHERE owner_type = ?1 AND owner_id = ?2 AND language_code = ?3
                       AND attribute_key = ?4 AND deleted_at IS NULL",
                    columns = RECORD_COLUMNS,
                    t = table
                ),
                params![owner.owner_type, owner.owner_id, language_code, attribute_key],
                record_from_row,
            )
            .optional()?;
        Ok(record)
    }

    /// Scoped existence check without loading the record.
    pub fn translation_exists(
        &self,
        owner: &OwnerRef,
        language_code: &str,
        attribute_key: &str,
    ) -> Result<bool> {
        let conn = self.conn();
        let table = self.translation_table(&conn)?;

        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {t}
                 WHERE owner_type = ?1 AND owner_id = ?2 AND language_code = ?3
                   AND attribute_key = ?4 AND deleted_at IS NULL",
                t = table
            ),
            params![owner.owner_type, owner.owner_id, language_code, attribute_key],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All live records of an owner, oldest first.
    pub fn load_translations(&self, owner: &OwnerRef) -> Result<Vec<TranslationRecord>> {
        let conn = self.conn();
        let table = self.translation_table(&conn)?;

        let mut stmt = conn.prepare(&format!(
            "SELECT {columns} FROM {t}
             WHERE owner_type = ?1 AND owner_id = ?2 AND deleted_at IS NULL
             ORDER BY id ASC",
            columns = RECORD_COLUMNS,
            t = table
        ))?;
        let records = stmt
            .query_map(params![owner.owner_type, owner.owner_id], record_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Insert or update the live record for (owner, language, attribute).
    pub fn upsert_translation(
        &self,
        owner: &OwnerRef,
        language_code: &str,
        attribute_key: &str,
        value: &str,
    ) -> Result<TranslationRecord> {
        let conn = self.conn();
        let table = self.translation_table(&conn)?;
        let now = timestamp(Utc::now());

        let record = conn.query_row(
            &format!(
                "INSERT INTO {t} (owner_type, owner_id, language_code, attribute_key, value, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                 ON CONFLICT (owner_type, owner_id, language_code, attribute_key) WHERE deleted_at IS NULL
                 DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
                 RETURNING {columns}",
                t = table,
                columns = RECORD_COLUMNS
            ),
            params![
                owner.owner_type,
                owner.owner_id,
                language_code,
                attribute_key,
                value,
                now
            ],
            record_from_row,
        )?;

        debug!(
            "Saved translation {} for {} ({})",
            attribute_key, owner, language_code
        );
        Ok(record)
    }

    /// Hard-delete the live record for (owner, language, attribute).
    pub fn delete_translation(
        &self,
        owner: &OwnerRef,
        language_code: &str,
        attribute_key: &str,
    ) -> Result<bool> {
        let conn = self.conn();
        let table = self.translation_table(&conn)?;

        let rows_affected = conn.execute(
            &format!(
                "DELETE FROM {t}
                 WHERE owner_type = ?1 AND owner_id = ?2 AND language_code = ?3
                   AND attribute_key = ?4 AND deleted_at IS NULL",
                t = table
            ),
            params![owner.owner_type, owner.owner_id, language_code, attribute_key],
        )?;

        if rows_affected > 0 {
            debug!(
                "Deleted translation {} for {} ({})",
                attribute_key, owner, language_code
            );
        }
        Ok(rows_affected > 0)
    }

    /// Hard-delete every record of an owner, including soft-deleted ones.
    pub fn delete_translations(&self, owner: &OwnerRef) -> Result<usize> {
        let conn = self.conn();
        let table = self.translation_table(&conn)?;

        let rows_affected = conn.execute(
            &format!("DELETE FROM {t} WHERE owner_type = ?1 AND owner_id = ?2", t = table),
            params![owner.owner_type, owner.owner_id],
        )?;
        Ok(rows_affected)
    }

    /// Tombstone every live record of an owner.
    pub fn soft_delete_translations(&self, owner: &OwnerRef) -> Result<usize> {
        let conn = self.conn();
        let table = self.translation_table(&conn)?;

        let rows_affected = conn.execute(
            &format!(
                "UPDATE {t} SET deleted_at = ?3
                 WHERE owner_type = ?1 AND owner_id = ?2 AND deleted_at IS NULL",
                t = table
            ),
            params![owner.owner_type, owner.owner_id, timestamp(Utc::now())],
        )?;
        Ok(rows_affected)
    }

    /// Bring back soft-deleted records of an owner.
    ///
    /// Per (language, attribute) only the most recently tombstoned record is
    /// restored, and only when no live record took its place meanwhile.
    pub fn restore_translations(&self, owner: &OwnerRef) -> Result<usize> {
        let conn = self.conn();
        let table = self.translation_table(&conn)?;

        let rows_affected = conn.execute(
            &format!(
                "UPDATE {t} SET deleted_at = NULL
                 WHERE owner_type = ?1 AND owner_id = ?2 AND deleted_at IS NOT NULL
                   AND id = (
                       SELECT MAX(trashed.id) FROM {t} AS trashed
                       WHERE trashed.owner_type = {t}.owner_type
                         AND trashed.owner_id = {t}.owner_id
                         AND trashed.language_code = {t}.language_code
                         AND trashed.attribute_key = {t}.attribute_key
                         AND trashed.deleted_at IS NOT NULL
                   )
                   AND NOT EXISTS (
                       SELECT 1 FROM {t} AS live
                       WHERE live.owner_type = {t}.owner_type
                         AND live.owner_id = {t}.owner_id
                         AND live.language_code = {t}.language_code
                         AND live.attribute_key = {t}.attribute_key
                         AND live.deleted_at IS NULL
                   )",
                t = table
            ),
            params![owner.owner_type, owner.owner_id],
        )?;
        Ok(rows_affected)
    }

    /// Number of live records of an owner.
    pub fn translation_count(&self, owner: &OwnerRef) -> Result<usize> {
        self.count_translations(owner, "deleted_at IS NULL")
    }

    /// Number of soft-deleted records of an owner.
    pub fn trashed_translation_count(&self, owner: &OwnerRef) -> Result<usize> {
        self.count_translations(owner, "deleted_at IS NOT NULL")
    }

    fn count_translations(&self, owner: &OwnerRef, condition: &str) -> Result<usize> {
        let conn = self.conn();
        let table = self.translation_table(&conn)?;

        let count: i64 = conn.query_row(
            &format!(
                "SELECT COUNT(*) FROM {t} WHERE owner_type = ?1 AND owner_id = ?2 AND {c}",
                t = table,
                c = condition
            ),
            params![owner.owner_type, owner.owner_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Latest `updated_at` among an owner's live records in a language.
    pub fn last_modified_at(
        &self,
        owner: &OwnerRef,
        language_code: &str,
    ) -> Result<Option<DateTime<Utc>>> {
        let conn = self.conn();
        let table = self.translation_table(&conn)?;

        let latest: Option<String> = conn.query_row(
            &format!(
                "SELECT MAX(updated_at) FROM {t}
                 WHERE owner_type = ?1 AND owner_id = ?2 AND language_code = ?3
                   AND deleted_at IS NULL",
                t = table
            ),
            params![owner.owner_type, owner.owner_id, language_code],
            |row| row.get(0),
        )?;

        latest
            .map(|text| parse_timestamp(0, text).map_err(TranslatorError::from))
            .transpose()
    }

    // ==================== Entity Rows ====================

    /// Create the owner table of an entity type if it does not exist.
    pub fn ensure_entity_table(&self, descriptor: &EntityDescriptor) -> Result<()> {
        descriptor.validate()?;

        let mut columns = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
        for column in descriptor.columns() {
            columns.push(format!("{} {}", column, column_type(descriptor.cast(column))));
        }
        columns.push("created_at TEXT NOT NULL".to_string());
        columns.push("updated_at TEXT NOT NULL".to_string());
        if descriptor.soft_deletes() {
            columns.push("deleted_at TEXT".to_string());
        }

        self.conn().execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {} ({})",
                descriptor.table(),
                columns.join(", ")
            ),
            [],
        )?;
        Ok(())
    }

    /// Insert a row from `data`; keys that are not declared columns are ignored.
    pub fn insert_entity(
        &self,
        descriptor: &Arc<EntityDescriptor>,
        data: &AttributeMap,
    ) -> Result<Entity> {
        let (columns, mut values) = assignable(descriptor, data)?;
        let now = timestamp(Utc::now());
        values.push(SqlValue::Text(now.clone()));
        values.push(SqlValue::Text(now));

        let mut names: Vec<&str> = columns.iter().map(String::as_str).collect();
        names.push("created_at");
        names.push("updated_at");
        let placeholders = vec!["?"; names.len()].join(", ");

        let id: i64 = self.conn().query_row(
            &format!(
                "INSERT INTO {} ({}) VALUES ({}) RETURNING id",
                descriptor.table(),
                names.join(", "),
                placeholders
            ),
            params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        debug!("Created {}#{}", descriptor.type_tag(), id);
        self.find_entity_with_trashed(descriptor, id)?
            .ok_or(TranslatorError::Store(rusqlite::Error::QueryReturnedNoRows))
    }

    /// Find a row that is not soft-deleted.
    pub fn find_entity(&self, descriptor: &Arc<EntityDescriptor>, id: i64) -> Result<Option<Entity>> {
        let entity = self.find_entity_with_trashed(descriptor, id)?;
        Ok(entity.filter(|entity| !entity.is_trashed()))
    }

    /// Find a row, soft-deleted or not.
    pub fn find_entity_with_trashed(
        &self,
        descriptor: &Arc<EntityDescriptor>,
        id: i64,
    ) -> Result<Option<Entity>> {
        let columns = descriptor.columns();
        let mut select = vec!["id".to_string()];
        select.extend(columns.iter().cloned());
        select.push("created_at".to_string());
        select.push("updated_at".to_string());
        select.push(if descriptor.soft_deletes() {
            "deleted_at".to_string()
        } else {
            "NULL".to_string()
        });

        let raw = self
            .conn()
            .query_row(
                &format!(
                    "SELECT {} FROM {} WHERE id = ?1",
                    select.join(", "),
                    descriptor.table()
                ),
                params![id],
                |row| {
                    let values = (1..=columns.len())
                        .map(|index| row.get::<_, SqlValue>(index))
                        .collect::<rusqlite::Result<Vec<_>>>()?;
                    let created_at = parse_timestamp(columns.len() + 1, row.get(columns.len() + 1)?)?;
                    let updated_at = parse_timestamp(columns.len() + 2, row.get(columns.len() + 2)?)?;
                    let deleted_at = row
                        .get::<_, Option<String>>(columns.len() + 3)?
                        .map(|text| parse_timestamp(columns.len() + 3, text))
                        .transpose()?;
                    Ok((values, created_at, updated_at, deleted_at))
                },
            )
            .optional()?;

        let Some((values, created_at, updated_at, deleted_at)) = raw else {
            return Ok(None);
        };

        let mut attributes = AttributeMap::new();
        for (column, sql_value) in columns.iter().zip(values.iter()) {
            let decoded = value::from_sql(descriptor.cast(column), ValueRef::from(sql_value))?;
            attributes.insert(column.clone(), decoded);
        }

        Ok(Some(Entity::from_row(
            Arc::clone(descriptor),
            id,
            attributes,
            created_at,
            updated_at,
            deleted_at,
        )))
    }

    /// Write `data` to the base row; keys that are not declared columns are
    /// ignored. The entity is refreshed from the stored row afterwards.
    pub fn update_entity(&self, entity: &mut Entity, data: &AttributeMap) -> Result<()> {
        let descriptor = Arc::clone(entity.descriptor());
        let (columns, mut values) = assignable(&descriptor, data)?;
        if columns.is_empty() {
            return Ok(());
        }

        let assignments = columns
            .iter()
            .map(|column| format!("{} = ?", column))
            .collect::<Vec<_>>()
            .join(", ");
        values.push(SqlValue::Text(timestamp(Utc::now())));
        values.push(SqlValue::Integer(entity.id()));

        self.conn().execute(
            &format!(
                "UPDATE {} SET {}, updated_at = ? WHERE id = ?",
                descriptor.table(),
                assignments
            ),
            params_from_iter(values.iter()),
        )?;

        if let Some(fresh) = self.find_entity_with_trashed(&descriptor, entity.id())? {
            entity.refresh_from(fresh);
        }
        debug!("Updated {}#{}", descriptor.type_tag(), entity.id());
        Ok(())
    }

    /// Tombstone a row of a soft-deletable entity type.
    pub fn soft_delete_entity(&self, entity: &mut Entity) -> Result<()> {
        let now = Utc::now();
        self.conn().execute(
            &format!("UPDATE {} SET deleted_at = ?1 WHERE id = ?2", entity.descriptor().table()),
            params![timestamp(now), entity.id()],
        )?;
        entity.set_deleted_at(Some(now));
        Ok(())
    }

    /// Remove a row permanently.
    pub fn force_delete_entity(&self, entity: &Entity) -> Result<()> {
        self.conn().execute(
            &format!("DELETE FROM {} WHERE id = ?1", entity.descriptor().table()),
            params![entity.id()],
        )?;
        Ok(())
    }

    /// Clear the tombstone of a soft-deleted row.
    pub fn restore_entity(&self, entity: &mut Entity) -> Result<()> {
        self.conn().execute(
            &format!("UPDATE {} SET deleted_at = NULL WHERE id = ?1", entity.descriptor().table()),
            params![entity.id()],
        )?;
        entity.set_deleted_at(None);
        Ok(())
    }

    // ==================== Queries ====================

    /// Run a select and return each row as a column → value map.
    pub fn fetch_rows(&self, query: &SelectQuery) -> Result<Vec<AttributeMap>> {
        let (sql, bindings) = query.to_sql();
        let conn = self.conn();
        let mut stmt = conn.prepare(&sql)?;
        let names: Vec<String> = stmt.column_names().iter().map(|n| n.to_string()).collect();

        let rows = stmt
            .query_map(params_from_iter(bindings.iter()), |row| {
                let mut map = AttributeMap::new();
                for (index, name) in names.iter().enumerate() {
                    map.insert(name.clone(), plain_value(row.get_ref(index)?));
                }
                Ok(map)
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

/// Fixed-width RFC 3339 so text comparison matches time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(index: usize, text: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&text)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(e)))
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<TranslationRecord> {
    Ok(TranslationRecord {
        id: row.get(0)?,
        owner_type: row.get(1)?,
        owner_id: row.get(2)?,
        language_code: row.get(3)?,
        attribute_key: row.get(4)?,
        value: row.get(5)?,
        created_at: parse_timestamp(6, row.get(6)?)?,
        updated_at: parse_timestamp(7, row.get(7)?)?,
        deleted_at: row
            .get::<_, Option<String>>(8)?
            .map(|text| parse_timestamp(8, text))
            .transpose()?,
    })
}

/// Declared columns present in `data`, with their SQL values.
fn assignable(
    descriptor: &EntityDescriptor,
    data: &AttributeMap,
) -> Result<(Vec<String>, Vec<SqlValue>)> {
    let mut columns = Vec::new();
    let mut values = Vec::new();
    for column in descriptor.columns() {
        if let Some(value) = data.get(column) {
            values.push(value::to_sql(descriptor.cast(column), value)?);
            columns.push(column.clone());
        }
    }
    Ok((columns, values))
}

fn column_type(cast: AttributeCast) -> &'static str {
    match cast {
        AttributeCast::Integer | AttributeCast::Boolean => "INTEGER",
        AttributeCast::Float => "REAL",
        AttributeCast::String | AttributeCast::Json => "TEXT",
    }
}

fn plain_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(integer) => Value::from(integer),
        ValueRef::Real(real) => Number::from_f64(real).map(Value::Number).unwrap_or(Value::Null),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::Translatable;
    use serde_json::json;
    use tempfile::TempDir;

    // ==================== Helper Functions ====================

    /// Create a temporary database for testing
    fn create_test_db() -> (Database, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test_translations.db");
        let db = Database::open(db_path.to_str().unwrap(), "translations")
            .expect("Failed to create database");
        (db, temp_dir)
    }

    fn product_descriptor() -> Arc<EntityDescriptor> {
        Arc::new(
            EntityDescriptor::new("product", "products")
                .column("name", AttributeCast::String)
                .column("description", AttributeCast::String)
                .column("data", AttributeCast::Json)
                .column("stock", AttributeCast::Integer)
                .translatable(&["name", "description", "data"])
                .soft_deletable(),
        )
    }

    fn owner() -> OwnerRef {
        OwnerRef::new("product", 1)
    }

    // ==================== Schema Tests ====================

    #[test]
    fn test_database_creates_translation_table() {
        let (db, _temp_dir) = create_test_db();

        let columns = db.table_columns("translations").expect("Should list columns");
        for required in REQUIRED_TRANSLATION_COLUMNS {
            assert!(columns.iter().any(|c| c == required), "missing {}", required);
        }
        assert!(db.ensure_translation_model().is_ok());
    }

    #[test]
    fn test_database_reopening() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("test.db");
        let path_str = db_path.to_str().unwrap();

        {
            let db = Database::open(path_str, "translations").expect("Failed to create database");
            db.upsert_translation(&owner(), "da", "name", "sko").expect("Should save");
        }

        {
            let db = Database::open(path_str, "translations").expect("Failed to reopen database");
            assert_eq!(db.translation_count(&owner()).unwrap(), 1, "Record should persist");
        }
    }

    #[test]
    fn test_invalid_database_path() {
        let result = Database::open("/non/existent/path/db.db", "translations");
        assert!(result.is_err());
    }

    #[test]
    fn test_invalid_table_name() {
        let result = Database::open_in_memory("translations; DROP TABLE x");
        assert!(matches!(result, Err(TranslatorError::InvalidConfiguration(_))));
    }

    #[test]
    fn test_foreign_table_fails_contract_at_use() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let db_path = temp_dir.path().join("foreign.db");
        let path_str = db_path.to_str().unwrap();
        {
            let conn = Connection::open(path_str).unwrap();
            conn.execute("CREATE TABLE labels (id INTEGER PRIMARY KEY, text TEXT)", [])
                .unwrap();
        }

        let db = Database::open(path_str, "labels").expect("Opening should succeed");
        let err = db.find_translation(&owner(), "da", "name").unwrap_err();

        assert!(matches!(err, TranslatorError::InvalidConfiguration(_)));
        assert!(err.to_string().contains("owner_type"));
        assert!(err.to_string().contains("language_code"));
    }

    // ==================== Upsert Tests ====================

    #[test]
    fn test_upsert_creates_record() {
        let (db, _temp_dir) = create_test_db();

        let record = db.upsert_translation(&owner(), "da", "name", "sko").unwrap();

        assert_eq!(record.owner(), owner());
        assert_eq!(record.language_code, "da");
        assert_eq!(record.attribute_key, "name");
        assert_eq!(record.value, "sko");
        assert_eq!(record.created_at, record.updated_at);
        assert!(record.deleted_at.is_none());
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let (db, _temp_dir) = create_test_db();

        let first = db.upsert_translation(&owner(), "da", "name", "sko").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let second = db.upsert_translation(&owner(), "da", "name", "støvler").unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.value, "støvler");
        assert_eq!(second.created_at, first.created_at);
        assert!(second.updated_at > first.updated_at);
        assert_eq!(db.translation_count(&owner()).unwrap(), 1);
    }

    #[test]
    fn test_upsert_distinguishes_owners_and_languages() {
        let (db, _temp_dir) = create_test_db();

        db.upsert_translation(&owner(), "da", "name", "sko").unwrap();
        db.upsert_translation(&owner(), "de", "name", "Schuhe").unwrap();
        db.upsert_translation(&OwnerRef::new("product", 2), "da", "name", "støvler")
            .unwrap();
        db.upsert_translation(&OwnerRef::new("category", 1), "da", "name", "fodtøj")
            .unwrap();

        assert_eq!(db.translation_count(&owner()).unwrap(), 2);
        assert_eq!(
            db.find_translation(&owner(), "da", "name").unwrap().unwrap().value,
            "sko"
        );
    }

    #[test]
    fn test_sql_injection_prevention_value() {
        let (db, _temp_dir) = create_test_db();

        let malicious = "x'); DROP TABLE translations; --";
        db.upsert_translation(&owner(), "da", "name", malicious).unwrap();

        let record = db.find_translation(&owner(), "da", "name").unwrap().unwrap();
        assert_eq!(record.value, malicious);
    }

    // ==================== Lookup Tests ====================

    #[test]
    fn test_find_missing_translation() {
        let (db, _temp_dir) = create_test_db();
        assert!(db.find_translation(&owner(), "da", "name").unwrap().is_none());
        assert!(!db.translation_exists(&owner(), "da", "name").unwrap());
    }

    #[test]
    fn test_load_translations_in_insert_order() {
        let (db, _temp_dir) = create_test_db();

        db.upsert_translation(&owner(), "da", "name", "sko").unwrap();
        db.upsert_translation(&owner(), "da", "description", "nogle sko").unwrap();

        let records = db.load_translations(&owner()).unwrap();
        let keys: Vec<_> = records.iter().map(|r| r.attribute_key.as_str()).collect();
        assert_eq!(keys, vec!["name", "description"]);
    }

    // ==================== Delete Tests ====================

    #[test]
    fn test_delete_translation() {
        let (db, _temp_dir) = create_test_db();

        db.upsert_translation(&owner(), "da", "name", "sko").unwrap();
        assert!(db.delete_translation(&owner(), "da", "name").unwrap());
        assert!(!db.delete_translation(&owner(), "da", "name").unwrap());
        assert_eq!(db.translation_count(&owner()).unwrap(), 0);
    }

    #[test]
    fn test_soft_delete_and_restore() {
        let (db, _temp_dir) = create_test_db();

        db.upsert_translation(&owner(), "da", "name", "sko").unwrap();
        db.upsert_translation(&owner(), "da", "description", "nogle sko").unwrap();

        assert_eq!(db.soft_delete_translations(&owner()).unwrap(), 2);
        assert_eq!(db.translation_count(&owner()).unwrap(), 0);
        assert_eq!(db.trashed_translation_count(&owner()).unwrap(), 2);
        assert!(db.find_translation(&owner(), "da", "name").unwrap().is_none());

        assert_eq!(db.restore_translations(&owner()).unwrap(), 2);
        assert_eq!(db.translation_count(&owner()).unwrap(), 2);
        assert_eq!(db.trashed_translation_count(&owner()).unwrap(), 0);
    }

    #[test]
    fn test_restore_skips_keys_rewritten_after_soft_delete() {
        let (db, _temp_dir) = create_test_db();

        db.upsert_translation(&owner(), "da", "name", "sko").unwrap();
        db.soft_delete_translations(&owner()).unwrap();
        db.upsert_translation(&owner(), "da", "name", "støvler").unwrap();

        assert_eq!(db.restore_translations(&owner()).unwrap(), 0);
        let record = db.find_translation(&owner(), "da", "name").unwrap().unwrap();
        assert_eq!(record.value, "støvler");
    }

    #[test]
    fn test_restore_picks_latest_tombstone_per_key() {
        let (db, _temp_dir) = create_test_db();

        db.upsert_translation(&owner(), "da", "name", "first").unwrap();
        db.soft_delete_translations(&owner()).unwrap();
        db.upsert_translation(&owner(), "da", "name", "second").unwrap();
        db.soft_delete_translations(&owner()).unwrap();

        assert_eq!(db.restore_translations(&owner()).unwrap(), 1);
        let record = db.find_translation(&owner(), "da", "name").unwrap().unwrap();
        assert_eq!(record.value, "second");
    }

    #[test]
    fn test_delete_translations_removes_trashed_too() {
        let (db, _temp_dir) = create_test_db();

        db.upsert_translation(&owner(), "da", "name", "sko").unwrap();
        db.soft_delete_translations(&owner()).unwrap();
        db.upsert_translation(&owner(), "da", "description", "nogle sko").unwrap();

        assert_eq!(db.delete_translations(&owner()).unwrap(), 2);
        assert_eq!(db.trashed_translation_count(&owner()).unwrap(), 0);
    }

    #[test]
    fn test_last_modified_at() {
        let (db, _temp_dir) = create_test_db();
        assert!(db.last_modified_at(&owner(), "da").unwrap().is_none());

        db.upsert_translation(&owner(), "da", "name", "sko").unwrap();
        std::thread::sleep(std::time::Duration::from_millis(5));
        let latest = db.upsert_translation(&owner(), "da", "description", "nogle sko").unwrap();

        assert_eq!(db.last_modified_at(&owner(), "da").unwrap(), Some(latest.updated_at));
    }

    // ==================== Entity Row Tests ====================

    #[test]
    fn test_entity_table_columns() {
        let (db, _temp_dir) = create_test_db();
        db.ensure_entity_table(&product_descriptor()).unwrap();

        let columns = db.table_columns("products").unwrap();
        assert_eq!(
            columns,
            vec!["id", "name", "description", "data", "stock", "created_at", "updated_at", "deleted_at"]
        );
    }

    #[test]
    fn test_insert_and_find_entity() {
        let (db, _temp_dir) = create_test_db();
        let descriptor = product_descriptor();
        db.ensure_entity_table(&descriptor).unwrap();

        let mut data = AttributeMap::new();
        data.insert("name".to_string(), json!("shoes"));
        data.insert("data".to_string(), json!({"size": 42}));
        data.insert("stock".to_string(), json!(3));
        data.insert("unknown".to_string(), json!("ignored"));

        let created = db.insert_entity(&descriptor, &data).unwrap();
        let found = db.find_entity(&descriptor, created.id()).unwrap().unwrap();

        assert_eq!(found.base_value("name"), json!("shoes"));
        assert_eq!(found.base_value("data"), json!({"size": 42}));
        assert_eq!(found.base_value("stock"), json!(3));
        assert_eq!(found.base_value("description"), Value::Null);
    }

    #[test]
    fn test_update_entity_only_touches_given_columns() {
        let (db, _temp_dir) = create_test_db();
        let descriptor = product_descriptor();
        db.ensure_entity_table(&descriptor).unwrap();

        let mut data = AttributeMap::new();
        data.insert("name".to_string(), json!("shoes"));
        data.insert("stock".to_string(), json!(3));
        let mut entity = db.insert_entity(&descriptor, &data).unwrap();

        let mut update = AttributeMap::new();
        update.insert("stock".to_string(), json!(5));
        db.update_entity(&mut entity, &update).unwrap();

        assert_eq!(entity.base_value("stock"), json!(5));
        assert_eq!(entity.base_value("name"), json!("shoes"));
    }

    #[test]
    fn test_soft_delete_hides_entity() {
        let (db, _temp_dir) = create_test_db();
        let descriptor = product_descriptor();
        db.ensure_entity_table(&descriptor).unwrap();

        let mut entity = db.insert_entity(&descriptor, &AttributeMap::new()).unwrap();
        db.soft_delete_entity(&mut entity).unwrap();

        assert!(entity.is_trashed());
        assert!(db.find_entity(&descriptor, entity.id()).unwrap().is_none());
        assert!(db.find_entity_with_trashed(&descriptor, entity.id()).unwrap().is_some());

        db.restore_entity(&mut entity).unwrap();
        assert!(db.find_entity(&descriptor, entity.id()).unwrap().is_some());
    }

    #[test]
    fn test_fetch_rows() {
        let (db, _temp_dir) = create_test_db();
        let descriptor = product_descriptor();
        db.ensure_entity_table(&descriptor).unwrap();

        let mut data = AttributeMap::new();
        data.insert("name".to_string(), json!("shoes"));
        db.insert_entity(&descriptor, &data).unwrap();

        let rows = db
            .fetch_rows(&SelectQuery::from("products").select("id").select("name"))
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["name"], json!("shoes"));
    }
}
