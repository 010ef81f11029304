//! The database connection boundary used by [`DbCrud`](crate::DbCrud).
//!
//! Backends implement the few primitive methods (`query`, `execute`,
//! `last_insert_id`, `list_columns`); column caching, insert subsets, and
//! INSERT / upsert statement generation are provided on top of them.
//!
//! A process-wide default connection can be registered with
//! [`register_connection`] and retrieved with [`connection`].

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::debug;

use crate::condition::ParamNamer;
use crate::crud::PrimaryKey;
use crate::error::{QueryError, QueryResult};
use crate::sql::{DatabaseType, quote_identifier};
use crate::value::{ParamMap, Row, Value};

/// Per-connection cache of table column lists.
#[derive(Debug, Default)]
pub struct ColumnCache {
    tables: RwLock<HashMap<String, Arc<Vec<String>>>>,
}

impl ColumnCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached columns of `table`, loading them with `load` on first use.
    pub fn get_or_load(
        &self,
        table: &str,
        load: impl FnOnce() -> QueryResult<Vec<String>>,
    ) -> QueryResult<Arc<Vec<String>>> {
        if let Some(columns) = self.tables.read().get(table) {
            return Ok(Arc::clone(columns));
        }
        let columns = Arc::new(load()?);
        self.tables
            .write()
            .insert(table.to_string(), Arc::clone(&columns));
        Ok(columns)
    }

    /// Forget every cached table.
    pub fn clear(&self) {
        self.tables.write().clear();
    }
}

/// A database connection speaking SQL with `:name` placeholders.
pub trait Connection: Send + Sync {
    /// Placeholder and upsert dialect of the backend.
    fn database_type(&self) -> DatabaseType;

    /// Run a statement and return its result rows.
    fn query(&self, sql: &str, params: &ParamMap) -> QueryResult<Vec<Row>>;

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &ParamMap) -> QueryResult<u64>;

    /// Key generated by the last insert on this connection, if any.
    fn last_insert_id(&self) -> Option<Value>;

    /// Column names of `table`, read from the backend.
    fn list_columns(&self, table: &str) -> QueryResult<Vec<String>>;

    /// The cache behind [`table_columns`](Self::table_columns).
    fn column_cache(&self) -> &ColumnCache;

    /// Escape a string for inclusion in a quoted SQL literal.
    fn escape_string(&self, value: &str) -> String {
        value.replace('\'', "''")
    }

    /// Column names of `table`, cached per connection.
    fn table_columns(&self, table: &str) -> QueryResult<Arc<Vec<String>>> {
        self.column_cache()
            .get_or_load(table, || self.list_columns(table))
    }

    /// The entries of `row` that are columns of `table`.
    fn subset_for_insert(&self, row: &Row, table: &str) -> QueryResult<Row> {
        let columns = self.table_columns(table)?;
        Ok(row
            .iter()
            .filter(|(field, _)| columns.iter().any(|c| c == *field))
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect())
    }

    /// Insert `row`, updating the existing row when the key already exists.
    /// Returns the generated key, if the backend reports one.
    fn upsert(
        &self,
        table: &str,
        row: &Row,
        primary_key: &PrimaryKey,
    ) -> QueryResult<Option<Value>> {
        let (sql, params) = upsert_statement(self.database_type(), table, row, primary_key)?;
        debug!(table, columns = row.len(), "upserting row");
        self.execute(&sql, &params)?;
        Ok(self.last_insert_id())
    }

    /// Insert `row`. Fails on key conflicts.
    fn insert(&self, table: &str, row: &Row) -> QueryResult<Option<Value>> {
        let (sql, params) = insert_statement(table, row)?;
        debug!(table, columns = row.len(), "inserting row");
        self.execute(&sql, &params)?;
        Ok(self.last_insert_id())
    }
}

struct InsertParts {
    columns: Vec<String>,
    placeholders: Vec<String>,
    params: ParamMap,
}

fn insert_parts(table: &str, row: &Row) -> QueryResult<InsertParts> {
    if row.is_empty() {
        return Err(QueryError::invalid_parameter(
            table,
            "no columns to insert",
        ));
    }
    let mut namer = ParamNamer::new();
    let mut parts = InsertParts {
        columns: Vec::with_capacity(row.len()),
        placeholders: Vec::with_capacity(row.len()),
        params: ParamMap::new(),
    };
    for (column, value) in row {
        let name = namer.single(column);
        parts.columns.push(quote_identifier(column));
        parts.placeholders.push(format!(":{}", name));
        parts.params.insert(name, value.clone());
    }
    Ok(parts)
}

/// `INSERT INTO table (…) VALUES (…)` with one placeholder per column.
pub fn insert_statement(table: &str, row: &Row) -> QueryResult<(String, ParamMap)> {
    let parts = insert_parts(table, row)?;
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_identifier(table),
        parts.columns.join(", "),
        parts.placeholders.join(", ")
    );
    Ok((sql, parts.params))
}

/// An INSERT that updates the non-key columns on a key conflict, in the
/// dialect of `db_type`.
pub fn upsert_statement(
    db_type: DatabaseType,
    table: &str,
    row: &Row,
    primary_key: &PrimaryKey,
) -> QueryResult<(String, ParamMap)> {
    let (insert, params) = insert_statement(table, row)?;
    let key_columns = primary_key.columns();
    let updated: Vec<&String> = row
        .keys()
        .filter(|column| !key_columns.contains(&column.as_str()))
        .collect();

    let sql = match db_type {
        DatabaseType::MySQL => {
            // MySQL needs at least one assignment; a key-only row re-assigns its key
            let targets: Vec<&str> = if updated.is_empty() {
                key_columns.clone()
            } else {
                updated.iter().map(|c| c.as_str()).collect()
            };
            let assignments: Vec<String> = targets
                .iter()
                .map(|c| {
                    let c = quote_identifier(c);
                    format!("{} = VALUES({})", c, c)
                })
                .collect();
            format!("{} ON DUPLICATE KEY UPDATE {}", insert, assignments.join(", "))
        }
        DatabaseType::SQLite | DatabaseType::PostgreSQL => {
            let target: Vec<String> = key_columns.iter().map(|c| quote_identifier(c)).collect();
            if updated.is_empty() {
                format!("{} ON CONFLICT ({}) DO NOTHING", insert, target.join(", "))
            } else {
                let assignments: Vec<String> = updated
                    .iter()
                    .map(|c| {
                        let c = quote_identifier(c);
                        format!("{} = excluded.{}", c, c)
                    })
                    .collect();
                format!(
                    "{} ON CONFLICT ({}) DO UPDATE SET {}",
                    insert,
                    target.join(", "),
                    assignments.join(", ")
                )
            }
        }
    };
    Ok((sql, params))
}

fn default_slot() -> &'static RwLock<Option<Arc<dyn Connection>>> {
    static SLOT: OnceLock<RwLock<Option<Arc<dyn Connection>>>> = OnceLock::new();
    SLOT.get_or_init(|| RwLock::new(None))
}

/// Register the process-wide default connection, replacing any earlier one.
pub fn register_connection(connection: Arc<dyn Connection>) {
    debug!("registering default connection");
    *default_slot().write() = Some(connection);
}

/// Remove the process-wide default connection.
pub fn clear_connection() {
    *default_slot().write() = None;
}

/// The process-wide default connection.
pub fn connection() -> QueryResult<Arc<dyn Connection>> {
    default_slot().read().clone().ok_or_else(|| {
        QueryError::missing_configuration("No db connection was registered")
            .with_suggestion("Call register_connection() at startup")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_insert_statement() {
        let (sql, params) = insert_statement("post", &row! { "title" => "Hi", "order" => 2 }).unwrap();
        assert_eq!(
            sql,
            "INSERT INTO post (title, \"order\") VALUES (:title, :order)"
        );
        assert_eq!(params["order"], Value::Int(2));
    }

    #[test]
    fn test_insert_statement_requires_columns() {
        assert!(insert_statement("post", &Row::new()).is_err());
    }

    #[test]
    fn test_upsert_sqlite() {
        let row = row! { "post_id" => 1, "title" => "Hi" };
        let (sql, _) = upsert_statement(
            DatabaseType::SQLite,
            "post",
            &row,
            &PrimaryKey::single("post_id"),
        )
        .unwrap();
        assert_eq!(
            sql,
            "INSERT INTO post (post_id, title) VALUES (:post_id, :title) \
             ON CONFLICT (post_id) DO UPDATE SET title = excluded.title"
        );
    }

    #[test]
    fn test_upsert_mysql() {
        let row = row! { "post_id" => 1, "title" => "Hi" };
        let (sql, _) =
            upsert_statement(DatabaseType::MySQL, "post", &row, &PrimaryKey::single("post_id"))
                .unwrap();
        assert!(sql.ends_with("ON DUPLICATE KEY UPDATE title = VALUES(title)"));
    }

    #[test]
    fn test_upsert_key_only_row() {
        let row = row! { "post_id" => 1, "tag_id" => 2 };
        let pk = PrimaryKey::composite(["post_id", "tag_id"]);
        let (sql, _) = upsert_statement(DatabaseType::SQLite, "post_tag", &row, &pk).unwrap();
        assert!(sql.ends_with("ON CONFLICT (post_id, tag_id) DO NOTHING"));
    }

    #[test]
    fn test_column_cache_loads_once() {
        let cache = ColumnCache::new();
        let loads = AtomicUsize::new(0);
        let load = || {
            loads.fetch_add(1, Ordering::SeqCst);
            Ok(vec!["a".to_string()])
        };
        cache.get_or_load("t", load).unwrap();
        cache.get_or_load("t", load).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        cache.clear();
        cache.get_or_load("t", load).unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
