//! SQLite connection implementing the AORM [`Connection`] boundary.

use std::sync::Arc;
use std::time::Duration;

use aorm_query::sql::quote_identifier;
use aorm_query::{
    ColumnCache, Connection, DatabaseType, ParamMap, QueryError, QueryResult, Row, Value,
    to_positional,
};
use parking_lot::Mutex;
use rusqlite::params_from_iter;
use tracing::{debug, trace};

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::{SqliteError, SqliteResult};
use crate::types::{read_row, to_sqlite};

struct Inner {
    conn: rusqlite::Connection,
    last_insert_id: Option<i64>,
}

/// A SQLite connection shared between threads.
///
/// Statements are serialized through a mutex. The key generated by the last
/// INSERT is remembered per connection and reported by
/// [`Connection::last_insert_id`].
pub struct SqliteConnection {
    inner: Mutex<Inner>,
    config: SqliteConfig,
    columns: ColumnCache,
}

impl SqliteConnection {
    /// Open a connection and apply the configured pragmas.
    pub fn open(config: SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => rusqlite::Connection::open_in_memory()?,
            DatabasePath::File(path) => rusqlite::Connection::open(path)?,
        };

        conn.pragma_update(None, "foreign_keys", config.foreign_keys)?;
        conn.pragma_update(None, "synchronous", config.synchronous.as_pragma())?;
        if !config.path.is_memory() {
            let mode: String = conn.pragma_update_and_check(
                None,
                "journal_mode",
                config.journal_mode.as_pragma(),
                |row| row.get(0),
            )?;
            trace!(journal_mode = %mode, "journal mode set");
        }
        if let Some(ms) = config.busy_timeout_ms {
            conn.busy_timeout(Duration::from_millis(u64::from(ms)))?;
        }

        debug!(path = %config.path.display(), "opened SQLite connection");
        Ok(Self {
            inner: Mutex::new(Inner {
                conn,
                last_insert_id: None,
            }),
            config,
            columns: ColumnCache::new(),
        })
    }

    /// Open an in-memory database.
    pub fn memory() -> SqliteResult<Self> {
        Self::open(SqliteConfig::memory())
    }

    /// Open the database named by a URL.
    pub fn from_url(url: impl AsRef<str>) -> SqliteResult<Self> {
        Self::open(SqliteConfig::from_url(url)?)
    }

    /// Open the database named by `AORM_DATABASE_URL`.
    pub fn from_env() -> SqliteResult<Self> {
        Self::open(SqliteConfig::from_env()?)
    }

    /// Open a connection and wrap it for registration.
    pub fn shared(config: SqliteConfig) -> SqliteResult<Arc<Self>> {
        Self::open(config).map(Arc::new)
    }

    /// The configuration this connection was opened with.
    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Run several `;`-separated statements without parameters, such as a
    /// schema. Cached column lists are dropped afterwards.
    pub fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        self.inner.lock().conn.execute_batch(sql)?;
        self.columns.clear();
        Ok(())
    }

    /// Run `f` with the underlying rusqlite connection.
    pub fn with_raw<T>(
        &self,
        f: impl FnOnce(&rusqlite::Connection) -> rusqlite::Result<T>,
    ) -> SqliteResult<T> {
        Ok(f(&self.inner.lock().conn)?)
    }

    fn run_query(&self, sql: &str, params: &ParamMap) -> QueryResult<Vec<Row>> {
        let (sql, values) = to_positional(sql, params)?;
        trace!(sql = %sql, params = values.len(), "query");

        let inner = self.inner.lock();
        let mut stmt = inner.conn.prepare(&sql).map_err(driver)?;
        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

        let mut rows = stmt
            .query(params_from_iter(values.iter().map(to_sqlite)))
            .map_err(driver)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(driver)? {
            out.push(read_row(row, &columns)?);
        }
        Ok(out)
    }

    fn run_execute(&self, sql: &str, params: &ParamMap) -> QueryResult<u64> {
        let (sql, values) = to_positional(sql, params)?;
        trace!(sql = %sql, params = values.len(), "execute");

        let mut inner = self.inner.lock();
        let affected = inner
            .conn
            .execute(&sql, params_from_iter(values.iter().map(to_sqlite)))
            .map_err(driver)?;
        if is_insert(&sql) && affected > 0 {
            inner.last_insert_id = Some(inner.conn.last_insert_rowid());
        }
        Ok(affected as u64)
    }
}

fn driver(err: rusqlite::Error) -> QueryError {
    SqliteError::from(err).into()
}

fn is_insert(sql: &str) -> bool {
    sql.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("insert"))
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.config.path)
            .finish()
    }
}

impl Connection for SqliteConnection {
    fn database_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    fn query(&self, sql: &str, params: &ParamMap) -> QueryResult<Vec<Row>> {
        self.run_query(sql, params).map_err(|e| e.with_sql(sql))
    }

    fn execute(&self, sql: &str, params: &ParamMap) -> QueryResult<u64> {
        self.run_execute(sql, params).map_err(|e| e.with_sql(sql))
    }

    fn last_insert_id(&self) -> Option<Value> {
        self.inner.lock().last_insert_id.map(Value::Int)
    }

    fn list_columns(&self, table: &str) -> QueryResult<Vec<String>> {
        let sql = format!("PRAGMA table_info({})", quote_identifier(table));
        let rows = self.query(&sql, &ParamMap::new())?;
        let columns: Vec<String> = rows
            .iter()
            .filter_map(|row| row.get("name").and_then(Value::as_str).map(String::from))
            .collect();
        if columns.is_empty() {
            return Err(QueryError::database(format!("no such table: {}", table))
                .with_context("Listing table columns"));
        }
        debug!(table, columns = columns.len(), "listed columns");
        Ok(columns)
    }

    fn column_cache(&self) -> &ColumnCache {
        &self.columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aorm_query::{ErrorCode, PrimaryKey, row};
    use pretty_assertions::assert_eq;

    fn blog() -> SqliteConnection {
        let conn = SqliteConnection::memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE post (
                post_id INTEGER PRIMARY KEY AUTOINCREMENT,
                author TEXT NOT NULL,
                title TEXT
            );",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_query_binds_named_parameters() {
        let conn = blog();
        conn.execute(
            "INSERT INTO post (author, title) VALUES (:author, :title)",
            &row! { "author" => "Deniz", "title" => "It's here" },
        )
        .unwrap();

        let rows = conn
            .query(
                "SELECT * FROM post WHERE author = :author",
                &row! { "author" => "Deniz" },
            )
            .unwrap();
        assert_eq!(
            rows,
            vec![row! { "post_id" => 1, "author" => "Deniz", "title" => "It's here" }]
        );
    }

    #[test]
    fn test_last_insert_id_tracks_inserts_only() {
        let conn = blog();
        assert_eq!(conn.last_insert_id(), None);

        conn.insert("post", &row! { "author" => "Deniz" }).unwrap();
        conn.insert("post", &row! { "author" => "Other" }).unwrap();
        assert_eq!(conn.last_insert_id(), Some(Value::Int(2)));

        conn.execute("DELETE FROM post WHERE post_id = :id", &row! { "id" => 1 })
            .unwrap();
        assert_eq!(conn.last_insert_id(), Some(Value::Int(2)));
    }

    #[test]
    fn test_list_columns_is_cached() {
        let conn = blog();
        assert_eq!(
            conn.table_columns("post").unwrap().as_slice(),
            ["post_id", "author", "title"]
        );

        let err = conn.list_columns("missing").unwrap_err();
        assert_eq!(err.message, "no such table: missing");
    }

    #[test]
    fn test_subset_for_insert_drops_unknown_fields() {
        let conn = blog();
        let subset = conn
            .subset_for_insert(&row! { "author" => "Deniz", "comments" => "ignored" }, "post")
            .unwrap();
        assert_eq!(subset, row! { "author" => "Deniz" });
    }

    #[test]
    fn test_upsert_updates_existing_row() {
        let conn = blog();
        let key = PrimaryKey::single("post_id");
        conn.upsert("post", &row! { "post_id" => 5, "author" => "Deniz" }, &key)
            .unwrap();
        conn.upsert(
            "post",
            &row! { "post_id" => 5, "author" => "Deniz", "title" => "Edited" },
            &key,
        )
        .unwrap();

        let rows = conn.query("SELECT title FROM post", &ParamMap::new()).unwrap();
        assert_eq!(rows, vec![row! { "title" => "Edited" }]);
    }

    #[test]
    fn test_constraint_failures_map_to_error_codes() {
        let conn = blog();
        let err = conn
            .execute("INSERT INTO post (title) VALUES (:title)", &row! { "title" => "x" })
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotNullConstraint);
        assert_eq!(
            err.context.sql.as_deref(),
            Some("INSERT INTO post (title) VALUES (:title)")
        );

        conn.insert("post", &row! { "post_id" => 1, "author" => "Deniz" }).unwrap();
        let err = conn
            .insert("post", &row! { "post_id" => 1, "author" => "Deniz" })
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::UniqueConstraint);
    }

    #[test]
    fn test_missing_parameter_is_reported() {
        let conn = blog();
        let err = conn
            .query("SELECT * FROM post WHERE author = :author", &ParamMap::new())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameter);
    }

    #[test]
    fn test_file_database_persists_between_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blog.db");

        {
            let conn = SqliteConnection::open(SqliteConfig::file(&path)).unwrap();
            conn.execute_batch("CREATE TABLE tag (name TEXT PRIMARY KEY);").unwrap();
            conn.insert("tag", &row! { "name" => "rust" }).unwrap();
        }

        let conn = SqliteConnection::open(SqliteConfig::file(&path)).unwrap();
        let rows = conn.query("SELECT name FROM tag", &ParamMap::new()).unwrap();
        assert_eq!(rows, vec![row! { "name" => "rust" }]);
    }
}
