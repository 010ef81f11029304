//! The storage collaborator of a model type, and a SQL table implementation.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::condition::ParamNamer;
use crate::connection::{self, Connection};
use crate::criteria::Criteria;
use crate::error::{QueryError, QueryResult};
use crate::sql::{Select, quote_identifier};
use crate::value::{ParamMap, Row, Value};

/// The primary key columns of a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKey {
    /// One key column.
    Single(String),
    /// Several key columns.
    Composite(Vec<String>),
}

impl PrimaryKey {
    /// A single-column key.
    pub fn single(column: impl Into<String>) -> Self {
        Self::Single(column.into())
    }

    /// A multi-column key.
    pub fn composite<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Composite(columns.into_iter().map(Into::into).collect())
    }

    /// The key columns, in order.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::Single(column) => vec![column.as_str()],
            Self::Composite(columns) => columns.iter().map(String::as_str).collect(),
        }
    }

    /// The key value of `row`. Every key column must be present.
    pub fn value_of(&self, row: &Row) -> QueryResult<KeyValue> {
        let get = |column: &str| {
            row.get(column)
                .cloned()
                .ok_or_else(|| QueryError::key_not_found(column))
        };
        match self {
            Self::Single(column) => Ok(KeyValue::Single(get(column.as_str())?)),
            Self::Composite(columns) => columns
                .iter()
                .map(|column| Ok((column.clone(), get(column.as_str())?)))
                .collect::<QueryResult<Row>>()
                .map(KeyValue::Composite),
        }
    }

    /// Whether `row` holds a non-null value for every key column.
    pub fn is_set_in(&self, row: &Row) -> bool {
        self.columns()
            .iter()
            .all(|column| row.get(*column).is_some_and(|v| !v.is_null()))
    }
}

impl fmt::Display for PrimaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.columns().join(", "))
    }
}

/// A primary key value.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    /// Value of a single-column key.
    Single(Value),
    /// Column to value, for a multi-column key.
    Composite(Row),
}

impl KeyValue {
    /// Column to value pairs, naming a single value after the key column.
    pub fn to_row(&self, primary_key: &PrimaryKey) -> QueryResult<Row> {
        match (self, primary_key) {
            (Self::Composite(row), _) => Ok(row.clone()),
            (Self::Single(value), PrimaryKey::Single(column)) => {
                let mut row = Row::new();
                row.insert(column.clone(), value.clone());
                Ok(row)
            }
            (Self::Single(_), PrimaryKey::Composite(columns)) => {
                Err(QueryError::invalid_parameter(
                    columns.join(", "),
                    "a single value cannot address a composite key",
                ))
            }
        }
    }
}

impl From<Value> for KeyValue {
    fn from(value: Value) -> Self {
        Self::Single(value)
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Single(Value::Int(value))
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        Self::Single(Value::from(value))
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::Single(Value::from(value))
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        Self::Single(Value::String(value))
    }
}

impl From<Row> for KeyValue {
    fn from(row: Row) -> Self {
        Self::Composite(row)
    }
}

/// Fetches, saves and deletes the raw rows of one model type.
pub trait Crud: Send + Sync {
    /// The primary key of the rows.
    fn primary_key(&self) -> PrimaryKey;

    /// The first row matching `criteria`.
    fn fetch_one(&self, criteria: &Criteria) -> QueryResult<Option<Row>>;

    /// All rows matching `criteria`.
    fn fetch_all(&self, criteria: &Criteria) -> QueryResult<Vec<Row>>;

    /// Insert or update `row`, returning its key.
    fn save(&self, row: &Row) -> QueryResult<KeyValue>;

    /// Insert `row`, returning its key. Never updates an existing row.
    fn insert(&self, row: &Row) -> QueryResult<KeyValue>;

    /// Delete the row with the given key.
    fn delete(&self, key: &KeyValue) -> QueryResult<()>;
}

/// A [`Crud`] over one SQL table.
///
/// Uses the connection given to [`with_connection`](Self::with_connection),
/// else the process-wide default connection at call time.
#[derive(Clone)]
pub struct DbCrud {
    table: String,
    primary_key: PrimaryKey,
    connection: Option<Arc<dyn Connection>>,
}

impl fmt::Debug for DbCrud {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCrud")
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .field("connection", &self.connection.is_some())
            .finish()
    }
}

impl DbCrud {
    /// A table mapper using the default connection.
    pub fn new(table: impl Into<String>, primary_key: PrimaryKey) -> Self {
        Self {
            table: table.into(),
            primary_key,
            connection: None,
        }
    }

    /// Use `connection` instead of the default one.
    pub fn with_connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.connection = Some(connection);
        self
    }

    /// The mapped table.
    pub fn table(&self) -> &str {
        &self.table
    }

    fn connection(&self) -> QueryResult<Arc<dyn Connection>> {
        match &self.connection {
            Some(connection) => Ok(Arc::clone(connection)),
            None => connection::connection(),
        }
    }

    /// The SELECT statement and parameters for `criteria`.
    pub fn select_for(&self, criteria: &Criteria) -> QueryResult<(String, ParamMap)> {
        self.select(criteria, None)
    }

    /// Like [`DbCrud::select_for`], limited to one row.
    pub fn select_for_one(&self, criteria: &Criteria) -> QueryResult<(String, ParamMap)> {
        self.select(criteria, Some("1"))
    }

    fn select(&self, criteria: &Criteria, limit: Option<&str>) -> QueryResult<(String, ParamMap)> {
        let mut select = Select::new();
        select.columns("*").from(quote_identifier(&self.table));
        if let Some(limit) = limit {
            select.limit(limit);
        }
        let params = match criteria.condition() {
            Some(condition) => {
                let (sql, params) = condition.to_sql(None)?;
                select.condition(sql);
                params
            }
            None => ParamMap::new(),
        };
        Ok((select.render(), params))
    }

    fn run_select(&self, sql: &str, params: &ParamMap) -> QueryResult<Vec<Row>> {
        debug!(table = %self.table, params = params.len(), "fetching rows");
        self.connection()?
            .query(sql, params)
            .map_err(|e| e.with_context(format!("Fetching from {}", self.table)))
    }

    fn key_from(&self, generated: Option<Value>, row: &Row) -> QueryResult<KeyValue> {
        match (&self.primary_key, generated) {
            (PrimaryKey::Single(column), Some(id))
                if !id.is_null() && !self.primary_key.is_set_in(row) =>
            {
                debug!(table = %self.table, column = %column, "using generated key");
                Ok(KeyValue::Single(id))
            }
            _ => self.primary_key.value_of(row),
        }
    }
}

impl Crud for DbCrud {
    fn primary_key(&self) -> PrimaryKey {
        self.primary_key.clone()
    }

    fn fetch_one(&self, criteria: &Criteria) -> QueryResult<Option<Row>> {
        let (sql, params) = self.select_for_one(criteria)?;
        Ok(self.run_select(&sql, &params)?.into_iter().next())
    }

    fn fetch_all(&self, criteria: &Criteria) -> QueryResult<Vec<Row>> {
        let (sql, params) = self.select_for(criteria)?;
        self.run_select(&sql, &params)
    }

    fn save(&self, row: &Row) -> QueryResult<KeyValue> {
        let connection = self.connection()?;
        let subset = connection.subset_for_insert(row, &self.table)?;
        let generated = connection.upsert(&self.table, &subset, &self.primary_key)?;
        self.key_from(generated, row)
    }

    fn insert(&self, row: &Row) -> QueryResult<KeyValue> {
        let connection = self.connection()?;
        let subset = connection.subset_for_insert(row, &self.table)?;
        let generated = connection.insert(&self.table, &subset)?;
        self.key_from(generated, row)
    }

    fn delete(&self, key: &KeyValue) -> QueryResult<()> {
        let key = key.to_row(&self.primary_key)?;
        let mut namer = ParamNamer::new();
        let mut params = ParamMap::new();
        let mut clauses = Vec::with_capacity(key.len());
        for (column, value) in key {
            let name = namer.single(&column);
            clauses.push(format!("{} = :{}", quote_identifier(&column), name));
            params.insert(name, value);
        }
        let sql = format!(
            "DELETE FROM {} WHERE {}",
            quote_identifier(&self.table),
            clauses.join(" AND ")
        );
        let affected = self.connection()?.execute(&sql, &params)?;
        debug!(table = %self.table, affected, "deleted rows");
        Ok(())
    }
}
