//! Type conversion between [`aorm_query::Value`] and SQLite values.

use aorm_query::{Row, Value};
use rusqlite::types::{Value as SqliteValue, ValueRef};

use crate::error::{SqliteError, SqliteResult};

/// Convert a bound parameter to a SQLite value.
///
/// Booleans become 0 / 1. Lists and JSON documents are stored as JSON text.
pub fn to_sqlite(value: &Value) -> SqliteValue {
    match value {
        Value::Null => SqliteValue::Null,
        Value::Bool(b) => SqliteValue::Integer(i64::from(*b)),
        Value::Int(i) => SqliteValue::Integer(*i),
        Value::Float(f) => SqliteValue::Real(*f),
        Value::String(s) => SqliteValue::Text(s.clone()),
        Value::List(_) | Value::Json(_) => SqliteValue::Text(value.to_json().to_string()),
    }
}

/// Convert a column value read from SQLite.
///
/// Text is returned as is, even when it looks like JSON. Blobs must be UTF-8.
pub fn from_sqlite(value: ValueRef<'_>) -> SqliteResult<Value> {
    Ok(match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Int(i),
        ValueRef::Real(f) => Value::Float(f),
        ValueRef::Text(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => match std::str::from_utf8(bytes) {
            Ok(s) => Value::String(s.to_string()),
            Err(_) => {
                return Err(SqliteError::type_conversion(format!(
                    "binary column of {} bytes is not valid UTF-8",
                    bytes.len()
                )));
            }
        },
    })
}

/// Read every column of `row` into a [`Row`], keyed by column name.
pub fn read_row(row: &rusqlite::Row<'_>, columns: &[String]) -> SqliteResult<Row> {
    let mut out = Row::with_capacity(columns.len());
    for (index, name) in columns.iter().enumerate() {
        out.insert(name.clone(), from_sqlite(row.get_ref(index)?)?);
    }
    Ok(out)
}
