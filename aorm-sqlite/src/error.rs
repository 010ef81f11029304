//! Error types for SQLite operations.

use aorm_query::{ErrorCode, QueryError};
use rusqlite::ffi;
use thiserror::Error;

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Error type for SQLite operations.
#[derive(Error, Debug)]
pub enum SqliteError {
    /// SQLite driver error.
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration file could not be parsed.
    #[error("Configuration error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A value cannot be stored or read.
    #[error("Type conversion error: {0}")]
    TypeConversion(String),
}

impl SqliteError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a type conversion error.
    pub fn type_conversion(msg: impl Into<String>) -> Self {
        Self::TypeConversion(msg.into())
    }
}

fn constraint_code(err: &rusqlite::Error) -> Option<ErrorCode> {
    let rusqlite::Error::SqliteFailure(failure, _) = err else {
        return None;
    };
    match failure.extended_code {
        ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
            Some(ErrorCode::UniqueConstraint)
        }
        ffi::SQLITE_CONSTRAINT_FOREIGNKEY => Some(ErrorCode::ForeignKeyConstraint),
        ffi::SQLITE_CONSTRAINT_NOTNULL => Some(ErrorCode::NotNullConstraint),
        _ => None,
    }
}

impl From<SqliteError> for QueryError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Sqlite(e) => {
                let message = e.to_string();
                let err = match constraint_code(&e) {
                    Some(code) => QueryError::new(code, message),
                    None => QueryError::database(message),
                };
                err.with_source(e)
            }
            SqliteError::Config(msg) => QueryError::invalid_configuration(msg),
            SqliteError::Toml(e) => QueryError::invalid_configuration(e.to_string()).with_source(e),
            SqliteError::TypeConversion(msg) => QueryError::invalid_data_type(msg),
        }
    }
}
