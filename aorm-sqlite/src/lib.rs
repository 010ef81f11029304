//! SQLite connection for the AORM data-access layer.
//!
//! [`SqliteConnection`] implements [`aorm_query::Connection`] on top of
//! `rusqlite`, so a [`DbCrud`](aorm_query::DbCrud) can read and write SQLite
//! tables.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use aorm_query::register_connection;
//! use aorm_sqlite::{SqliteConfig, SqliteConnection};
//!
//! let config = SqliteConfig::from_url("sqlite://./blog.db")?;
//! register_connection(Arc::new(SqliteConnection::open(config)?));
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod types;

pub use config::{DatabasePath, DatabaseSection, JournalMode, SqliteConfig, SynchronousMode};
pub use connection::SqliteConnection;
pub use error::{SqliteError, SqliteResult};
