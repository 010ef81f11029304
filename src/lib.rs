//! # AORM
//!
//! An active-record data-access layer.
//!
//! AORM provides:
//! - A condition algebra that renders SQL `WHERE` fragments with uniquely
//!   named parameters
//! - Criteria bundling a condition, requested relations and an immutability
//!   flag
//! - Active records with lifecycle hooks and lazy, recursive relation
//!   resolution
//! - A table mapper over a pluggable connection, with a SQLite backend
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use aorm::prelude::*;
//! use aorm::sqlite::SqliteConnection;
//!
//! struct Post;
//! struct Comment;
//!
//! impl Model for Post {
//!     const NAME: &'static str = "Post";
//!
//!     fn create_crud() -> Arc<dyn Crud> {
//!         Arc::new(DbCrud::new("post", PrimaryKey::single("post_id")))
//!     }
//!
//!     fn relations() -> RelationTable<Self> {
//!         RelationTable::new().with("comments", |post: &Record<Post>| {
//!             let post_id = post.value("post_id")?.clone();
//!             Ok(Comment::fetch_all(row! { "post_id" => post_id })?.into())
//!         })
//!     }
//! }
//!
//! aorm::register_connection(Arc::new(SqliteConnection::from_url("sqlite://blog.db")?));
//!
//! let mut criteria = Criteria::create();
//! criteria
//!     .add_condition(Post::condition().equals("author", "Deniz"))?
//!     .add_related("comments")?;
//!
//! for post in Post::fetch_all(criteria)? {
//!     println!("{}", post.data_with_relations());
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Conditions, criteria, the storage boundary and SQL helpers.
pub mod query {
    pub use aorm_query::*;
}

/// Models, records and the relation registry.
pub mod record {
    pub use aorm_record::*;
}

/// SQLite connection.
#[cfg(feature = "sqlite")]
#[cfg_attr(docsrs, doc(cfg(feature = "sqlite")))]
pub mod sqlite {
    pub use aorm_sqlite::*;
}

pub use aorm_query::logging;
pub use aorm_query::{
    Condition, ConditionFactory, Connection, Criteria, CriteriaArg, Crud, DbCrud, ErrorCode, KeyValue,
    Operator, PrimaryKey, QueryError, QueryResult, RelationTree, Row, Value, clear_connection,
    connection, register_connection, row,
};
pub use aorm_record::{Entity, Field, Model, Record, RecordState, Related, RelationTable, Repository};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use aorm_record::prelude::*;
}
