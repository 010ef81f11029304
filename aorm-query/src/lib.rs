//! # aorm-query
//!
//! Query building for the AORM data-access layer.
//!
//! This crate provides:
//! - [`Value`], [`Row`] and [`ParamMap`], the data passed to and from storage
//! - the [`Condition`] algebra and its [`ConditionFactory`]
//! - [`Criteria`], bundling a condition, a [`RelationTree`] and an
//!   immutability flag
//! - the [`Crud`] storage boundary, the [`Connection`] boundary and the
//!   [`DbCrud`] table mapper built on them
//! - SQL helpers: the [`Select`](sql::Select) builder and named to positional
//!   placeholder conversion
//!
//! ## Conditions
//!
//! ```rust
//! use aorm_query::{ConditionFactory, Operator};
//!
//! let f = ConditionFactory::new();
//! let adults = f.greater_than_or_equals("age", 18);
//! let named = f.like("name", "D%");
//!
//! let both = adults.combine_with(named, Operator::And);
//! assert_eq!(both.render(None)?, "(age >= :age) AND (name LIKE :name)");
//! assert_eq!(both.render(Some("u"))?, "(u.age >= :age) AND (u.name LIKE :name)");
//! # Ok::<(), aorm_query::QueryError>(())
//! ```
//!
//! ## Criteria shorthand
//!
//! Fetch operations accept anything convertible to [`CriteriaArg`]:
//!
//! ```rust
//! use aorm_query::CriteriaArg;
//! use serde_json::json;
//!
//! let criteria = CriteriaArg::from(json!({"author": "Deniz"})).into_criteria()?;
//! assert_eq!(criteria.condition().unwrap().render(None)?, "author = :author");
//!
//! let err = CriteriaArg::from(json!(["Deniz"])).into_criteria().unwrap_err();
//! assert_eq!(err.message, "criteria array must be associative");
//! # Ok::<(), aorm_query::QueryError>(())
//! ```

pub mod condition;
pub mod connection;
pub mod criteria;
pub mod crud;
pub mod error;
pub mod logging;
pub mod relations;
pub mod sql;
pub mod value;

pub use condition::{
    CompositeCondition, Condition, ConditionFactory, ConditionKind, ConditionList, Operator,
    SimpleCondition,
};
pub use connection::{
    ColumnCache, Connection, clear_connection, connection, register_connection,
};
pub use criteria::{Criteria, CriteriaArg};
pub use crud::{Crud, DbCrud, KeyValue, PrimaryKey};
pub use error::{ErrorCode, QueryError, QueryResult};
pub use relations::{RelationNode, RelationRequest, RelationTree};
pub use sql::{DatabaseType, Select, to_positional};
pub use value::{ParamMap, Row, Value, row_to_json};

#[doc(hidden)]
pub use tracing as __tracing;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::condition::{Condition, ConditionFactory, Operator};
    pub use crate::criteria::{Criteria, CriteriaArg};
    pub use crate::crud::{Crud, DbCrud, KeyValue, PrimaryKey};
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::relations::RelationTree;
    pub use crate::row;
    pub use crate::value::{Row, Value};
}
