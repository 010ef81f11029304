//! # aorm-record
//!
//! Active records for the AORM data-access layer.
//!
//! A [`Model`] names a record type, its storage collaborator and its
//! relations. [`Record`]s of that model carry a field map, a lifecycle state
//! and the relations resolved so far:
//!
//! ```rust,ignore
//! use aorm_record::prelude::*;
//!
//! let mut criteria = Criteria::create();
//! criteria
//!     .add_condition(Post::condition().equals("author", "Deniz"))?
//!     .add_related("comments.author")?;
//!
//! for mut post in Post::fetch_all(criteria)? {
//!     post.set("title", "Edited")?;
//!     post.save()?;
//! }
//! ```
//!
//! Relations are loaded on first access through [`Record::get_related`], or
//! eagerly for every fetched record when the criteria request them. Related
//! records are type-erased behind [`Entity`] and recovered with
//! [`Related::as_one`] / [`Related::records`].

pub mod model;
pub mod record;
pub mod related;
pub mod registry;
pub mod repository;

#[cfg(test)]
pub(crate) mod testing;

pub use model::Model;
pub use record::{Field, Record, RecordState};
pub use related::{Entity, Loader, Related, RelationTable};
pub use registry::{CrudFactory, register_crud, reset, set_crud_override, unregister_crud};
pub use repository::Repository;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::model::Model;
    pub use crate::record::{Field, Record, RecordState};
    pub use crate::related::{Entity, Related, RelationTable};
    pub use crate::repository::Repository;
    pub use aorm_query::prelude::*;
}
