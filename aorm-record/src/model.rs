//! The model trait: one implementation per record type.

use std::sync::Arc;

use aorm_query::{
    ConditionFactory, Criteria, CriteriaArg, Crud, KeyValue, QueryError, QueryResult,
};
use tracing::debug;

use crate::record::Record;
use crate::registry;
use crate::related::RelationTable;

/// A record type backed by a [`Crud`].
///
/// ```rust,ignore
/// struct Post;
///
/// impl Model for Post {
///     const NAME: &'static str = "Post";
///
///     fn create_crud() -> Arc<dyn Crud> {
///         Arc::new(DbCrud::new("post", PrimaryKey::single("post_id")))
///     }
///
///     fn relations() -> RelationTable<Self> {
///         RelationTable::new().with("comments", |post: &Record<Post>| {
///             let post_id = post.value("post_id")?.clone();
///             Ok(Comment::fetch_all(row! { "post_id" => post_id })?.into())
///         })
///     }
/// }
///
/// let posts = Post::fetch_all(json!({"author": "Deniz"}))?;
/// ```
pub trait Model: Sized + 'static {
    /// Model name used in logs and errors.
    const NAME: &'static str;

    /// Build the storage collaborator. Called once per process, the result is
    /// cached by the registry.
    fn create_crud() -> Arc<dyn Crud>;

    /// Declared relations. Called once per process, the result is cached by
    /// the registry.
    fn relations() -> RelationTable<Self> {
        RelationTable::new()
    }

    /// Runs before `save()` and `insert()` hand the record to storage.
    fn before_save(_record: &mut Record<Self>) -> QueryResult<()> {
        Ok(())
    }

    /// Runs after a successful `save()` or `insert()`.
    fn after_save(_record: &mut Record<Self>) -> QueryResult<()> {
        Ok(())
    }

    /// Runs before `delete()` hands the key to storage.
    fn before_delete(_record: &mut Record<Self>) -> QueryResult<()> {
        Ok(())
    }

    /// Runs after a successful `delete()`.
    fn after_delete(_record: &mut Record<Self>) -> QueryResult<()> {
        Ok(())
    }

    /// The storage collaborator, from the registry.
    fn crud() -> Arc<dyn Crud> {
        registry::crud::<Self>()
    }

    /// The condition factory.
    fn condition() -> &'static ConditionFactory {
        static FACTORY: ConditionFactory = ConditionFactory;
        &FACTORY
    }

    /// The first record matching `criteria`, or `None`.
    fn fetch_one(criteria: impl Into<CriteriaArg>) -> QueryResult<Option<Record<Self>>> {
        let criteria = criteria.into().into_criteria()?;
        debug!(model = Self::NAME, "fetching one");
        match Self::crud().fetch_one(&criteria)? {
            Some(row) => Record::materialize(row, &criteria).map(Some),
            None => Ok(None),
        }
    }

    /// Every record matching `criteria`.
    fn fetch_all(criteria: impl Into<CriteriaArg>) -> QueryResult<Vec<Record<Self>>> {
        let criteria = criteria.into().into_criteria()?;
        let rows = Self::crud().fetch_all(&criteria)?;
        debug!(model = Self::NAME, rows = rows.len(), "fetched all");
        rows.into_iter()
            .map(|row| Record::materialize(row, &criteria))
            .collect()
    }

    /// The record with the given primary key, with `extra` criteria folded in.
    ///
    /// Fails with a not-found error when nothing matches.
    fn fetch_by_primary_key(
        key: impl Into<KeyValue>,
        extra: Option<&Criteria>,
    ) -> QueryResult<Record<Self>> {
        let key = key.into();
        let key_row = key.to_row(&Self::crud().primary_key())?;

        let mut criteria = Criteria::create();
        for (column, value) in &key_row {
            criteria.add_condition(Self::condition().equals(column.clone(), value.clone()))?;
        }
        if let Some(extra) = extra {
            criteria.add_criteria(extra)?;
        }

        Self::fetch_one(criteria)?.ok_or_else(|| {
            let key_text = key_row
                .iter()
                .map(|(column, value)| format!("{}={}", column, value.to_json()))
                .collect::<Vec<_>>()
                .join(", ");
            QueryError::not_found(Self::NAME)
                .with_context(format!("Fetching {} by primary key {}", Self::NAME, key_text))
        })
    }
}
