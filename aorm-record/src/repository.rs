//! Collection-style access to the records of one model type.

use std::fmt;
use std::marker::PhantomData;

use aorm_query::{Criteria, CriteriaArg, KeyValue, QueryResult};

use crate::model::Model;
use crate::record::Record;

/// Fetch, save and delete records of `M`.
///
/// A thin layer over the [`Model`] functions, for code that prefers passing
/// a repository value around.
pub struct Repository<M: Model> {
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> Repository<M> {
    /// A repository for `M`.
    pub fn new() -> Self {
        Self {
            _model: PhantomData,
        }
    }

    /// See [`Model::fetch_by_primary_key`].
    pub fn get_by_primary_key(
        &self,
        key: impl Into<KeyValue>,
        extra: Option<&Criteria>,
    ) -> QueryResult<Record<M>> {
        M::fetch_by_primary_key(key, extra)
    }

    /// See [`Model::fetch_one`].
    pub fn get_one(&self, criteria: impl Into<CriteriaArg>) -> QueryResult<Option<Record<M>>> {
        M::fetch_one(criteria)
    }

    /// See [`Model::fetch_all`].
    pub fn get_all(&self, criteria: impl Into<CriteriaArg>) -> QueryResult<Vec<Record<M>>> {
        M::fetch_all(criteria)
    }

    /// See [`Record::save`].
    pub fn save(&self, record: &mut Record<M>) -> QueryResult<()> {
        record.save()
    }

    /// See [`Record::delete`].
    pub fn delete(&self, record: &mut Record<M>) -> QueryResult<()> {
        record.delete()
    }
}

impl<M: Model> Default for Repository<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> Clone for Repository<M> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<M: Model> fmt::Debug for Repository<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository").field("model", &M::NAME).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::blog_models;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_repository_delegates_to_model() {
        blog_models!();
        seed_blog();

        let posts = Repository::<Post>::default();
        assert_eq!(posts.get_all(row! { "author" => "Deniz" }).unwrap().len(), 2);

        let mut post = posts.get_by_primary_key(2, None).unwrap();
        post.set("title", "Renamed").unwrap();
        posts.save(&mut post).unwrap();

        let reloaded = posts.get_one(row! { "post_id" => 2 }).unwrap().unwrap();
        assert_eq!(reloaded.value("title").unwrap(), &aorm_query::Value::from("Renamed"));

        posts.delete(&mut post).unwrap();
        assert!(posts.get_one(row! { "post_id" => 2 }).unwrap().is_none());
        assert_eq!(format!("{:?}", posts), "Repository { model: \"Post\" }");
    }
}
