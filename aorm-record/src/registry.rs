//! Process-wide caches of relation tables and storage collaborators.
//!
//! Both caches are keyed by model type, filled on first use, and never
//! invalidated except through the hooks below, which exist for tests:
//!
//! - [`register_crud`] installs a [`Crud`] for one model type
//! - [`set_crud_override`] builds every other model's `Crud` from a factory
//! - [`reset`] forgets everything
//!
//! Lookup order for a model's `Crud` is: registered instance, override
//! factory, then the cached result of [`Model::create_crud`].

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use aorm_query::Crud;
use parking_lot::RwLock;
use tracing::debug;

use crate::model::Model;
use crate::related::RelationTable;

pub use aorm_query::{clear_connection, connection, register_connection};

/// Builds a [`Crud`] for the model with the given name.
pub type CrudFactory = Arc<dyn Fn(&'static str) -> Arc<dyn Crud> + Send + Sync>;

type CrudMap = HashMap<TypeId, Arc<dyn Crud>>;

#[derive(Default)]
struct Registry {
    relations: RwLock<HashMap<TypeId, Arc<dyn Any + Send + Sync>>>,
    cruds: RwLock<CrudMap>,
    registered: RwLock<CrudMap>,
    override_factory: RwLock<Option<CrudFactory>>,
    overrides: RwLock<CrudMap>,
}

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(Registry::default)
}

fn cached_crud(map: &RwLock<CrudMap>, key: TypeId) -> Option<Arc<dyn Crud>> {
    map.read().get(&key).cloned()
}

/// The relation table of `M`, built by [`Model::relations`] on first use.
pub fn relations<M: Model>() -> Arc<RelationTable<M>> {
    let key = TypeId::of::<M>();
    let cached = registry().relations.read().get(&key).cloned();
    if let Some(table) = cached.and_then(|any| any.downcast::<RelationTable<M>>().ok()) {
        return table;
    }

    // Built outside the lock: relation declarations may touch the registry.
    let table = Arc::new(M::relations());
    debug!(model = M::NAME, relations = table.len(), "caching relation table");
    let mut relations = registry().relations.write();
    let entry = relations
        .entry(key)
        .or_insert_with(|| Arc::clone(&table) as Arc<dyn Any + Send + Sync>);
    Arc::clone(entry)
        .downcast::<RelationTable<M>>()
        .unwrap_or(table)
}

/// The storage collaborator of `M`.
pub fn crud<M: Model>() -> Arc<dyn Crud> {
    let key = TypeId::of::<M>();
    let registry = registry();

    if let Some(crud) = cached_crud(&registry.registered, key) {
        return crud;
    }

    let factory = registry.override_factory.read().clone();
    if let Some(factory) = factory {
        if let Some(crud) = cached_crud(&registry.overrides, key) {
            return crud;
        }
        let crud = factory(M::NAME);
        debug!(model = M::NAME, "using overridden crud");
        return Arc::clone(registry.overrides.write().entry(key).or_insert(crud));
    }

    if let Some(crud) = cached_crud(&registry.cruds, key) {
        return crud;
    }
    let crud = M::create_crud();
    debug!(model = M::NAME, "caching crud");
    Arc::clone(registry.cruds.write().entry(key).or_insert(crud))
}

/// Install `crud` as the storage collaborator of `M`, ahead of any override.
pub fn register_crud<M: Model>(crud: Arc<dyn Crud>) {
    debug!(model = M::NAME, "registering crud");
    registry().registered.write().insert(TypeId::of::<M>(), crud);
}

/// Remove a collaborator installed with [`register_crud`].
pub fn unregister_crud<M: Model>() {
    registry().registered.write().remove(&TypeId::of::<M>());
}

/// Build the `Crud` of every model from `factory`, or stop doing so with
/// `None`. Either way, collaborators built by an earlier factory are dropped.
pub fn set_crud_override(factory: Option<CrudFactory>) {
    let registry = registry();
    *registry.override_factory.write() = factory;
    registry.overrides.write().clear();
}

/// Forget every cached relation table and collaborator, every override, and
/// the default connection.
pub fn reset() {
    let registry = registry();
    registry.relations.write().clear();
    registry.cruds.write().clear();
    registry.registered.write().clear();
    *registry.override_factory.write() = None;
    registry.overrides.write().clear();
    clear_connection();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::blog_models;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_crud_and_relations_are_cached_per_model() {
        blog_models!();

        assert!(Arc::ptr_eq(&crud::<Post>(), &crud::<Post>()));
        assert!(!Arc::ptr_eq(&crud::<Post>(), &crud::<Comment>()));
        assert!(Arc::ptr_eq(&relations::<Post>(), &relations::<Post>()));
        assert_eq!(relations::<Post>().names().collect::<Vec<_>>(), vec!["comments", "author"]);
        assert!(relations::<Author>().is_empty());
    }

    #[test]
    fn test_registered_crud_takes_precedence() {
        blog_models!();
        seed_blog();

        let replacement: Arc<dyn Crud> = Arc::new(MemoryCrud::new(PrimaryKey::single("post_id")));
        register_crud::<Post>(Arc::clone(&replacement));
        assert!(Arc::ptr_eq(&Post::crud(), &replacement));
        assert!(Post::fetch_all(()).unwrap().is_empty());

        unregister_crud::<Post>();
        assert_eq!(Post::fetch_all(()).unwrap().len(), 3);
    }
}
