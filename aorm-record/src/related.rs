//! Related records and the per-model relation tables that load them.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use aorm_query::{QueryResult, RelationTree, Row, Value};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::model::Model;
use crate::record::Record;

/// A record of any model type.
///
/// Related records of different model types live side by side in a
/// [`Related`]; this is the interface they share. Use
/// [`Related::as_one`] / [`Related::records`] to get the typed record back.
pub trait Entity: Any + Send + Sync + fmt::Debug {
    /// Name of the model type.
    fn model_name(&self) -> &'static str;

    /// The field map.
    fn data(&self) -> &Row;

    /// A field value.
    fn value(&self, name: &str) -> QueryResult<&Value>;

    /// Set a field value.
    fn set_value(&mut self, name: &str, value: Value) -> QueryResult<()>;

    /// Make the record, and everything related to it, immutable.
    fn make_immutable(&mut self);

    /// Whether the record is immutable.
    fn is_immutable(&self) -> bool;

    /// Whether the record was never persisted.
    fn is_new(&self) -> bool;

    /// Resolve the relations requested by `tree`, recursively.
    fn resolve(&mut self, tree: &RelationTree) -> QueryResult<()>;

    /// A relation, resolving it if necessary.
    fn related(&mut self, name: &str) -> QueryResult<&Related>;

    /// The field map plus every resolved relation, as JSON.
    fn data_with_relations(&self) -> JsonValue;

    /// Upcast for downcasting to the concrete record type.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for downcasting to the concrete record type.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The result of resolving one relation.
#[derive(Debug, Default)]
pub enum Related {
    /// A to-one relation.
    One(Box<dyn Entity>),
    /// A to-many relation.
    Many(Vec<Box<dyn Entity>>),
    /// A to-one relation with no counterpart.
    #[default]
    Empty,
}

impl Related {
    /// A to-one result.
    pub fn one<M: Model>(record: Record<M>) -> Self {
        Self::One(Box::new(record))
    }

    /// A to-many result.
    pub fn many<M: Model>(records: Vec<Record<M>>) -> Self {
        Self::Many(
            records
                .into_iter()
                .map(|r| Box::new(r) as Box<dyn Entity>)
                .collect(),
        )
    }

    /// A to-one result that may be missing.
    pub fn optional<M: Model>(record: Option<Record<M>>) -> Self {
        record.map_or(Self::Empty, Self::one)
    }

    /// The related records as a sequence: one, many, or none.
    pub fn entities(&self) -> Vec<&dyn Entity> {
        match self {
            Self::One(entity) => vec![&**entity],
            Self::Many(entities) => entities.iter().map(|e| &**e).collect(),
            Self::Empty => Vec::new(),
        }
    }

    /// Mutable access to the related records as a sequence.
    pub fn entities_mut(&mut self) -> Vec<&mut Box<dyn Entity>> {
        match self {
            Self::One(entity) => vec![entity],
            Self::Many(entities) => entities.iter_mut().collect(),
            Self::Empty => Vec::new(),
        }
    }

    /// Number of related records.
    pub fn len(&self) -> usize {
        match self {
            Self::One(_) => 1,
            Self::Many(entities) => entities.len(),
            Self::Empty => 0,
        }
    }

    /// Whether there are no related records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The to-one record, if it is a `Record<M>`.
    pub fn as_one<M: Model>(&self) -> Option<&Record<M>> {
        match self {
            Self::One(entity) => entity.as_any().downcast_ref::<Record<M>>(),
            _ => None,
        }
    }

    /// Every related record that is a `Record<M>`, in order.
    pub fn records<M: Model>(&self) -> Vec<&Record<M>> {
        self.entities()
            .into_iter()
            .filter_map(|e| e.as_any().downcast_ref::<Record<M>>())
            .collect()
    }

    /// Mutable access to every related record that is a `Record<M>`.
    pub fn records_mut<M: Model>(&mut self) -> Vec<&mut Record<M>> {
        self.entities_mut()
            .into_iter()
            .filter_map(|e| e.as_any_mut().downcast_mut::<Record<M>>())
            .collect()
    }

    pub(crate) fn make_immutable(&mut self) {
        for entity in self.entities_mut() {
            entity.make_immutable();
        }
    }

    /// JSON form: an object, an array of objects, or null.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::One(entity) => entity.data_with_relations(),
            Self::Many(entities) => entities.iter().map(|e| e.data_with_relations()).collect(),
            Self::Empty => JsonValue::Null,
        }
    }
}

impl<M: Model> From<Record<M>> for Related {
    fn from(record: Record<M>) -> Self {
        Self::one(record)
    }
}

impl<M: Model> From<Vec<Record<M>>> for Related {
    fn from(records: Vec<Record<M>>) -> Self {
        Self::many(records)
    }
}

impl<M: Model> From<Option<Record<M>>> for Related {
    fn from(record: Option<Record<M>>) -> Self {
        Self::optional(record)
    }
}

/// Loads one relation of a `Record<M>`.
pub type Loader<M> = Arc<dyn Fn(&Record<M>) -> QueryResult<Related> + Send + Sync>;

/// Relation name to loader, declared once per model type.
///
/// ```rust,ignore
/// fn relations() -> RelationTable<Self> {
///     RelationTable::new().with("comments", |post: &Record<Post>| {
///         let post_id = post.value("post_id")?.clone();
///         Ok(Comment::fetch_all(row! { "post_id" => post_id })?.into())
///     })
/// }
/// ```
pub struct RelationTable<M: Model> {
    loaders: IndexMap<String, Loader<M>>,
}

impl<M: Model> RelationTable<M> {
    /// A table with no relations.
    pub fn new() -> Self {
        Self {
            loaders: IndexMap::new(),
        }
    }

    /// Add a relation.
    pub fn with<F>(mut self, name: impl Into<String>, loader: F) -> Self
    where
        F: Fn(&Record<M>) -> QueryResult<Related> + Send + Sync + 'static,
    {
        self.loaders.insert(name.into(), Arc::new(loader));
        self
    }

    /// The loader of a relation.
    pub fn get(&self, name: &str) -> Option<&Loader<M>> {
        self.loaders.get(name)
    }

    /// Whether the relation is declared.
    pub fn contains(&self, name: &str) -> bool {
        self.loaders.contains_key(name)
    }

    /// Declared relation names, in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.loaders.keys().map(String::as_str)
    }

    /// Number of declared relations.
    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    /// Whether no relation is declared.
    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }
}

impl<M: Model> Default for RelationTable<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> fmt::Debug for RelationTable<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelationTable")
            .field("model", &M::NAME)
            .field("relations", &self.loaders.keys().collect::<Vec<_>>())
            .finish()
    }
}
