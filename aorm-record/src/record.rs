//! Active records: a field map plus lifecycle state and resolved relations.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use aorm_query::{
    Criteria, QueryError, QueryResult, RelationTree, Row, Value, aorm_trace, row_to_json,
};
use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use tracing::{debug, trace};

use crate::model::Model;
use crate::registry;
use crate::related::{Entity, Related, RelationTable};

/// Lifecycle state of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Not yet persisted.
    New,
    /// Loaded from or saved to storage.
    Persisted,
    /// Deleted from storage; no further storage operations are allowed.
    Deleted,
}

/// A field read through [`Record::get`].
#[derive(Debug, Clone, Copy)]
pub enum Field<'a> {
    /// A plain field value.
    Value(&'a Value),
    /// A resolved relation.
    Related(&'a Related),
}

impl<'a> Field<'a> {
    /// The value, if this is a plain field.
    pub fn as_value(&self) -> Option<&'a Value> {
        match self {
            Self::Value(value) => Some(value),
            Self::Related(_) => None,
        }
    }

    /// The relation, if this is one.
    pub fn as_related(&self) -> Option<&'a Related> {
        match self {
            Self::Related(related) => Some(related),
            Self::Value(_) => None,
        }
    }
}

/// One record of model `M`.
pub struct Record<M: Model> {
    data: Row,
    related: IndexMap<String, Related>,
    state: RecordState,
    immutable: bool,
    _model: PhantomData<fn() -> M>,
}

impl<M: Model> fmt::Debug for Record<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Record")
            .field("model", &M::NAME)
            .field("data", &self.data)
            .field("related", &self.related.keys().collect::<Vec<_>>())
            .field("state", &self.state)
            .field("immutable", &self.immutable)
            .finish()
    }
}

impl<M: Model> Record<M> {
    /// A new, not yet persisted record.
    pub fn new(data: Row) -> Self {
        Self::with_state(data, RecordState::New)
    }

    /// A record for a row that came from storage.
    pub fn hydrate(data: Row) -> Self {
        Self::with_state(data, RecordState::Persisted)
    }

    fn with_state(data: Row, state: RecordState) -> Self {
        Self {
            data,
            related: IndexMap::new(),
            state,
            immutable: false,
            _model: PhantomData,
        }
    }

    /// Hydrate `row` and apply `criteria`: immutability, then the requested
    /// relation tree.
    pub(crate) fn materialize(row: Row, criteria: &Criteria) -> QueryResult<Self> {
        let mut record = Self::hydrate(row);
        aorm_trace!(model = M::NAME, fields = record.data.len(), "hydrated record");
        if criteria.is_immutable() {
            record.make_immutable();
        }
        record.resolve(criteria.related_map())?;
        Ok(record)
    }

    fn relation_table() -> Arc<RelationTable<M>> {
        registry::relations::<M>()
    }

    // ============== State ==============

    /// Lifecycle state.
    pub fn state(&self) -> RecordState {
        self.state
    }

    /// Whether the record was never persisted.
    pub fn is_new(&self) -> bool {
        self.state == RecordState::New
    }

    /// Whether the record was deleted.
    pub fn is_deleted(&self) -> bool {
        self.state == RecordState::Deleted
    }

    /// Make the record immutable. Relations resolved now or later are made
    /// immutable too. There is no way back.
    pub fn make_immutable(&mut self) -> &mut Self {
        self.immutable = true;
        for related in self.related.values_mut() {
            related.make_immutable();
        }
        self
    }

    /// Whether field changes are rejected.
    pub fn is_immutable(&self) -> bool {
        self.immutable
    }

    fn ensure_mutable(&self) -> QueryResult<()> {
        if self.immutable {
            return Err(QueryError::immutable("cannot change immutable object").with_model(M::NAME));
        }
        Ok(())
    }

    fn ensure_not_deleted(&self) -> QueryResult<()> {
        if self.is_deleted() {
            return Err(QueryError::deleted(M::NAME));
        }
        Ok(())
    }

    // ============== Fields ==============

    /// Read a field or relation by name.
    ///
    /// Declared relations take precedence over fields of the same name and are
    /// resolved on first access.
    pub fn get(&mut self, name: &str) -> QueryResult<Field<'_>> {
        if Self::relation_table().contains(name) {
            return self.get_related(name).map(Field::Related);
        }
        self.value(name).map(Field::Value)
    }

    /// A plain field value.
    pub fn value(&self, name: &str) -> QueryResult<&Value> {
        self.data
            .get(name)
            .ok_or_else(|| QueryError::key_not_found(name).with_model(M::NAME))
    }

    /// Set a field.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) -> QueryResult<()> {
        self.ensure_mutable()?;
        self.data.insert(name.into(), value.into());
        Ok(())
    }

    /// Whether `name` is a field, a resolved relation, or a declared relation.
    pub fn contains(&self, name: &str) -> bool {
        self.data.contains_key(name)
            || self.related.contains_key(name)
            || Self::relation_table().contains(name)
    }

    /// Remove a field and any resolved relation of the same name.
    pub fn unset(&mut self, name: &str) -> QueryResult<()> {
        self.ensure_mutable()?;
        self.data.shift_remove(name);
        self.related.shift_remove(name);
        Ok(())
    }

    /// The field map.
    pub fn data(&self) -> &Row {
        &self.data
    }

    /// The field map plus every resolved relation, as JSON.
    pub fn data_with_relations(&self) -> JsonValue {
        let mut json = row_to_json(&self.data);
        if let JsonValue::Object(map) = &mut json {
            for (name, related) in &self.related {
                map.insert(name.clone(), related.to_json());
            }
        }
        json
    }

    /// Set every entry of `data`, keeping fields not mentioned.
    pub fn set_data(&mut self, data: Row) -> QueryResult<()> {
        self.ensure_mutable()?;
        self.data.extend(data);
        Ok(())
    }

    // ============== Relations ==============

    /// A relation, resolved on first access and cached afterwards.
    pub fn get_related(&mut self, name: &str) -> QueryResult<&Related> {
        self.related_mut(name).map(|related| &*related)
    }

    /// Mutable access to a relation, resolving it if necessary.
    pub fn related_mut(&mut self, name: &str) -> QueryResult<&mut Related> {
        if !self.related.contains_key(name) {
            let related = self.load_related(name)?;
            self.related.insert(name.to_string(), related);
        }
        self.related
            .get_mut(name)
            .ok_or_else(|| QueryError::internal(format!("relation {} vanished from cache", name)))
    }

    /// Every declared relation, resolving the ones not resolved yet.
    pub fn get_all_related(&mut self) -> QueryResult<&IndexMap<String, Related>> {
        let table = Self::relation_table();
        for name in table.names() {
            if !self.related.contains_key(name) {
                let related = self.load_related_with(&table, name)?;
                self.related.insert(name.to_string(), related);
            }
        }
        Ok(&self.related)
    }

    fn load_related(&self, name: &str) -> QueryResult<Related> {
        self.load_related_with(&Self::relation_table(), name)
    }

    fn load_related_with(&self, table: &RelationTable<M>, name: &str) -> QueryResult<Related> {
        let loader = table
            .get(name)
            .ok_or_else(|| QueryError::unknown_relation(M::NAME, name))?;
        debug!(model = M::NAME, relation = name, "resolving relation");
        let mut related = (**loader)(self)?;
        if self.immutable {
            related.make_immutable();
        }
        trace!(model = M::NAME, relation = name, count = related.len(), "resolved relation");
        Ok(related)
    }

    /// Resolve the relations requested by `tree`.
    ///
    /// Each named relation is resolved (or taken from the cache). Nested
    /// entries are then resolved on every related record, all the way down.
    pub fn resolve(&mut self, tree: &RelationTree) -> QueryResult<()> {
        for (name, node) in tree {
            let related = self.related_mut(name)?;
            if let Some(subtree) = node.nested() {
                for entity in related.entities_mut() {
                    entity.resolve(subtree)?;
                }
            }
        }
        Ok(())
    }

    // ============== Storage ==============

    /// Insert or update the record.
    ///
    /// Runs the save hooks, stores the field map, and merges the returned
    /// key into the fields.
    pub fn save(&mut self) -> QueryResult<()> {
        self.store(false)
    }

    /// Insert the record. Never updates an existing row; key conflicts fail.
    pub fn insert(&mut self) -> QueryResult<()> {
        self.store(true)
    }

    fn store(&mut self, insert_only: bool) -> QueryResult<()> {
        self.ensure_not_deleted()?;
        M::before_save(self)?;

        let crud = M::crud();
        let key = if insert_only {
            crud.insert(&self.data)?
        } else {
            crud.save(&self.data)?
        };
        let key_row = key.to_row(&crud.primary_key())?;
        debug!(model = M::NAME, insert_only, key = ?key_row, "stored record");
        self.data.extend(key_row);
        self.state = RecordState::Persisted;

        M::after_save(self)
    }

    /// Delete the record from storage.
    ///
    /// Fails for records that were never persisted. Afterwards the record is
    /// marked deleted and refuses further storage operations.
    pub fn delete(&mut self) -> QueryResult<()> {
        self.ensure_not_deleted()?;
        if self.is_new() {
            return Err(QueryError::delete_of_new(M::NAME));
        }
        M::before_delete(self)?;

        let crud = M::crud();
        let key = crud.primary_key().value_of(&self.data)?;
        crud.delete(&key)?;
        debug!(model = M::NAME, "deleted record");

        M::after_delete(self)?;
        self.state = RecordState::Deleted;
        Ok(())
    }
}

impl<M: Model> Entity for Record<M> {
    fn model_name(&self) -> &'static str {
        M::NAME
    }

    fn data(&self) -> &Row {
        &self.data
    }

    fn value(&self, name: &str) -> QueryResult<&Value> {
        Record::value(self, name)
    }

    fn set_value(&mut self, name: &str, value: Value) -> QueryResult<()> {
        Record::set(self, name, value)
    }

    fn make_immutable(&mut self) {
        Record::make_immutable(self);
    }

    fn is_immutable(&self) -> bool {
        self.immutable
    }

    fn is_new(&self) -> bool {
        Record::is_new(self)
    }

    fn resolve(&mut self, tree: &RelationTree) -> QueryResult<()> {
        Record::resolve(self, tree)
    }

    fn related(&mut self, name: &str) -> QueryResult<&Related> {
        self.get_related(name)
    }

    fn data_with_relations(&self) -> JsonValue {
        Record::data_with_relations(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
