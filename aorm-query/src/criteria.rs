//! Fetch criteria: a condition, the relations to resolve, and an immutability flag.
//!
//! ```rust
//! use aorm_query::{Criteria, ConditionFactory, Operator};
//!
//! let f = ConditionFactory::new();
//! let mut criteria = Criteria::create();
//! criteria
//!     .add_condition(f.equals("author", "Deniz"))?
//!     .add_condition_with(f.is_null("deleted_on"), Operator::Or)?
//!     .add_related("comments.author")?
//!     .immutable()?;
//!
//! assert!(criteria.is_immutable());
//! assert_eq!(criteria.related_map().len(), 1);
//! # Ok::<(), aorm_query::QueryError>(())
//! ```

use std::collections::HashMap;
use std::sync::OnceLock;

use serde_json::Value as JsonValue;
use tracing::trace;

use crate::condition::{Condition, ConditionFactory, Operator};
use crate::error::{QueryError, QueryResult};
use crate::relations::{RelationRequest, RelationTree};
use crate::value::{Row, Value};

#[derive(Debug, Clone, Default, PartialEq)]
struct Parts {
    condition: Option<Condition>,
    related: RelationTree,
    immutable: bool,
}

#[derive(Debug, Clone, PartialEq)]
enum Inner {
    Null,
    Regular(Parts),
}

/// What to fetch.
///
/// A regular criteria is built up in place with the `add_*` methods. The
/// null criteria ([`Criteria::null`]) stands in when no criteria was given:
/// it has no condition and no relations, and every mutator fails.
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria(Inner);

impl Default for Criteria {
    fn default() -> Self {
        Self::create()
    }
}

impl Criteria {
    /// An empty regular criteria.
    pub fn create() -> Self {
        Self(Inner::Regular(Parts::default()))
    }

    /// A regular criteria holding `condition`.
    pub fn create_with(condition: Condition) -> Self {
        Self(Inner::Regular(Parts {
            condition: Some(condition),
            ..Parts::default()
        }))
    }

    /// The null criteria.
    pub fn null() -> Self {
        Self(Inner::Null)
    }

    fn parts_mut(&mut self) -> QueryResult<&mut Parts> {
        match &mut self.0 {
            Inner::Regular(parts) => Ok(parts),
            Inner::Null => Err(QueryError::immutable("NullCriteria cannot be modified")
                .with_suggestion("Start from Criteria::create() instead")),
        }
    }

    /// AND the condition into this criteria.
    pub fn add_condition(&mut self, condition: Condition) -> QueryResult<&mut Self> {
        self.add_condition_with(condition, Operator::And)
    }

    /// Set the condition, or combine the existing one with `condition` by `operator`.
    pub fn add_condition_with(
        &mut self,
        condition: Condition,
        operator: Operator,
    ) -> QueryResult<&mut Self> {
        let parts = self.parts_mut()?;
        parts.condition = Some(match parts.condition.take() {
            Some(existing) => existing.combine_with(condition, operator),
            None => condition,
        });
        Ok(self)
    }

    /// Request a relation by name, dotted path, or tree.
    pub fn add_related(&mut self, request: impl Into<RelationRequest>) -> QueryResult<&mut Self> {
        let RelationRequest(tree) = request.into();
        self.parts_mut()?.related.merge(&tree);
        Ok(self)
    }

    /// Make the records fetched with this criteria immutable.
    ///
    /// The criteria itself stays buildable.
    pub fn immutable(&mut self) -> QueryResult<&mut Self> {
        self.parts_mut()?.immutable = true;
        Ok(self)
    }

    /// Fold `other` into this criteria: AND its condition, merge its relation
    /// tree, and take on its immutability.
    pub fn add_criteria(&mut self, other: &Criteria) -> QueryResult<&mut Self> {
        self.parts_mut()?;
        if let Some(condition) = other.condition() {
            self.add_condition(condition.clone())?;
        }
        if !other.related_map().is_empty() {
            self.add_related(other.related_map())?;
        }
        if other.is_immutable() {
            self.immutable()?;
        }
        Ok(self)
    }

    /// The condition, if any.
    pub fn condition(&self) -> Option<&Condition> {
        match &self.0 {
            Inner::Regular(parts) => parts.condition.as_ref(),
            Inner::Null => None,
        }
    }

    /// The requested relations.
    pub fn related_map(&self) -> &RelationTree {
        static EMPTY: OnceLock<RelationTree> = OnceLock::new();
        match &self.0 {
            Inner::Regular(parts) => &parts.related,
            Inner::Null => EMPTY.get_or_init(RelationTree::new),
        }
    }

    /// Whether fetched records are made immutable.
    pub fn is_immutable(&self) -> bool {
        match &self.0 {
            Inner::Regular(parts) => parts.immutable,
            Inner::Null => false,
        }
    }

    /// Whether this is the null criteria.
    pub fn is_null(&self) -> bool {
        matches!(self.0, Inner::Null)
    }
}

/// The forms a fetch accepts in place of a [`Criteria`].
#[derive(Debug, Clone)]
pub enum CriteriaArg {
    /// No criteria: everything, no relations.
    None,
    /// A single condition.
    Condition(Condition),
    /// `field = value` for every entry, AND-ed in order.
    Fields(Row),
    /// JSON shorthand; an object is read as [`CriteriaArg::Fields`].
    Json(JsonValue),
    /// A ready criteria, used as is.
    Criteria(Criteria),
}

impl CriteriaArg {
    /// Normalize into a canonical [`Criteria`].
    pub fn into_criteria(self) -> QueryResult<Criteria> {
        let criteria = match self {
            Self::None => Criteria::null(),
            Self::Criteria(criteria) => criteria,
            Self::Condition(condition) => Criteria::create_with(condition),
            Self::Fields(fields) => equality_criteria(fields)?,
            Self::Json(json) => match json {
                JsonValue::Null => Criteria::null(),
                JsonValue::Object(map) => {
                    equality_criteria(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())?
                }
                JsonValue::Array(_) => {
                    return Err(QueryError::invalid_criteria(
                        "criteria array must be associative",
                    ));
                }
                other => {
                    return Err(QueryError::invalid_criteria(format!(
                        "Unhandled criteria type: {}",
                        json_type_name(&other)
                    )));
                }
            },
        };
        trace!(
            null = criteria.is_null(),
            immutable = criteria.is_immutable(),
            relations = criteria.related_map().len(),
            "normalized criteria"
        );
        Ok(criteria)
    }
}

fn equality_criteria(fields: Row) -> QueryResult<Criteria> {
    let factory = ConditionFactory::new();
    let mut criteria = Criteria::create();
    for (field, value) in fields {
        criteria.add_condition(factory.equals(field, value))?;
    }
    Ok(criteria)
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

impl From<()> for CriteriaArg {
    fn from(_: ()) -> Self {
        Self::None
    }
}

impl From<Criteria> for CriteriaArg {
    fn from(criteria: Criteria) -> Self {
        Self::Criteria(criteria)
    }
}

impl From<&Criteria> for CriteriaArg {
    fn from(criteria: &Criteria) -> Self {
        Self::Criteria(criteria.clone())
    }
}

impl From<&mut Criteria> for CriteriaArg {
    fn from(criteria: &mut Criteria) -> Self {
        Self::Criteria(criteria.clone())
    }
}

impl From<Option<Criteria>> for CriteriaArg {
    fn from(criteria: Option<Criteria>) -> Self {
        criteria.map_or(Self::None, Self::Criteria)
    }
}

impl From<Condition> for CriteriaArg {
    fn from(condition: Condition) -> Self {
        Self::Condition(condition)
    }
}

impl From<Row> for CriteriaArg {
    fn from(fields: Row) -> Self {
        Self::Fields(fields)
    }
}

impl From<HashMap<String, Value>> for CriteriaArg {
    fn from(fields: HashMap<String, Value>) -> Self {
        // HashMap has no order of its own; sort so the rendered SQL is stable.
        let mut entries: Vec<_> = fields.into_iter().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self::Fields(entries.into_iter().collect())
    }
}

impl From<JsonValue> for CriteriaArg {
    fn from(json: JsonValue) -> Self {
        Self::Json(json)
    }
}
