//! Conditions for building WHERE clauses.
//!
//! A [`Condition`] is either a single predicate on one field
//! ([`SimpleCondition`]) or a list of conditions joined by AND or OR
//! ([`CompositeCondition`]). Rendering produces SQL with named placeholders
//! (`:field`, `:field__1`, …) and a matching [`ParamMap`].
//!
//! ```rust
//! use aorm_query::{ConditionFactory, Operator};
//!
//! let f = ConditionFactory::new();
//! let condition = f
//!     .equals("author", "Deniz")
//!     .combine_with(f.in_list("status", ["draft", "live"]), Operator::And);
//!
//! let (sql, params) = condition.to_sql(None).unwrap();
//! assert_eq!(sql, "(author = :author) AND (status IN (:status__1, :status__2))");
//! assert_eq!(params.len(), 3);
//! ```

mod factory;
mod params;

use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::{QueryError, QueryResult};
use crate::value::{ParamMap, Value};

pub use factory::ConditionFactory;
pub(crate) use params::ParamNamer;

/// Operator joining the children of a composite condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operator {
    /// All children must hold.
    #[default]
    And,
    /// At least one child must hold.
    Or,
}

impl Operator {
    /// SQL keyword.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// The predicate kind of a [`SimpleCondition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionKind {
    /// `field = :field`
    Equals,
    /// `field <> :field`
    NotEquals,
    /// `field < :field`
    LessThan,
    /// `field <= :field`
    LessThanOrEquals,
    /// `field > :field`
    GreaterThan,
    /// `field >= :field`
    GreaterThanOrEquals,
    /// `field BETWEEN :field__1 AND :field__2`
    Between,
    /// `field NOT BETWEEN :field__1 AND :field__2`
    NotBetween,
    /// `field IN (:field__1, …)`
    In,
    /// `field NOT IN (:field__1, …)`
    NotIn,
    /// `field LIKE :field`
    Like,
    /// `field NOT LIKE :field`
    NotLike,
    /// `field IS NULL`
    IsNull,
    /// `field IS NOT NULL`
    IsNotNull,
    /// Literal SQL expression with caller-supplied parameters.
    Raw,
}

impl ConditionKind {
    /// All kinds, in declaration order.
    pub const ALL: [ConditionKind; 15] = [
        Self::Equals,
        Self::NotEquals,
        Self::LessThan,
        Self::LessThanOrEquals,
        Self::GreaterThan,
        Self::GreaterThanOrEquals,
        Self::Between,
        Self::NotBetween,
        Self::In,
        Self::NotIn,
        Self::Like,
        Self::NotLike,
        Self::IsNull,
        Self::IsNotNull,
        Self::Raw,
    ];

    /// Stable name of the kind (`"equals"`, `"not_in"`, …).
    pub fn name(&self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not_equals",
            Self::LessThan => "less_than",
            Self::LessThanOrEquals => "less_than_or_equals",
            Self::GreaterThan => "greater_than",
            Self::GreaterThanOrEquals => "greater_than_or_equals",
            Self::Between => "between",
            Self::NotBetween => "not_between",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Like => "like",
            Self::NotLike => "not_like",
            Self::IsNull => "is_null",
            Self::IsNotNull => "is_not_null",
            Self::Raw => "raw",
        }
    }

    fn comparison(&self) -> Option<&'static str> {
        match self {
            Self::Equals => Some("="),
            Self::NotEquals => Some("<>"),
            Self::LessThan => Some("<"),
            Self::LessThanOrEquals => Some("<="),
            Self::GreaterThan => Some(">"),
            Self::GreaterThanOrEquals => Some(">="),
            _ => None,
        }
    }

    fn not_keyword(&self) -> &'static str {
        match self {
            Self::NotBetween | Self::NotIn | Self::NotLike | Self::IsNotNull => "NOT ",
            _ => "",
        }
    }
}

impl fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConditionKind {
    type Err = QueryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == name)
            .ok_or_else(|| QueryError::unsupported_condition(name))
    }
}

/// A single predicate on one field.
#[derive(Debug, Clone, PartialEq)]
pub struct SimpleCondition {
    kind: ConditionKind,
    field: String,
    value: Option<Value>,
    value2: Option<Value>,
    raw_params: ParamMap,
}

impl SimpleCondition {
    /// Create a predicate. For [`ConditionKind::Raw`], `field` holds the expression.
    pub fn new(
        kind: ConditionKind,
        field: impl Into<String>,
        value: Option<Value>,
        value2: Option<Value>,
    ) -> Self {
        Self {
            kind,
            field: field.into(),
            value,
            value2,
            raw_params: ParamMap::new(),
        }
    }

    /// Create a predicate from a kind name, failing for unknown kinds.
    pub fn from_kind_name(
        kind: &str,
        field: impl Into<String>,
        value: Option<Value>,
        value2: Option<Value>,
    ) -> QueryResult<Self> {
        Ok(Self::new(kind.parse()?, field, value, value2))
    }

    /// Create a raw SQL predicate. Parameter names must match the
    /// placeholders used in `expression`.
    pub fn raw(expression: impl Into<String>, params: ParamMap) -> Self {
        Self {
            kind: ConditionKind::Raw,
            field: expression.into(),
            value: None,
            value2: None,
            raw_params: params,
        }
    }

    /// The predicate kind.
    pub fn kind(&self) -> ConditionKind {
        self.kind
    }

    /// The field name, or the expression text of a raw predicate.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// The first operand.
    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    /// The second operand (BETWEEN upper bound).
    pub fn value2(&self) -> Option<&Value> {
        self.value2.as_ref()
    }

    /// The parameters supplied with a raw predicate.
    pub fn raw_params(&self) -> &ParamMap {
        &self.raw_params
    }

    fn in_values(&self) -> Vec<Value> {
        match &self.value {
            Some(value) => value.elements().into_iter().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Allocate placeholder names and record the bound values. Returns the
    /// names in the order they appear in the fragment.
    fn bind(&self, namer: &mut ParamNamer, params: &mut ParamMap) -> Vec<String> {
        match self.kind {
            ConditionKind::Raw => {
                params.extend(self.raw_params.iter().map(|(k, v)| (k.clone(), v.clone())));
                Vec::new()
            }
            ConditionKind::IsNull | ConditionKind::IsNotNull => Vec::new(),
            ConditionKind::In | ConditionKind::NotIn => {
                let values = self.in_values();
                let names = namer.many(&self.field, values.len());
                params.extend(names.iter().cloned().zip(values));
                names
            }
            ConditionKind::Between | ConditionKind::NotBetween => {
                let (Some(low), Some(high)) = (&self.value, &self.value2) else {
                    return Vec::new();
                };
                let names = namer.many(&self.field, 2);
                params.insert(names[0].clone(), low.clone());
                params.insert(names[1].clone(), high.clone());
                names
            }
            _ => {
                let name = namer.single(&self.field);
                params.insert(name.clone(), self.value.clone().unwrap_or_default());
                vec![name]
            }
        }
    }

    fn write(
        &self,
        alias: Option<&str>,
        namer: &mut ParamNamer,
        params: &mut ParamMap,
    ) -> QueryResult<String> {
        let names = self.bind(namer, params);
        let column = match alias {
            Some(alias) => format!("{}.{}", alias, self.field),
            None => self.field.clone(),
        };
        let not = self.kind.not_keyword();

        if let Some(op) = self.kind.comparison() {
            return Ok(format!("{} {} :{}", column, op, names[0]));
        }

        match self.kind {
            ConditionKind::Between | ConditionKind::NotBetween => {
                if self.value.is_none() || self.value2.is_none() {
                    return Err(QueryError::unsupported_condition(self.kind.name())
                        .with_context("BETWEEN requires two operands"));
                }
                Ok(format!(
                    "{} {}BETWEEN :{} AND :{}",
                    column, not, names[0], names[1]
                ))
            }
            ConditionKind::In | ConditionKind::NotIn => {
                if names.is_empty() {
                    return Err(QueryError::unsupported_condition(self.kind.name())
                        .with_context("IN requires at least one value"));
                }
                let placeholders: Vec<_> = names.iter().map(|n| format!(":{}", n)).collect();
                Ok(format!("{} {}IN ({})", column, not, placeholders.join(", ")))
            }
            ConditionKind::Like | ConditionKind::NotLike => {
                Ok(format!("{} {}LIKE :{}", column, not, names[0]))
            }
            ConditionKind::IsNull | ConditionKind::IsNotNull => {
                Ok(format!("{} IS {}NULL", column, not))
            }
            ConditionKind::Raw => Ok(self.field.clone()),
            other => Err(QueryError::unsupported_condition(other.name())),
        }
    }
}

/// Conditions joined by one operator.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeCondition {
    children: Vec<Condition>,
    operator: Operator,
}

impl CompositeCondition {
    /// Join `conditions` with `operator`, lifting the children of composites
    /// that already use the same operator. Composites using the other
    /// operator are kept whole so their grouping survives.
    pub fn combine(conditions: impl IntoIterator<Item = Condition>, operator: Operator) -> Self {
        let mut children = Vec::new();
        for condition in conditions {
            match condition {
                Condition::Composite(composite) if composite.operator == operator => {
                    children.extend(composite.children);
                }
                other => children.push(other),
            }
        }
        Self { children, operator }
    }

    /// The child conditions, in order.
    pub fn children(&self) -> &[Condition] {
        &self.children
    }

    /// The joining operator.
    pub fn operator(&self) -> Operator {
        self.operator
    }

    fn write(
        &self,
        alias: Option<&str>,
        namer: &mut ParamNamer,
        params: &mut ParamMap,
    ) -> QueryResult<String> {
        if self.children.is_empty() {
            return Ok(match self.operator {
                Operator::And => "1 = 1".to_string(),
                Operator::Or => "1 = 0".to_string(),
            });
        }
        let parts = self
            .children
            .iter()
            .map(|child| child.write(alias, namer, params))
            .collect::<QueryResult<Vec<_>>>()?;
        let glue = format!(") {} (", self.operator.as_sql());
        Ok(format!("({})", parts.join(&glue)))
    }
}

/// One or more conditions handed to [`Condition::combine_with`].
#[derive(Debug, Clone, Default)]
pub struct ConditionList(Vec<Condition>);

impl From<Condition> for ConditionList {
    fn from(condition: Condition) -> Self {
        Self(vec![condition])
    }
}

impl From<Vec<Condition>> for ConditionList {
    fn from(conditions: Vec<Condition>) -> Self {
        Self(conditions)
    }
}

impl<const N: usize> From<[Condition; N]> for ConditionList {
    fn from(conditions: [Condition; N]) -> Self {
        Self(conditions.into())
    }
}

/// A filter predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// A single predicate.
    Simple(SimpleCondition),
    /// Conditions joined by AND or OR.
    Composite(CompositeCondition),
}

impl Condition {
    /// Render the condition as SQL, prefixing field names with `alias.` when given.
    pub fn render(&self, alias: Option<&str>) -> QueryResult<String> {
        self.to_sql(alias).map(|(sql, _)| sql)
    }

    /// The bound parameters matching the placeholders of [`render`](Self::render).
    pub fn parameters(&self) -> ParamMap {
        let mut namer = self.namer();
        let mut params = ParamMap::new();
        self.collect(&mut namer, &mut params);
        params
    }

    /// Render SQL and parameters in one pass.
    pub fn to_sql(&self, alias: Option<&str>) -> QueryResult<(String, ParamMap)> {
        let mut namer = self.namer();
        let mut params = ParamMap::new();
        let sql = self.write(alias, &mut namer, &mut params)?;
        trace!(sql = %sql, params = params.len(), "rendered condition");
        Ok((sql, params))
    }

    /// A new condition joining this one with `others` by `operator`.
    ///
    /// Neither `self` nor the arguments are modified.
    pub fn combine_with(&self, others: impl Into<ConditionList>, operator: Operator) -> Condition {
        let ConditionList(others) = others.into();
        let conditions = std::iter::once(self.clone()).chain(others);
        Condition::Composite(CompositeCondition::combine(conditions, operator))
    }

    /// Shorthand for `combine_with(other, Operator::And)`.
    pub fn and(&self, other: impl Into<ConditionList>) -> Condition {
        self.combine_with(other, Operator::And)
    }

    /// Shorthand for `combine_with(other, Operator::Or)`.
    pub fn or(&self, other: impl Into<ConditionList>) -> Condition {
        self.combine_with(other, Operator::Or)
    }

    /// The simple predicate, if this is one.
    pub fn as_simple(&self) -> Option<&SimpleCondition> {
        match self {
            Self::Simple(simple) => Some(simple),
            Self::Composite(_) => None,
        }
    }

    /// The composite node, if this is one.
    pub fn as_composite(&self) -> Option<&CompositeCondition> {
        match self {
            Self::Composite(composite) => Some(composite),
            Self::Simple(_) => None,
        }
    }

    fn namer(&self) -> ParamNamer {
        let mut namer = ParamNamer::new();
        self.reserve_raw_names(&mut namer);
        namer
    }

    fn reserve_raw_names(&self, namer: &mut ParamNamer) {
        match self {
            Self::Simple(simple) => {
                for name in simple.raw_params.keys() {
                    namer.reserve(name);
                }
            }
            Self::Composite(composite) => {
                for child in &composite.children {
                    child.reserve_raw_names(namer);
                }
            }
        }
    }

    fn collect(&self, namer: &mut ParamNamer, params: &mut ParamMap) {
        match self {
            Self::Simple(simple) => {
                simple.bind(namer, params);
            }
            Self::Composite(composite) => {
                for child in &composite.children {
                    child.collect(namer, params);
                }
            }
        }
    }

    fn write(
        &self,
        alias: Option<&str>,
        namer: &mut ParamNamer,
        params: &mut ParamMap,
    ) -> QueryResult<String> {
        match self {
            Self::Simple(simple) => simple.write(alias, namer, params),
            Self::Composite(composite) => composite.write(alias, namer, params),
        }
    }
}

impl From<SimpleCondition> for Condition {
    fn from(simple: SimpleCondition) -> Self {
        Self::Simple(simple)
    }
}

impl From<CompositeCondition> for Condition {
    fn from(composite: CompositeCondition) -> Self {
        Self::Composite(composite)
    }
}
