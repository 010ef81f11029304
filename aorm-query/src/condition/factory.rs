//! Constructors for every condition kind.

use super::{Condition, ConditionKind, SimpleCondition};
use crate::value::{ParamMap, Value};

/// Builds [`Condition`]s.
///
/// Stateless; models hand one out through `Model::condition()` so query code
/// reads as `M::condition().equals("author", "Deniz")`.
///
/// Placeholders are named after the field with every character outside
/// `[A-Za-z0-9_]` replaced by `_`, so `p.author` binds `:p_author`. Names
/// passed to [`ConditionFactory::raw`] are used as given and are never
/// handed out to other predicates of the same statement.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionFactory;

impl ConditionFactory {
    /// Create a factory.
    pub fn new() -> Self {
        Self
    }

    fn simple(
        &self,
        kind: ConditionKind,
        field: impl Into<String>,
        value: Option<Value>,
        value2: Option<Value>,
    ) -> Condition {
        Condition::Simple(SimpleCondition::new(kind, field, value, value2))
    }

    /// `field = value`. A null value is bound as NULL, not rewritten to `IS NULL`.
    pub fn equals(&self, field: impl Into<String>, value: impl Into<Value>) -> Condition {
        self.simple(ConditionKind::Equals, field, Some(value.into()), None)
    }

    /// `field <> value`
    pub fn not_equals(&self, field: impl Into<String>, value: impl Into<Value>) -> Condition {
        self.simple(ConditionKind::NotEquals, field, Some(value.into()), None)
    }

    /// `field < value`
    pub fn less_than(&self, field: impl Into<String>, value: impl Into<Value>) -> Condition {
        self.simple(ConditionKind::LessThan, field, Some(value.into()), None)
    }

    /// `field <= value`
    pub fn less_than_or_equals(
        &self,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Condition {
        self.simple(ConditionKind::LessThanOrEquals, field, Some(value.into()), None)
    }

    /// `field > value`
    pub fn greater_than(&self, field: impl Into<String>, value: impl Into<Value>) -> Condition {
        self.simple(ConditionKind::GreaterThan, field, Some(value.into()), None)
    }

    /// `field >= value`
    pub fn greater_than_or_equals(
        &self,
        field: impl Into<String>,
        value: impl Into<Value>,
    ) -> Condition {
        self.simple(
            ConditionKind::GreaterThanOrEquals,
            field,
            Some(value.into()),
            None,
        )
    }

    /// `field BETWEEN low AND high`
    pub fn between(
        &self,
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Condition {
        self.simple(
            ConditionKind::Between,
            field,
            Some(low.into()),
            Some(high.into()),
        )
    }

    /// `field NOT BETWEEN low AND high`
    pub fn not_between(
        &self,
        field: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Condition {
        self.simple(
            ConditionKind::NotBetween,
            field,
            Some(low.into()),
            Some(high.into()),
        )
    }

    /// `field IN (values…)`. Rendering fails if `values` is empty.
    pub fn in_list<I, V>(&self, field: impl Into<String>, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = Value::List(values.into_iter().map(Into::into).collect());
        self.simple(ConditionKind::In, field, Some(values), None)
    }

    /// `field NOT IN (values…)`. Rendering fails if `values` is empty.
    pub fn not_in<I, V>(&self, field: impl Into<String>, values: I) -> Condition
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = Value::List(values.into_iter().map(Into::into).collect());
        self.simple(ConditionKind::NotIn, field, Some(values), None)
    }

    /// `field LIKE pattern`
    pub fn like(&self, field: impl Into<String>, pattern: impl Into<Value>) -> Condition {
        self.simple(ConditionKind::Like, field, Some(pattern.into()), None)
    }

    /// `field NOT LIKE pattern`
    pub fn not_like(&self, field: impl Into<String>, pattern: impl Into<Value>) -> Condition {
        self.simple(ConditionKind::NotLike, field, Some(pattern.into()), None)
    }

    /// `field IS NULL`
    pub fn is_null(&self, field: impl Into<String>) -> Condition {
        self.simple(ConditionKind::IsNull, field, None, None)
    }

    /// `field IS NOT NULL`
    pub fn is_not_null(&self, field: impl Into<String>) -> Condition {
        self.simple(ConditionKind::IsNotNull, field, None, None)
    }

    /// A literal SQL expression rendered verbatim, with its own parameters.
    pub fn raw(&self, expression: impl Into<String>, params: ParamMap) -> Condition {
        Condition::Simple(SimpleCondition::raw(expression, params))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row;

    #[test]
    fn test_dotted_field_placeholder_beside_raw() {
        let f = ConditionFactory::new();
        let condition = f
            .equals("p.author", "Deniz")
            .and(f.raw("p.title = :p_author", row! { "p_author" => "Title" }));
        let (sql, params) = condition.to_sql(None).unwrap();
        assert_eq!(sql, "(p.author = :p_author__1) AND (p.title = :p_author)");
        assert_eq!(params["p_author"], Value::from("Title"));
        assert_eq!(params["p_author__1"], Value::from("Deniz"));
    }

    #[test]
    fn test_factory_sets_kind_and_field() {
        let f = ConditionFactory::new();
        let cases = [
            (f.equals("a", 1), ConditionKind::Equals),
            (f.not_equals("a", 1), ConditionKind::NotEquals),
            (f.less_than("a", 1), ConditionKind::LessThan),
            (f.less_than_or_equals("a", 1), ConditionKind::LessThanOrEquals),
            (f.greater_than("a", 1), ConditionKind::GreaterThan),
            (f.greater_than_or_equals("a", 1), ConditionKind::GreaterThanOrEquals),
            (f.between("a", 1, 2), ConditionKind::Between),
            (f.not_between("a", 1, 2), ConditionKind::NotBetween),
            (f.in_list("a", [1]), ConditionKind::In),
            (f.not_in("a", [1]), ConditionKind::NotIn),
            (f.like("a", "%"), ConditionKind::Like),
            (f.not_like("a", "%"), ConditionKind::NotLike),
            (f.is_null("a"), ConditionKind::IsNull),
            (f.is_not_null("a"), ConditionKind::IsNotNull),
            (f.raw("a", ParamMap::new()), ConditionKind::Raw),
        ];
        for (condition, kind) in cases {
            let simple = condition.as_simple().unwrap();
            assert_eq!(simple.kind(), kind);
            assert_eq!(simple.field(), "a");
        }
    }

    #[test]
    fn test_equals_null_binds_null() {
        let condition = ConditionFactory::new().equals("deleted_on", Value::Null);
        let (sql, params) = condition.to_sql(None).unwrap();
        assert_eq!(sql, "deleted_on = :deleted_on");
        assert_eq!(params["deleted_on"], Value::Null);
    }

    #[test]
    fn test_null_checks_bind_nothing() {
        let f = ConditionFactory::new();
        assert!(f.is_null("a").parameters().is_empty());
        assert!(f.is_not_null("a").parameters().is_empty());
    }
}
