//! Scalar values stored in records and bound to SQL parameters.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A raw record: field name to value, in column order.
pub type Row = IndexMap<String, Value>;

/// Bound parameters of a rendered statement: placeholder name (without the
/// leading `:`) to value, in rendering order.
pub type ParamMap = IndexMap<String, Value>;

/// A value that can be stored in a record field or bound to a placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// Null value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Float value.
    Float(f64),
    /// String value.
    String(String),
    /// List of values, the operand of IN / NOT IN.
    List(Vec<Value>),
    /// JSON object value.
    Json(JsonValue),
}

impl Value {
    /// Check if this is a null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The string content, if this is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer content, if this is an integer.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// The elements of a list value; any other value is a one-element list.
    pub fn elements(&self) -> Vec<&Value> {
        match self {
            Self::List(values) => values.iter().collect(),
            other => vec![other],
        }
    }

    /// Name of the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Json(_) => "json",
        }
    }

    /// Convert to a JSON value.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Int(i) => JsonValue::Number((*i).into()),
            Self::Float(f) => serde_json::Number::from_f64(*f)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::List(values) => JsonValue::Array(values.iter().map(Value::to_json).collect()),
            Self::Json(j) => j.clone(),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Self::List(v.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Self::Null,
        }
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => Self::Float(n.as_f64().unwrap_or_default()),
            },
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(items) => Self::List(items.into_iter().map(Value::from).collect()),
            object @ JsonValue::Object(_) => Self::Json(object),
        }
    }
}

/// Convert a row to a JSON object.
pub fn row_to_json(row: &Row) -> JsonValue {
    JsonValue::Object(
        row.iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect(),
    )
}

/// Build a [`Row`] from `field => value` pairs.
///
/// ```rust
/// use aorm_query::{row, Value};
///
/// let post = row! { "author" => "Deniz", "post_id" => 1 };
/// assert_eq!(post["author"], Value::from("Deniz"));
/// ```
#[macro_export]
macro_rules! row {
    () => {
        $crate::value::Row::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut row = $crate::value::Row::new();
        $(
            row.insert(::std::string::String::from($key), $crate::value::Value::from($value));
        )+
        row
    }};
}
