//! SQL generation utilities.

use std::fmt;
use std::str::FromStr;

use crate::error::{QueryError, QueryResult};
use crate::value::{ParamMap, Value};

/// Escape a string for use in SQL (for identifiers, not values).
pub fn escape_identifier(name: &str) -> String {
    // Double any existing quotes
    let escaped = name.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Check if an identifier needs quoting.
pub fn needs_quoting(name: &str) -> bool {
    let reserved = [
        "user", "order", "group", "select", "from", "where", "table", "index", "key", "primary",
        "foreign", "check", "default", "null", "not", "and", "or", "in", "is", "like", "between",
        "case", "when", "then", "else", "end", "as", "on", "join", "left", "limit", "offset",
        "union", "all", "distinct", "having", "insert", "update", "delete", "into", "values",
        "set",
    ];

    if reserved.contains(&name.to_lowercase().as_str()) {
        return true;
    }

    !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Quote an identifier if needed.
pub fn quote_identifier(name: &str) -> String {
    if needs_quoting(name) {
        escape_identifier(name)
    } else {
        name.to_string()
    }
}

/// Positional placeholder style of a backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DatabaseType {
    /// PostgreSQL uses $1, $2, etc.
    PostgreSQL,
    /// MySQL uses ?, ?, etc.
    MySQL,
    /// SQLite uses ?, ?, etc.
    #[default]
    SQLite,
}

impl DatabaseType {
    /// Get the parameter placeholder for this database type.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::PostgreSQL => format!("${}", index),
            Self::MySQL | Self::SQLite => "?".to_string(),
        }
    }
}

/// Rewrite `:name` placeholders to `?`, returning the values in order of appearance.
///
/// ```rust
/// use aorm_query::{row, sql::to_positional, Value};
///
/// let params = row! { "my_a" => "value_for_a", "something_else" => "another_value" };
/// let (sql, values) = to_positional(
///     "SELECT * FROM my_table WHERE my_a = :my_a AND my_b = :something_else",
///     &params,
/// )?;
/// assert_eq!(sql, "SELECT * FROM my_table WHERE my_a = ? AND my_b = ?");
/// assert_eq!(values, vec![Value::from("value_for_a"), Value::from("another_value")]);
/// # Ok::<(), aorm_query::QueryError>(())
/// ```
pub fn to_positional(sql: &str, params: &ParamMap) -> QueryResult<(String, Vec<Value>)> {
    to_positional_for(sql, params, DatabaseType::SQLite)
}

/// [`to_positional`] with the placeholder style of `db_type`.
///
/// `::` casts and text inside single or double quotes are copied unchanged.
/// A placeholder may appear more than once; its value is repeated. A
/// placeholder with no bound value is an error.
pub fn to_positional_for(
    sql: &str,
    params: &ParamMap,
    db_type: DatabaseType,
) -> QueryResult<(String, Vec<Value>)> {
    let mut out = String::with_capacity(sql.len());
    let mut values = Vec::new();
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            out.push(c);
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '\'' | '"' => {
                quote = Some(c);
                out.push(c);
            }
            ':' => match chars.peek() {
                Some(':') => {
                    chars.next();
                    out.push_str("::");
                }
                Some(&next) if next.is_ascii_alphabetic() || next == '_' => {
                    let mut name = String::new();
                    while let Some(&n) = chars.peek() {
                        if n.is_ascii_alphanumeric() || n == '_' {
                            name.push(n);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    let value = params
                        .get(&name)
                        .or_else(|| params.get(&format!(":{}", name)))
                        .ok_or_else(|| {
                            QueryError::invalid_parameter(&name, "no value bound")
                                .with_sql(sql)
                        })?;
                    values.push(value.clone());
                    out.push_str(&db_type.placeholder(values.len()));
                }
                _ => out.push(c),
            },
            _ => out.push(c),
        }
    }

    Ok((out, values))
}

/// A part of a [`Select`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectPart {
    /// `SELECT …`
    Columns,
    /// `FROM …`
    From,
    /// `JOIN …`
    Joins,
    /// `LEFT JOIN …`
    LeftJoins,
    /// `WHERE …`
    Condition,
    /// `ORDER BY …`
    Order,
    /// `LIMIT …`
    Limit,
}

impl SelectPart {
    /// All parts, in rendering order.
    pub const ALL: [SelectPart; 7] = [
        Self::Columns,
        Self::From,
        Self::Joins,
        Self::LeftJoins,
        Self::Condition,
        Self::Order,
        Self::Limit,
    ];

    /// Part name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Columns => "columns",
            Self::From => "from",
            Self::Joins => "joins",
            Self::LeftJoins => "left_joins",
            Self::Condition => "condition",
            Self::Order => "order",
            Self::Limit => "limit",
        }
    }
}

impl FromStr for SelectPart {
    type Err = QueryError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|part| part.name() == name)
            .ok_or_else(|| QueryError::invalid_parameter(name, "Invalid part name"))
    }
}

/// A SELECT statement assembled from named parts.
///
/// ```rust
/// use aorm_query::sql::Select;
///
/// let mut select = Select::new();
/// select.columns("p.*").from("post p").condition("p.author = :author");
/// assert_eq!(
///     select.render(),
///     "SELECT p.*\nFROM post p\nWHERE p.author = :author"
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Select {
    columns: Option<String>,
    from: Option<String>,
    joins: Vec<String>,
    left_joins: Vec<String>,
    condition: Option<String>,
    order: Option<String>,
    limit: Option<String>,
}

fn non_empty(value: impl Into<String>) -> Option<String> {
    Some(value.into()).filter(|v| !v.is_empty())
}

impl Select {
    /// An empty statement.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the column list.
    pub fn columns(&mut self, columns: impl Into<String>) -> &mut Self {
        self.columns = non_empty(columns);
        self
    }

    /// Set the FROM clause.
    pub fn from(&mut self, from: impl Into<String>) -> &mut Self {
        self.from = non_empty(from);
        self
    }

    /// Append a JOIN.
    pub fn join(&mut self, join: impl Into<String>) -> &mut Self {
        self.joins.push(join.into());
        self
    }

    /// Append a LEFT JOIN.
    pub fn left_join(&mut self, join: impl Into<String>) -> &mut Self {
        self.left_joins.push(join.into());
        self
    }

    /// Set the WHERE condition.
    pub fn condition(&mut self, condition: impl Into<String>) -> &mut Self {
        self.condition = non_empty(condition);
        self
    }

    /// Set the ORDER BY list.
    pub fn order(&mut self, order: impl Into<String>) -> &mut Self {
        self.order = non_empty(order);
        self
    }

    /// Set the LIMIT clause.
    pub fn limit(&mut self, limit: impl Into<String>) -> &mut Self {
        self.limit = non_empty(limit);
        self
    }

    /// Render every part that is set, one clause per line.
    pub fn render(&self) -> String {
        self.render_parts(&SelectPart::ALL)
    }

    /// Render only `parts`, still in clause order.
    pub fn render_parts(&self, parts: &[SelectPart]) -> String {
        let mut lines = Vec::new();
        for part in SelectPart::ALL.iter().filter(|p| parts.contains(p)) {
            let line = match part {
                SelectPart::Columns => self.columns.as_ref().map(|c| format!("SELECT {}", c)),
                SelectPart::From => self.from.as_ref().map(|f| format!("FROM {}", f)),
                SelectPart::Joins => (!self.joins.is_empty())
                    .then(|| format!("JOIN {}", self.joins.join(" JOIN "))),
                SelectPart::LeftJoins => (!self.left_joins.is_empty())
                    .then(|| format!("LEFT JOIN {}", self.left_joins.join(" LEFT JOIN "))),
                SelectPart::Condition => self.condition.as_ref().map(|c| format!("WHERE {}", c)),
                SelectPart::Order => self.order.as_ref().map(|o| format!("ORDER BY {}", o)),
                SelectPart::Limit => self.limit.as_ref().map(|l| format!("LIMIT {}", l)),
            };
            lines.extend(line);
        }
        lines.join("\n")
    }

    /// Merge `other` into this statement.
    ///
    /// Columns and orders are comma-joined, joins appended, and conditions
    /// AND-ed in parentheses. Two FROM clauses conflict.
    pub fn merge(&mut self, other: &Select) -> QueryResult<&mut Self> {
        if self.from.is_some() && other.from.is_some() {
            return Err(QueryError::invalid_parameter(
                "from",
                "both selects specify a FROM part",
            ));
        }
        if self.from.is_none() {
            self.from = other.from.clone();
        }

        self.columns = join_lists(self.columns.take(), other.columns.as_deref());
        self.order = join_lists(self.order.take(), other.order.as_deref());
        self.joins.extend(other.joins.iter().cloned());
        self.left_joins.extend(other.left_joins.iter().cloned());

        self.condition = match (self.condition.take(), other.condition.as_deref()) {
            (Some(mine), Some(theirs)) => Some(format!("({}) AND ({})", mine, theirs)),
            (mine, theirs) => mine.or_else(|| theirs.map(str::to_string)),
        };

        if self.limit.is_none() {
            self.limit = other.limit.clone();
        }
        Ok(self)
    }
}

fn join_lists(mine: Option<String>, theirs: Option<&str>) -> Option<String> {
    match (mine, theirs) {
        (Some(mine), Some(theirs)) => Some(format!("{}, {}", mine, theirs)),
        (mine, theirs) => mine.or_else(|| theirs.map(str::to_string)),
    }
}

impl fmt::Display for Select {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::row;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_escape_identifier() {
        assert_eq!(escape_identifier("user"), "\"user\"");
        assert_eq!(escape_identifier("has\"quote"), "\"has\"\"quote\"");
    }

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("order"), "\"order\"");
        assert_eq!(quote_identifier("post"), "post");
        assert_eq!(quote_identifier("has space"), "\"has space\"");
    }

    #[test]
    fn test_to_positional_order_of_appearance() {
        let params = row! { "b" => 2, "a" => 1 };
        let (sql, values) = to_positional("x = :a OR y = :b OR z = :a", &params).unwrap();
        assert_eq!(sql, "x = ? OR y = ? OR z = ?");
        assert_eq!(values, vec![Value::Int(1), Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn test_to_positional_accepts_prefixed_keys() {
        let params = row! { ":my_a" => "value_for_a" };
        let (sql, values) = to_positional("my_a = :my_a", &params).unwrap();
        assert_eq!(sql, "my_a = ?");
        assert_eq!(values, vec![Value::from("value_for_a")]);
    }

    #[test]
    fn test_to_positional_skips_casts_and_literals() {
        let params = row! { "id" => 7 };
        let (sql, values) =
            to_positional("SELECT ':nope', id::text FROM t WHERE id = :id", &params).unwrap();
        assert_eq!(sql, "SELECT ':nope', id::text FROM t WHERE id = ?");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_to_positional_numbered() {
        let params = row! { "a" => 1, "b" => 2 };
        let (sql, _) = to_positional_for("a = :a AND b = :b", &params, DatabaseType::PostgreSQL)
            .unwrap();
        assert_eq!(sql, "a = $1 AND b = $2");
    }

    #[test]
    fn test_to_positional_missing_value() {
        let err = to_positional("a = :a", &ParamMap::new()).unwrap_err();
        assert_eq!(err.code, ErrorCode::InvalidParameter);
        assert_eq!(err.context.field.as_deref(), Some("a"));
    }

    #[test]
    fn test_select_render_parts() {
        let mut select = Select::new();
        select
            .columns("*")
            .from("post")
            .join("author a ON a.id = post.author_id")
            .left_join("tag t ON t.post_id = post.post_id")
            .condition("post.author = :author")
            .order("created_on DESC")
            .limit("10");
        assert_eq!(
            select.render(),
            "SELECT *\nFROM post\nJOIN author a ON a.id = post.author_id\n\
             LEFT JOIN tag t ON t.post_id = post.post_id\nWHERE post.author = :author\n\
             ORDER BY created_on DESC\nLIMIT 10"
        );
        assert_eq!(
            select.render_parts(&[SelectPart::Limit, SelectPart::Condition]),
            "WHERE post.author = :author\nLIMIT 10"
        );
    }

    #[test]
    fn test_select_merge() {
        let mut base = Select::new();
        base.columns("p.*").from("post p").condition("p.live = 1").order("p.id");
        let mut extra = Select::new();
        extra
            .columns("a.name")
            .join("author a ON a.id = p.author_id")
            .condition("a.name = :name")
            .order("a.name");

        base.merge(&extra).unwrap();
        assert_eq!(
            base.render(),
            "SELECT p.*, a.name\nFROM post p\nJOIN author a ON a.id = p.author_id\n\
             WHERE (p.live = 1) AND (a.name = :name)\nORDER BY p.id, a.name"
        );
    }

    #[test]
    fn test_select_merge_takes_other_from() {
        let mut base = Select::new();
        base.columns("*");
        let mut other = Select::new();
        other.from("post");
        base.merge(&other).unwrap();
        assert_eq!(base.render(), "SELECT *\nFROM post");
    }

    #[test]
    fn test_select_merge_conflicting_from() {
        let mut a = Select::new();
        a.from("post");
        let b = a.clone();
        assert!(a.merge(&b).is_err());
    }

    #[test]
    fn test_select_part_names() {
        assert_eq!("left_joins".parse::<SelectPart>().unwrap(), SelectPart::LeftJoins);
        assert!("having".parse::<SelectPart>().is_err());
    }
}
