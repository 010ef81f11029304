//! Error types for query building and record operations.
//!
//! Every failure surfaced by AORM is a [`QueryError`] carrying:
//! - an [`ErrorCode`] for programmatic handling
//! - a human readable message
//! - optional context (model, field, operation, SQL) and suggestions
//!
//! # Error Codes
//!
//! Error codes follow a pattern: A{category}{number}
//! - 1xxx: Query errors (not found, unsupported condition, criteria shape)
//! - 2xxx: Constraint violations reported by the storage backend
//! - 4xxx: Record lifecycle errors (immutable, delete of new record)
//! - 5xxx: Execution errors (database, parameters)
//! - 6xxx: Data errors (type conversion)
//! - 7xxx: Configuration errors
//! - 9xxx: Internal errors
//!
//! ```rust
//! use aorm_query::{QueryError, ErrorCode};
//!
//! let err = QueryError::not_found("Post");
//! assert_eq!(err.code, ErrorCode::RecordNotFound);
//! assert!(err.to_string().contains("Post"));
//! ```

use std::fmt;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    // Query errors (1xxx)
    /// No record matched a primary-key fetch (A1001).
    RecordNotFound = 1001,
    /// Condition kind cannot be rendered (A1002).
    UnsupportedCondition = 1002,
    /// Criteria shorthand has an unsupported shape (A1003).
    InvalidCriteria = 1003,
    /// Relation name not declared for the model (A1004).
    UnknownRelation = 1004,
    /// Field not present in the record (A1005).
    KeyNotFound = 1005,

    // Constraint errors (2xxx)
    /// Unique constraint violation (A2001).
    UniqueConstraint = 2001,
    /// Foreign key constraint violation (A2002).
    ForeignKeyConstraint = 2002,
    /// Not null constraint violation (A2003).
    NotNullConstraint = 2003,

    // Lifecycle errors (4xxx)
    /// Mutation attempted on an immutable criteria or record (A4001).
    Immutable = 4001,
    /// Delete attempted on a record that was never persisted (A4002).
    DeleteOfNewRecord = 4002,
    /// Record used after it was deleted (A4003).
    DeletedRecord = 4003,

    // Execution errors (5xxx)
    /// Invalid or missing bound parameter (A5001).
    InvalidParameter = 5001,
    /// General database error (A5002).
    DatabaseError = 5002,

    // Data errors (6xxx)
    /// Invalid data type (A6001).
    InvalidDataType = 6001,

    // Configuration errors (7xxx)
    /// Invalid configuration (A7001).
    InvalidConfiguration = 7001,
    /// Missing configuration (A7002).
    MissingConfiguration = 7002,

    // Internal errors (9xxx)
    /// Internal error (A9001).
    Internal = 9001,
}

impl ErrorCode {
    /// Get the error code string (e.g., "A1001").
    pub fn code(&self) -> String {
        format!("A{}", *self as u16)
    }

    /// Get a short description of the error code.
    pub fn description(&self) -> &'static str {
        match self {
            Self::RecordNotFound => "Record not found",
            Self::UnsupportedCondition => "Unsupported condition",
            Self::InvalidCriteria => "Invalid criteria",
            Self::UnknownRelation => "Unknown relation",
            Self::KeyNotFound => "No such key",
            Self::UniqueConstraint => "Unique constraint violation",
            Self::ForeignKeyConstraint => "Foreign key constraint violation",
            Self::NotNullConstraint => "Not null constraint violation",
            Self::Immutable => "Immutable object",
            Self::DeleteOfNewRecord => "Delete of new record",
            Self::DeletedRecord => "Record already deleted",
            Self::InvalidParameter => "Invalid parameter",
            Self::DatabaseError => "Database error",
            Self::InvalidDataType => "Invalid data type",
            Self::InvalidConfiguration => "Invalid configuration",
            Self::MissingConfiguration => "Missing configuration",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Suggestion for fixing an error.
#[derive(Debug, Clone)]
pub struct Suggestion {
    /// The suggestion text.
    pub text: String,
    /// Optional code example.
    pub code: Option<String>,
}

impl Suggestion {
    /// Create a new suggestion.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            code: None,
        }
    }

    /// Add a code example.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Additional context for an error.
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    /// The operation that was being performed.
    pub operation: Option<String>,
    /// The model involved.
    pub model: Option<String>,
    /// The field or relation involved.
    pub field: Option<String>,
    /// The SQL statement (if available).
    pub sql: Option<String>,
    /// Suggestions for fixing the error.
    pub suggestions: Vec<Suggestion>,
    /// Help text.
    pub help: Option<String>,
}

/// Errors that can occur during query and record operations.
#[derive(Error, Debug)]
pub struct QueryError {
    /// The error code.
    pub code: ErrorCode,
    /// The error message.
    pub message: String,
    /// Additional context.
    pub context: ErrorContext,
    /// The source error (if any).
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.code(), self.message)
    }
}

impl QueryError {
    /// Create a new error with the given code and message.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: ErrorContext::default(),
            source: None,
        }
    }

    /// Add context about the operation.
    pub fn with_context(mut self, operation: impl Into<String>) -> Self {
        self.context.operation = Some(operation.into());
        self
    }

    /// Add a suggestion for fixing the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.context.suggestions.push(Suggestion::new(suggestion));
        self
    }

    /// Add a code suggestion.
    pub fn with_code_suggestion(mut self, text: impl Into<String>, code: impl Into<String>) -> Self {
        self.context
            .suggestions
            .push(Suggestion::new(text).with_code(code));
        self
    }

    /// Add help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.context.help = Some(help.into());
        self
    }

    /// Set the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.context.model = Some(model.into());
        self
    }

    /// Set the field.
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.context.field = Some(field.into());
        self
    }

    /// Set the SQL statement.
    pub fn with_sql(mut self, sql: impl Into<String>) -> Self {
        self.context.sql = Some(sql.into());
        self
    }

    /// Set the source error.
    pub fn with_source<E: std::error::Error + Send + Sync + 'static>(mut self, source: E) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    // ============== Constructor Functions ==============

    /// A primary-key fetch matched nothing.
    pub fn not_found(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::RecordNotFound,
            format!("Unable to find {} matching the given primary key", model),
        )
        .with_model(&model)
        .with_code_suggestion(
            "Use fetch_one() to get None instead of an error",
            format!("{}::fetch_one(criteria)", model),
        )
    }

    /// A condition kind cannot be rendered.
    pub fn unsupported_condition(kind: impl Into<String>) -> Self {
        let kind = kind.into();
        Self::new(
            ErrorCode::UnsupportedCondition,
            format!("Unsupported condition type: {}", kind),
        )
        .with_field(&kind)
    }

    /// The criteria shorthand handed to a fetch has the wrong shape.
    pub fn invalid_criteria(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidCriteria, message.into())
            .with_suggestion("Pass a Criteria, a Condition, a field/value object, or nothing")
    }

    /// The relation is not declared for the model.
    pub fn unknown_relation(model: impl Into<String>, relation: impl Into<String>) -> Self {
        let model = model.into();
        let relation = relation.into();
        Self::new(
            ErrorCode::UnknownRelation,
            format!("Unknown relation name: {}", relation),
        )
        .with_model(&model)
        .with_field(&relation)
        .with_help(format!("Declare the relation in {}::relations()", model))
    }

    /// The field is not set on the record.
    pub fn key_not_found(key: impl Into<String>) -> Self {
        let key = key.into();
        Self::new(ErrorCode::KeyNotFound, format!("no such key: {}", key)).with_field(&key)
    }

    /// A mutation was attempted on something immutable.
    pub fn immutable(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Immutable, message.into())
    }

    /// A record that was never saved cannot be deleted.
    pub fn delete_of_new(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(ErrorCode::DeleteOfNewRecord, "New model cannot be deleted").with_model(&model)
    }

    /// A record was used after a successful delete.
    pub fn deleted(model: impl Into<String>) -> Self {
        let model = model.into();
        Self::new(
            ErrorCode::DeletedRecord,
            format!("{} record was already deleted", model),
        )
        .with_model(&model)
    }

    /// Create a unique constraint violation error.
    pub fn unique_violation(table: impl Into<String>, message: impl Into<String>) -> Self {
        let table = table.into();
        Self::new(
            ErrorCode::UniqueConstraint,
            format!("Unique constraint violated on {}: {}", table, message.into()),
        )
        .with_model(&table)
        .with_suggestion("Use save() to update an existing row instead of insert()")
    }

    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: impl Into<String>, message: impl Into<String>) -> Self {
        let name = name.into();
        Self::new(
            ErrorCode::InvalidParameter,
            format!("Invalid parameter {}: {}", name, message.into()),
        )
        .with_field(&name)
    }

    /// Create a general database error.
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
            .with_suggestion("Check the database logs for more details")
    }

    /// Create a data type error.
    pub fn invalid_data_type(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidDataType, message.into())
    }

    /// Create a missing configuration error.
    pub fn missing_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MissingConfiguration, message.into())
    }

    /// Create an invalid configuration error.
    pub fn invalid_configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidConfiguration, message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, format!("Internal error: {}", message.into()))
    }

    // ============== Error Checks ==============

    /// Check if this is a not found error.
    pub fn is_not_found(&self) -> bool {
        self.code == ErrorCode::RecordNotFound
    }

    /// Check if this is an immutability error.
    pub fn is_immutable(&self) -> bool {
        self.code == ErrorCode::Immutable
    }

    /// Check if this is a constraint violation.
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::UniqueConstraint
                | ErrorCode::ForeignKeyConstraint
                | ErrorCode::NotNullConstraint
        )
    }

    /// Display the full error with all context and suggestions.
    pub fn display_full(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error [{}]: {}\n", self.code.code(), self.message));

        if let Some(ref op) = self.context.operation {
            output.push_str(&format!("  → While: {}\n", op));
        }
        if let Some(ref model) = self.context.model {
            output.push_str(&format!("  → Model: {}\n", model));
        }
        if let Some(ref field) = self.context.field {
            output.push_str(&format!("  → Field: {}\n", field));
        }

        // SQL (truncated if too long)
        if let Some(ref sql) = self.context.sql {
            let sql_display = if sql.len() > 200 {
                let cut = (0..=200).rev().find(|i| sql.is_char_boundary(*i)).unwrap_or(0);
                format!("{}...", &sql[..cut])
            } else {
                sql.clone()
            };
            output.push_str(&format!("  → SQL: {}\n", sql_display));
        }

        if !self.context.suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for (i, suggestion) in self.context.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion.text));
                if let Some(ref code) = suggestion.code {
                    output.push_str(&format!(
                        "     ```\n     {}\n     ```\n",
                        code.replace('\n', "\n     ")
                    ));
                }
            }
        }

        if let Some(ref help) = self.context.help {
            output.push_str(&format!("\nHelp: {}\n", help));
        }

        output
    }
}

/// Helper for creating errors with context.
#[macro_export]
macro_rules! query_error {
    ($code:expr, $msg:expr) => {
        $crate::error::QueryError::new($code, $msg)
    };
    ($code:expr, $msg:expr, $($key:ident = $value:expr),+ $(,)?) => {{
        let mut err = $crate::error::QueryError::new($code, $msg);
        $(
            err = err.$key($value);
        )+
        err
    }};
}
