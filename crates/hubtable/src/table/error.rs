use thiserror::Error;

use crate::github::GitHubError;

use super::column::ColumnType;

/// A column value could not be extracted from a parent item.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum HydrateError {
    /// The hydrator does not accept this item shape.
    #[error("column {column}: expected {expected}, got {actual}")]
    UnexpectedShape {
        column: &'static str,
        expected: &'static str,
        actual: String,
    },

    /// The extracted value does not fit the column's declared type.
    #[error("column {column}: expected {expected:?} value, got {actual}")]
    TypeMismatch {
        column: &'static str,
        expected: ColumnType,
        actual: String,
    },

    #[error("failed to serialize item: {0}")]
    Serialize(String),
}

impl HydrateError {
    pub fn unexpected_shape(
        column: &'static str,
        expected: &'static str,
        actual: impl Into<String>,
    ) -> Self {
        Self::UnexpectedShape {
            column,
            expected,
            actual: actual.into(),
        }
    }
}

/// Errors returned by table scans and gets.
#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    GitHub(#[from] GitHubError),

    #[error(transparent)]
    Hydrate(#[from] HydrateError),

    #[error("table {table} requires an equality qualifier on {column}")]
    MissingQualifier {
        table: &'static str,
        column: &'static str,
    },

    #[error("invalid qualifier on {column}: {message}")]
    InvalidQualifier { column: String, message: String },

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("table {table} has no column {column}")]
    UnknownColumn { table: &'static str, column: String },

    #[error("table {0} does not support get")]
    GetNotSupported(&'static str),
}

impl TableError {
    pub fn invalid_qualifier(column: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidQualifier {
            column: column.into(),
            message: message.into(),
        }
    }
}
