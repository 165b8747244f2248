/// CellTable Errors
///
/// Every structural failure (unknown column, shape violation, bad level set)
/// surfaces as a `TableError`. Missing or NaN cell values are never errors:
/// reductions skip them.

use thiserror::Error;

/// Errors returned by table, view, aggregation and split operations.
#[derive(Debug, Error)]
pub enum TableError {
    /// A column name lookup missed.
    #[error("column '{0}' not found")]
    ColumnNotFound(String),

    /// A column with this name already exists in the table.
    #[error("column '{0}' already exists")]
    DuplicateColumn(String),

    /// Row-count or layout violation on column add or resize.
    #[error("shape error: {0}")]
    Shape(String),

    /// Scalar accessor used on a tensor column, or vice versa.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Order statistics (or sorting/grouping) requested on a multi-element cell column.
    #[error("not applicable: {0}")]
    NotApplicable(String),

    /// Zero quantiles, probabilities, columns or rows supplied where at least one is needed.
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Invalid level selection or ordering for a `Splits`.
    #[error("invalid levels: {0}")]
    InvalidLevels(String),

    /// A group key function returned a different number of values for some row.
    #[error("group key arity mismatch at row {row}: expected {expected} values, got {actual}")]
    KeyArity {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Malformed schema header.
    #[error("header error: {0}")]
    Header(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, TableError>;
