//! Error types for table operations

use crate::types::ColumnType;
use thiserror::Error;

/// Failure of a read or cell update, as reported to clients
///
/// The display string is the message sent over both wires.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CellError {
    #[error("Table not found")]
    TableNotFound { table_id: String },

    #[error("Column not found")]
    ColumnNotFound { column_id: String },

    #[error("Row not found")]
    RowNotFound { row_id: String },

    #[error("Primary key column is read-only")]
    PrimaryKeyReadOnly { column_id: String },

    #[error("Column is read-only")]
    ColumnReadOnly { column_id: String },

    #[error("Expected {} value", .expected.expected_noun())]
    TypeMismatch { expected: ColumnType },

    #[error("Value is missing")]
    MissingValue,

    #[error("{0}")]
    InvalidRequestShape(String),
}

/// Discriminant of a [`CellError`], for mapping onto wire status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    TableNotFound,
    ColumnNotFound,
    RowNotFound,
    PrimaryKeyReadOnly,
    ColumnReadOnly,
    TypeMismatch,
    MissingValue,
    InvalidRequestShape,
}

impl ErrorKind {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ErrorKind::TableNotFound | ErrorKind::ColumnNotFound | ErrorKind::RowNotFound
        )
    }
}

impl CellError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CellError::TableNotFound { .. } => ErrorKind::TableNotFound,
            CellError::ColumnNotFound { .. } => ErrorKind::ColumnNotFound,
            CellError::RowNotFound { .. } => ErrorKind::RowNotFound,
            CellError::PrimaryKeyReadOnly { .. } => ErrorKind::PrimaryKeyReadOnly,
            CellError::ColumnReadOnly { .. } => ErrorKind::ColumnReadOnly,
            CellError::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            CellError::MissingValue => ErrorKind::MissingValue,
            CellError::InvalidRequestShape(_) => ErrorKind::InvalidRequestShape,
        }
    }

    pub(crate) fn table_not_found(table_id: &str) -> Self {
        CellError::TableNotFound {
            table_id: table_id.to_string(),
        }
    }
}

/// Invalid table definition rejected by [`crate::table::TableBuilder`]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("Duplicate column id: {0}")]
    DuplicateColumn(String),

    #[error("Primary key column not in schema: {0}")]
    UnknownPrimaryKey(String),

    #[error("Parent key column not in schema: {0}")]
    UnknownParentKey(String),

    #[error("Row {row} has a cell for unknown column {column}")]
    UnknownCellColumn { row: usize, column: String },

    #[error("Row {0} has no text value for the primary key")]
    MissingPrimaryKey(usize),

    #[error("Row {row} has a non-text parent reference in column {column}")]
    InvalidParentReference { row: usize, column: String },

    #[error("Duplicate row id: {0}")]
    DuplicateRow(String),

    #[error("Row {row}, column {column}: {source}")]
    InvalidCell {
        row: usize,
        column: String,
        #[source]
        source: CellError,
    },
}
