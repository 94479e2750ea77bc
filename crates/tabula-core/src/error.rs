//! Error types for tabula-core
//!
//! These are failures of the library API (malformed reference text, bad
//! names). Spreadsheet-level errors such as `#DIV/0!` are values, see
//! [`ErrorCode`](crate::ErrorCode).

use thiserror::Error;

/// Result type alias using [`Error`]
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in tabula-core
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid cell address format
    #[error("Invalid cell address: {0}")]
    InvalidAddress(String),

    /// Invalid cell range format
    #[error("Invalid cell range: {0}")]
    InvalidRange(String),

    /// Invalid reference text (sheet qualifier, quoting)
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// Row index out of bounds
    #[error("Row index {0} out of bounds (max: {1})")]
    RowOutOfBounds(u32, u32),

    /// Column index out of bounds
    #[error("Column index {0} out of bounds (max: {1})")]
    ColumnOutOfBounds(u32, u16),

    /// Sheet not found by name
    #[error("Sheet not found: {0}")]
    SheetNotFound(String),

    /// Duplicate sheet name
    #[error("Sheet name already exists: {0}")]
    DuplicateSheetName(String),

    /// Invalid named area
    #[error("Invalid name: {0}")]
    InvalidName(String),
}
