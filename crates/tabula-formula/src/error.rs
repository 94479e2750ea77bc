//! Formula error types

use thiserror::Error;

/// Result type for formula operations
pub type FormulaResult<T> = std::result::Result<T, FormulaError>;

/// Errors raised while turning formula text into a program
///
/// Evaluation never fails with this type: runtime problems are spreadsheet
/// error values such as `#VALUE!`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormulaError {
    /// Formula text does not start with `=`
    #[error("Formula must start with '='")]
    MissingEquals,

    /// The scanner hit text it could not tokenize
    #[error("Unexpected '{text}' at offset {offset}")]
    Scan { text: String, offset: usize },

    /// Tokens do not reduce to a single expression
    #[error("Syntax error: {0}")]
    Syntax(String),

    /// A function name was registered twice
    #[error("Duplicate function: {0}")]
    DuplicateFunction(String),
}
