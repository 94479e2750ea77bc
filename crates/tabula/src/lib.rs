//! # tabula
//!
//! A spreadsheet formula engine.
//!
//! Formula text is scanned into tokens, compiled into a compact stack-machine
//! program and evaluated against a host that resolves cell references. This
//! crate bundles the engine with an in-memory [`Workbook`] host.
//!
//! ## Features
//!
//! - Arithmetic, comparison, concatenation and percent operators
//! - Cell, range, cross-sheet and named-area references
//! - Range intersection (space) and union (`~`)
//! - Inline arrays, `{1;2|3;4}`, with element-wise arithmetic
//! - Memoized cross-cell evaluation with cycle detection
//! - A registry of built-in functions open to custom ones
//!
//! ## Example
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! workbook.set_value(0, "A1", 4).unwrap();
//! workbook.set_value(0, "A2", 6).unwrap();
//! workbook.set_formula(0, "B1", "=SUM(A1:A2)/2").unwrap();
//!
//! assert_eq!(workbook.evaluate(0, "B1").unwrap(), Value::float(5.0));
//! assert_eq!(
//!     workbook.evaluate_formula(0, "=B1&\" units\"").unwrap(),
//!     Value::text("5 units")
//! );
//! ```

pub mod calculation;
pub mod prelude;
pub mod workbook;

// Re-export calculation types
pub use calculation::{CalculationStats, WorkbookCalculationExt};
pub use workbook::{Sheet, Workbook};

// Re-export core types
pub use tabula_core::{
    CalculationSettings, CellAddress, CellKey, CellRange, Error, ErrorCode, RefTarget, Reference,
    Region, Result, Value, ValueArray, ValueCalc, ValueConverter, ValueFormat, ValueKind,
    ValueType, MAX_COLS, MAX_ROWS,
};

// Re-export formula types
pub use tabula_formula::{
    compile, scan, CallContext, EvalContext, EvalState, Formula, FormulaError, FormulaResult,
    Function, FunctionDef, FunctionRegistry, FunctionRepository, NamedAreas, Opcode, Program,
    Resolver, Token, TokenKind,
};
