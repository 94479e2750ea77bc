//! # tabula-core
//!
//! Core data structures for the tabula formula engine.
//!
//! This crate provides the fundamental types the scanner, compiler and
//! evaluator operate on:
//! - [`Value`] - Tagged runtime value with a display-format tag
//! - [`ValueArray`] - Sparse, shared, copy-on-write 2-D array of values
//! - [`ValueCalc`] and [`ValueConverter`] - Arithmetic and coercion rules
//! - [`CellAddress`], [`CellRange`], [`Reference`] and [`Region`] - Cell addressing
//! - [`CalculationSettings`] - Locale and evaluation limits
//!
//! ## Example
//!
//! ```rust
//! use tabula_core::{CalculationSettings, Value, ValueCalc};
//!
//! let settings = CalculationSettings::default();
//! let calc = ValueCalc::new(&settings);
//!
//! let sum = calc.add(&Value::integer(2), &Value::float(0.5));
//! assert_eq!(sum, Value::float(2.5));
//! ```

pub mod address;
pub mod error;
pub mod settings;
pub mod value;

// Re-exports for convenience
pub use address::{CellAddress, CellKey, CellRange, RefTarget, Reference, Region};
pub use error::{Error, Result};
pub use settings::CalculationSettings;
pub use value::{
    ErrorCode, Value, ValueArray, ValueCalc, ValueConverter, ValueFormat, ValueKind, ValueType,
};

/// Maximum number of rows in a sheet
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a sheet
pub const MAX_COLS: u16 = 16_384;
