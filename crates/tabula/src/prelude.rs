//! Prelude module - common imports for tabula users
//!
//! ```rust
//! use tabula::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationSettings,
    CalculationStats,
    // Addressing
    CellAddress,
    CellKey,
    CellRange,

    // Error types
    Error,
    ErrorCode,
    // Formula types
    Formula,
    FunctionRegistry,
    Result,

    // Values
    Value,
    ValueArray,
    // Main types
    Workbook,
    // Extension traits
    WorkbookCalculationExt,
};
