//! Host interfaces for reference resolution

use crate::formula::Formula;
use tabula_core::{CellKey, ErrorCode, Region, Value};

/// Lookup of user-defined named areas
pub trait NamedAreas {
    /// Whether `name` refers to a named area
    fn is_named_area(&self, name: &str) -> bool;
}

/// A host without named areas
#[derive(Debug, Clone, Copy, Default)]
pub struct NoNames;

impl NamedAreas for NoNames {
    fn is_named_area(&self, _name: &str) -> bool {
        false
    }
}

/// A cell as seen by the evaluator
#[derive(Debug, Clone)]
pub struct ResolvedCell<'r> {
    /// Identity used for memoization and cycle detection
    pub key: CellKey,
    /// Stored value, used when the cell has no formula
    pub value: Value,
    /// Formula owned by the cell, evaluated on demand
    pub formula: Option<&'r Formula>,
}

impl<'r> ResolvedCell<'r> {
    /// An empty cell without a formula
    pub fn empty(key: CellKey) -> Self {
        Self {
            key,
            value: Value::empty(),
            formula: None,
        }
    }
}

/// Turns reference text into cells and regions
///
/// `sheet` is the sheet of the formula being evaluated; unqualified
/// references resolve against it.
pub trait Resolver: NamedAreas {
    /// Resolve single-cell reference text
    fn resolve_cell(&self, reference: &str, sheet: usize) -> Result<ResolvedCell<'_>, ErrorCode>;

    /// Resolve range or named-area text to its current values and rectangle
    fn resolve_range(&self, reference: &str, sheet: usize) -> Result<(Value, Region), ErrorCode>;

    /// The cell at a known key
    fn cell(&self, key: CellKey) -> ResolvedCell<'_>;

    /// Current values of a region as an array
    fn region_values(&self, region: &Region) -> Value;

    /// Cells in a region that hold formulas
    ///
    /// The evaluator recomputes these through its memo table before
    /// handing a range to a function.
    fn formula_cells(&self, _region: &Region) -> Vec<CellKey> {
        Vec::new()
    }
}

/// A resolver for formulas that reference no cells
///
/// Every reference resolves to `#REF!`.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyResolver;

impl NamedAreas for EmptyResolver {
    fn is_named_area(&self, _name: &str) -> bool {
        false
    }
}

impl Resolver for EmptyResolver {
    fn resolve_cell(&self, _reference: &str, _sheet: usize) -> Result<ResolvedCell<'_>, ErrorCode> {
        Err(ErrorCode::Ref)
    }

    fn resolve_range(&self, _reference: &str, _sheet: usize) -> Result<(Value, Region), ErrorCode> {
        Err(ErrorCode::Ref)
    }

    fn cell(&self, key: CellKey) -> ResolvedCell<'_> {
        ResolvedCell::empty(key)
    }

    fn region_values(&self, _region: &Region) -> Value {
        Value::empty()
    }
}
