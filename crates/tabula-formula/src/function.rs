//! Function-call interfaces

use tabula_core::{Region, Value, ValueCalc};

/// Where a function call happens and what its arguments referred to
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    /// Region behind each argument, `None` for computed values
    pub regions: Vec<Option<Region>>,
    /// Row of the cell owning the formula (0-based)
    pub row: u32,
    /// Column of the cell owning the formula (0-based)
    pub col: u16,
    /// Sheet of the cell owning the formula
    pub sheet: usize,
}

impl CallContext {
    /// Region behind argument `index`
    pub fn region(&self, index: usize) -> Option<&Region> {
        self.regions.get(index).and_then(Option::as_ref)
    }
}

/// A callable spreadsheet function
///
/// Arguments arrive unreduced: a range argument is the whole array, with
/// its region in [`CallContext::regions`].
pub trait Function {
    fn invoke(&self, args: &[Value], calc: &ValueCalc<'_>, call: &CallContext) -> Value;
}

/// Name-based function lookup
///
/// Implementations decide whether names are case-sensitive; the evaluator
/// passes the name exactly as written in the formula.
pub trait FunctionRepository {
    fn lookup(&self, name: &str) -> Option<&dyn Function>;
}
