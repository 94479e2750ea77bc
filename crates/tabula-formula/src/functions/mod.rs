//! Built-in spreadsheet functions

pub mod info;
pub mod logical;
pub mod math;
pub mod text;

use crate::error::{FormulaError, FormulaResult};
use crate::function::{CallContext, Function, FunctionRepository};
use ahash::AHashMap;
use once_cell::sync::Lazy;
use std::fmt;
use tabula_core::{ErrorCode, Value, ValueCalc};

/// Function implementation signature
///
/// Implementations receive unreduced arguments and report failures as
/// error values.
pub type FunctionImpl = fn(&[Value], &ValueCalc<'_>, &CallContext) -> Value;

/// Function definition
#[derive(Clone, Copy)]
pub struct FunctionDef {
    /// Function name (uppercase)
    pub name: &'static str,
    /// Minimum arguments
    pub min_args: usize,
    /// Maximum arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FunctionImpl,
}

impl FunctionDef {
    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.map_or(true, |max| count <= max)
    }
}

impl fmt::Debug for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish_non_exhaustive()
    }
}

impl Function for FunctionDef {
    fn invoke(&self, args: &[Value], calc: &ValueCalc<'_>, call: &CallContext) -> Value {
        if !self.accepts(args.len()) {
            return Value::error(ErrorCode::Value);
        }
        (self.implementation)(args, calc, call)
    }
}

/// Function registry
///
/// Names are matched case-insensitively.
#[derive(Debug, Clone)]
pub struct FunctionRegistry {
    functions: AHashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    /// Create a new registry with all built-in functions
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_math_functions();
        registry.register_logical_functions();
        registry.register_text_functions();
        registry.register_info_functions();

        registry
    }

    /// Create a registry without any functions
    pub fn empty() -> Self {
        Self {
            functions: AHashMap::new(),
        }
    }

    /// Look up a function by name
    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(&name.to_uppercase())
    }

    /// Register a function; fails if the name is taken
    pub fn register(&mut self, def: FunctionDef) -> FormulaResult<()> {
        let key = def.name.to_uppercase();
        if self.functions.contains_key(&key) {
            return Err(FormulaError::DuplicateFunction(key));
        }
        self.functions.insert(key, def);
        Ok(())
    }

    /// Number of registered functions
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn add(
        &mut self,
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        implementation: FunctionImpl,
    ) {
        self.functions.insert(
            name.to_string(),
            FunctionDef {
                name,
                min_args,
                max_args,
                implementation,
            },
        );
    }

    fn register_math_functions(&mut self) {
        self.add("SUM", 1, None, math::fn_sum);
        self.add("COUNT", 1, None, math::fn_count);
        self.add("ABS", 1, Some(1), math::fn_abs);
        self.add("MOD", 2, Some(2), math::fn_mod);
        self.add("POWER", 2, Some(2), math::fn_power);
        self.add("PI", 0, Some(0), math::fn_pi);
    }

    fn register_logical_functions(&mut self) {
        self.add("IF", 2, Some(3), logical::fn_if);
        self.add("NOT", 1, Some(1), logical::fn_not);
        self.add("AND", 1, None, logical::fn_and);
        self.add("OR", 1, None, logical::fn_or);
        self.add("TRUE", 0, Some(0), logical::fn_true);
        self.add("FALSE", 0, Some(0), logical::fn_false);
        self.add("IFERROR", 2, Some(2), logical::fn_iferror);
    }

    fn register_text_functions(&mut self) {
        self.add("CONCATENATE", 1, None, text::fn_concatenate);
        self.add("LEN", 1, Some(1), text::fn_len);
    }

    fn register_info_functions(&mut self) {
        self.add("ISERROR", 1, Some(1), info::fn_iserror);
        self.add("ISBLANK", 1, Some(1), info::fn_isblank);
        self.add("NA", 0, Some(0), info::fn_na);
        self.add("ROW", 0, Some(1), info::fn_row);
        self.add("COLUMN", 0, Some(1), info::fn_column);
        self.add("ROWS", 1, Some(1), info::fn_rows);
        self.add("COLUMNS", 1, Some(1), info::fn_columns);
    }
}

impl FunctionRepository for FunctionRegistry {
    fn lookup(&self, name: &str) -> Option<&dyn Function> {
        self.get(name).map(|def| def as &dyn Function)
    }
}

static DEFAULT_REGISTRY: Lazy<FunctionRegistry> = Lazy::new(FunctionRegistry::new);

/// Shared registry holding the built-in functions
pub fn default_registry() -> &'static FunctionRegistry {
    &DEFAULT_REGISTRY
}

/// Values of all arguments with arrays flattened row by row
///
/// Only populated array entries are yielded; the flag marks values that
/// came from an array.
pub(crate) fn flatten(args: &[Value]) -> Vec<(&Value, bool)> {
    let mut out = Vec::with_capacity(args.len());
    for arg in args {
        match arg.as_array() {
            Some(array) => out.extend(array.iter().map(|(_, _, v)| (v, true))),
            None => out.push((arg, false)),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_core::CalculationSettings;

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = FunctionRegistry::new();
        assert!(registry.lookup("sum").is_some());
        assert!(registry.lookup("Sum").is_some());
        assert!(registry.lookup("NOPE").is_none());
    }

    #[test]
    fn test_argument_count_is_checked() {
        let registry = FunctionRegistry::new();
        let settings = CalculationSettings::default();
        let calc = ValueCalc::new(&settings);
        let call = CallContext::default();

        let abs = registry.lookup("ABS").unwrap();
        assert_eq!(
            abs.invoke(&[], &calc, &call),
            Value::error(ErrorCode::Value)
        );
        assert_eq!(
            abs.invoke(&[Value::integer(1), Value::integer(2)], &calc, &call),
            Value::error(ErrorCode::Value)
        );
        assert_eq!(abs.invoke(&[Value::integer(-3)], &calc, &call), Value::float(3.0));
    }

    #[test]
    fn test_register_rejects_duplicates() {
        let mut registry = FunctionRegistry::empty();
        let def = FunctionDef {
            name: "Double",
            min_args: 1,
            max_args: Some(1),
            implementation: |args, calc, _| calc.mul(&args[0], &Value::integer(2)),
        };
        registry.register(def).unwrap();
        assert_eq!(
            registry.register(def),
            Err(FormulaError::DuplicateFunction("DOUBLE".into()))
        );
        assert_eq!(registry.len(), 1);
        assert!(registry.get("double").is_some());
    }

    #[test]
    fn test_default_registry_is_shared() {
        assert!(std::ptr::eq(default_registry(), default_registry()));
        assert!(default_registry().names().contains(&"IFERROR"));
    }
}
