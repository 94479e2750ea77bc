//! # tabula-formula
//!
//! Formula engine for tabula.
//!
//! This crate provides:
//! - A scanner that splits formula text into typed tokens
//! - A shift-reduce compiler that turns tokens into stack-machine opcodes
//! - A stack evaluator with memoized cross-cell evaluation and cycle detection
//! - The [`Formula`] object tying the three together, with cached compilation
//! - A registry of built-in functions
//!
//! ## Example
//!
//! ```rust
//! use tabula_core::{CalculationSettings, Value};
//! use tabula_formula::{EmptyResolver, EvalContext, Formula, FunctionRegistry};
//!
//! let settings = CalculationSettings::default();
//! let functions = FunctionRegistry::new();
//! let ctx = EvalContext::new(&EmptyResolver, &functions, &settings);
//!
//! let formula = Formula::with_expression("=SUM(1;2;3)*2");
//! assert_eq!(formula.eval(&ctx), Value::float(12.0));
//! ```

pub mod compiler;
pub mod error;
pub mod evaluator;
pub mod formula;
pub mod function;
pub mod functions;
pub mod opcode;
pub mod resolver;
pub mod scanner;
pub mod token;

pub use compiler::{compile, Program};
pub use error::{FormulaError, FormulaResult};
pub use evaluator::{EvalContext, EvalState, Evaluator, StackEntry};
pub use formula::Formula;
pub use function::{CallContext, Function, FunctionRepository};
pub use functions::{default_registry, FunctionDef, FunctionRegistry};
pub use opcode::Opcode;
pub use resolver::{EmptyResolver, NamedAreas, NoNames, ResolvedCell, Resolver};
pub use scanner::scan;
pub use token::{Operator, Token, TokenKind, Tokens};
