//! The formula object

use crate::compiler::{compile, Program};
use crate::error::FormulaResult;
use crate::evaluator::{EvalContext, EvalState, Evaluator};
use crate::resolver::{NamedAreas, NoNames, Resolver};
use crate::scanner::scan;
use crate::token::Tokens;
use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;
use tabula_core::{CalculationSettings, CellKey, ErrorCode, Value};
use tracing::debug;

/// Named-area lookup backed by a resolver
struct ResolverNames<'a>(&'a dyn Resolver);

impl NamedAreas for ResolverNames<'_> {
    fn is_named_area(&self, name: &str) -> bool {
        self.0.is_named_area(name)
    }
}

/// Formula text plus its lazily compiled program
///
/// The program is built on first use and reused until the expression
/// changes or [`invalidate`](Formula::invalidate) is called. Named areas
/// are recognised when the formula compiles, so hosts call `invalidate`
/// after defining or removing a name.
#[derive(Clone, Default)]
pub struct Formula {
    expression: String,
    owner: Option<CellKey>,
    sheet: usize,
    compiled: RefCell<Option<FormulaResult<Arc<Program>>>>,
}

impl Formula {
    /// An empty formula
    pub fn new() -> Self {
        Self::default()
    }

    /// A formula with no owning cell
    pub fn with_expression(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            ..Self::default()
        }
    }

    /// A formula owned by a cell; relative behaviour such as `ROW()` uses it
    pub fn for_cell(owner: CellKey, expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            owner: Some(owner),
            sheet: owner.sheet,
            ..Self::default()
        }
    }

    /// A formula evaluated on a sheet but not stored in any cell
    pub fn for_sheet(sheet: usize, expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
            sheet,
            ..Self::default()
        }
    }

    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// Replace the text and drop the compiled program
    pub fn set_expression(&mut self, expression: impl Into<String>) {
        self.expression = expression.into();
        self.invalidate();
    }

    /// Reset to an empty expression
    pub fn clear(&mut self) {
        self.set_expression(String::new());
    }

    pub fn owner(&self) -> Option<CellKey> {
        self.owner
    }

    pub fn set_owner(&mut self, owner: Option<CellKey>) {
        self.owner = owner;
        if let Some(key) = owner {
            self.sheet = key.sheet;
        }
    }

    /// Sheet that unqualified references resolve against
    pub fn sheet(&self) -> usize {
        self.sheet
    }

    /// Drop the compiled program so the next use recompiles
    pub fn invalidate(&self) {
        self.compiled.replace(None);
    }

    /// Tokens of the expression
    pub fn tokens(&self, settings: &CalculationSettings, names: &dyn NamedAreas) -> Tokens {
        scan(&self.expression, settings, names)
    }

    /// Whether the expression compiles with default settings and no names
    pub fn is_valid(&self) -> bool {
        self.is_valid_in(&CalculationSettings::default(), &NoNames)
    }

    /// Whether the expression compiles in a given environment
    pub fn is_valid_in(&self, settings: &CalculationSettings, names: &dyn NamedAreas) -> bool {
        self.program(settings, names).is_ok()
    }

    /// The compiled program, compiling on first use
    pub fn program(
        &self,
        settings: &CalculationSettings,
        names: &dyn NamedAreas,
    ) -> FormulaResult<Arc<Program>> {
        if let Some(compiled) = self.compiled.borrow().as_ref() {
            return compiled.clone();
        }

        let result = compile(&self.tokens(settings, names)).map(Arc::new);
        if let Err(err) = &result {
            debug!(expression = %self.expression, error = %err, "formula does not compile");
        }
        self.compiled.replace(Some(result.clone()));
        result
    }

    /// Evaluate the formula
    ///
    /// An invalid expression evaluates to `#PARSE!`.
    pub fn eval(&self, ctx: &EvalContext<'_>) -> Value {
        let mut state = EvalState::new();
        self.eval_in(ctx, &mut state)
    }

    /// Evaluate with some cells read from other cells
    ///
    /// Each `(from, to)` pair makes every read of `from`, including reads
    /// by formulas reached during this evaluation, read `to` instead.
    pub fn eval_with_indirections(
        &self,
        ctx: &EvalContext<'_>,
        indirections: impl IntoIterator<Item = (CellKey, CellKey)>,
    ) -> Value {
        let mut state = EvalState::with_indirections(indirections);
        self.eval_in(ctx, &mut state)
    }

    /// Evaluate against an existing state, sharing its memo table
    ///
    /// The owning cell, when there is one, is memoized like any other cell:
    /// a second call with the same state returns the stored value.
    pub fn eval_in(&self, ctx: &EvalContext<'_>, state: &mut EvalState) -> Value {
        let Some(owner) = self.owner else {
            return self.eval_program(ctx, None, state);
        };
        if let Some(value) = state.memoized(&owner) {
            return value.clone();
        }
        state.seed(owner);
        let value = self.eval_program(ctx, Some(owner), state);
        state.store(owner, value.clone());
        value
    }

    pub(crate) fn eval_program(
        &self,
        ctx: &EvalContext<'_>,
        owner: Option<CellKey>,
        state: &mut EvalState,
    ) -> Value {
        match self.program(ctx.settings, &ResolverNames(ctx.resolver)) {
            Ok(program) => match owner {
                Some(_) => Evaluator::new(ctx, owner).run(&program, state),
                None => Evaluator::for_sheet(ctx, self.sheet).run(&program, state),
            },
            Err(_) => Value::error(ErrorCode::Parse),
        }
    }

    /// Listing of the compiled program, or the compile error
    pub fn dump(&self, settings: &CalculationSettings, names: &dyn NamedAreas) -> String {
        match self.program(settings, names) {
            Ok(program) => format!("Expression: {}\n{}", self.expression, program.dump()),
            Err(err) => format!("Expression: {}\nInvalid: {}\n", self.expression, err),
        }
    }
}

impl PartialEq for Formula {
    fn eq(&self, other: &Self) -> bool {
        self.expression == other.expression
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formula")
            .field("expression", &self.expression)
            .field("owner", &self.owner)
            .field("sheet", &self.sheet)
            .finish()
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}
