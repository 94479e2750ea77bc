//! Stack machine evaluator
//!
//! Runs a [`Program`] against a host [`Resolver`]. Cells that hold formulas
//! are evaluated on demand and memoized per evaluation in an [`EvalState`].
//! A cell is seeded with `#CIRCLE!` before its formula runs, so a reference
//! cycle reads that seed instead of recursing forever.

use crate::compiler::Program;
use crate::formula::Formula;
use crate::function::{CallContext, FunctionRepository};
use crate::opcode::Opcode;
use crate::resolver::{ResolvedCell, Resolver};
use ahash::AHashMap;
use tabula_core::{CalculationSettings, CellKey, ErrorCode, Region, Value, ValueArray, ValueCalc};
use tracing::{debug, trace, warn};

/// Everything an evaluation reads but never changes
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub resolver: &'a dyn Resolver,
    pub functions: &'a dyn FunctionRepository,
    pub settings: &'a CalculationSettings,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        resolver: &'a dyn Resolver,
        functions: &'a dyn FunctionRepository,
        settings: &'a CalculationSettings,
    ) -> Self {
        Self {
            resolver,
            functions,
            settings,
        }
    }
}

/// Per-evaluation scratch state
///
/// Holds the memo table of computed cell values, the cell indirection map
/// and the current recursion depth. Sharing one state across several
/// top-level evaluations reuses their results.
#[derive(Debug, Clone, Default)]
pub struct EvalState {
    memo: AHashMap<CellKey, Value>,
    indirections: AHashMap<CellKey, CellKey>,
    depth: usize,
}

impl EvalState {
    pub fn new() -> Self {
        Self::default()
    }

    /// State that reads every cell in `from -> to` pairs from `to` instead
    pub fn with_indirections(indirections: impl IntoIterator<Item = (CellKey, CellKey)>) -> Self {
        Self {
            indirections: indirections.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Value computed for a cell during this evaluation
    pub fn memoized(&self, key: &CellKey) -> Option<&Value> {
        self.memo.get(key)
    }

    /// Number of cells computed so far
    pub fn memo_len(&self) -> usize {
        self.memo.len()
    }

    pub(crate) fn seed(&mut self, key: CellKey) {
        self.memo.insert(key, Value::error(ErrorCode::Circle));
    }

    pub(crate) fn store(&mut self, key: CellKey, value: Value) {
        self.memo.insert(key, value);
    }

    fn redirect(&self, key: CellKey) -> Option<CellKey> {
        self.indirections.get(&key).copied().filter(|k| *k != key)
    }
}

/// A value on the evaluation stack, with the region it was read from
#[derive(Debug, Clone, Default)]
pub struct StackEntry {
    pub value: Value,
    pub region: Option<Region>,
    /// The reference text named an area rather than spelling out cells
    pub named: bool,
}

impl StackEntry {
    fn value(value: Value) -> Self {
        Self {
            value,
            region: None,
            named: false,
        }
    }

    fn reference(value: Value, region: Region, named: bool) -> Self {
        Self {
            value,
            region: Some(region),
            named,
        }
    }
}

/// Executes programs on behalf of one formula
pub struct Evaluator<'c, 'a> {
    ctx: &'c EvalContext<'a>,
    calc: ValueCalc<'a>,
    owner: Option<CellKey>,
    sheet: usize,
}

impl<'c, 'a> Evaluator<'c, 'a> {
    /// An evaluator for a formula owned by `owner`, if any
    pub fn new(ctx: &'c EvalContext<'a>, owner: Option<CellKey>) -> Self {
        Self {
            ctx,
            calc: ValueCalc::new(ctx.settings),
            owner,
            sheet: owner.map_or(0, |k| k.sheet),
        }
    }

    /// An evaluator for a formula not owned by any cell
    ///
    /// Unqualified references resolve against `sheet`.
    pub fn for_sheet(ctx: &'c EvalContext<'a>, sheet: usize) -> Self {
        Self {
            ctx,
            calc: ValueCalc::new(ctx.settings),
            owner: None,
            sheet,
        }
    }

    fn sheet(&self) -> usize {
        self.sheet
    }

    /// Run a program to completion
    ///
    /// Never fails: problems surface as error values. A program that leaves
    /// anything but exactly one value on the stack yields `#VALUE!`.
    pub fn run(&self, program: &Program, state: &mut EvalState) -> Value {
        let mut stack: Vec<StackEntry> = Vec::new();

        for (pc, code) in program.codes().iter().enumerate() {
            trace!(pc, %code, stack = stack.len(), "exec");
            match *code {
                Opcode::Nop => {}

                Opcode::Load(index) | Opcode::Ref(index) => {
                    let value = program.constant(index).cloned().unwrap_or_default();
                    stack.push(StackEntry::value(value));
                }

                Opcode::Neg => {
                    let value = self.pop_value(&mut stack);
                    let result = if value.is_error() {
                        value
                    } else {
                        self.calc.neg(&value)
                    };
                    stack.push(StackEntry::value(result));
                }

                Opcode::Add | Opcode::Sub | Opcode::Mul | Opcode::Div | Opcode::Pow => {
                    let rhs = self.pop_value(&mut stack);
                    let lhs = self.pop_value(&mut stack);
                    let result = match code {
                        Opcode::Add => self.calc.add(&lhs, &rhs),
                        Opcode::Sub => self.calc.sub(&lhs, &rhs),
                        Opcode::Mul => self.calc.mul(&lhs, &rhs),
                        Opcode::Div => self.calc.div(&lhs, &rhs),
                        _ => self.calc.pow(&lhs, &rhs),
                    };
                    stack.push(StackEntry::value(result));
                }

                Opcode::Concat => {
                    let rhs = self.pop_value(&mut stack);
                    let lhs = self.pop_value(&mut stack);
                    let converter = self.calc.converter();
                    let result = match (converter.as_text(&lhs), converter.as_text(&rhs)) {
                        (Some(mut l), Some(r)) => {
                            l.push_str(&r);
                            Value::text(l)
                        }
                        _ => Value::error(ErrorCode::Value),
                    };
                    stack.push(StackEntry::value(result));
                }

                Opcode::Not => {
                    let value = self.pop_value(&mut stack);
                    let result = match self.calc.converter().as_boolean(&value) {
                        Some(b) if !value.is_error() => Value::boolean(!b),
                        _ => Value::error(ErrorCode::Value),
                    };
                    stack.push(StackEntry::value(result));
                }

                Opcode::Equal | Opcode::Less | Opcode::Greater => {
                    let rhs = self.pop_value(&mut stack);
                    let lhs = self.pop_value(&mut stack);
                    let result = if rhs.is_error() {
                        rhs
                    } else if lhs.is_error() {
                        lhs
                    } else {
                        let ordering = lhs.compare(&rhs);
                        Value::boolean(match code {
                            Opcode::Equal => ordering.is_eq(),
                            Opcode::Less => ordering.is_lt(),
                            _ => ordering.is_gt(),
                        })
                    };
                    stack.push(StackEntry::value(result));
                }

                Opcode::Cell(index) => {
                    let entry = self.load_cell(program, index, state);
                    stack.push(entry);
                }

                Opcode::Range(index) => {
                    let entry = self.load_range(program, index, state);
                    stack.push(entry);
                }

                Opcode::Intersect => {
                    let rhs = pop(&mut stack);
                    let lhs = pop(&mut stack);
                    stack.push(self.intersect(lhs, rhs, state));
                }

                Opcode::Union => {
                    let rhs = pop(&mut stack);
                    let lhs = pop(&mut stack);
                    stack.push(self.union(lhs, rhs, state));
                }

                Opcode::Function(argc) => {
                    if stack.len() < argc + 1 {
                        warn!(pc, argc, stack = stack.len(), "function call without enough operands");
                        return Value::error(ErrorCode::Value);
                    }
                    let args = stack.split_off(stack.len() - argc);
                    let name = pop(&mut stack).value;
                    stack.push(StackEntry::value(self.call(&name, args)));
                }

                Opcode::Array { cols, rows } => {
                    if stack.len() < cols * rows {
                        warn!(pc, cols, rows, stack = stack.len(), "array without enough elements");
                        return Value::error(ErrorCode::Value);
                    }
                    let mut array = ValueArray::with_size(cols as u32, rows as u32);
                    for row in (0..rows).rev() {
                        for col in (0..cols).rev() {
                            array.set_element(col as u32, row as u32, pop(&mut stack).value);
                        }
                    }
                    stack.push(StackEntry::value(Value::array(array)));
                }
            }
        }

        if stack.len() != 1 {
            debug!(remaining = stack.len(), "program left an unbalanced stack");
            return Value::error(ErrorCode::Value);
        }
        pop(&mut stack).value
    }

    /// Evaluate a formula owned by `key`, guarding the recursion depth
    fn eval_nested(&self, key: CellKey, formula: &Formula, state: &mut EvalState) -> Value {
        if state.depth >= self.ctx.settings.max_recursion_depth {
            warn!(
                sheet = key.sheet,
                row = key.row,
                col = key.col,
                depth = state.depth,
                "recursion limit reached"
            );
            return Value::error(ErrorCode::Circle);
        }
        state.depth += 1;
        let value = formula.eval_program(self.ctx, formula.owner().or(Some(key)), state);
        state.depth -= 1;
        value
    }

    /// Value of a cell through the indirection map and the memo table
    fn cell_value(&self, resolved: ResolvedCell<'_>, state: &mut EvalState) -> Value {
        let resolved = match state.redirect(resolved.key) {
            Some(target) => self.ctx.resolver.cell(target),
            None => resolved,
        };
        let key = resolved.key;

        if let Some(value) = state.memoized(&key) {
            return value.clone();
        }
        state.seed(key);
        let value = match resolved.formula {
            Some(formula) => self.eval_nested(key, formula, state),
            None => resolved.value,
        };
        state.store(key, value.clone());
        value
    }

    fn reference_text<'p>(&self, program: &'p Program, index: usize) -> &'p str {
        program
            .constant(index)
            .and_then(Value::as_text)
            .unwrap_or_default()
    }

    fn load_cell(&self, program: &Program, index: usize, state: &mut EvalState) -> StackEntry {
        let text = self.reference_text(program, index);
        match self.ctx.resolver.resolve_cell(text, self.sheet()) {
            Ok(resolved) => {
                let region = Region::cell(resolved.key);
                let value = self.cell_value(resolved, state);
                let named = self.ctx.resolver.is_named_area(text);
                StackEntry::reference(value, region, named)
            }
            Err(code) => StackEntry::value(Value::error(code)),
        }
    }

    fn load_range(&self, program: &Program, index: usize, state: &mut EvalState) -> StackEntry {
        let text = self.reference_text(program, index);
        match self.ctx.resolver.resolve_range(text, self.sheet()) {
            Ok((values, region)) => {
                let value = self.with_formula_cells(values, &region, state);
                let named = self.ctx.resolver.is_named_area(text);
                StackEntry::reference(value, region, named)
            }
            Err(code) => StackEntry::value(Value::error(code)),
        }
    }

    /// Replace stored values of formula cells in a region with computed ones
    fn with_formula_cells(&self, values: Value, region: &Region, state: &mut EvalState) -> Value {
        let keys = self.ctx.resolver.formula_cells(region);
        if keys.is_empty() {
            return values;
        }
        let mut array = match values.as_array() {
            Some(array) => array.clone(),
            None => ValueArray::with_size(
                u32::from(region.range.col_count()),
                region.range.row_count(),
            ),
        };
        for key in keys {
            if !region.range.contains(key.row, key.col) {
                continue;
            }
            let value = self.cell_value(self.ctx.resolver.cell(key), state);
            array.set_element(
                u32::from(key.col - region.left()),
                key.row - region.top(),
                value,
            );
        }
        Value::array(array)
    }

    fn region_entry(&self, region: Region, state: &mut EvalState) -> StackEntry {
        if region.range.is_single() {
            let key = CellKey::new(region.sheet, region.top(), region.left());
            let value = self.cell_value(self.ctx.resolver.cell(key), state);
            return StackEntry::reference(value, region, false);
        }
        let values = self.ctx.resolver.region_values(&region);
        let value = self.with_formula_cells(values, &region, state);
        StackEntry::reference(value, region, false)
    }

    fn intersect(&self, lhs: StackEntry, rhs: StackEntry, state: &mut EvalState) -> StackEntry {
        let (Some(a), Some(b)) = (lhs.region, rhs.region) else {
            return StackEntry::value(Value::error(ErrorCode::Value));
        };
        match a.intersect(&b) {
            Some(region) => self.region_entry(region, state),
            None => StackEntry::value(Value::error(ErrorCode::Null)),
        }
    }

    fn union(&self, lhs: StackEntry, rhs: StackEntry, state: &mut EvalState) -> StackEntry {
        let (Some(a), Some(b)) = (lhs.region, rhs.region) else {
            return StackEntry::value(Value::error(ErrorCode::Value));
        };
        let Some(bounds) = a.bounding(&b) else {
            return StackEntry::value(Value::error(ErrorCode::Value));
        };

        let mut entry = self.region_entry(bounds, state);
        // Cells of the bounding box outside both operands are blank
        if let Some(array) = entry.value.as_array() {
            let mut array = array.clone();
            for row in bounds.range.start.row..=bounds.range.end.row {
                for col in bounds.range.start.col..=bounds.range.end.col {
                    if !a.range.contains(row, col) && !b.range.contains(row, col) {
                        array.set_element(
                            u32::from(col - bounds.left()),
                            row - bounds.top(),
                            Value::empty(),
                        );
                    }
                }
            }
            entry.value = Value::array(array);
        }
        entry
    }

    fn call(&self, name: &Value, args: Vec<StackEntry>) -> Value {
        let Some(name) = self.calc.converter().as_text(name) else {
            return Value::error(ErrorCode::Value);
        };
        let Some(function) = self.ctx.functions.lookup(&name) else {
            debug!(name = %name, "unknown function");
            return Value::error(ErrorCode::Name);
        };

        let call = CallContext {
            regions: args.iter().map(|e| e.region).collect(),
            row: self.owner.map_or(0, |k| k.row),
            col: self.owner.map_or(0, |k| k.col),
            sheet: self.sheet(),
        };
        let values: Vec<Value> = args.into_iter().map(|e| e.value).collect();
        function.invoke(&values, &self.calc, &call)
    }

    fn pop_value(&self, stack: &mut Vec<StackEntry>) -> Value {
        self.value_or_element(pop(stack))
    }

    /// Reduce an array operand to a scalar where a scalar is expected
    ///
    /// A 1x1 array yields its element. A multi-cell named area whose rows
    /// span the owner's row yields the element on that row: in the owner's
    /// column when the area covers it, else in the area's first column.
    /// Anything else is returned unchanged.
    pub fn value_or_element(&self, entry: StackEntry) -> Value {
        let Some(array) = entry.value.as_array() else {
            return entry.value;
        };
        if array.columns() == 1 && array.rows() == 1 {
            return array.element(0, 0);
        }
        if let (true, Some(region), Some(owner)) = (entry.named, entry.region, self.owner) {
            if let Some(row) = owner.row.checked_sub(region.top()) {
                if row < array.rows() {
                    let col = owner
                        .col
                        .checked_sub(region.left())
                        .map(u32::from)
                        .filter(|&col| col < array.columns())
                        .unwrap_or(0);
                    return array.element(col, row);
                }
            }
        }
        entry.value
    }
}

/// Pop an entry; an empty stack reads as `#VALUE!`
fn pop(stack: &mut Vec<StackEntry>) -> StackEntry {
    stack
        .pop()
        .unwrap_or_else(|| StackEntry::value(Value::error(ErrorCode::Value)))
}
