//! Shift-reduce compiler
//!
//! Tokens are shifted onto a syntax stack and reduced by a fixed set of
//! rules whenever the next token allows it. Each reduction emits opcodes,
//! so the program comes out in postfix order. Operator precedence comes
//! from [`Operator::precedence`]; all binary operators are left-associative.

use crate::error::{FormulaError, FormulaResult};
use crate::opcode::Opcode;
use crate::token::{Operator, Token, TokenKind, Tokens};
use std::fmt::Write as _;
use tabula_core::Value;
use tracing::debug;

/// A compiled formula: a constant pool plus opcodes
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Program {
    constants: Vec<Value>,
    codes: Vec<Opcode>,
}

impl Program {
    pub fn constants(&self) -> &[Value] {
        &self.constants
    }

    pub fn codes(&self) -> &[Opcode] {
        &self.codes
    }

    pub fn constant(&self, index: usize) -> Option<&Value> {
        self.constants.get(index)
    }

    fn push_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    /// Human-readable listing of constants and codes
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Constants:");
        for (i, value) in self.constants.iter().enumerate() {
            let _ = writeln!(out, "  #{}: {:?} {}", i, value.value_type(), value);
        }
        let _ = writeln!(out, "Codes:");
        for (i, code) in self.codes.iter().enumerate() {
            let _ = writeln!(out, "  {:>3}  {}", i, code);
        }
        out
    }
}

/// Entry of the syntax stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Item {
    Operand,
    /// A bare name, which becomes a function when followed by `(`
    Identifier,
    Op(Operator),
}

impl Item {
    fn is_operand(self) -> bool {
        !matches!(self, Item::Op(_))
    }
}

struct Compiler {
    program: Program,
    stack: Vec<Item>,
    arg_stack: Vec<usize>,
    arg_count: usize,
    /// Width of the first row of each open inline array
    row_widths: Vec<Option<usize>>,
    error: Option<FormulaError>,
}

/// Compile scanned tokens into a program
///
/// Fails when the tokens are invalid or do not reduce to exactly one
/// expression.
pub fn compile(tokens: &Tokens) -> FormulaResult<Program> {
    if let Some(bad) = tokens.first_unknown() {
        return Err(FormulaError::Scan {
            text: bad.text().to_string(),
            offset: bad.offset(),
        });
    }
    if !tokens.is_valid() {
        return Err(FormulaError::MissingEquals);
    }

    let end = Token::end(tokens.last().map_or(1, |t| t.offset() + t.text().chars().count()));
    let mut compiler = Compiler {
        program: Program::default(),
        stack: Vec::new(),
        arg_stack: Vec::new(),
        arg_count: 0,
        row_widths: Vec::new(),
        error: None,
    };
    for token in tokens.iter().chain(std::iter::once(&end)) {
        compiler.shift(token);
    }
    if let Some(error) = compiler.error {
        return Err(error);
    }

    let accepted = compiler.stack.len() == 2
        && compiler.stack[1] == Item::Op(Operator::End)
        && compiler.stack[0].is_operand();
    if !accepted {
        debug!(stack = ?compiler.stack, "formula did not reduce");
        return Err(FormulaError::Syntax(
            "expression does not reduce to a single value".into(),
        ));
    }
    Ok(compiler.program)
}

impl Compiler {
    /// Item `depth` places below the top
    fn top(&self, depth: usize) -> Option<Item> {
        self.stack.len().checked_sub(depth + 1).map(|i| self.stack[i])
    }

    fn top_is(&self, depth: usize, op: Operator) -> bool {
        self.top(depth) == Some(Item::Op(op))
    }

    fn top_is_operand(&self, depth: usize) -> bool {
        self.top(depth).is_some_and(Item::is_operand)
    }

    fn top_op(&self, depth: usize) -> Option<Operator> {
        match self.top(depth) {
            Some(Item::Op(op)) => Some(op),
            _ => None,
        }
    }

    fn pop(&mut self, n: usize) {
        let len = self.stack.len().saturating_sub(n);
        self.stack.truncate(len);
    }

    fn emit(&mut self, code: Opcode) {
        self.program.codes.push(code);
    }

    fn shift(&mut self, token: &Token) {
        // Entering a function's argument list
        if self.top_is(0, Operator::LeftPar) && self.top(1) == Some(Item::Identifier) {
            self.arg_stack.push(self.arg_count);
            self.arg_count = 1;
        }

        // Entering an inline array; the row count rides on the arg stack
        if self.top_is(0, Operator::CurlyBra) {
            self.arg_stack.push(self.arg_count);
            self.arg_stack.push(1);
            self.arg_count = 1;
            self.row_widths.push(None);
        }

        match token.kind() {
            TokenKind::Unknown => {}
            TokenKind::Boolean
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::String
            | TokenKind::Error => {
                let value = token.literal().unwrap_or_default();
                let index = self.program.push_constant(value);
                self.emit(Opcode::Load(index));
                self.stack.push(Item::Operand);
            }
            TokenKind::Cell => self.reference(token, Opcode::Cell, Item::Operand),
            TokenKind::Range => self.reference(token, Opcode::Range, Item::Operand),
            TokenKind::Identifier => self.reference(token, Opcode::Ref, Item::Identifier),
            TokenKind::Operator(Operator::Percent) => {
                // Close a finished group or call first, so `(a)%` scales a
                while matches!(
                    self.top_op(0),
                    Some(Operator::RightPar | Operator::CurlyKet)
                ) && self.reduce(Operator::Percent)
                {}
                // Postfix: scale the operand in place, never shifted
                if self.top_is_operand(0) {
                    let index = self.program.push_constant(Value::float(0.01));
                    self.emit(Opcode::Load(index));
                    self.emit(Opcode::Mul);
                }
            }
            TokenKind::Operator(op) => {
                while self.reduce(op) {}
                self.stack.push(Item::Op(op));
            }
        }
    }

    fn reference(&mut self, token: &Token, code: fn(usize) -> Opcode, item: Item) {
        let index = self.program.push_constant(Value::text(token.text()));
        self.emit(code(index));
        self.stack.push(item);
    }

    /// Apply the first matching rule; false when none applies
    fn reduce(&mut self, token: Operator) -> bool {
        let len = self.stack.len();

        // id ( a1 ; a2  ->  id ( a1
        if len >= 5
            && matches!(token, Operator::RightPar | Operator::Semicolon)
            && self.top_is_operand(0)
            && self.top_is(1, Operator::Semicolon)
            && self.top_is_operand(2)
            && self.top_is(3, Operator::LeftPar)
            && self.top(4) == Some(Item::Identifier)
        {
            self.pop(2);
            self.arg_count += 1;
            return true;
        }

        // id ( a ;  ->  id ( a, with an empty argument
        if len >= 4
            && matches!(token, Operator::RightPar | Operator::Semicolon)
            && self.top_is(0, Operator::Semicolon)
            && self.top_is_operand(1)
            && self.top_is(2, Operator::LeftPar)
            && self.top(3) == Some(Item::Identifier)
        {
            self.pop(1);
            let index = self.program.push_constant(Value::empty());
            self.emit(Opcode::Load(index));
            self.arg_count += 1;
            return true;
        }

        // id ( a )  ->  call
        if len >= 4
            && self.top_is(0, Operator::RightPar)
            && self.top_is_operand(1)
            && self.top_is(2, Operator::LeftPar)
            && self.top(3) == Some(Item::Identifier)
        {
            self.pop(4);
            self.stack.push(Item::Operand);
            self.emit(Opcode::Function(self.arg_count));
            self.arg_count = self.arg_stack.pop().unwrap_or(0);
            return true;
        }

        // id ( )  ->  call without arguments
        if len >= 3
            && self.top_is(0, Operator::RightPar)
            && self.top_is(1, Operator::LeftPar)
            && self.top(2) == Some(Item::Identifier)
        {
            self.pop(3);
            self.stack.push(Item::Operand);
            self.emit(Opcode::Function(0));
            self.arg_count = self.arg_stack.pop().unwrap_or(0);
            return true;
        }

        let array_token = matches!(
            token,
            Operator::Semicolon | Operator::CurlyKet | Operator::Pipe
        );

        // { a ; b  ->  { a
        if len >= 4
            && array_token
            && self.top_is_operand(0)
            && self.top_is(1, Operator::Semicolon)
            && self.top_is_operand(2)
            && self.top_is(3, Operator::CurlyBra)
        {
            self.pop(2);
            self.arg_count += 1;
            return true;
        }

        // { a | b  ->  { a, starting a new row
        if len >= 4
            && array_token
            && self.top_is_operand(0)
            && self.top_is(1, Operator::Pipe)
            && self.top_is_operand(2)
            && self.top_is(3, Operator::CurlyBra)
        {
            self.pop(2);
            self.finish_row();
            let rows = self.arg_stack.pop().unwrap_or(1);
            self.arg_stack.push(rows + 1);
            self.arg_count = 1;
            return true;
        }

        // { a }  ->  array
        if len >= 3
            && self.top_is(0, Operator::CurlyKet)
            && self.top_is_operand(1)
            && self.top_is(2, Operator::CurlyBra)
        {
            self.pop(3);
            self.stack.push(Item::Operand);
            self.finish_row();
            self.row_widths.pop();
            let rows = self.arg_stack.pop().unwrap_or(1);
            self.emit(Opcode::Array {
                cols: self.arg_count,
                rows,
            });
            self.arg_count = self.arg_stack.pop().unwrap_or(0);
            return true;
        }

        // ( y )  ->  y
        if len >= 3
            && self.top_is(0, Operator::RightPar)
            && self.top_is_operand(1)
            && self.top_is(2, Operator::LeftPar)
        {
            let inner = self.top(1).unwrap_or(Item::Operand);
            self.pop(3);
            self.stack.push(inner);
            return true;
        }

        if token == Operator::LeftPar {
            return false;
        }

        // a op b  ->  result, when op binds at least as tightly as the token
        if len >= 3 && self.top_is_operand(0) && self.top_is_operand(2) {
            if let Some(op) = self.top_op(1) {
                if op.precedence() >= token.precedence() {
                    self.pop(3);
                    self.stack.push(Item::Operand);
                    self.emit_binary(op);
                    return true;
                }
            }
        }

        // op1 -x  ->  op1 x
        if len >= 3
            && self.top_is_operand(0)
            && matches!(self.top_op(1), Some(Operator::Plus | Operator::Minus))
            && self.top_op(2).is_some()
        {
            let negate = self.top_is(1, Operator::Minus);
            self.pop(2);
            self.stack.push(Item::Operand);
            if negate {
                self.emit(Opcode::Neg);
            }
            return true;
        }

        // -x at the very start
        if len == 2
            && self.top_is_operand(0)
            && matches!(self.top_op(1), Some(Operator::Plus | Operator::Minus))
        {
            let negate = self.top_is(1, Operator::Minus);
            self.pop(2);
            self.stack.push(Item::Operand);
            if negate {
                self.emit(Opcode::Neg);
            }
            return true;
        }

        false
    }

    /// Check the row just completed against the first row of its array
    fn finish_row(&mut self) {
        let width = self.arg_count;
        let Some(slot) = self.row_widths.last_mut() else {
            return;
        };
        match *slot {
            None => *slot = Some(width),
            Some(first) if first != width => {
                let error = FormulaError::Syntax(format!(
                    "inline array row has {} values, expected {}",
                    width, first
                ));
                self.error.get_or_insert(error);
            }
            Some(_) => {}
        }
    }

    fn emit_binary(&mut self, op: Operator) {
        match op {
            Operator::Plus => self.emit(Opcode::Add),
            Operator::Minus => self.emit(Opcode::Sub),
            Operator::Asterisk => self.emit(Opcode::Mul),
            Operator::Slash => self.emit(Opcode::Div),
            Operator::Caret => self.emit(Opcode::Pow),
            Operator::Ampersand => self.emit(Opcode::Concat),
            Operator::Intersect => self.emit(Opcode::Intersect),
            Operator::Union => self.emit(Opcode::Union),
            Operator::Equal => self.emit(Opcode::Equal),
            Operator::Less => self.emit(Opcode::Less),
            Operator::Greater => self.emit(Opcode::Greater),
            Operator::NotEqual => {
                self.emit(Opcode::Equal);
                self.emit(Opcode::Not);
            }
            Operator::LessEqual => {
                self.emit(Opcode::Greater);
                self.emit(Opcode::Not);
            }
            Operator::GreaterEqual => {
                self.emit(Opcode::Less);
                self.emit(Opcode::Not);
            }
            // Separators reduce without emitting anything
            _ => {}
        }
    }
}
