//! Stack machine instructions

use std::fmt;

/// One instruction of a compiled formula
///
/// Indexed variants refer to the program's constant pool. Binary operators
/// pop the right operand first, then the left one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Nop,
    /// Push a constant
    Load(usize),
    /// Push a constant holding a bare name
    Ref(usize),
    /// Resolve a cell reference held in a constant and push its value
    Cell(usize),
    /// Resolve a range reference held in a constant and push its values
    Range(usize),
    /// Call a function with this many arguments; the name sits below them
    Function(usize),
    Add,
    Sub,
    Neg,
    Mul,
    Div,
    Pow,
    Concat,
    Intersect,
    Not,
    Equal,
    Less,
    Greater,
    Union,
    /// Build an array from `cols * rows` values, row by row
    Array { cols: usize, rows: usize },
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::Nop => f.write_str("Nop"),
            Opcode::Load(i) => write!(f, "Load #{}", i),
            Opcode::Ref(i) => write!(f, "Ref #{}", i),
            Opcode::Cell(i) => write!(f, "Cell #{}", i),
            Opcode::Range(i) => write!(f, "Range #{}", i),
            Opcode::Function(n) => write!(f, "Function ({})", n),
            Opcode::Add => f.write_str("Add"),
            Opcode::Sub => f.write_str("Sub"),
            Opcode::Neg => f.write_str("Neg"),
            Opcode::Mul => f.write_str("Mul"),
            Opcode::Div => f.write_str("Div"),
            Opcode::Pow => f.write_str("Pow"),
            Opcode::Concat => f.write_str("Concat"),
            Opcode::Intersect => f.write_str("Intersect"),
            Opcode::Not => f.write_str("Not"),
            Opcode::Equal => f.write_str("Equal"),
            Opcode::Less => f.write_str("Less"),
            Opcode::Greater => f.write_str("Greater"),
            Opcode::Union => f.write_str("Union"),
            Opcode::Array { cols, rows } => write!(f, "Array ({}x{})", cols, rows),
        }
    }
}
