//! Arithmetic on values
//!
//! Every binary operation follows the same steps:
//! 1. An Error operand is returned as-is, the left one first.
//! 2. Array operands are mapped element-wise. A scalar is broadcast over
//!    the array; two arrays produce the component-wise maximum shape, with
//!    missing positions read as Empty.
//! 3. Scalars are coerced to numbers (Empty is 0, booleans are 0/1, text
//!    must parse or the result is `#VALUE!`).
//! 4. The result is a Float whose format combines the operand formats when
//!    the left operand is numeric or empty.

use super::{ErrorCode, Value, ValueArray, ValueFormat, ValueKind};
use super::convert::ValueConverter;
use crate::settings::CalculationSettings;
use num_complex::Complex64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
}

/// Arithmetic with error, array and format propagation
#[derive(Debug, Clone, Copy)]
pub struct ValueCalc<'a> {
    converter: ValueConverter<'a>,
}

impl<'a> ValueCalc<'a> {
    pub fn new(settings: &'a CalculationSettings) -> Self {
        Self {
            converter: ValueConverter::new(settings),
        }
    }

    /// The converter used for coercions
    pub fn converter(&self) -> &ValueConverter<'a> {
        &self.converter
    }

    pub fn settings(&self) -> &'a CalculationSettings {
        self.converter.settings()
    }

    pub fn add(&self, a: &Value, b: &Value) -> Value {
        self.binary(BinaryOp::Add, a, b)
    }

    pub fn sub(&self, a: &Value, b: &Value) -> Value {
        self.binary(BinaryOp::Sub, a, b)
    }

    pub fn mul(&self, a: &Value, b: &Value) -> Value {
        self.binary(BinaryOp::Mul, a, b)
    }

    /// Division; a zero divisor is `#DIV/0!`
    pub fn div(&self, a: &Value, b: &Value) -> Value {
        self.binary(BinaryOp::Div, a, b)
    }

    /// Remainder taking the sign of the divisor; a zero divisor is `#DIV/0!`
    pub fn modulo(&self, a: &Value, b: &Value) -> Value {
        self.binary(BinaryOp::Mod, a, b)
    }

    /// Power; a non-finite result is `#NUM!`
    pub fn pow(&self, a: &Value, b: &Value) -> Value {
        self.binary(BinaryOp::Pow, a, b)
    }

    /// Unary minus: errors pass through, arrays negate element-wise
    pub fn neg(&self, a: &Value) -> Value {
        if a.is_error() {
            return a.clone();
        }
        self.mul(a, &Value::integer(-1))
    }

    /// Text concatenation; any operand that cannot become text is `#VALUE!`
    pub fn concat(&self, a: &Value, b: &Value) -> Value {
        match (self.converter.as_text(a), self.converter.as_text(b)) {
            (Some(left), Some(right)) => Value::text(left + &right),
            _ => Value::error(ErrorCode::Value),
        }
    }

    fn binary(&self, op: BinaryOp, a: &Value, b: &Value) -> Value {
        if a.is_error() {
            return a.clone();
        }
        if b.is_error() {
            return b.clone();
        }
        if a.is_array() || b.is_array() {
            return self.map_arrays(op, a, b);
        }

        let lhs = match self.converter.numeric_or_error(a) {
            Ok(v) => v,
            Err(code) => return Value::error(code),
        };
        let rhs = match self.converter.numeric_or_error(b) {
            Ok(v) => v,
            Err(code) => return Value::error(code),
        };

        let mut result = if lhs.is_complex() || rhs.is_complex() {
            complex_op(op, lhs.as_complex().unwrap_or_default(), rhs.as_complex().unwrap_or_default())
        } else {
            float_op(op, lhs.as_number().unwrap_or(0.0), rhs.as_number().unwrap_or(0.0))
        };

        if !result.is_error() && (a.is_number() || a.is_empty()) {
            result.set_format(ValueFormat::combine(a.format(), b.format()));
        }
        result
    }

    fn map_arrays(&self, op: BinaryOp, a: &Value, b: &Value) -> Value {
        let columns = a.columns().max(b.columns());
        let rows = a.rows().max(b.rows());
        let mut out = ValueArray::with_size(columns, rows);
        for row in 0..rows {
            for col in 0..columns {
                let lhs = element_or_scalar(a, col, row);
                let rhs = element_or_scalar(b, col, row);
                out.set_element(col, row, self.binary(op, &lhs, &rhs));
            }
        }
        Value::array(out)
    }
}

/// Array element with Empty fill, or the scalar itself (broadcast)
fn element_or_scalar(value: &Value, col: u32, row: u32) -> Value {
    match value.kind() {
        ValueKind::Array(array) => array.element(col, row),
        _ => value.clone(),
    }
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Value {
    match op {
        BinaryOp::Add => Value::float(a + b),
        BinaryOp::Sub => Value::float(a - b),
        BinaryOp::Mul => Value::float(a * b),
        BinaryOp::Div => {
            if b == 0.0 {
                Value::error(ErrorCode::Div0)
            } else {
                Value::float(a / b)
            }
        }
        BinaryOp::Mod => {
            if b == 0.0 {
                return Value::error(ErrorCode::Div0);
            }
            let mut m = a % b;
            if (b > 0.0 && m < 0.0) || (b < 0.0 && m > 0.0) {
                m += b;
            }
            Value::float(m)
        }
        BinaryOp::Pow => {
            let p = a.powf(b);
            if p.is_finite() {
                Value::float(p)
            } else {
                Value::error(ErrorCode::Num)
            }
        }
    }
}

fn complex_op(op: BinaryOp, a: Complex64, b: Complex64) -> Value {
    let zero = Complex64::new(0.0, 0.0);
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == zero {
                return Value::error(ErrorCode::Div0);
            }
            a / b
        }
        BinaryOp::Mod => {
            if a.im != 0.0 || b.im != 0.0 {
                return Value::error(ErrorCode::Num);
            }
            return float_op(op, a.re, b.re);
        }
        BinaryOp::Pow => a.powc(b),
    };
    if !(result.re.is_finite() && result.im.is_finite()) {
        return Value::error(ErrorCode::Num);
    }
    if result.im == 0.0 {
        Value::float(result.re)
    } else {
        Value::complex(result)
    }
}
