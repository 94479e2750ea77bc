//! Runtime values
//!
//! This module contains:
//! - [`Value`] - A tagged value plus its display-format tag
//! - [`ErrorCode`] - The closed set of spreadsheet errors
//! - [`ValueArray`] - Sparse 2-D array payload
//! - [`ValueConverter`] - Coercions between value types
//! - [`ValueCalc`] - Arithmetic with error, array and format propagation

mod array;
mod calc;
mod compare;
mod convert;

pub use array::ValueArray;
pub use calc::ValueCalc;
pub use convert::ValueConverter;

use num_complex::Complex64;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Spreadsheet error values
///
/// Errors are identified by code, never by their display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    /// #CIRCLE! - Reference cycle
    Circle,
    /// #DEPEND! - Unresolvable or deleted reference
    Depend,
    /// #DIV/0! - Division or modulo by zero
    Div0,
    /// #N/A - Value not available
    Na,
    /// #NAME? - Unknown function or name
    Name,
    /// #NUM! - Argument outside the numeric domain
    Num,
    /// #NULL! - Empty range intersection
    Null,
    /// #PARSE! - Formula could not be scanned or compiled
    Parse,
    /// #REF! - Invalid reference
    Ref,
    /// #VALUE! - Wrong type or shape
    Value,
}

impl ErrorCode {
    /// Every error code, in display order
    pub const ALL: [ErrorCode; 10] = [
        ErrorCode::Circle,
        ErrorCode::Depend,
        ErrorCode::Div0,
        ErrorCode::Na,
        ErrorCode::Name,
        ErrorCode::Num,
        ErrorCode::Null,
        ErrorCode::Parse,
        ErrorCode::Ref,
        ErrorCode::Value,
    ];

    /// Get the display string for this error
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Circle => "#CIRCLE!",
            ErrorCode::Depend => "#DEPEND!",
            ErrorCode::Div0 => "#DIV/0!",
            ErrorCode::Na => "#N/A",
            ErrorCode::Name => "#NAME?",
            ErrorCode::Num => "#NUM!",
            ErrorCode::Null => "#NULL!",
            ErrorCode::Parse => "#PARSE!",
            ErrorCode::Ref => "#REF!",
            ErrorCode::Value => "#VALUE!",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorCode {
    type Err = ();

    /// Parse an error literal, case-insensitively
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ErrorCode::ALL
            .into_iter()
            .find(|code| code.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}

/// Display-format tag carried alongside a value
///
/// Only used to propagate formatting through arithmetic; it never changes
/// how a value computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ValueFormat {
    #[default]
    None,
    Boolean,
    Number,
    Percent,
    Money,
    DateTime,
    Date,
    Time,
    Text,
}

impl ValueFormat {
    /// Date, time or date-time
    pub fn is_date_like(&self) -> bool {
        matches!(self, ValueFormat::DateTime | ValueFormat::Date | ValueFormat::Time)
    }

    /// Format of an arithmetic result from the formats of its operands
    pub fn combine(a: ValueFormat, b: ValueFormat) -> ValueFormat {
        if a.is_date_like() && b.is_date_like() {
            return ValueFormat::Number;
        }
        let chosen = match a {
            ValueFormat::None | ValueFormat::Boolean => b,
            _ => a,
        };
        match chosen {
            ValueFormat::None | ValueFormat::Boolean | ValueFormat::Text => ValueFormat::Number,
            other => other,
        }
    }
}

/// Payload-free type tag of a [`Value`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Empty,
    Boolean,
    Integer,
    Float,
    Complex,
    Text,
    Array,
    Error,
    CellRange,
}

/// The payload of a [`Value`]
#[derive(Debug, Clone)]
pub enum ValueKind {
    /// No value
    Empty,
    /// TRUE / FALSE
    Boolean(bool),
    /// 64-bit integer
    Integer(i64),
    /// Floating point number
    Float(f64),
    /// Complex number
    Complex(Complex64),
    /// Shared text
    Text(Arc<str>),
    /// 2-D array
    Array(ValueArray),
    /// Error from the closed set
    Error(ErrorCode),
    /// Reserved for range-valued results
    CellRange,
}

impl PartialEq for ValueKind {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ValueKind::Empty, ValueKind::Empty) => true,
            (ValueKind::Boolean(a), ValueKind::Boolean(b)) => a == b,
            (ValueKind::Integer(a), ValueKind::Integer(b)) => a == b,
            (ValueKind::Float(a), ValueKind::Float(b)) => compare::approx_eq(*a, *b),
            (ValueKind::Complex(a), ValueKind::Complex(b)) => a == b,
            (ValueKind::Text(a), ValueKind::Text(b)) => a == b,
            (ValueKind::Array(a), ValueKind::Array(b)) => a == b,
            (ValueKind::Error(a), ValueKind::Error(b)) => a == b,
            (ValueKind::CellRange, ValueKind::CellRange) => true,
            _ => false,
        }
    }
}

/// A runtime value: a tagged payload plus a display-format tag
///
/// `==` is strict: both the type and the payload must match, and the format
/// tag is ignored. Use [`Value::compare`] or [`Value::equal`] for
/// spreadsheet comparison semantics.
#[derive(Debug, Clone)]
pub struct Value {
    kind: ValueKind,
    format: ValueFormat,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::empty()
    }
}

impl Value {
    fn with(kind: ValueKind, format: ValueFormat) -> Self {
        Self { kind, format }
    }

    /// The empty value
    pub fn empty() -> Self {
        Self::with(ValueKind::Empty, ValueFormat::None)
    }

    /// A boolean value
    pub fn boolean(b: bool) -> Self {
        Self::with(ValueKind::Boolean(b), ValueFormat::Boolean)
    }

    /// An integer value
    pub fn integer(i: i64) -> Self {
        Self::with(ValueKind::Integer(i), ValueFormat::Number)
    }

    /// A floating point value
    pub fn float(f: f64) -> Self {
        Self::with(ValueKind::Float(f), ValueFormat::Number)
    }

    /// A complex value
    pub fn complex(c: Complex64) -> Self {
        Self::with(ValueKind::Complex(c), ValueFormat::Number)
    }

    /// A text value
    pub fn text<S: AsRef<str>>(s: S) -> Self {
        Self::with(ValueKind::Text(Arc::from(s.as_ref())), ValueFormat::Text)
    }

    /// An array value
    pub fn array(array: ValueArray) -> Self {
        Self::with(ValueKind::Array(array), ValueFormat::None)
    }

    /// An error value
    pub fn error(code: ErrorCode) -> Self {
        Self::with(ValueKind::Error(code), ValueFormat::None)
    }

    /// The payload
    pub fn kind(&self) -> &ValueKind {
        &self.kind
    }

    /// Consume into the payload
    pub fn into_kind(self) -> ValueKind {
        self.kind
    }

    /// The type tag
    pub fn value_type(&self) -> ValueType {
        match self.kind {
            ValueKind::Empty => ValueType::Empty,
            ValueKind::Boolean(_) => ValueType::Boolean,
            ValueKind::Integer(_) => ValueType::Integer,
            ValueKind::Float(_) => ValueType::Float,
            ValueKind::Complex(_) => ValueType::Complex,
            ValueKind::Text(_) => ValueType::Text,
            ValueKind::Array(_) => ValueType::Array,
            ValueKind::Error(_) => ValueType::Error,
            ValueKind::CellRange => ValueType::CellRange,
        }
    }

    /// The display-format tag
    pub fn format(&self) -> ValueFormat {
        self.format
    }

    /// Replace the display-format tag
    pub fn set_format(&mut self, format: ValueFormat) {
        self.format = format;
    }

    /// Builder-style [`set_format`](Self::set_format)
    pub fn with_format(mut self, format: ValueFormat) -> Self {
        self.format = format;
        self
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, ValueKind::Empty)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.kind, ValueKind::Boolean(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self.kind, ValueKind::Integer(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self.kind, ValueKind::Float(_))
    }

    pub fn is_complex(&self) -> bool {
        matches!(self.kind, ValueKind::Complex(_))
    }

    /// Integer, float or complex
    pub fn is_number(&self) -> bool {
        matches!(
            self.kind,
            ValueKind::Integer(_) | ValueKind::Float(_) | ValueKind::Complex(_)
        )
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, ValueKind::Text(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self.kind, ValueKind::Array(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self.kind, ValueKind::Error(_))
    }

    /// The boolean payload
    pub fn as_boolean(&self) -> Option<bool> {
        match self.kind {
            ValueKind::Boolean(b) => Some(b),
            _ => None,
        }
    }

    /// The integer payload, truncating floats
    pub fn as_integer(&self) -> Option<i64> {
        match self.kind {
            ValueKind::Integer(i) => Some(i),
            ValueKind::Float(f) => Some(f as i64),
            _ => None,
        }
    }

    /// Numeric payload as a float (the real part for complex numbers)
    pub fn as_number(&self) -> Option<f64> {
        match self.kind {
            ValueKind::Integer(i) => Some(i as f64),
            ValueKind::Float(f) => Some(f),
            ValueKind::Complex(c) => Some(c.re),
            _ => None,
        }
    }

    /// Numeric payload as a complex number
    pub fn as_complex(&self) -> Option<Complex64> {
        match self.kind {
            ValueKind::Complex(c) => Some(c),
            _ => self.as_number().map(|re| Complex64::new(re, 0.0)),
        }
    }

    /// The text payload
    pub fn as_text(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The array payload
    pub fn as_array(&self) -> Option<&ValueArray> {
        match &self.kind {
            ValueKind::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The error code
    pub fn error_code(&self) -> Option<ErrorCode> {
        match self.kind {
            ValueKind::Error(code) => Some(code),
            _ => None,
        }
    }

    /// Columns of an array; scalars count as 1x1
    pub fn columns(&self) -> u32 {
        self.as_array().map_or(1, ValueArray::columns)
    }

    /// Rows of an array; scalars count as 1x1
    pub fn rows(&self) -> u32 {
        self.as_array().map_or(1, ValueArray::rows)
    }

    /// Populated entries of an array; scalars count as 1
    pub fn count(&self) -> usize {
        self.as_array().map_or(1, ValueArray::count)
    }

    /// Element of an array, or the value itself for scalars
    pub fn element(&self, col: u32, row: u32) -> Value {
        match &self.kind {
            ValueKind::Array(a) => a.element(col, row),
            _ => self.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Empty | ValueKind::CellRange => Ok(()),
            ValueKind::Boolean(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            ValueKind::Integer(i) => write!(f, "{}", i),
            ValueKind::Float(n) => f.write_str(&convert::format_float(*n, '.')),
            ValueKind::Complex(c) => f.write_str(&convert::format_complex(*c, '.')),
            ValueKind::Text(s) => f.write_str(s),
            ValueKind::Array(a) => {
                f.write_str("{")?;
                for row in 0..a.rows() {
                    if row > 0 {
                        f.write_str("|")?;
                    }
                    for col in 0..a.columns() {
                        if col > 0 {
                            f.write_str(";")?;
                        }
                        write!(f, "{}", a.element(col, row))?;
                    }
                }
                f.write_str("}")
            }
            ValueKind::Error(code) => write!(f, "{}", code),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::boolean(b)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::integer(n as i64)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::float(n)
    }
}

impl From<Complex64> for Value {
    fn from(c: Complex64) -> Self {
        Value::complex(c)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::text(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::text(s)
    }
}

impl From<ErrorCode> for Value {
    fn from(code: ErrorCode) -> Self {
        Value::error(code)
    }
}

impl From<ValueArray> for Value {
    fn from(array: ValueArray) -> Self {
        Value::array(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_constructor_formats() {
        assert_eq!(Value::empty().format(), ValueFormat::None);
        assert_eq!(Value::boolean(true).format(), ValueFormat::Boolean);
        assert_eq!(Value::integer(1).format(), ValueFormat::Number);
        assert_eq!(Value::float(1.5).format(), ValueFormat::Number);
        assert_eq!(Value::text("x").format(), ValueFormat::Text);
        assert_eq!(Value::error(ErrorCode::Na).format(), ValueFormat::None);
    }

    #[test]
    fn test_strict_equality() {
        assert_eq!(Value::integer(1), Value::integer(1));
        assert_ne!(Value::integer(1), Value::float(1.0));
        assert_eq!(Value::float(0.1 + 0.2), Value::float(0.3));
        assert_ne!(Value::text("a"), Value::text("A"));
        assert_eq!(
            Value::float(2.0).with_format(ValueFormat::Date),
            Value::float(2.0)
        );
    }

    #[test]
    fn test_error_code_strings() {
        assert_eq!(ErrorCode::Div0.to_string(), "#DIV/0!");
        assert_eq!(ErrorCode::Name.to_string(), "#NAME?");
        assert_eq!("#n/a".parse::<ErrorCode>(), Ok(ErrorCode::Na));
        assert_eq!("#PARSE!".parse::<ErrorCode>(), Ok(ErrorCode::Parse));
        assert!("#BOGUS!".parse::<ErrorCode>().is_err());
        for code in ErrorCode::ALL {
            assert_eq!(code.as_str().parse::<ErrorCode>(), Ok(code));
        }
    }

    #[test]
    fn test_combine_formats() {
        use ValueFormat::*;
        assert_eq!(ValueFormat::combine(Date, Date), Number);
        assert_eq!(ValueFormat::combine(Date, Number), Date);
        assert_eq!(ValueFormat::combine(None, Money), Money);
        assert_eq!(ValueFormat::combine(Boolean, Percent), Percent);
        assert_eq!(ValueFormat::combine(None, None), Number);
    }

    #[test]
    fn test_scalar_as_array() {
        let v = Value::integer(7);
        assert_eq!(v.columns(), 1);
        assert_eq!(v.rows(), 1);
        assert_eq!(v.element(3, 3), v);
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::boolean(false).to_string(), "FALSE");
        assert_eq!(Value::float(2.5).to_string(), "2.5");
        assert_eq!(Value::float(3.0).to_string(), "3");
        assert_eq!(Value::error(ErrorCode::Ref).to_string(), "#REF!");

        let array = ValueArray::from_rows(vec![
            vec![Value::integer(1), Value::integer(2)],
            vec![Value::integer(3), Value::integer(4)],
        ]);
        assert_eq!(Value::array(array).to_string(), "{1;2|3;4}");
    }
}
