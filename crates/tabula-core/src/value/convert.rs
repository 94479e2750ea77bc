//! Coercions between value types

use super::{ErrorCode, Value, ValueFormat, ValueKind};
use crate::settings::CalculationSettings;
use num_complex::Complex64;

/// Converts values between types following spreadsheet coercion rules
///
/// Text parsing honours the locale decimal and thousands separators from
/// [`CalculationSettings`].
#[derive(Debug, Clone, Copy)]
pub struct ValueConverter<'a> {
    settings: &'a CalculationSettings,
}

impl<'a> ValueConverter<'a> {
    pub fn new(settings: &'a CalculationSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &'a CalculationSettings {
        self.settings
    }

    /// Parse text as a number
    ///
    /// Accepts an optional sign, thousands separators, the locale decimal
    /// symbol (or `.`), an exponent and a trailing `%`. Integral text
    /// without decimals or exponent becomes an Integer.
    pub fn parse_number(&self, text: &str) -> Option<Value> {
        let mut s = text.trim();
        let percent = s.ends_with('%');
        if percent {
            s = s[..s.len() - 1].trim_end();
        }
        if s.is_empty() {
            return None;
        }

        let mut normalized = String::with_capacity(s.len());
        let mut is_float = false;
        for ch in s.chars() {
            if Some(ch) == self.settings.thousands_separator {
                continue;
            }
            if self.settings.is_decimal_point(ch) {
                normalized.push('.');
                is_float = true;
            } else {
                if ch == 'e' || ch == 'E' {
                    is_float = true;
                }
                normalized.push(ch);
            }
        }
        if !normalized
            .chars()
            .any(|c| c.is_ascii_digit())
        {
            return None;
        }
        if !normalized
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '+' | '-' | 'e' | 'E'))
        {
            return None;
        }

        if percent {
            let n: f64 = normalized.parse().ok()?;
            return Some(Value::float(n / 100.0).with_format(ValueFormat::Percent));
        }
        if !is_float {
            if let Ok(i) = normalized.parse::<i64>() {
                return Some(Value::integer(i));
            }
        }
        normalized.parse::<f64>().ok().map(Value::float)
    }

    /// Numeric form of a value
    ///
    /// Empty is 0, booleans are 0/1, arrays use their first element and
    /// numbers pass through. Returns `None` for text that is not a number.
    /// Errors map to 0; callers are expected to propagate them first.
    pub fn as_numeric(&self, value: &Value) -> Option<Value> {
        match value.kind() {
            ValueKind::Empty | ValueKind::Error(_) | ValueKind::CellRange => {
                Some(Value::float(0.0))
            }
            ValueKind::Boolean(b) => {
                Some(Value::float(if *b { 1.0 } else { 0.0 }).with_format(ValueFormat::Boolean))
            }
            ValueKind::Integer(_) | ValueKind::Float(_) | ValueKind::Complex(_) => {
                Some(value.clone())
            }
            ValueKind::Text(s) => self.parse_number(s),
            ValueKind::Array(a) => self.as_numeric(&a.element(0, 0)),
        }
    }

    /// Float form of a value; non-numeric text counts as 0
    pub fn to_float(&self, value: &Value) -> f64 {
        self.as_numeric(value)
            .and_then(|v| v.as_number())
            .unwrap_or(0.0)
    }

    /// Complex form of a value; non-numeric text counts as 0
    pub fn to_complex(&self, value: &Value) -> Complex64 {
        self.as_numeric(value)
            .and_then(|v| v.as_complex())
            .unwrap_or_default()
    }

    /// Text form of a value
    ///
    /// Returns `None` for errors and for arrays with more than one cell.
    pub fn as_text(&self, value: &Value) -> Option<String> {
        let decimal = self.settings.decimal_separator;
        match value.kind() {
            ValueKind::Empty | ValueKind::CellRange => Some(String::new()),
            ValueKind::Boolean(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
            ValueKind::Integer(i) => Some(i.to_string()),
            ValueKind::Float(f) => Some(format_float(*f, decimal)),
            ValueKind::Complex(c) => Some(format_complex(*c, decimal)),
            ValueKind::Text(s) => Some(s.to_string()),
            ValueKind::Array(a) if a.columns() <= 1 && a.rows() <= 1 => {
                self.as_text(&a.element(0, 0))
            }
            ValueKind::Array(_) | ValueKind::Error(_) => None,
        }
    }

    /// Truth value of a value
    ///
    /// Numbers are true when non-zero; text must read `TRUE` or `FALSE`
    /// (any case). Errors and other text yield `None`.
    pub fn as_boolean(&self, value: &Value) -> Option<bool> {
        match value.kind() {
            ValueKind::Empty | ValueKind::CellRange => Some(false),
            ValueKind::Boolean(b) => Some(*b),
            ValueKind::Integer(i) => Some(*i != 0),
            ValueKind::Float(f) => Some(*f != 0.0),
            ValueKind::Complex(c) => Some(c.re != 0.0 || c.im != 0.0),
            ValueKind::Text(s) => {
                if s.eq_ignore_ascii_case("TRUE") {
                    Some(true)
                } else if s.eq_ignore_ascii_case("FALSE") {
                    Some(false)
                } else {
                    None
                }
            }
            ValueKind::Array(a) => self.as_boolean(&a.element(0, 0)),
            ValueKind::Error(_) => None,
        }
    }

    /// Numeric coercion used by arithmetic
    ///
    /// Like [`as_numeric`](Self::as_numeric) but non-numeric, non-empty text
    /// is a `#VALUE!` error.
    pub fn numeric_or_error(&self, value: &Value) -> Result<Value, ErrorCode> {
        if let Some(code) = value.error_code() {
            return Err(code);
        }
        if let Some(s) = value.as_text() {
            if s.is_empty() {
                return Ok(Value::float(0.0));
            }
        }
        self.as_numeric(value).ok_or(ErrorCode::Value)
    }
}

/// Shortest text for a float, without a trailing `.0`
pub(crate) fn format_float(f: f64, decimal: char) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        return format!("{}", f as i64);
    }
    let text = format!("{}", f);
    if decimal == '.' {
        text
    } else {
        text.replace('.', &decimal.to_string())
    }
}

pub(crate) fn format_complex(c: Complex64, decimal: char) -> String {
    if c.im == 0.0 {
        return format_float(c.re, decimal);
    }
    let sign = if c.im < 0.0 { '-' } else { '+' };
    format!(
        "{}{}{}i",
        format_float(c.re, decimal),
        sign,
        format_float(c.im.abs(), decimal)
    )
}
