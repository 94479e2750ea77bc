//! Math functions

use super::flatten;
use crate::function::CallContext;
use tabula_core::{ErrorCode, Value, ValueCalc};

/// SUM function
///
/// Direct arguments are coerced to numbers; inside arrays only numbers
/// count. The first error encountered is returned.
pub fn fn_sum(args: &[Value], calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    let mut sum = Value::float(0.0);

    for (value, from_array) in flatten(args) {
        if let Some(code) = value.error_code() {
            return Value::error(code);
        }
        if from_array && !value.is_number() {
            continue;
        }
        match calc.converter().numeric_or_error(value) {
            Ok(n) => sum = calc.add(&sum, &n),
            Err(code) => return Value::error(code),
        }
    }

    sum
}

/// COUNT function
pub fn fn_count(args: &[Value], _calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    let count = flatten(args)
        .into_iter()
        .filter(|(value, _)| value.is_number())
        .count();
    Value::integer(count as i64)
}

/// ABS function
pub fn fn_abs(args: &[Value], calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    match calc.converter().numeric_or_error(&args[0]) {
        Ok(n) => match n.as_complex() {
            Some(c) if c.im != 0.0 => Value::float(c.norm()),
            _ => Value::float(n.as_number().unwrap_or_default().abs()),
        },
        Err(code) => Value::error(code),
    }
}

/// MOD function; the result takes the divisor's sign
pub fn fn_mod(args: &[Value], calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    calc.modulo(&args[0], &args[1])
}

/// POWER function
pub fn fn_power(args: &[Value], calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    calc.pow(&args[0], &args[1])
}

/// PI function
pub fn fn_pi(_args: &[Value], _calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    Value::float(std::f64::consts::PI)
}
