//! Logical functions

use super::flatten;
use crate::function::CallContext;
use tabula_core::{ErrorCode, Value, ValueCalc};

/// Truth value of a direct argument; errors and non-boolean text fail
fn condition(value: &Value, calc: &ValueCalc<'_>) -> Result<bool, Value> {
    if value.is_error() {
        return Err(value.clone());
    }
    calc.converter()
        .as_boolean(value)
        .ok_or_else(|| Value::error(ErrorCode::Value))
}

/// IF function
pub fn fn_if(args: &[Value], calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    match condition(&args[0], calc) {
        Ok(true) => args[1].clone(),
        Ok(false) => args.get(2).cloned().unwrap_or(Value::boolean(false)),
        Err(err) => err,
    }
}

/// NOT function
pub fn fn_not(args: &[Value], calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    match condition(&args[0], calc) {
        Ok(b) => Value::boolean(!b),
        Err(err) => err,
    }
}

/// Fold the logical values of all arguments
///
/// Text and empty entries inside arrays are ignored. With nothing left to
/// fold the result is `#VALUE!`.
fn fold_logical(args: &[Value], calc: &ValueCalc<'_>, init: bool, f: fn(bool, bool) -> bool) -> Value {
    let mut acc = init;
    let mut seen = false;

    for (value, from_array) in flatten(args) {
        if value.is_error() {
            return value.clone();
        }
        if from_array && (value.is_text() || value.is_empty()) {
            continue;
        }
        match calc.converter().as_boolean(value) {
            Some(b) => {
                acc = f(acc, b);
                seen = true;
            }
            None => return Value::error(ErrorCode::Value),
        }
    }

    if seen {
        Value::boolean(acc)
    } else {
        Value::error(ErrorCode::Value)
    }
}

/// AND function
pub fn fn_and(args: &[Value], calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    fold_logical(args, calc, true, |a, b| a && b)
}

/// OR function
pub fn fn_or(args: &[Value], calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    fold_logical(args, calc, false, |a, b| a || b)
}

/// TRUE function
pub fn fn_true(_args: &[Value], _calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    Value::boolean(true)
}

/// FALSE function
pub fn fn_false(_args: &[Value], _calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    Value::boolean(false)
}

/// IFERROR function
pub fn fn_iferror(args: &[Value], _calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    if args[0].is_error() {
        args[1].clone()
    } else {
        args[0].clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tabula_core::{CalculationSettings, ValueArray};

    fn call(f: super::super::FunctionImpl, args: &[Value]) -> Value {
        let settings = CalculationSettings::default();
        let calc = ValueCalc::new(&settings);
        f(args, &calc, &CallContext::default())
    }

    #[test]
    fn test_if() {
        assert_eq!(
            call(fn_if, &[Value::boolean(true), Value::integer(1), Value::integer(2)]),
            Value::integer(1)
        );
        assert_eq!(
            call(fn_if, &[Value::integer(0), Value::integer(1), Value::integer(2)]),
            Value::integer(2)
        );
        assert_eq!(
            call(fn_if, &[Value::integer(0), Value::integer(1)]),
            Value::boolean(false)
        );
        assert_eq!(
            call(fn_if, &[Value::error(ErrorCode::Na), Value::integer(1)]),
            Value::error(ErrorCode::Na)
        );
        assert_eq!(
            call(fn_if, &[Value::text("maybe"), Value::integer(1)]),
            Value::error(ErrorCode::Value)
        );
    }

    #[test]
    fn test_and_or() {
        assert_eq!(
            call(fn_and, &[Value::boolean(true), Value::integer(1)]),
            Value::boolean(true)
        );
        assert_eq!(
            call(fn_and, &[Value::boolean(true), Value::integer(0)]),
            Value::boolean(false)
        );
        assert_eq!(
            call(fn_or, &[Value::boolean(false), Value::integer(0)]),
            Value::boolean(false)
        );

        let range = Value::array(ValueArray::from_rows(vec![vec![
            Value::text("skip"),
            Value::boolean(true),
        ]]));
        assert_eq!(call(fn_or, &[range]), Value::boolean(true));

        let only_text = Value::array(ValueArray::from_rows(vec![vec![Value::text("x")]]));
        assert_eq!(call(fn_and, &[only_text]), Value::error(ErrorCode::Value));
    }

    #[test]
    fn test_iferror() {
        assert_eq!(
            call(fn_iferror, &[Value::error(ErrorCode::Div0), Value::integer(0)]),
            Value::integer(0)
        );
        assert_eq!(
            call(fn_iferror, &[Value::integer(5), Value::integer(0)]),
            Value::integer(5)
        );
    }
}
