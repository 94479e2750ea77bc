//! Text functions

use crate::function::CallContext;
use tabula_core::{ErrorCode, Value, ValueCalc};

/// CONCATENATE function
pub fn fn_concatenate(args: &[Value], calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    let mut out = String::new();
    for arg in args {
        if arg.is_error() {
            return arg.clone();
        }
        match calc.converter().as_text(arg) {
            Some(s) => out.push_str(&s),
            None => return Value::error(ErrorCode::Value),
        }
    }
    Value::text(out)
}

/// LEN function, counting characters
pub fn fn_len(args: &[Value], calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    if args[0].is_error() {
        return args[0].clone();
    }
    match calc.converter().as_text(&args[0]) {
        Some(s) => Value::integer(s.chars().count() as i64),
        None => Value::error(ErrorCode::Value),
    }
}
