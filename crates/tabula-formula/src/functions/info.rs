//! Information functions

use crate::function::CallContext;
use tabula_core::{ErrorCode, Value, ValueCalc};

/// ISERROR function
pub fn fn_iserror(args: &[Value], _calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    Value::boolean(args[0].is_error())
}

/// ISBLANK function
pub fn fn_isblank(args: &[Value], _calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    let blank = match args[0].as_array() {
        Some(array) => array.columns() == 1 && array.rows() == 1 && array.count() == 0,
        None => args[0].is_empty(),
    };
    Value::boolean(blank)
}

/// NA function
pub fn fn_na(_args: &[Value], _calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
    Value::error(ErrorCode::Na)
}

/// ROW function: 1-based row of the reference, or of the calling cell
pub fn fn_row(args: &[Value], _calc: &ValueCalc<'_>, call: &CallContext) -> Value {
    if args.is_empty() {
        return Value::integer(i64::from(call.row) + 1);
    }
    match call.region(0) {
        Some(region) => Value::integer(i64::from(region.top()) + 1),
        None => Value::error(ErrorCode::Value),
    }
}

/// COLUMN function: 1-based column of the reference, or of the calling cell
pub fn fn_column(args: &[Value], _calc: &ValueCalc<'_>, call: &CallContext) -> Value {
    if args.is_empty() {
        return Value::integer(i64::from(call.col) + 1);
    }
    match call.region(0) {
        Some(region) => Value::integer(i64::from(region.left()) + 1),
        None => Value::error(ErrorCode::Value),
    }
}

/// ROWS function
pub fn fn_rows(args: &[Value], _calc: &ValueCalc<'_>, call: &CallContext) -> Value {
    let rows = match call.region(0) {
        Some(region) => region.range.row_count(),
        None => args[0].rows(),
    };
    Value::integer(i64::from(rows))
}

/// COLUMNS function
pub fn fn_columns(args: &[Value], _calc: &ValueCalc<'_>, call: &CallContext) -> Value {
    let cols = match call.region(0) {
        Some(region) => u32::from(region.range.col_count()),
        None => args[0].columns(),
    };
    Value::integer(i64::from(cols))
}
