//! Tests for formula evaluation against a workbook

use pretty_assertions::assert_eq;
use tabula::prelude::*;
use tabula::{CallContext, FunctionDef, ValueCalc};

fn eval(expression: &str) -> Value {
    Workbook::new().evaluate_formula(0, expression).unwrap()
}

fn numbers(rows: &[&[f64]]) -> Value {
    Value::array(ValueArray::from_rows(
        rows.iter()
            .map(|row| row.iter().map(|&n| Value::float(n)).collect())
            .collect(),
    ))
}

/// Test basic formula evaluation without cell references
#[test]
fn test_evaluate_simple_formulas() {
    assert_eq!(eval("=1+2*3"), Value::float(7.0));
    assert_eq!(eval("=(1+2)*3"), Value::float(9.0));
    assert_eq!(eval("=2^3^2"), Value::float(64.0));
    assert_eq!(eval("=50%"), Value::float(0.5));
    assert_eq!(eval("=50%+1"), Value::float(1.5));
    assert_eq!(eval("=(1+1)%"), Value::float(0.02));
    assert_eq!(eval("=ABS(-50)%"), Value::float(0.5));
    assert_eq!(eval("=\"Hello \"&\"World\""), Value::text("Hello World"));
    assert_eq!(eval("=5>3"), Value::boolean(true));
    assert_eq!(eval("=5<>5"), Value::boolean(false));
}

/// Test error propagation through arithmetic
#[test]
fn test_errors_propagate() {
    assert_eq!(eval("=1/0"), Value::error(ErrorCode::Div0));
    assert_eq!(eval("=MOD(5;0)"), Value::error(ErrorCode::Div0));
    assert_eq!(eval("=\"abc\"+5"), Value::error(ErrorCode::Value));
    assert_eq!(eval("=#N/A+1"), Value::error(ErrorCode::Na));
    assert_eq!(eval("=#REF!+#DIV/0!"), Value::error(ErrorCode::Ref));
    assert_eq!(eval("=1+"), Value::error(ErrorCode::Parse));
    assert_eq!(eval("={1;2|3}"), Value::error(ErrorCode::Parse));
    assert_eq!(eval("=NOSUCHFUNC(1)"), Value::error(ErrorCode::Name));
    assert_eq!(eval("=IFERROR(NOSUCHFUNC(1);42)"), Value::integer(42));
    assert_eq!(eval("=ABS()"), Value::error(ErrorCode::Value));
}

/// Test element-wise array arithmetic
#[test]
fn test_inline_arrays() {
    assert_eq!(
        eval("={1;2|3;4}*10"),
        numbers(&[&[10.0, 20.0], &[30.0, 40.0]])
    );

    // Shapes differ: the result takes the larger extents, missing cells read as empty
    let result = eval("={1;2|3;4}+{1;1;1}");
    assert_eq!(result.columns(), 3);
    assert_eq!(result.rows(), 2);
    assert_eq!(result.element(0, 0), Value::float(2.0));
    assert_eq!(result.element(2, 0), Value::float(1.0));
    assert_eq!(result.element(2, 1), Value::float(0.0));
}

/// Test formula evaluation with cell references
#[test]
fn test_evaluate_with_cell_references() {
    let mut wb = Workbook::new();
    wb.set_value(0, "A1", 10.0).unwrap();
    wb.set_value(0, "A2", 20.0).unwrap();
    wb.set_value(0, "A3", 30.0).unwrap();
    wb.set_value(0, "B1", 5.0).unwrap();
    wb.set_formula(0, "C1", "=A1+B1").unwrap();
    wb.set_formula(0, "C2", "=C1*2").unwrap();

    assert_eq!(wb.evaluate_formula(0, "=A1").unwrap(), Value::float(10.0));
    assert_eq!(wb.evaluate(0, "C1").unwrap(), Value::float(15.0));
    assert_eq!(wb.evaluate(0, "C2").unwrap(), Value::float(30.0));
    assert_eq!(wb.evaluate_formula(0, "=A1>B1").unwrap(), Value::boolean(true));
    assert_eq!(wb.evaluate_formula(0, "=SUM(A1:A3)").unwrap(), Value::float(60.0));
    assert_eq!(wb.evaluate_formula(0, "=COUNT(A1:B3)").unwrap(), Value::integer(4));
    assert_eq!(wb.evaluate_formula(0, "=ISBLANK(Z1)").unwrap(), Value::boolean(true));

    // Values are live: a change is seen on the next evaluation
    wb.set_value(0, "A1", 1.0).unwrap();
    assert_eq!(wb.evaluate(0, "C2").unwrap(), Value::float(12.0));
}

/// Ranges include computed values of formula cells
#[test]
fn test_range_includes_formula_results() {
    let mut wb = Workbook::new();
    wb.set_value(0, "A1", 1).unwrap();
    wb.set_formula(0, "A2", "=A1*2").unwrap();
    wb.set_formula(0, "A3", "=A2*2").unwrap();
    wb.set_formula(0, "B1", "=SUM(A1:A3)").unwrap();

    assert_eq!(wb.evaluate(0, "B1").unwrap(), Value::float(7.0));
}

/// Test references across sheets
#[test]
fn test_cross_sheet_references() {
    let mut wb = Workbook::new();
    let sales = wb.add_sheet("Sales Q3").unwrap();
    wb.set_value(sales, "A4", 250).unwrap();
    wb.set_value(sales, "B4", 50).unwrap();

    assert_eq!(
        wb.evaluate_formula(0, "='Sales Q3'!A4*2").unwrap(),
        Value::float(500.0)
    );
    assert_eq!(
        wb.evaluate_formula(0, "=SUM('Sales Q3'!A4:B4)").unwrap(),
        Value::float(300.0)
    );
    assert_eq!(wb.evaluate_formula(sales, "=A4-B4").unwrap(), Value::float(200.0));
    assert_eq!(
        wb.evaluate_formula(0, "=Missing!A1").unwrap(),
        Value::error(ErrorCode::Ref)
    );
}

/// Direct and indirect cycles evaluate to #CIRCLE!
#[test]
fn test_circular_references() {
    let mut wb = Workbook::new();
    wb.set_formula(0, "A1", "=A1+1").unwrap();
    wb.set_formula(0, "B1", "=C1").unwrap();
    wb.set_formula(0, "C1", "=B1*2").unwrap();
    wb.set_formula(0, "D1", "=SUM(D1:D2)").unwrap();

    assert_eq!(wb.evaluate(0, "A1").unwrap(), Value::error(ErrorCode::Circle));
    assert_eq!(wb.evaluate(0, "B1").unwrap(), Value::error(ErrorCode::Circle));
    assert_eq!(wb.evaluate(0, "C1").unwrap(), Value::error(ErrorCode::Circle));
    assert_eq!(wb.evaluate(0, "D1").unwrap(), Value::error(ErrorCode::Circle));
}

/// Long reference chains stop at the recursion limit
#[test]
fn test_recursion_limit() {
    let settings = CalculationSettings {
        max_recursion_depth: 8,
        ..CalculationSettings::default()
    };
    let mut wb = Workbook::with_settings(settings);
    wb.set_value(0, "A1", 1).unwrap();
    for row in 2..=30 {
        wb.set_formula(0, &format!("A{}", row), &format!("=A{}+1", row - 1))
            .unwrap();
    }

    assert_eq!(wb.evaluate(0, "A5").unwrap(), Value::float(5.0));
    assert_eq!(wb.evaluate(0, "A30").unwrap(), Value::error(ErrorCode::Circle));
}

/// Named areas resolve in formulas and select the row of the calling cell
#[test]
fn test_named_areas() {
    let mut wb = Workbook::new();
    for (row, price) in [(1, 10), (2, 20), (3, 30)] {
        wb.set_value(0, &format!("B{}", row), price).unwrap();
    }
    wb.set_formula(0, "C2", "=Prices*2").unwrap();
    wb.set_formula(0, "C3", "=SUM(Prices)").unwrap();

    // Undefined at compile time, the name reads as text
    assert_eq!(wb.evaluate(0, "C3").unwrap(), Value::error(ErrorCode::Value));

    wb.define_name("Prices", "Sheet1!$B$1:$B$3").unwrap();
    assert_eq!(wb.evaluate(0, "C2").unwrap(), Value::float(40.0));
    assert_eq!(wb.evaluate(0, "C3").unwrap(), Value::float(60.0));
    assert_eq!(wb.evaluate_formula(0, "=ROWS(Prices)").unwrap(), Value::integer(3));
}

/// A named area spanning columns picks from the owner's row only within its rows
#[test]
fn test_named_area_spanning_columns() {
    let mut wb = Workbook::new();
    for (cell, value) in [("B1", 1), ("C1", 2), ("B2", 3), ("C2", 4)] {
        wb.set_value(0, cell, value).unwrap();
    }
    wb.define_name("Grid", "Sheet1!$B$1:$C$2").unwrap();
    wb.set_formula(0, "D2", "=Grid*1").unwrap();
    wb.set_formula(0, "D3", "=Grid*1").unwrap();

    assert_eq!(wb.evaluate(0, "D2").unwrap(), Value::float(3.0));
    assert_eq!(
        wb.evaluate(0, "D3").unwrap(),
        numbers(&[&[1.0, 2.0], &[3.0, 4.0]])
    );
}

/// Space intersects ranges and `~` unites them
#[test]
fn test_intersection_and_union() {
    let mut wb = Workbook::new();
    for (i, cell) in ["A1", "B1", "A2", "B2", "C3"].iter().enumerate() {
        wb.set_value(0, cell, (i + 1) as i64).unwrap();
    }

    assert_eq!(wb.evaluate_formula(0, "=A1:B2 B2:C3").unwrap(), Value::integer(4));
    assert_eq!(
        wb.evaluate_formula(0, "=A1:A2 C1:C3").unwrap(),
        Value::error(ErrorCode::Null)
    );
    assert_eq!(wb.evaluate_formula(0, "=SUM(A1~C3)").unwrap(), Value::float(6.0));
}

/// Custom functions can be registered on the workbook
#[test]
fn test_custom_function() {
    fn double(args: &[Value], calc: &ValueCalc<'_>, _call: &CallContext) -> Value {
        calc.mul(&args[0], &Value::integer(2))
    }

    let mut wb = Workbook::new();
    wb.functions_mut()
        .register(FunctionDef {
            name: "DOUBLE",
            min_args: 1,
            max_args: Some(1),
            implementation: double,
        })
        .unwrap();

    assert_eq!(wb.evaluate_formula(0, "=double(21)").unwrap(), Value::float(42.0));
    assert_eq!(
        wb.evaluate_formula(0, "=DOUBLE(1;2)").unwrap(),
        Value::error(ErrorCode::Value)
    );
}

/// What-if evaluation reads one cell in place of another
#[test]
fn test_indirections() {
    let mut wb = Workbook::new();
    wb.set_value(0, "A1", 10).unwrap();
    wb.set_value(0, "A2", 99).unwrap();
    wb.set_formula(0, "B1", "=A1+1").unwrap();
    wb.set_formula(0, "B2", "=B1*2").unwrap();

    let a1 = CellKey::new(0, 0, 0);
    let a2 = CellKey::new(0, 1, 0);
    assert_eq!(
        wb.evaluate_with_indirections(0, "B2", [(a1, a2)]).unwrap(),
        Value::float(200.0)
    );
    assert_eq!(wb.evaluate(0, "B2").unwrap(), Value::float(22.0));
}

/// Locale settings change how numbers are written
#[test]
fn test_comma_decimal_locale() {
    let mut wb = Workbook::with_settings(CalculationSettings::comma_decimal());
    wb.set_value(0, "A1", "1.234,5").unwrap();
    assert_eq!(wb.evaluate_formula(0, "=1,5*2").unwrap(), Value::float(3.0));
    assert_eq!(wb.evaluate_formula(0, "=A1*2").unwrap(), Value::float(2469.0));
}

/// Recalculation stores results in the cells
#[test]
fn test_workbook_calculate() {
    let mut wb = Workbook::new();
    wb.set_value(0, "A1", 3).unwrap();
    wb.set_formula(0, "A2", "=A1^2").unwrap();
    wb.set_formula(0, "A3", "=A2&\"!\"").unwrap();
    wb.set_formula(0, "A4", "=A4").unwrap();

    let stats = wb.calculate().unwrap();
    assert_eq!(stats.formula_count, 3);
    assert_eq!(stats.circular_references, 1);
    assert_eq!(wb.value(0, "A2").unwrap(), Value::float(9.0));
    assert_eq!(wb.value(0, "A3").unwrap(), Value::text("9!"));
}
