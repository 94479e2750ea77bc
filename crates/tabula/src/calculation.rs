//! Workbook calculation
//!
//! Evaluates every formula cell of a workbook and stores the results as the
//! cells' values. All cells share one evaluation state, so a cell referenced
//! by many formulas is computed once per run, and members of a reference
//! cycle come out as `#CIRCLE!`.
//!
//! # Example
//!
//! ```rust
//! use tabula::prelude::*;
//!
//! let mut workbook = Workbook::new();
//! workbook.set_value(0, "A1", 10.0).unwrap();
//! workbook.set_value(0, "A2", 20.0).unwrap();
//! workbook.set_formula(0, "A3", "=A1+A2").unwrap();
//!
//! let stats = workbook.calculate().unwrap();
//! assert_eq!(stats.formula_count, 1);
//! assert_eq!(workbook.value(0, "A3").unwrap(), Value::float(30.0));
//! ```

use crate::workbook::Workbook;
use tabula_core::{CellKey, Error, ErrorCode, Result, Value};
use tabula_formula::EvalState;
use tracing::debug;

/// Statistics from a calculation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CalculationStats {
    /// Total number of formula cells
    pub formula_count: usize,
    /// Number of cells whose value was computed, formula or not
    pub cells_calculated: usize,
    /// Number of formula cells that ended up `#CIRCLE!`
    pub circular_references: usize,
    /// Number of formula cells that evaluated to any error
    pub errors: usize,
}

/// Extension trait for Workbook to add calculation methods
pub trait WorkbookCalculationExt {
    /// Calculate all formulas in the workbook
    fn calculate(&mut self) -> Result<CalculationStats>;

    /// Calculate the formulas of one sheet
    ///
    /// Formulas on other sheets that these depend on are evaluated too, but
    /// only this sheet's cells are updated.
    fn calculate_sheet(&mut self, sheet: usize) -> Result<CalculationStats>;
}

impl WorkbookCalculationExt for Workbook {
    fn calculate(&mut self) -> Result<CalculationStats> {
        let keys = formula_keys(self, None);
        Ok(calculate_cells(self, &keys))
    }

    fn calculate_sheet(&mut self, sheet: usize) -> Result<CalculationStats> {
        if self.sheet(sheet).is_none() {
            return Err(Error::SheetNotFound(format!("#{}", sheet)));
        }
        let keys = formula_keys(self, Some(sheet));
        Ok(calculate_cells(self, &keys))
    }
}

fn formula_keys(workbook: &Workbook, only: Option<usize>) -> Vec<CellKey> {
    (0..workbook.sheet_count())
        .filter(|&index| only.map_or(true, |o| o == index))
        .filter_map(|index| workbook.sheet(index).map(|sheet| (index, sheet)))
        .flat_map(|(index, sheet)| {
            sheet
                .formula_cells()
                .map(move |(row, col, _)| CellKey::new(index, row, col))
        })
        .collect()
}

fn calculate_cells(workbook: &mut Workbook, keys: &[CellKey]) -> CalculationStats {
    let mut stats = CalculationStats {
        formula_count: keys.len(),
        ..CalculationStats::default()
    };
    if keys.is_empty() {
        return stats;
    }

    let results: Vec<(CellKey, Value)> = {
        let ctx = workbook.context();
        let mut state = EvalState::new();
        let results: Vec<_> = keys
            .iter()
            .filter_map(|&key| {
                let sheet = workbook.sheet(key.sheet)?;
                let formula = sheet.formula(key.row, key.col)?;
                Some((key, formula.eval_in(&ctx, &mut state)))
            })
            .collect();
        stats.cells_calculated = state.memo_len();
        results
    };

    for (key, value) in results {
        match value.error_code() {
            Some(ErrorCode::Circle) => {
                stats.circular_references += 1;
                stats.errors += 1;
            }
            Some(_) => stats.errors += 1,
            None => {}
        }
        workbook.store_result(key, value);
    }

    debug!(
        formulas = stats.formula_count,
        calculated = stats.cells_calculated,
        circular = stats.circular_references,
        errors = stats.errors,
        "calculation finished"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_calculate_stores_results() {
        let mut wb = Workbook::new();
        wb.set_value(0, "A1", 2).unwrap();
        wb.set_formula(0, "A2", "=A1*10").unwrap();
        wb.set_formula(0, "A3", "=A2+A1").unwrap();

        assert_eq!(wb.value(0, "A3").unwrap(), Value::empty());
        let stats = wb.calculate().unwrap();
        assert_eq!(stats.formula_count, 2);
        assert_eq!(stats.errors, 0);
        assert_eq!(wb.value(0, "A2").unwrap(), Value::float(20.0));
        assert_eq!(wb.value(0, "A3").unwrap(), Value::float(22.0));
    }

    #[test]
    fn test_calculate_counts_cycles_and_errors() {
        let mut wb = Workbook::new();
        wb.set_formula(0, "A1", "=B1").unwrap();
        wb.set_formula(0, "B1", "=A1").unwrap();
        wb.set_formula(0, "C1", "=1/0").unwrap();
        wb.set_formula(0, "D1", "=5").unwrap();

        let stats = wb.calculate().unwrap();
        assert_eq!(stats.formula_count, 4);
        assert_eq!(stats.circular_references, 2);
        assert_eq!(stats.errors, 3);
        assert_eq!(wb.value(0, "A1").unwrap(), Value::error(ErrorCode::Circle));
        assert_eq!(wb.value(0, "C1").unwrap(), Value::error(ErrorCode::Div0));
    }

    #[test]
    fn test_calculate_sheet() {
        let mut wb = Workbook::new();
        wb.add_sheet("Two").unwrap();
        wb.set_formula(0, "A1", "=1+1").unwrap();
        wb.set_formula(1, "A1", "=Sheet1!A1*3").unwrap();

        let stats = wb.calculate_sheet(1).unwrap();
        assert_eq!(stats.formula_count, 1);
        // Dependency on the first sheet was computed but not stored
        assert_eq!(stats.cells_calculated, 2);
        assert_eq!(wb.value(1, "A1").unwrap(), Value::float(6.0));
        assert_eq!(wb.value(0, "A1").unwrap(), Value::empty());

        assert!(wb.calculate_sheet(7).is_err());
    }
}
