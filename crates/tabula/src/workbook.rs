//! In-memory workbook
//!
//! A [`Workbook`] owns named sheets of cells, workbook-level named areas and
//! the settings and function registry its formulas evaluate with. It is the
//! [`Resolver`] its own formulas read through.

use ahash::AHashMap;
use lazy_regex::regex_is_match;
use std::collections::BTreeMap;
use tabula_core::address::is_valid_name;
use tabula_core::{
    CalculationSettings, CellAddress, CellKey, CellRange, Error, ErrorCode, RefTarget, Reference,
    Region, Result, Value, ValueArray,
};
use tabula_formula::{
    EvalContext, EvalState, Formula, FunctionRegistry, NamedAreas, ResolvedCell, Resolver,
};
use tracing::debug;

/// Contents of one cell
#[derive(Debug, Clone, Default)]
struct CellEntry {
    /// Literal value, or the last calculated result of the formula
    value: Value,
    formula: Option<Formula>,
}

/// A named sheet of cells
#[derive(Debug, Clone)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<(u32, u16), CellEntry>,
}

impl Sheet {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            cells: BTreeMap::new(),
        }
    }

    /// Sheet name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of non-empty cells
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Stored value of a cell; formula cells hold their last result
    pub fn value(&self, row: u32, col: u16) -> Value {
        self.cells
            .get(&(row, col))
            .map(|cell| cell.value.clone())
            .unwrap_or_default()
    }

    /// Formula of a cell
    pub fn formula(&self, row: u32, col: u16) -> Option<&Formula> {
        self.cells.get(&(row, col)).and_then(|cell| cell.formula.as_ref())
    }

    /// Iterate over formula cells as `(row, col, formula)`
    pub fn formula_cells(&self) -> impl Iterator<Item = (u32, u16, &Formula)> {
        self.cells
            .iter()
            .filter_map(|(&(row, col), cell)| cell.formula.as_ref().map(|f| (row, col, f)))
    }

    /// Cells inside a range, row by row
    fn cells_in<'s>(
        &'s self,
        range: &'s CellRange,
    ) -> impl Iterator<Item = (u32, u16, &'s CellEntry)> + 's {
        self.cells
            .range((range.start.row, range.start.col)..=(range.end.row, range.end.col))
            .filter(move |((_, col), _)| *col >= range.start.col && *col <= range.end.col)
            .map(|(&(row, col), cell)| (row, col, cell))
    }
}

/// A workbook (spreadsheet document)
///
/// A workbook contains sheets, workbook-scoped named areas, calculation
/// settings and the functions its formulas may call.
#[derive(Debug)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    /// Named areas by upper-cased name
    names: AHashMap<String, Region>,
    settings: CalculationSettings,
    functions: FunctionRegistry,
}

impl Workbook {
    /// Create a workbook with one sheet named `Sheet1`
    pub fn new() -> Self {
        let mut wb = Self::empty();
        wb.sheets.push(Sheet::new("Sheet1"));
        wb
    }

    /// Create a workbook with no sheets
    pub fn empty() -> Self {
        Self {
            sheets: Vec::new(),
            names: AHashMap::new(),
            settings: CalculationSettings::default(),
            functions: FunctionRegistry::new(),
        }
    }

    /// Create a workbook with one sheet and custom settings
    pub fn with_settings(settings: CalculationSettings) -> Self {
        let mut wb = Self::new();
        wb.settings = settings;
        wb
    }

    // ==================== Sheets ====================

    /// Get the number of sheets
    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Get a sheet by index
    pub fn sheet(&self, index: usize) -> Option<&Sheet> {
        self.sheets.get(index)
    }

    /// Get the index of a sheet by name (case-insensitive)
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|sheet| sheet.name.eq_ignore_ascii_case(name))
    }

    /// Iterate over sheet names in order
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.iter().map(|sheet| sheet.name.as_str())
    }

    /// Add a sheet and return its index
    pub fn add_sheet(&mut self, name: &str) -> Result<usize> {
        let name = name.trim();
        if name.is_empty() || name.contains(|c: char| "!'[]:*?/\\".contains(c)) {
            return Err(Error::InvalidReference(format!("invalid sheet name '{}'", name)));
        }
        if self.sheet_index(name).is_some() {
            return Err(Error::DuplicateSheetName(name.to_string()));
        }

        self.sheets.push(Sheet::new(name));
        // References to the new name may now resolve differently
        self.invalidate_formulas();
        Ok(self.sheets.len() - 1)
    }

    fn sheet_mut(&mut self, index: usize) -> Result<&mut Sheet> {
        self.sheets
            .get_mut(index)
            .ok_or_else(|| Error::SheetNotFound(format!("#{}", index)))
    }

    fn check_sheet(&self, index: usize) -> Result<&Sheet> {
        self.sheets
            .get(index)
            .ok_or_else(|| Error::SheetNotFound(format!("#{}", index)))
    }

    // ==================== Cells ====================

    /// Set a literal value, replacing any formula in the cell
    pub fn set_value(&mut self, sheet: usize, address: &str, value: impl Into<Value>) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        let value = value.into();
        let cells = &mut self.sheet_mut(sheet)?.cells;
        if value.is_empty() {
            cells.remove(&(addr.row, addr.col));
        } else {
            cells.insert(
                (addr.row, addr.col),
                CellEntry {
                    value,
                    formula: None,
                },
            );
        }
        Ok(())
    }

    /// Set a formula; its cached result is empty until calculated
    pub fn set_formula(&mut self, sheet: usize, address: &str, expression: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        let key = CellKey::new(sheet, addr.row, addr.col);
        let cells = &mut self.sheet_mut(sheet)?.cells;
        cells.insert(
            (addr.row, addr.col),
            CellEntry {
                value: Value::empty(),
                formula: Some(Formula::for_cell(key, expression)),
            },
        );
        Ok(())
    }

    /// Remove a cell's value and formula
    pub fn clear_cell(&mut self, sheet: usize, address: &str) -> Result<()> {
        let addr = CellAddress::parse(address)?;
        self.sheet_mut(sheet)?.cells.remove(&(addr.row, addr.col));
        Ok(())
    }

    /// Stored value of a cell; formula cells hold their last calculated result
    pub fn value(&self, sheet: usize, address: &str) -> Result<Value> {
        let addr = CellAddress::parse(address)?;
        Ok(self.check_sheet(sheet)?.value(addr.row, addr.col))
    }

    /// Formula of a cell, if it has one
    pub fn formula(&self, sheet: usize, address: &str) -> Result<Option<&Formula>> {
        let addr = CellAddress::parse(address)?;
        Ok(self.check_sheet(sheet)?.formula(addr.row, addr.col))
    }

    /// Evaluate a cell now
    ///
    /// Formula cells are computed from the current contents of the cells
    /// they reference; other cells return their value.
    pub fn evaluate(&self, sheet: usize, address: &str) -> Result<Value> {
        let addr = CellAddress::parse(address)?;
        let cell = self.check_sheet(sheet)?.cells.get(&(addr.row, addr.col));
        Ok(match cell {
            Some(CellEntry {
                formula: Some(formula),
                ..
            }) => formula.eval(&self.context()),
            Some(cell) => cell.value.clone(),
            None => Value::empty(),
        })
    }

    /// Evaluate an expression that is not stored in any cell
    ///
    /// Unqualified references resolve against `sheet`.
    pub fn evaluate_formula(&self, sheet: usize, expression: &str) -> Result<Value> {
        self.check_sheet(sheet)?;
        Ok(Formula::for_sheet(sheet, expression).eval(&self.context()))
    }

    /// Evaluate a cell with some cells read from others
    pub fn evaluate_with_indirections(
        &self,
        sheet: usize,
        address: &str,
        indirections: impl IntoIterator<Item = (CellKey, CellKey)>,
    ) -> Result<Value> {
        let addr = CellAddress::parse(address)?;
        let key = CellKey::new(sheet, addr.row, addr.col);
        let ctx = self.context();
        let mut state = EvalState::with_indirections(indirections);
        let resolved = self.cell(key);
        Ok(match resolved.formula {
            Some(formula) => formula.eval_in(&ctx, &mut state),
            None => resolved.value,
        })
    }

    // ==================== Named areas ====================

    /// Define a workbook-scoped name for a cell or range
    ///
    /// `refers_to` is reference text such as `Sheet1!$A$1:$A$10`; without a
    /// sheet qualifier it refers to the first sheet. Redefining a name
    /// replaces it. Formulas are recompiled on next use so they pick up the
    /// change.
    pub fn define_name(&mut self, name: &str, refers_to: &str) -> Result<()> {
        if !is_valid_name(name)
            || regex_is_match!(r"^[A-Za-z]{1,3}[0-9]+$", name)
            || name.eq_ignore_ascii_case("TRUE")
            || name.eq_ignore_ascii_case("FALSE")
        {
            return Err(Error::InvalidName(name.to_string()));
        }

        let reference = Reference::parse(refers_to)?;
        let range = match reference.target {
            RefTarget::Cell(addr) => CellRange::single(addr),
            RefTarget::Range(range) => range,
            RefTarget::Name(_) => return Err(Error::InvalidReference(refers_to.to_string())),
        };
        let sheet = match &reference.sheet {
            Some(sheet) => self
                .sheet_index(sheet)
                .ok_or_else(|| Error::SheetNotFound(sheet.clone()))?,
            None => 0,
        };
        self.check_sheet(sheet)?;

        debug!(name, refers_to, "defined name");
        self.names
            .insert(name.to_uppercase(), Region::new(sheet, range));
        self.invalidate_formulas();
        Ok(())
    }

    /// Remove a name; returns whether it existed
    pub fn remove_name(&mut self, name: &str) -> bool {
        let removed = self.names.remove(&name.to_uppercase()).is_some();
        if removed {
            self.invalidate_formulas();
        }
        removed
    }

    /// Region a name refers to
    pub fn name_region(&self, name: &str) -> Option<Region> {
        self.names.get(&name.to_uppercase()).copied()
    }

    // ==================== Calculation ====================

    /// Get calculation settings
    pub fn settings(&self) -> &CalculationSettings {
        &self.settings
    }

    /// Replace calculation settings; formulas are recompiled on next use
    pub fn set_settings(&mut self, settings: CalculationSettings) {
        self.settings = settings;
        self.invalidate_formulas();
    }

    /// Functions available to formulas
    pub fn functions(&self) -> &FunctionRegistry {
        &self.functions
    }

    /// Mutable access to register custom functions
    pub fn functions_mut(&mut self) -> &mut FunctionRegistry {
        &mut self.functions
    }

    /// Evaluation context reading from this workbook
    pub fn context(&self) -> EvalContext<'_> {
        EvalContext::new(self, &self.functions, &self.settings)
    }

    pub(crate) fn store_result(&mut self, key: CellKey, value: Value) {
        if let Some(cell) = self
            .sheets
            .get_mut(key.sheet)
            .and_then(|sheet| sheet.cells.get_mut(&(key.row, key.col)))
        {
            cell.value = value;
        }
    }

    fn invalidate_formulas(&self) {
        for sheet in &self.sheets {
            for (_, _, formula) in sheet.formula_cells() {
                formula.invalidate();
            }
        }
    }

    /// Sheet and rectangle named by reference text
    fn resolve_region(&self, reference: &str, sheet: usize) -> std::result::Result<Region, ErrorCode> {
        let parsed = Reference::parse(reference).map_err(|_| ErrorCode::Ref)?;
        let range = match parsed.target {
            RefTarget::Name(name) => {
                return self.name_region(&name).ok_or(ErrorCode::Name);
            }
            RefTarget::Cell(addr) => CellRange::single(addr),
            RefTarget::Range(range) => range,
        };
        let sheet = match &parsed.sheet {
            Some(name) => self.sheet_index(name).ok_or(ErrorCode::Ref)?,
            None if sheet < self.sheets.len() => sheet,
            None => return Err(ErrorCode::Ref),
        };
        Ok(Region::new(sheet, range))
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

impl NamedAreas for Workbook {
    fn is_named_area(&self, name: &str) -> bool {
        self.names.contains_key(&name.to_uppercase())
    }
}

impl Resolver for Workbook {
    fn resolve_cell(
        &self,
        reference: &str,
        sheet: usize,
    ) -> std::result::Result<ResolvedCell<'_>, ErrorCode> {
        let region = self.resolve_region(reference, sheet)?;
        if !region.range.is_single() {
            return Err(ErrorCode::Value);
        }
        Ok(self.cell(CellKey::new(region.sheet, region.top(), region.left())))
    }

    fn resolve_range(
        &self,
        reference: &str,
        sheet: usize,
    ) -> std::result::Result<(Value, Region), ErrorCode> {
        let region = self.resolve_region(reference, sheet)?;
        Ok((self.region_values(&region), region))
    }

    fn cell(&self, key: CellKey) -> ResolvedCell<'_> {
        let Some(sheet) = self.sheets.get(key.sheet) else {
            return ResolvedCell {
                key,
                value: Value::error(ErrorCode::Ref),
                formula: None,
            };
        };
        match sheet.cells.get(&(key.row, key.col)) {
            Some(cell) => ResolvedCell {
                key,
                value: cell.value.clone(),
                formula: cell.formula.as_ref(),
            },
            None => ResolvedCell::empty(key),
        }
    }

    fn region_values(&self, region: &Region) -> Value {
        let Some(sheet) = self.sheets.get(region.sheet) else {
            return Value::error(ErrorCode::Ref);
        };
        let mut array = ValueArray::with_size(
            u32::from(region.range.col_count()),
            region.range.row_count(),
        );
        for (row, col, cell) in sheet.cells_in(&region.range) {
            if !cell.value.is_empty() {
                array.set_element(
                    u32::from(col - region.left()),
                    row - region.top(),
                    cell.value.clone(),
                );
            }
        }
        Value::array(array)
    }

    fn formula_cells(&self, region: &Region) -> Vec<CellKey> {
        let Some(sheet) = self.sheets.get(region.sheet) else {
            return Vec::new();
        };
        sheet
            .cells_in(&region.range)
            .filter(|(_, _, cell)| cell.formula.is_some())
            .map(|(row, col, _)| CellKey::new(region.sheet, row, col))
            .collect()
    }
}
