//! Sparse array payload

use super::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
struct ArrayData {
    /// Populated entries keyed by (row, col), so iteration is row-major
    cells: BTreeMap<(u32, u32), Value>,
    columns: u32,
    rows: u32,
}

/// A sparse 2-D array of values
///
/// Cloning is cheap: the storage is shared until one of the copies is
/// mutated. Declared extents may exceed the populated entries, and unset
/// positions read as [`Value::empty`].
#[derive(Debug, Clone, Default)]
pub struct ValueArray {
    data: Arc<ArrayData>,
}

impl ValueArray {
    /// Create an empty 0x0 array
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an array with declared extents and no populated entries
    pub fn with_size(columns: u32, rows: u32) -> Self {
        Self {
            data: Arc::new(ArrayData {
                cells: BTreeMap::new(),
                columns,
                rows,
            }),
        }
    }

    /// Build from row-major nested vectors
    pub fn from_rows(rows: Vec<Vec<Value>>) -> Self {
        let columns = rows.iter().map(Vec::len).max().unwrap_or(0) as u32;
        let mut array = Self::with_size(columns, rows.len() as u32);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                array.set_element(c as u32, r as u32, value);
            }
        }
        array
    }

    /// Number of columns
    pub fn columns(&self) -> u32 {
        self.data.columns
    }

    /// Number of rows
    pub fn rows(&self) -> u32 {
        self.data.rows
    }

    /// Number of populated entries
    pub fn count(&self) -> usize {
        self.data.cells.len()
    }

    /// Reference to a populated entry
    pub fn get(&self, col: u32, row: u32) -> Option<&Value> {
        self.data.cells.get(&(row, col))
    }

    /// Element at (col, row); unset positions are empty
    pub fn element(&self, col: u32, row: u32) -> Value {
        self.get(col, row).cloned().unwrap_or_default()
    }

    /// Set an element, growing the extents when needed
    ///
    /// Copies the storage first if it is shared with another array.
    pub fn set_element(&mut self, col: u32, row: u32, value: Value) {
        let data = Arc::make_mut(&mut self.data);
        data.columns = data.columns.max(col + 1);
        data.rows = data.rows.max(row + 1);
        if value.is_empty() {
            data.cells.remove(&(row, col));
        } else {
            data.cells.insert((row, col), value);
        }
    }

    /// Populated entries as `(col, row, value)`, row by row
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, &Value)> + '_ {
        self.data
            .cells
            .iter()
            .map(|(&(row, col), value)| (col, row, value))
    }

    /// Whether two arrays currently share storage
    pub fn shares_storage(&self, other: &ValueArray) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for ValueArray {
    fn eq(&self, other: &Self) -> bool {
        self.shares_storage(other) || self.data == other.data
    }
}
