//! Cell addressing: A1 addresses, rectangular ranges, sheet-qualified
//! reference text and bound regions

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "A1", "$B$2")
///
/// Rows and columns are 0-based internally and 1-based / lettered in text.
/// The optional `$` markers are kept for display only; they do not change
/// how a reference resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Row index (0-based)
    pub row: u32,
    /// Column index (0-based, A=0)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a new cell address with relative references
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// # Examples
    /// ```
    /// use tabula_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$B$2").unwrap();
    /// assert_eq!((addr.row, addr.col), (1, 1));
    /// assert!(addr.row_absolute && addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let bytes = s.as_bytes();
        let mut pos = 0;

        let col_absolute = bytes.first() == Some(&b'$');
        if col_absolute {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(Error::InvalidAddress(format!("no column letters in '{}'", s)));
        }
        let col = Self::letters_to_column(&s[col_start..pos])?;

        let row_absolute = bytes.get(pos) == Some(&b'$');
        if row_absolute {
            pos += 1;
        }

        let row_str = &s[pos..];
        if row_str.is_empty() || !row_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(format!("invalid row number in '{}'", s)));
        }
        let row: u32 = row_str
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;
        if row == 0 {
            return Err(Error::InvalidAddress(format!(
                "row number must be >= 1 in '{}'",
                s
            )));
        }
        if row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row - 1, MAX_ROWS - 1));
        }

        Ok(Self {
            row: row - 1,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// Convert column index to letters (0 = A, 25 = Z, 26 = AA, etc.)
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::new();
        let mut n = col as u32 + 1;
        while n > 0 {
            n -= 1;
            letters.push((b'A' + (n % 26) as u8) as char);
            n /= 26;
        }
        letters.iter().rev().collect()
    }

    /// Convert column letters to index (A = 0, Z = 25, AA = 26, etc.)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!("invalid column letter '{}'", c)));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(Error::ColumnOutOfBounds(col - 1, MAX_COLS - 1));
            }
        }

        Ok((col - 1) as u16)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        format!(
            "{}{}{}{}",
            if self.col_absolute { "$" } else { "" },
            Self::column_to_letters(self.col),
            if self.row_absolute { "$" } else { "" },
            self.row + 1
        )
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A normalized rectangle of cells (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Top-left corner
    pub start: CellAddress,
    /// Bottom-right corner
    pub end: CellAddress,
}

impl CellRange {
    /// Create a range, normalizing so `start` is top-left
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        let mut start = a;
        let mut end = b;
        start.row = a.row.min(b.row);
        end.row = a.row.max(b.row);
        start.col = a.col.min(b.col);
        end.col = a.col.max(b.col);
        Self { start, end }
    }

    /// Create a range from row/column indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse a range from `A1:B10` notation (a lone `C3` is a single cell)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::new(CellAddress::parse(a)?, CellAddress::parse(b)?)),
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// Whether the range covers exactly one cell
    pub fn is_single(&self) -> bool {
        self.start.row == self.end.row && self.start.col == self.end.col
    }

    /// Check if a cell is within this range
    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    /// Number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && self.end.row >= other.start.row
            && self.start.col <= other.end.col
            && self.end.col >= other.start.col
    }

    /// The common part of two ranges, if any
    pub fn intersect(&self, other: &CellRange) -> Option<CellRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(CellRange::from_indices(
            self.start.row.max(other.start.row),
            self.start.col.max(other.start.col),
            self.end.row.min(other.end.row),
            self.end.col.min(other.end.col),
        ))
    }

    /// The smallest range covering both
    pub fn bounding(&self, other: &CellRange) -> CellRange {
        CellRange::from_indices(
            self.start.row.min(other.start.row),
            self.start.col.min(other.start.col),
            self.end.row.max(other.end.row),
            self.end.col.max(other.end.col),
        )
    }

    /// Format as A1:B10 string
    pub fn to_a1_string(&self) -> String {
        if self.start == self.end {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start, self.end)
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// What a piece of reference text points at, after the sheet qualifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefTarget {
    /// A single cell, `B7`
    Cell(CellAddress),
    /// A rectangle, `A1:C3`
    Range(CellRange),
    /// A named area, `TotalSales`
    Name(String),
}

/// Reference text split into an optional sheet qualifier and a target
///
/// Accepted forms: `A1`, `$A$1`, `A1:B2`, `Sheet2!A1`, `'Sales Q3'!A1:B2`,
/// `Sheet2!A1:Sheet2!B2`, `Sheet2!TotalSales`, `TotalSales`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    /// Sheet name, without quotes
    pub sheet: Option<String>,
    /// Cell, range or name
    pub target: RefTarget,
}

impl Reference {
    /// Parse reference text as produced by the formula scanner
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::InvalidReference("empty reference".into()));
        }

        let (sheet, rest) = split_sheet(text)?;

        if let Some((first, second)) = rest.split_once(':') {
            // The second corner may repeat the sheet qualifier
            let (second_sheet, second) = split_sheet(second)?;
            if let (Some(a), Some(b)) = (&sheet, &second_sheet) {
                if a != b {
                    return Err(Error::InvalidReference(format!(
                        "range spans two sheets in '{}'",
                        text
                    )));
                }
            }
            let start = CellAddress::parse(first)?;
            let end = CellAddress::parse(second)?;
            return Ok(Self {
                sheet: sheet.or(second_sheet),
                target: RefTarget::Range(CellRange::new(start, end)),
            });
        }

        if let Ok(addr) = CellAddress::parse(rest) {
            return Ok(Self {
                sheet,
                target: RefTarget::Cell(addr),
            });
        }

        if is_valid_name(rest) {
            return Ok(Self {
                sheet,
                target: RefTarget::Name(rest.to_string()),
            });
        }

        Err(Error::InvalidReference(text.to_string()))
    }

    /// The single cell, when the target is one
    pub fn cell(&self) -> Option<CellAddress> {
        match &self.target {
            RefTarget::Cell(addr) => Some(*addr),
            RefTarget::Range(range) if range.is_single() => Some(range.start),
            _ => None,
        }
    }
}

impl FromStr for Reference {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(sheet) = &self.sheet {
            if sheet.chars().all(|c| c.is_alphanumeric() || c == '_') {
                write!(f, "{}!", sheet)?;
            } else {
                write!(f, "'{}'!", sheet)?;
            }
        }
        match &self.target {
            RefTarget::Cell(addr) => write!(f, "{}", addr),
            RefTarget::Range(range) => write!(f, "{}:{}", range.start, range.end),
            RefTarget::Name(name) => f.write_str(name),
        }
    }
}

/// Split `Sheet!rest` / `'Quoted Sheet'!rest` into its parts
fn split_sheet(text: &str) -> Result<(Option<String>, &str)> {
    if let Some(quoted) = text.strip_prefix('\'') {
        let close = quoted
            .find('\'')
            .ok_or_else(|| Error::InvalidReference(format!("unterminated quote in '{}'", text)))?;
        let sheet = &quoted[..close];
        let rest = quoted[close + 1..].strip_prefix('!').ok_or_else(|| {
            Error::InvalidReference(format!("quoted sheet name without '!' in '{}'", text))
        })?;
        return Ok((Some(sheet.to_string()), rest));
    }

    // Only the first `!` before any `:` is a qualifier for this corner
    let head = text.split(':').next().unwrap_or(text);
    match head.find('!') {
        Some(pos) if pos > 0 => Ok((Some(text[..pos].to_string()), &text[pos + 1..])),
        Some(_) => Err(Error::InvalidReference(format!("empty sheet name in '{}'", text))),
        None => Ok((None, text)),
    }
}

/// Names start with a letter or `_` and continue with letters, digits, `_` or `.`
pub fn is_valid_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}

/// Identity of a cell across the whole workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    /// Sheet index
    pub sheet: usize,
    /// Row (0-based)
    pub row: u32,
    /// Column (0-based)
    pub col: u16,
}

impl CellKey {
    /// Create a new cell key
    pub fn new(sheet: usize, row: u32, col: u16) -> Self {
        Self { sheet, row, col }
    }
}

/// A rectangle bound to a sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Region {
    /// Sheet index
    pub sheet: usize,
    /// Cells covered
    pub range: CellRange,
}

impl Region {
    /// Create a region
    pub fn new(sheet: usize, range: CellRange) -> Self {
        Self { sheet, range }
    }

    /// A one-cell region
    pub fn cell(key: CellKey) -> Self {
        Self::new(key.sheet, CellRange::from_indices(key.row, key.col, key.row, key.col))
    }

    /// Top row
    pub fn top(&self) -> u32 {
        self.range.start.row
    }

    /// Left column
    pub fn left(&self) -> u16 {
        self.range.start.col
    }

    /// Common part of two regions on the same sheet
    pub fn intersect(&self, other: &Region) -> Option<Region> {
        if self.sheet != other.sheet {
            return None;
        }
        self.range
            .intersect(&other.range)
            .map(|range| Region::new(self.sheet, range))
    }

    /// Bounding box of two regions on the same sheet
    pub fn bounding(&self, other: &Region) -> Option<Region> {
        if self.sheet != other.sheet {
            return None;
        }
        Some(Region::new(self.sheet, self.range.bounding(&other.range)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_column_letters() {
        assert_eq!(CellAddress::column_to_letters(0), "A");
        assert_eq!(CellAddress::column_to_letters(25), "Z");
        assert_eq!(CellAddress::column_to_letters(26), "AA");
        assert_eq!(CellAddress::column_to_letters(701), "ZZ");
        assert_eq!(CellAddress::column_to_letters(16383), "XFD");

        assert_eq!(CellAddress::letters_to_column("A").unwrap(), 0);
        assert_eq!(CellAddress::letters_to_column("aa").unwrap(), 26);
        assert_eq!(CellAddress::letters_to_column("XFD").unwrap(), 16383);
        assert!(CellAddress::letters_to_column("XFE").is_err());
        assert!(CellAddress::letters_to_column("ZZZZZZZZ").is_err());
    }

    #[test]
    fn test_cell_address_parse() {
        let addr = CellAddress::parse("B2").unwrap();
        assert_eq!((addr.row, addr.col), (1, 1));
        assert!(!addr.row_absolute);

        let addr = CellAddress::parse("A$1").unwrap();
        assert!(!addr.col_absolute);
        assert!(addr.row_absolute);

        let addr = CellAddress::parse("XFD1048576").unwrap();
        assert_eq!((addr.row, addr.col), (1048575, 16383));

        assert!(CellAddress::parse("").is_err());
        assert!(CellAddress::parse("A").is_err());
        assert!(CellAddress::parse("A0").is_err());
        assert!(CellAddress::parse("A1048577").is_err());
        assert!(CellAddress::parse("A1B").is_err());
    }

    #[test]
    fn test_cell_address_display() {
        assert_eq!(CellAddress::new(99, 2).to_string(), "C100");
        assert_eq!(CellAddress::parse("$A$1").unwrap().to_string(), "$A$1");
    }

    #[test]
    fn test_range_normalizes() {
        let range = CellRange::parse("C3:A1").unwrap();
        assert_eq!(range, CellRange::from_indices(0, 0, 2, 2));
        assert_eq!(range.row_count(), 3);
        assert_eq!(range.col_count(), 3);
        assert!(range.contains(1, 1));
        assert!(!range.contains(3, 0));
    }

    #[test]
    fn test_range_intersect_and_bounding() {
        let a = CellRange::parse("A1:C3").unwrap();
        let b = CellRange::parse("B2:D4").unwrap();
        assert_eq!(a.intersect(&b), Some(CellRange::parse("B2:C3").unwrap()));
        assert_eq!(a.bounding(&b), CellRange::parse("A1:D4").unwrap());

        let c = CellRange::parse("E5").unwrap();
        assert_eq!(a.intersect(&c), None);
    }

    #[test]
    fn test_reference_parse() {
        let r = Reference::parse("B7").unwrap();
        assert_eq!(r.sheet, None);
        assert_eq!(r.target, RefTarget::Cell(CellAddress::new(6, 1)));

        let r = Reference::parse("Sheet2!A1:B3").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Sheet2"));
        assert_eq!(r.target, RefTarget::Range(CellRange::from_indices(0, 0, 2, 1)));

        let r = Reference::parse("'Sales Q3'!A4").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Sales Q3"));
        assert_eq!(r.cell(), Some(CellAddress::new(3, 0)));

        let r = Reference::parse("Sheet2!A1:Sheet2!B2").unwrap();
        assert_eq!(r.sheet.as_deref(), Some("Sheet2"));

        let r = Reference::parse("Sheet2!TotalSales").unwrap();
        assert_eq!(r.target, RefTarget::Name("TotalSales".into()));
    }

    #[test]
    fn test_reference_parse_errors() {
        assert!(Reference::parse("").is_err());
        assert!(Reference::parse("!A1").is_err());
        assert!(Reference::parse("'Open!A1").is_err());
        assert!(Reference::parse("'Sheet'A1").is_err());
        assert!(Reference::parse("A!B1:C!D2").is_err());
        assert!(Reference::parse("1abc").is_err());
    }

    #[test]
    fn test_reference_display() {
        assert_eq!(Reference::parse("'Sales Q3'!A4").unwrap().to_string(), "'Sales Q3'!A4");
        assert_eq!(Reference::parse("Sheet1!A1:B2").unwrap().to_string(), "Sheet1!A1:B2");
    }

    #[test]
    fn test_region_ops() {
        let a = Region::new(0, CellRange::parse("A1:B4").unwrap());
        let b = Region::new(0, CellRange::parse("B2:C2").unwrap());
        let other = Region::new(1, CellRange::parse("A1").unwrap());

        assert_eq!(
            a.intersect(&b),
            Some(Region::new(0, CellRange::parse("B2").unwrap()))
        );
        assert_eq!(
            a.bounding(&b),
            Some(Region::new(0, CellRange::parse("A1:C4").unwrap()))
        );
        assert_eq!(a.intersect(&other), None);
        assert_eq!(a.bounding(&other), None);
    }
}
