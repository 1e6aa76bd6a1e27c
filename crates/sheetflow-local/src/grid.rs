//! Worksheet cell storage and the pure grid operations behind `LocalWorksheet`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use sheetflow_core::address::{CellAddress, CellRange};
use sheetflow_core::error::{Result, SheetflowError};
use sheetflow_core::types::{CellMatch, CellQuery, CellValue, Record};

/// Cell limit per spreadsheet grid, matching the hosted service.
pub const MAX_CELLS: u64 = 10_000_000;

/// Reject grid sizes whose cell count exceeds [`MAX_CELLS`].
pub fn check_grid_size(op: &str, rows: u32, cols: u32) -> Result<()> {
    let cells = rows as u64 * cols as u64;
    if cells > MAX_CELLS {
        return Err(SheetflowError::remote(
            op,
            format!(
                "grid of {} rows x {} cols ({} cells) exceeds the limit of {} cells",
                rows, cols, cells, MAX_CELLS
            ),
        ));
    }
    Ok(())
}

/// One worksheet: its declared grid size and the cells written so far.
///
/// `cells` is ragged: rows and columns past the last written cell are
/// implicitly empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetData {
    pub id: u64,
    pub title: String,
    pub rows: u32,
    pub cols: u32,
    #[serde(default)]
    pub cells: Vec<Vec<CellValue>>,
}

impl SheetData {
    pub fn new(id: u64, title: impl Into<String>, rows: u32, cols: u32) -> Self {
        Self {
            id,
            title: title.into(),
            rows,
            cols,
            cells: Vec::new(),
        }
    }

    pub fn get(&self, addr: CellAddress) -> CellValue {
        self.cells
            .get(addr.row as usize - 1)
            .and_then(|row| row.get(addr.col as usize - 1))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set(&mut self, addr: CellAddress, value: CellValue) -> Result<()> {
        self.check_bounds("update_cell", addr)?;
        self.put(addr, value);
        Ok(())
    }

    /// Index of the last row holding any value, 0 when the sheet is empty.
    pub fn last_data_row(&self) -> u32 {
        self.cells
            .iter()
            .rposition(|row| row.iter().any(|c| !c.is_empty()))
            .map(|i| i as u32 + 1)
            .unwrap_or(0)
    }

    /// Write `values` after the last non-empty row, growing the grid if needed.
    pub fn append_row(&mut self, values: Vec<CellValue>) -> Result<()> {
        let target = self.last_data_row() + 1;
        let rows = self.rows.max(target);
        let cols = self.cols.max(width_of("append_row", &values)?);
        check_grid_size("append_row", rows, cols)?;

        self.rows = rows;
        self.cols = cols;
        for (i, value) in values.into_iter().enumerate() {
            self.put(CellAddress::new(target, i as u32 + 1), value);
        }
        Ok(())
    }

    /// Insert `values` at `index`, shifting later rows down by one.
    pub fn insert_row(&mut self, values: Vec<CellValue>, index: u32) -> Result<()> {
        let rows = self.rows.checked_add(1).ok_or_else(|| {
            SheetflowError::remote(
                "insert_row",
                format!("'{}' cannot grow past {} rows", self.title, self.rows),
            )
        })?;
        if index == 0 || index > rows {
            return Err(SheetflowError::remote(
                "insert_row",
                format!("index {} is outside 1..={}", index, rows),
            ));
        }
        let cols = self.cols.max(width_of("insert_row", &values)?);
        check_grid_size("insert_row", rows, cols)?;

        let at = index as usize - 1;
        if self.cells.len() < at {
            self.cells.resize_with(at, Vec::new);
        }
        self.cells.insert(at, values);
        self.rows = rows;
        self.cols = cols;
        Ok(())
    }

    pub fn update_range(&mut self, range: CellRange, values: Vec<Vec<CellValue>>) -> Result<()> {
        self.check_bounds("update_range", range.end)?;
        if values.len() as u32 > range.rows() {
            return Err(SheetflowError::remote(
                "update_range",
                format!("{} rows of values do not fit in {}", values.len(), range),
            ));
        }
        if let Some(wide) = values.iter().find(|r| r.len() as u32 > range.cols()) {
            return Err(SheetflowError::remote(
                "update_range",
                format!("a row of {} values does not fit in {}", wide.len(), range),
            ));
        }
        for (r, row) in values.into_iter().enumerate() {
            for (c, value) in row.into_iter().enumerate() {
                let addr = CellAddress::new(range.start.row + r as u32, range.start.col + c as u32);
                self.put(addr, value);
            }
        }
        Ok(())
    }

    /// Values of one row, without trailing empties.
    pub fn row(&self, index: u32) -> Vec<CellValue> {
        let mut row = self
            .cells
            .get(index.saturating_sub(1) as usize)
            .filter(|_| index > 0)
            .cloned()
            .unwrap_or_default();
        trim_trailing(&mut row);
        row
    }

    /// Values of one column, without trailing empties.
    pub fn column(&self, index: u32) -> Vec<CellValue> {
        if index == 0 {
            return Vec::new();
        }
        let mut col: Vec<CellValue> = self
            .cells
            .iter()
            .map(|row| row.get(index as usize - 1).cloned().unwrap_or_default())
            .collect();
        trim_trailing(&mut col);
        col
    }

    /// All rows up to the last non-empty one, padded to a common width.
    pub fn all_values(&self) -> Vec<Vec<CellValue>> {
        let rows = self.last_data_row() as usize;
        let mut out: Vec<Vec<CellValue>> = (1..=rows as u32).map(|i| self.row(i)).collect();
        let width = out.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut out {
            row.resize(width, CellValue::Empty);
        }
        out
    }

    /// Rows below the first, keyed by the first row's rendered values.
    pub fn records(&self) -> Result<Vec<Record>> {
        let mut values = self.all_values().into_iter();
        let Some(header) = values.next() else {
            return Ok(Vec::new());
        };
        let keys: Vec<String> = header.iter().map(CellValue::rendered).collect();

        // Blank headers count too; two of them would collapse into one "" key.
        let mut seen = std::collections::HashSet::new();
        if let Some(dup) = keys.iter().find(|k| !seen.insert(k.as_str())) {
            let column = if dup.is_empty() {
                "blank column".to_string()
            } else {
                format!("column '{}'", dup)
            };
            return Err(SheetflowError::remote(
                "get_all_records",
                format!("header row contains duplicate {}", column),
            ));
        }

        Ok(values
            .map(|row| {
                keys.iter()
                    .cloned()
                    .zip(row)
                    .collect::<BTreeMap<String, CellValue>>()
            })
            .collect())
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Matching cells in row-major order.
    pub fn find_all(&self, query: &CellQuery) -> Vec<CellMatch> {
        let mut found = Vec::new();
        for (r, row) in self.cells.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() && query.matches(value) {
                    found.push(CellMatch {
                        row: r as u32 + 1,
                        col: c as u32 + 1,
                        value: value.clone(),
                    });
                }
            }
        }
        found
    }

    fn check_bounds(&self, op: &str, addr: CellAddress) -> Result<()> {
        if addr.row > self.rows || addr.col > self.cols {
            return Err(SheetflowError::remote(
                op,
                format!(
                    "{} exceeds grid limits of '{}' ({} rows x {} cols)",
                    addr, self.title, self.rows, self.cols
                ),
            ));
        }
        Ok(())
    }

    fn put(&mut self, addr: CellAddress, value: CellValue) {
        let (r, c) = (addr.row as usize - 1, addr.col as usize - 1);
        if self.cells.len() <= r {
            self.cells.resize_with(r + 1, Vec::new);
        }
        let row = &mut self.cells[r];
        if row.len() <= c {
            row.resize(c + 1, CellValue::Empty);
        }
        row[c] = value;
    }
}

fn width_of(op: &str, values: &[CellValue]) -> Result<u32> {
    u32::try_from(values.len())
        .map_err(|_| SheetflowError::remote(op, format!("{} values do not fit in a row", values.len())))
}

fn trim_trailing(values: &mut Vec<CellValue>) {
    while values.last().is_some_and(CellValue::is_empty) {
        values.pop();
    }
}
