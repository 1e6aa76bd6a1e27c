//! A1-notation cell addresses and ranges.
//!
//! Rows and columns are 1-based, matching the spreadsheet service. `$`
//! absolute markers are accepted and ignored.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SheetflowError};

/// A single cell, e.g. `B7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || SheetflowError::InvalidAddress(s.to_string());
        let trimmed: String = s.trim().chars().filter(|c| *c != '$').collect();

        let split = trimmed
            .find(|c: char| c.is_ascii_digit())
            .ok_or_else(invalid)?;
        let (letters, digits) = trimmed.split_at(split);
        if letters.is_empty() || !letters.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid());
        }

        let col = column_index(letters).ok_or_else(invalid)?;
        let row: u32 = digits.parse().map_err(|_| invalid())?;
        if row == 0 {
            return Err(invalid());
        }
        Ok(Self { row, col })
    }
}

impl FromStr for CellAddress {
    type Err = SheetflowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_letters(self.col), self.row)
    }
}

/// A rectangular block of cells, e.g. `A1:C3`. A single address is a 1×1 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn parse(s: &str) -> Result<Self> {
        let (a, b) = match s.split_once(':') {
            Some((a, b)) => (CellAddress::parse(a)?, CellAddress::parse(b)?),
            None => {
                let a = CellAddress::parse(s)?;
                (a, a)
            }
        };
        Ok(Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        })
    }

    pub fn rows(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    pub fn cols(&self) -> u32 {
        self.end.col - self.start.col + 1
    }
}

impl FromStr for CellRange {
    type Err = SheetflowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// `A` → 1, `Z` → 26, `AA` → 27.
pub fn column_index(letters: &str) -> Option<u32> {
    letters.chars().try_fold(0u32, |acc, c| {
        let digit = (c.to_ascii_uppercase() as u32).checked_sub('A' as u32)? + 1;
        if digit > 26 {
            return None;
        }
        acc.checked_mul(26)?.checked_add(digit)
    })
}

/// 1 → `A`, 27 → `AA`.
pub fn column_letters(mut col: u32) -> String {
    let mut out = Vec::new();
    while col > 0 {
        let rem = (col - 1) % 26;
        out.push((b'A' + rem as u8) as char);
        col = (col - 1) / 26;
    }
    out.iter().rev().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple() {
        assert_eq!(CellAddress::parse("A1").unwrap(), CellAddress::new(1, 1));
        assert_eq!(CellAddress::parse("b7").unwrap(), CellAddress::new(7, 2));
        assert_eq!(CellAddress::parse("AA10").unwrap(), CellAddress::new(10, 27));
        assert_eq!(CellAddress::parse("$C$3").unwrap(), CellAddress::new(3, 3));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "A", "12", "A0", "1A", "A-1", "Ä1", "A1B"] {
            assert!(
                matches!(CellAddress::parse(bad), Err(SheetflowError::InvalidAddress(_))),
                "expected {bad:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_column_letters_round_trip_edges() {
        assert_eq!(column_letters(1), "A");
        assert_eq!(column_letters(26), "Z");
        assert_eq!(column_letters(27), "AA");
        assert_eq!(column_letters(702), "ZZ");
        assert_eq!(column_letters(703), "AAA");
        assert_eq!(column_index("ZZ"), Some(702));
    }

    #[test]
    fn test_range_normalises_corners() {
        let r = CellRange::parse("C3:A1").unwrap();
        assert_eq!(r.start, CellAddress::new(1, 1));
        assert_eq!(r.end, CellAddress::new(3, 3));
        assert_eq!(r.rows(), 3);
        assert_eq!(r.cols(), 3);
        assert_eq!(r.to_string(), "A1:C3");
    }

    #[test]
    fn test_single_cell_range() {
        let r = CellRange::parse("B2").unwrap();
        assert_eq!(r.rows(), 1);
        assert_eq!(r.cols(), 1);
        assert_eq!(r.to_string(), "B2");
    }
}
