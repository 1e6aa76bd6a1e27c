use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize, Serializer};

/// A single cell value as exchanged with the spreadsheet service.
///
/// Serialises as plain JSON: `null`, a bool, a number or a string.
/// Integral numbers are written as JSON integers.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Empty => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// The value as the service renders it for display and searching.
    pub fn rendered(&self) -> String {
        match self {
            Self::Empty => String::new(),
            Self::Bool(true) => "TRUE".to_string(),
            Self::Bool(false) => "FALSE".to_string(),
            Self::Number(n) if as_integer(*n).is_some() => format!("{}", *n as i64),
            Self::Number(n) => n.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

/// Largest magnitude an `f64` holds without losing integer precision.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

fn as_integer(n: f64) -> Option<i64> {
    (n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER).then_some(n as i64)
}

impl Serialize for CellValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Empty => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => match as_integer(*n) {
                Some(i) => serializer.serialize_i64(i),
                None => serializer.serialize_f64(*n),
            },
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl std::fmt::Display for CellValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.rendered())
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// A cell found by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellMatch {
    pub row: u32,
    pub col: u32,
    pub value: CellValue,
}

/// One data row keyed by the worksheet's header row.
///
/// Keys iterate (and serialise) in sorted order, not column order; use
/// `get_all_values` when column order matters. Header names are unique.
pub type Record = BTreeMap<String, CellValue>;

/// Which worksheet of a spreadsheet to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetSelector {
    /// The first worksheet.
    Default,
    Title(String),
}

impl SheetSelector {
    /// `None` or an empty title selects the default worksheet.
    pub fn from_title(title: Option<&str>) -> Self {
        match title {
            Some(t) if !t.is_empty() => Self::Title(t.to_string()),
            _ => Self::Default,
        }
    }
}

impl std::fmt::Display for SheetSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "<first worksheet>"),
            Self::Title(t) => write!(f, "{}", t),
        }
    }
}

/// Search criteria for `Worksheet::find_all`.
#[derive(Debug, Clone)]
pub enum CellQuery {
    /// Cells whose rendered value equals the text exactly.
    Text(String),
    /// Cells whose rendered value contains a match for the pattern.
    Pattern(Regex),
}

impl CellQuery {
    pub fn matches(&self, value: &CellValue) -> bool {
        let rendered = value.rendered();
        match self {
            Self::Text(text) => rendered == *text,
            Self::Pattern(re) => re.is_match(&rendered),
        }
    }
}

/// Extract the spreadsheet key from a `docs.google.com/spreadsheets/d/<key>` URL.
pub fn spreadsheet_key_from_url(url: &str) -> Option<&str> {
    static KEY_RE: OnceLock<Regex> = OnceLock::new();
    let re = KEY_RE.get_or_init(|| {
        Regex::new(r"/spreadsheets/d/([a-zA-Z0-9_-]+)").expect("static regex is valid")
    });
    re.captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}
