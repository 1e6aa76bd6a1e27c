use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;

use sheetflow_core::address::{CellAddress, CellRange};
use sheetflow_core::credentials::ServiceAccountCredentials;
use sheetflow_core::error::{Result, SheetflowError};
use sheetflow_core::handle::{ClientHandle, SpreadsheetHandle, WorksheetHandle};
use sheetflow_core::traits::{SheetsClient, SheetsConnector, Spreadsheet, Worksheet};
use sheetflow_core::types::{CellMatch, CellQuery, CellValue, Record, SheetSelector};

/// Shared count of calls made against a family of mocks.
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn hit(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// A connector that accepts any document and counts `connect` calls.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    pub calls: CallCounter,
}

impl SheetsConnector for MockConnector {
    fn name(&self) -> &str {
        "mock"
    }

    fn connect<'a>(
        &'a self,
        credentials: &'a ServiceAccountCredentials,
    ) -> BoxFuture<'a, Result<ClientHandle>> {
        self.calls.hit();
        let client = MockClient::new(&credentials.client_email, self.calls.clone());
        Box::pin(async move { Ok(ClientHandle::new(client)) })
    }
}

/// Client whose spreadsheets are created on demand.
pub struct MockClient {
    account: String,
    calls: CallCounter,
    spreadsheets: Mutex<Vec<SpreadsheetHandle>>,
}

impl MockClient {
    pub fn new(account: &str, calls: CallCounter) -> Self {
        Self {
            account: account.to_string(),
            calls,
            spreadsheets: Mutex::new(Vec::new()),
        }
    }

    fn get_or_create(&self, title: &str) -> SpreadsheetHandle {
        let mut spreadsheets = self.spreadsheets.lock().unwrap();
        if let Some(found) = spreadsheets.iter().find(|s| s.title() == title) {
            return found.clone();
        }
        let handle = SpreadsheetHandle::new(MockSpreadsheet::new(title, self.calls.clone()));
        spreadsheets.push(handle.clone());
        handle
    }
}

impl SheetsClient for MockClient {
    fn account(&self) -> &str {
        &self.account
    }

    fn open_by_title<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>> {
        self.calls.hit();
        let handle = self.get_or_create(title);
        Box::pin(async move { Ok(handle) })
    }

    fn open_by_url<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>> {
        self.calls.hit();
        let result = sheetflow_core::types::spreadsheet_key_from_url(url)
            .map(|key| self.get_or_create(key))
            .ok_or_else(|| SheetflowError::not_found("spreadsheet url", url));
        Box::pin(async move { result })
    }

    fn create<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>> {
        self.calls.hit();
        let handle = self.get_or_create(title);
        Box::pin(async move { Ok(handle) })
    }
}

/// Spreadsheet starting with a single `Sheet1`.
pub struct MockSpreadsheet {
    title: String,
    calls: CallCounter,
    sheets: Mutex<Vec<WorksheetHandle>>,
}

impl MockSpreadsheet {
    pub fn new(title: &str, calls: CallCounter) -> Self {
        let first = WorksheetHandle::new(MockWorksheet::new("Sheet1", calls.clone()));
        Self {
            title: title.to_string(),
            calls,
            sheets: Mutex::new(vec![first]),
        }
    }
}

impl Spreadsheet for MockSpreadsheet {
    fn id(&self) -> &str {
        &self.title
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn url(&self) -> String {
        format!("https://docs.google.com/spreadsheets/d/{}/edit", self.title)
    }

    fn sheet<'a>(&'a self, selector: &'a SheetSelector) -> BoxFuture<'a, Result<WorksheetHandle>> {
        self.calls.hit();
        let sheets = self.sheets.lock().unwrap();
        let found = match selector {
            SheetSelector::Default => sheets.first().cloned(),
            SheetSelector::Title(t) => sheets.iter().find(|s| s.title() == t).cloned(),
        };
        let result = found.ok_or_else(|| SheetflowError::not_found("worksheet", selector.to_string()));
        Box::pin(async move { result })
    }

    fn add_sheet<'a>(
        &'a self,
        title: &'a str,
        _rows: u32,
        _cols: u32,
    ) -> BoxFuture<'a, Result<WorksheetHandle>> {
        self.calls.hit();
        let mut sheets = self.sheets.lock().unwrap();
        let result = if sheets.iter().any(|s| s.title() == title) {
            Err(SheetflowError::remote("add_sheet", format!("duplicate sheet {}", title)))
        } else {
            let handle = WorksheetHandle::new(MockWorksheet::new(title, self.calls.clone()));
            sheets.push(handle.clone());
            Ok(handle)
        };
        Box::pin(async move { result })
    }

    fn delete_sheet<'a>(&'a self, sheet: &'a WorksheetHandle) -> BoxFuture<'a, Result<()>> {
        self.calls.hit();
        let mut sheets = self.sheets.lock().unwrap();
        let before = sheets.len();
        sheets.retain(|s| !s.same_as(sheet));
        let result = if sheets.len() < before {
            Ok(())
        } else {
            Err(SheetflowError::not_found("worksheet", sheet.title()))
        };
        Box::pin(async move { result })
    }
}

/// Worksheet backed by a plain row vector. No grid limits.
pub struct MockWorksheet {
    title: String,
    calls: CallCounter,
    rows: Mutex<Vec<Vec<CellValue>>>,
}

impl MockWorksheet {
    pub fn new(title: &str, calls: CallCounter) -> Self {
        Self {
            title: title.to_string(),
            calls,
            rows: Mutex::new(Vec::new()),
        }
    }

    fn read<R: Send + 'static>(&self, f: impl FnOnce(&Vec<Vec<CellValue>>) -> R) -> BoxFuture<'_, Result<R>> {
        self.calls.hit();
        let out = f(&self.rows.lock().unwrap());
        Box::pin(async move { Ok(out) })
    }

    fn write(&self, f: impl FnOnce(&mut Vec<Vec<CellValue>>)) -> BoxFuture<'_, Result<()>> {
        self.calls.hit();
        f(&mut self.rows.lock().unwrap());
        Box::pin(async move { Ok(()) })
    }
}

fn put(rows: &mut Vec<Vec<CellValue>>, row: u32, col: u32, value: CellValue) {
    let (r, c) = (row as usize - 1, col as usize - 1);
    if rows.len() <= r {
        rows.resize_with(r + 1, Vec::new);
    }
    if rows[r].len() <= c {
        rows[r].resize(c + 1, CellValue::Empty);
    }
    rows[r][c] = value;
}

impl Worksheet for MockWorksheet {
    fn id(&self) -> u64 {
        0
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn get_cell(&self, address: CellAddress) -> BoxFuture<'_, Result<CellValue>> {
        self.read(move |rows| {
            rows.get(address.row as usize - 1)
                .and_then(|r| r.get(address.col as usize - 1))
                .cloned()
                .unwrap_or_default()
        })
    }

    fn update_cell(&self, address: CellAddress, value: CellValue) -> BoxFuture<'_, Result<()>> {
        self.write(move |rows| put(rows, address.row, address.col, value))
    }

    fn append_row(&self, values: Vec<CellValue>) -> BoxFuture<'_, Result<()>> {
        self.write(move |rows| rows.push(values))
    }

    fn insert_row(&self, values: Vec<CellValue>, index: u32) -> BoxFuture<'_, Result<()>> {
        self.write(move |rows| {
            let at = (index as usize - 1).min(rows.len());
            rows.insert(at, values);
        })
    }

    fn update_range(
        &self,
        range: CellRange,
        values: Vec<Vec<CellValue>>,
    ) -> BoxFuture<'_, Result<()>> {
        self.write(move |rows| {
            for (r, row) in values.into_iter().enumerate() {
                for (c, value) in row.into_iter().enumerate() {
                    put(rows, range.start.row + r as u32, range.start.col + c as u32, value);
                }
            }
        })
    }

    fn get_row(&self, index: u32) -> BoxFuture<'_, Result<Vec<CellValue>>> {
        self.read(move |rows| rows.get(index as usize - 1).cloned().unwrap_or_default())
    }

    fn get_column(&self, index: u32) -> BoxFuture<'_, Result<Vec<CellValue>>> {
        self.read(move |rows| {
            rows.iter()
                .map(|r| r.get(index as usize - 1).cloned().unwrap_or_default())
                .collect()
        })
    }

    fn get_all_values(&self) -> BoxFuture<'_, Result<Vec<Vec<CellValue>>>> {
        self.read(|rows| rows.clone())
    }

    fn get_all_records(&self) -> BoxFuture<'_, Result<Vec<Record>>> {
        self.read(|rows| {
            let Some((header, body)) = rows.split_first() else {
                return Vec::new();
            };
            body.iter()
                .map(|row| {
                    header
                        .iter()
                        .enumerate()
                        .map(|(i, h)| (h.rendered(), row.get(i).cloned().unwrap_or_default()))
                        .collect::<Record>()
                })
                .collect()
        })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        self.write(|rows| rows.clear())
    }

    fn find_all<'a>(&'a self, query: &'a CellQuery) -> BoxFuture<'a, Result<Vec<CellMatch>>> {
        self.read(move |rows| {
            let mut found = Vec::new();
            for (r, row) in rows.iter().enumerate() {
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
        })
    }
}

/// A mock client and the counter shared by everything it opens.
pub fn mock_client(account: &str) -> (ClientHandle, CallCounter) {
    let calls = CallCounter::new();
    (ClientHandle::new(MockClient::new(account, calls.clone())), calls)
}

pub fn mock_spreadsheet(title: &str) -> (SpreadsheetHandle, CallCounter) {
    let calls = CallCounter::new();
    (SpreadsheetHandle::new(MockSpreadsheet::new(title, calls.clone())), calls)
}

pub fn mock_worksheet(title: &str) -> (WorksheetHandle, CallCounter) {
    let calls = CallCounter::new();
    (WorksheetHandle::new(MockWorksheet::new(title, calls.clone())), calls)
}
