//! Minimal handle stubs for this crate's unit tests.

use futures::future::BoxFuture;

use crate::address::{CellAddress, CellRange};
use crate::error::{Result, SheetflowError};
use crate::handle::{ClientHandle, SpreadsheetHandle, WorksheetHandle};
use crate::traits::{SheetsClient, Spreadsheet, Worksheet};
use crate::types::{CellMatch, CellQuery, CellValue, Record, SheetSelector};

fn unsupported<T: Send + 'static>(op: &str) -> BoxFuture<'static, Result<T>> {
    let err = SheetflowError::remote(op, "stub");
    Box::pin(async move { Err(err) })
}

pub struct StubClient(pub String);

impl SheetsClient for StubClient {
    fn account(&self) -> &str {
        &self.0
    }
    fn open_by_title<'a>(&'a self, _title: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>> {
        unsupported("open_by_title")
    }
    fn open_by_url<'a>(&'a self, _url: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>> {
        unsupported("open_by_url")
    }
    fn create<'a>(&'a self, _title: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>> {
        unsupported("create")
    }
}

pub struct StubSpreadsheet(pub String);

impl Spreadsheet for StubSpreadsheet {
    fn id(&self) -> &str {
        "stub"
    }
    fn title(&self) -> &str {
        &self.0
    }
    fn url(&self) -> String {
        String::new()
    }
    fn sheet<'a>(&'a self, _selector: &'a SheetSelector) -> BoxFuture<'a, Result<WorksheetHandle>> {
        unsupported("sheet")
    }
    fn add_sheet<'a>(&'a self, _title: &'a str, _rows: u32, _cols: u32) -> BoxFuture<'a, Result<WorksheetHandle>> {
        unsupported("add_sheet")
    }
    fn delete_sheet<'a>(&'a self, _sheet: &'a WorksheetHandle) -> BoxFuture<'a, Result<()>> {
        unsupported("delete_sheet")
    }
}

pub struct StubWorksheet(pub String);

impl Worksheet for StubWorksheet {
    fn id(&self) -> u64 {
        0
    }
    fn title(&self) -> &str {
        &self.0
    }
    fn get_cell(&self, _address: CellAddress) -> BoxFuture<'_, Result<CellValue>> {
        unsupported("get_cell")
    }
    fn update_cell(&self, _address: CellAddress, _value: CellValue) -> BoxFuture<'_, Result<()>> {
        unsupported("update_cell")
    }
    fn append_row(&self, _values: Vec<CellValue>) -> BoxFuture<'_, Result<()>> {
        unsupported("append_row")
    }
    fn insert_row(&self, _values: Vec<CellValue>, _index: u32) -> BoxFuture<'_, Result<()>> {
        unsupported("insert_row")
    }
    fn update_range(&self, _range: CellRange, _values: Vec<Vec<CellValue>>) -> BoxFuture<'_, Result<()>> {
        unsupported("update_range")
    }
    fn get_row(&self, _index: u32) -> BoxFuture<'_, Result<Vec<CellValue>>> {
        unsupported("get_row")
    }
    fn get_column(&self, _index: u32) -> BoxFuture<'_, Result<Vec<CellValue>>> {
        unsupported("get_column")
    }
    fn get_all_values(&self) -> BoxFuture<'_, Result<Vec<Vec<CellValue>>>> {
        unsupported("get_all_values")
    }
    fn get_all_records(&self) -> BoxFuture<'_, Result<Vec<Record>>> {
        unsupported("get_all_records")
    }
    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        unsupported("clear")
    }
    fn find_all<'a>(&'a self, _query: &'a CellQuery) -> BoxFuture<'a, Result<Vec<CellMatch>>> {
        unsupported("find_all")
    }
}

pub fn client(account: &str) -> ClientHandle {
    ClientHandle::new(StubClient(account.to_string()))
}

pub fn spreadsheet(title: &str) -> SpreadsheetHandle {
    SpreadsheetHandle::new(StubSpreadsheet(title.to_string()))
}

pub fn worksheet(title: &str) -> WorksheetHandle {
    WorksheetHandle::new(StubWorksheet(title.to_string()))
}
