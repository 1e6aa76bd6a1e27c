use futures::future::BoxFuture;

use crate::address::{CellAddress, CellRange};
use crate::context::ExecutionContext;
use crate::credentials::ServiceAccountCredentials;
use crate::error::Result;
use crate::handle::{ClientHandle, SpreadsheetHandle, WorksheetHandle};
use crate::node::{NodeDescriptor, NodeOutputs};
use crate::types::{CellMatch, CellQuery, CellValue, Record, SheetSelector};

/// Connector: turns a credential document into an authenticated client.
pub trait SheetsConnector: Send + Sync + 'static {
    /// Backend name for logs (e.g., "local").
    fn name(&self) -> &str;

    /// Build a client. A rejected document is `AuthenticationFailed`.
    fn connect<'a>(
        &'a self,
        credentials: &'a ServiceAccountCredentials,
    ) -> BoxFuture<'a, Result<ClientHandle>>;
}

/// Spreadsheet-service client.
pub trait SheetsClient: Send + Sync + 'static {
    /// Account the client is authenticated as.
    fn account(&self) -> &str;

    fn open_by_title<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>>;

    fn open_by_url<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>>;

    fn create<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>>;
}

/// An open spreadsheet.
pub trait Spreadsheet: Send + Sync + 'static {
    fn id(&self) -> &str;

    fn title(&self) -> &str;

    fn url(&self) -> String;

    fn sheet<'a>(&'a self, selector: &'a SheetSelector) -> BoxFuture<'a, Result<WorksheetHandle>>;

    fn add_sheet<'a>(
        &'a self,
        title: &'a str,
        rows: u32,
        cols: u32,
    ) -> BoxFuture<'a, Result<WorksheetHandle>>;

    fn delete_sheet<'a>(&'a self, sheet: &'a WorksheetHandle) -> BoxFuture<'a, Result<()>>;
}

/// An open worksheet. Row and column indices are 1-based.
pub trait Worksheet: Send + Sync + 'static {
    fn id(&self) -> u64;

    fn title(&self) -> &str;

    fn get_cell(&self, address: CellAddress) -> BoxFuture<'_, Result<CellValue>>;

    fn update_cell(&self, address: CellAddress, value: CellValue) -> BoxFuture<'_, Result<()>>;

    /// Append after the last non-empty row.
    fn append_row(&self, values: Vec<CellValue>) -> BoxFuture<'_, Result<()>>;

    /// Insert so the new row ends up at `index`, shifting later rows down.
    fn insert_row(&self, values: Vec<CellValue>, index: u32) -> BoxFuture<'_, Result<()>>;

    fn update_range(
        &self,
        range: CellRange,
        values: Vec<Vec<CellValue>>,
    ) -> BoxFuture<'_, Result<()>>;

    fn get_row(&self, index: u32) -> BoxFuture<'_, Result<Vec<CellValue>>>;

    fn get_column(&self, index: u32) -> BoxFuture<'_, Result<Vec<CellValue>>>;

    fn get_all_values(&self) -> BoxFuture<'_, Result<Vec<Vec<CellValue>>>>;

    /// Rows below the header row, keyed by header.
    fn get_all_records(&self) -> BoxFuture<'_, Result<Vec<Record>>>;

    fn clear(&self) -> BoxFuture<'_, Result<()>>;

    fn find_all<'a>(&'a self, query: &'a CellQuery) -> BoxFuture<'a, Result<Vec<CellMatch>>>;
}

/// Node: one unit of work in a pipeline.
pub trait Node: Send + Sync + 'static {
    /// Instance name used in logs and errors (step id, or the kind).
    fn name(&self) -> &str;

    /// Static description of the node kind and its slots.
    fn descriptor(&self) -> &'static NodeDescriptor;

    /// Resolve inputs, perform the delegated action and return outputs.
    ///
    /// Publishing into the context is done by [`crate::node::run_node`].
    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>>;
}
