use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::RwLock;
use tracing::{debug, info};

use sheetflow_core::address::{CellAddress, CellRange};
use sheetflow_core::credentials::ServiceAccountCredentials;
use sheetflow_core::error::{Result, SheetflowError};
use sheetflow_core::handle::{ClientHandle, SpreadsheetHandle, WorksheetHandle};
use sheetflow_core::traits::{SheetsClient, SheetsConnector, Spreadsheet, Worksheet};
use sheetflow_core::types::{
    spreadsheet_key_from_url, CellMatch, CellQuery, CellValue, Record, SheetSelector,
};

use crate::grid::SheetData;
use crate::store::{spreadsheet_url, SpreadsheetData, Store};

type SharedStore = Arc<RwLock<Store>>;

/// In-process spreadsheet service, optionally backed by a JSON file.
#[derive(Clone, Default)]
pub struct LocalBackend {
    store: SharedStore,
    path: Option<PathBuf>,
}

impl LocalBackend {
    /// A backend that lives only in memory.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load the store at `path`, or start empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let store = Store::load(&path).await?;
        Ok(Self {
            store: Arc::new(RwLock::new(store)),
            path: Some(path),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Persist the store. A no-op for in-memory backends.
    pub async fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        self.store.read().await.save(path).await
    }

    pub fn connector(&self) -> LocalConnector {
        LocalConnector {
            store: self.store.clone(),
        }
    }

    /// A client that skips credential validation.
    pub fn client(&self, account: impl Into<String>) -> ClientHandle {
        ClientHandle::new(LocalClient {
            store: self.store.clone(),
            account: account.into(),
        })
    }

    /// Copy of the current store contents.
    pub async fn snapshot(&self) -> Store {
        self.store.read().await.clone()
    }
}

/// Accepts service-account documents and hands out `LocalClient`s.
pub struct LocalConnector {
    store: SharedStore,
}

impl LocalConnector {
    fn validate(credentials: &ServiceAccountCredentials) -> Result<()> {
        if credentials.account_type != "service_account" {
            return Err(SheetflowError::AuthenticationFailed(format!(
                "expected a service_account document, got type '{}'",
                credentials.account_type
            )));
        }
        if !credentials.client_email.contains('@') {
            return Err(SheetflowError::AuthenticationFailed(format!(
                "client_email '{}' is not an account address",
                credentials.client_email
            )));
        }
        if credentials.private_key.trim().is_empty() {
            return Err(SheetflowError::AuthenticationFailed(
                "private_key is empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl SheetsConnector for LocalConnector {
    fn name(&self) -> &str {
        "local"
    }

    fn connect<'a>(
        &'a self,
        credentials: &'a ServiceAccountCredentials,
    ) -> BoxFuture<'a, Result<ClientHandle>> {
        Box::pin(async move {
            Self::validate(credentials)?;
            info!(account = %credentials.client_email, "Authenticated against local backend");
            Ok(ClientHandle::new(LocalClient {
                store: self.store.clone(),
                account: credentials.client_email.clone(),
            }))
        })
    }
}

pub struct LocalClient {
    store: SharedStore,
    account: String,
}

impl LocalClient {
    fn handle(&self, data: &SpreadsheetData) -> SpreadsheetHandle {
        SpreadsheetHandle::new(LocalSpreadsheet {
            store: self.store.clone(),
            id: data.id.clone(),
            title: data.title.clone(),
        })
    }
}

impl SheetsClient for LocalClient {
    fn account(&self) -> &str {
        &self.account
    }

    fn open_by_title<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>> {
        Box::pin(async move {
            let store = self.store.read().await;
            let data = store.by_title(title)?;
            debug!(id = %data.id, title, "Opened spreadsheet by title");
            Ok(self.handle(data))
        })
    }

    fn open_by_url<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>> {
        Box::pin(async move {
            let key = spreadsheet_key_from_url(url)
                .ok_or_else(|| SheetflowError::not_found("spreadsheet url", url))?;
            let store = self.store.read().await;
            let data = store.by_id(key)?;
            debug!(id = %data.id, title = %data.title, "Opened spreadsheet by url");
            Ok(self.handle(data))
        })
    }

    fn create<'a>(&'a self, title: &'a str) -> BoxFuture<'a, Result<SpreadsheetHandle>> {
        Box::pin(async move {
            let mut store = self.store.write().await;
            let data = store.create(title);
            info!(id = %data.id, title, "Created spreadsheet");
            Ok(self.handle(data))
        })
    }
}

pub struct LocalSpreadsheet {
    store: SharedStore,
    id: String,
    title: String,
}

impl LocalSpreadsheet {
    fn handle(&self, sheet: &SheetData) -> WorksheetHandle {
        WorksheetHandle::new(LocalWorksheet {
            store: self.store.clone(),
            spreadsheet_id: self.id.clone(),
            sheet_id: sheet.id,
            title: sheet.title.clone(),
        })
    }
}

impl Spreadsheet for LocalSpreadsheet {
    fn id(&self) -> &str {
        &self.id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn url(&self) -> String {
        spreadsheet_url(&self.id)
    }

    fn sheet<'a>(&'a self, selector: &'a SheetSelector) -> BoxFuture<'a, Result<WorksheetHandle>> {
        Box::pin(async move {
            let store = self.store.read().await;
            let sheet = store.by_id(&self.id)?.select(selector)?;
            Ok(self.handle(sheet))
        })
    }

    fn add_sheet<'a>(
        &'a self,
        title: &'a str,
        rows: u32,
        cols: u32,
    ) -> BoxFuture<'a, Result<WorksheetHandle>> {
        Box::pin(async move {
            let mut store = self.store.write().await;
            let sheet = store.by_id_mut(&self.id)?.add_sheet(title, rows, cols)?;
            info!(spreadsheet = %self.title, title, rows, cols, "Added worksheet");
            Ok(self.handle(sheet))
        })
    }

    fn delete_sheet<'a>(&'a self, sheet: &'a WorksheetHandle) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut store = self.store.write().await;
            store.by_id_mut(&self.id)?.delete_sheet(sheet.id())?;
            info!(spreadsheet = %self.title, title = %sheet.title(), "Deleted worksheet");
            Ok(())
        })
    }
}

pub struct LocalWorksheet {
    store: SharedStore,
    spreadsheet_id: String,
    sheet_id: u64,
    title: String,
}

impl LocalWorksheet {
    async fn read<R>(&self, f: impl FnOnce(&SheetData) -> Result<R> + Send) -> Result<R> {
        let store = self.store.read().await;
        f(store.by_id(&self.spreadsheet_id)?.sheet(self.sheet_id)?)
    }

    async fn write<R>(&self, f: impl FnOnce(&mut SheetData) -> Result<R> + Send) -> Result<R> {
        let mut store = self.store.write().await;
        f(store.by_id_mut(&self.spreadsheet_id)?.sheet_mut(self.sheet_id)?)
    }
}

impl Worksheet for LocalWorksheet {
    fn id(&self) -> u64 {
        self.sheet_id
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn get_cell(&self, address: CellAddress) -> BoxFuture<'_, Result<CellValue>> {
        Box::pin(async move { self.read(|s| Ok(s.get(address))).await })
    }

    fn update_cell(&self, address: CellAddress, value: CellValue) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.write(|s| s.set(address, value)).await })
    }

    fn append_row(&self, values: Vec<CellValue>) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.write(|s| s.append_row(values)).await })
    }

    fn insert_row(&self, values: Vec<CellValue>, index: u32) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.write(|s| s.insert_row(values, index)).await })
    }

    fn update_range(
        &self,
        range: CellRange,
        values: Vec<Vec<CellValue>>,
    ) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move { self.write(|s| s.update_range(range, values)).await })
    }

    fn get_row(&self, index: u32) -> BoxFuture<'_, Result<Vec<CellValue>>> {
        Box::pin(async move { self.read(|s| Ok(s.row(index))).await })
    }

    fn get_column(&self, index: u32) -> BoxFuture<'_, Result<Vec<CellValue>>> {
        Box::pin(async move { self.read(|s| Ok(s.column(index))).await })
    }

    fn get_all_values(&self) -> BoxFuture<'_, Result<Vec<Vec<CellValue>>>> {
        Box::pin(async move { self.read(|s| Ok(s.all_values())).await })
    }

    fn get_all_records(&self) -> BoxFuture<'_, Result<Vec<Record>>> {
        Box::pin(async move { self.read(SheetData::records).await })
    }

    fn clear(&self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.write(|s| {
                s.clear();
                Ok(())
            })
            .await
        })
    }

    fn find_all<'a>(&'a self, query: &'a CellQuery) -> BoxFuture<'a, Result<Vec<CellMatch>>> {
        Box::pin(async move { self.read(|s| Ok(s.find_all(query))).await })
    }
}
