use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use sheetflow_core::error::{Result, SheetflowError};
use sheetflow_core::types::SheetSelector;

use crate::grid::{check_grid_size, SheetData};

/// Title given to the worksheet every new spreadsheet starts with.
pub const DEFAULT_SHEET_TITLE: &str = "Sheet1";
pub const DEFAULT_SHEET_ROWS: u32 = 1000;
pub const DEFAULT_SHEET_COLS: u32 = 26;

/// Everything the local backend knows, as persisted on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Store {
    #[serde(default)]
    pub spreadsheets: Vec<SpreadsheetData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpreadsheetData {
    pub id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub next_sheet_id: u64,
    pub sheets: Vec<SheetData>,
}

impl SpreadsheetData {
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().simple().to_string(),
            title: title.into(),
            created_at: now,
            updated_at: now,
            next_sheet_id: 1,
            sheets: vec![SheetData::new(
                0,
                DEFAULT_SHEET_TITLE,
                DEFAULT_SHEET_ROWS,
                DEFAULT_SHEET_COLS,
            )],
        }
    }

    pub fn url(&self) -> String {
        spreadsheet_url(&self.id)
    }

    pub fn select(&self, selector: &SheetSelector) -> Result<&SheetData> {
        let found = match selector {
            SheetSelector::Default => self.sheets.first(),
            SheetSelector::Title(t) => self.sheets.iter().find(|s| s.title == *t),
        };
        found.ok_or_else(|| SheetflowError::not_found("worksheet", selector.to_string()))
    }

    pub fn sheet(&self, sheet_id: u64) -> Result<&SheetData> {
        self.sheets
            .iter()
            .find(|s| s.id == sheet_id)
            .ok_or_else(|| self.missing_sheet(sheet_id))
    }

    pub fn sheet_mut(&mut self, sheet_id: u64) -> Result<&mut SheetData> {
        self.updated_at = Utc::now();
        match self.sheets.iter().position(|s| s.id == sheet_id) {
            Some(i) => Ok(&mut self.sheets[i]),
            None => Err(self.missing_sheet(sheet_id)),
        }
    }

    pub fn add_sheet(&mut self, title: &str, rows: u32, cols: u32) -> Result<&SheetData> {
        if self.sheets.iter().any(|s| s.title == title) {
            return Err(SheetflowError::remote(
                "add_sheet",
                format!("a sheet with the name \"{}\" already exists", title),
            ));
        }
        if rows == 0 || cols == 0 {
            return Err(SheetflowError::remote(
                "add_sheet",
                format!("grid size {}x{} must be positive", rows, cols),
            ));
        }
        check_grid_size("add_sheet", rows, cols)?;
        let id = self.next_sheet_id;
        self.next_sheet_id += 1;
        self.updated_at = Utc::now();
        self.sheets.push(SheetData::new(id, title, rows, cols));
        Ok(&self.sheets[self.sheets.len() - 1])
    }

    pub fn delete_sheet(&mut self, sheet_id: u64) -> Result<()> {
        let index = self
            .sheets
            .iter()
            .position(|s| s.id == sheet_id)
            .ok_or_else(|| self.missing_sheet(sheet_id))?;
        if self.sheets.len() == 1 {
            return Err(SheetflowError::remote(
                "delete_sheet",
                "a spreadsheet must keep at least one worksheet",
            ));
        }
        self.sheets.remove(index);
        self.updated_at = Utc::now();
        Ok(())
    }

    fn missing_sheet(&self, sheet_id: u64) -> SheetflowError {
        SheetflowError::not_found("worksheet", format!("gid {} in '{}'", sheet_id, self.title))
    }
}

impl Store {
    /// Read a store file; a missing file is an empty store.
    pub async fn load(path: &Path) -> Result<Self> {
        match tokio::fs::read(path).await {
            Ok(bytes) => {
                let store: Store = serde_json::from_slice(&bytes)?;
                debug!(
                    path = %path.display(),
                    spreadsheets = store.spreadsheets.len(),
                    "Loaded local store"
                );
                Ok(store)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No local store yet, starting empty");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Write the store through a temp file and rename it into place.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, serde_json::to_vec_pretty(self)?).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(path = %path.display(), "Saved local store");
        Ok(())
    }

    pub fn by_id(&self, id: &str) -> Result<&SpreadsheetData> {
        self.spreadsheets
            .iter()
            .find(|s| s.id == id)
            .ok_or_else(|| SheetflowError::not_found("spreadsheet", id))
    }

    pub fn by_id_mut(&mut self, id: &str) -> Result<&mut SpreadsheetData> {
        self.spreadsheets
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| SheetflowError::not_found("spreadsheet", id))
    }

    /// First spreadsheet with the exact title.
    pub fn by_title(&self, title: &str) -> Result<&SpreadsheetData> {
        self.spreadsheets
            .iter()
            .find(|s| s.title == title)
            .ok_or_else(|| SheetflowError::not_found("spreadsheet", title))
    }

    pub fn create(&mut self, title: &str) -> &SpreadsheetData {
        self.spreadsheets.push(SpreadsheetData::new(title));
        &self.spreadsheets[self.spreadsheets.len() - 1]
    }
}

pub fn spreadsheet_url(id: &str) -> String {
    format!("https://docs.google.com/spreadsheets/d/{}/edit", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_spreadsheet_has_default_sheet() {
        let data = SpreadsheetData::new("Budget");
        assert_eq!(data.sheets.len(), 1);
        assert_eq!(data.sheets[0].title, "Sheet1");
        assert_eq!((data.sheets[0].rows, data.sheets[0].cols), (1000, 26));
        assert_eq!(data.id.len(), 32);
        assert!(data.url().ends_with(&format!("/d/{}/edit", data.id)));
    }

    #[test]
    fn test_select_default_and_title() {
        let mut data = SpreadsheetData::new("Budget");
        data.add_sheet("Q1", 10, 10).unwrap();
        assert_eq!(data.select(&SheetSelector::Default).unwrap().title, "Sheet1");
        assert_eq!(data.select(&SheetSelector::Title("Q1".into())).unwrap().id, 1);
        let err = data.select(&SheetSelector::Title("Q2".into())).unwrap_err();
        assert!(matches!(err, SheetflowError::RemoteNotFound { .. }));
    }

    #[test]
    fn test_duplicate_sheet_title_rejected() {
        let mut data = SpreadsheetData::new("Budget");
        let err = data.add_sheet("Sheet1", 10, 10).unwrap_err();
        assert!(matches!(err, SheetflowError::RemoteOperationFailed { .. }));
    }

    #[test]
    fn test_last_sheet_cannot_be_deleted() {
        let mut data = SpreadsheetData::new("Budget");
        assert!(data.delete_sheet(0).is_err());
        data.add_sheet("Q1", 10, 10).unwrap();
        data.delete_sheet(0).unwrap();
        assert_eq!(data.sheets[0].title, "Q1");
        assert!(matches!(
            data.delete_sheet(0).unwrap_err(),
            SheetflowError::RemoteNotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("sheets.json");

        let mut store = Store::default();
        let id = store.create("Budget").id.clone();
        store.save(&path).await.unwrap();

        let loaded = Store::load(&path).await.unwrap();
        assert_eq!(loaded.by_id(&id).unwrap().title, "Budget");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::load(&dir.path().join("absent.json")).await.unwrap();
        assert!(store.spreadsheets.is_empty());
    }
}
