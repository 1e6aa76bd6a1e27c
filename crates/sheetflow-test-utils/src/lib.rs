//! Shared test utilities for sheetflow crates.
//!
//! Provides mock implementations of the spreadsheet traits that count every
//! call they receive, and service-account credential fixtures.

mod fixtures;
mod mocks;

pub use fixtures::{
    credentials_tempdir, encoded_credentials, sample_credentials, unique_env_var, write_credentials_file,
    SAMPLE_ACCOUNT,
};
pub use mocks::{
    mock_client, mock_spreadsheet, mock_worksheet, CallCounter, MockClient, MockConnector,
    MockSpreadsheet, MockWorksheet,
};
