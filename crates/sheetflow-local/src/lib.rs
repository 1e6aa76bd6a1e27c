//! An in-process implementation of the spreadsheet service traits.
//!
//! State is shared between every handle created from the same
//! [`LocalBackend`], so a worksheet written through one handle is visible
//! through any other handle to the same sheet.

pub mod backend;
pub mod grid;
pub mod store;

pub use backend::{LocalBackend, LocalClient, LocalConnector, LocalSpreadsheet, LocalWorksheet};
pub use store::Store;
