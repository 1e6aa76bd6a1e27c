pub mod auth;
pub mod cells;
pub mod rows;
pub mod search;
pub mod spreadsheet;
pub mod worksheet;

use serde::Serialize;

use sheetflow_core::error::{Result, SheetflowError};

/// Reject index 0; row and column indices are 1-based.
pub(crate) fn one_based(node: &str, slot: &str, index: u32) -> Result<u32> {
    if index == 0 {
        return Err(SheetflowError::invalid_node(
            node,
            format!("'{}' is 1-based, got 0", slot),
        ));
    }
    Ok(index)
}

pub(crate) fn to_json<T: Serialize>(value: &T) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(value)?)
}
