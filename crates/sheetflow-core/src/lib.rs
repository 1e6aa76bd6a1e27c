pub mod address;
pub mod config;
pub mod context;
pub mod credentials;
pub mod error;
pub mod handle;
pub mod node;
pub mod slot;
pub mod traits;
pub mod types;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use context::ExecutionContext;
pub use error::{Result, SheetflowError};
pub use handle::{ClientHandle, ContextHandle, ContextKey, Handle, SpreadsheetHandle, WorksheetHandle};
pub use node::{run_node, NodeDescriptor, NodeOutputs, OutputValue};
pub use slot::{InputKind, InputSlot, InputSpec, OutputSpec};
pub use types::*;
