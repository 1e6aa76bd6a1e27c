//! Built-in spreadsheet nodes and the registry that builds them by kind.

pub mod builtin;
pub mod registry;

pub use builtin::auth::AuthenticateNode;
pub use builtin::cells::{
    GetAllRecordsNode, GetAllValuesNode, ReadCellNode, UpdateCellNode, UpdateRangeNode,
};
pub use builtin::rows::{AppendRowNode, InsertRowNode, ReadColumnNode, ReadRowNode};
pub use builtin::search::{FindRegexMatchesNode, FindStringMatchesNode};
pub use builtin::spreadsheet::{
    CreateSpreadsheetNode, OpenSpreadsheetByUrlNode, OpenSpreadsheetNode,
};
pub use builtin::worksheet::{
    ClearWorksheetNode, CreateWorksheetNode, DeleteWorksheetNode, OpenWorksheetNode,
};
pub use registry::{NodeArgs, NodeEnv, NodeRegistry};
