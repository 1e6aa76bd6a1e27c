use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use sheetflow_core::config::WorksheetConfig;
use sheetflow_core::context::ExecutionContext;
use sheetflow_core::error::Result;
use sheetflow_core::handle::{ContextKey, SpreadsheetHandle, WorksheetHandle};
use sheetflow_core::node::{NodeDescriptor, NodeOutputs};
use sheetflow_core::slot::{InputSlot, InputSpec, OutputSpec};
use sheetflow_core::traits::Node;
use sheetflow_core::types::SheetSelector;

use crate::registry::{NodeArgs, NodeEnv};

// ── OpenWorksheetNode ───────────────────────────────────────────

pub static OPEN_WORKSHEET: NodeDescriptor = NodeDescriptor {
    kind: "open_worksheet",
    description: "Select a worksheet of a spreadsheet by title, or the first one.",
    inputs: &[
        InputSpec::context("spreadsheet", "Spreadsheet to select from"),
        InputSpec::parameter("worksheet_title", "Worksheet title; the first one when absent"),
    ],
    outputs: &[OutputSpec::published("worksheet", ContextKey::Worksheet, "The selected worksheet")],
};

pub struct OpenWorksheetNode {
    name: String,
    spreadsheet: InputSlot<SpreadsheetHandle>,
    worksheet_title: Option<String>,
}

#[derive(Deserialize)]
struct OpenWorksheetParams {
    #[serde(default)]
    worksheet_title: Option<String>,
}

impl OpenWorksheetNode {
    pub fn new() -> Self {
        Self {
            name: OPEN_WORKSHEET.kind.to_string(),
            spreadsheet: InputSlot::context("spreadsheet"),
            worksheet_title: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_spreadsheet(mut self, spreadsheet: SpreadsheetHandle) -> Self {
        self.spreadsheet.bind(spreadsheet);
        self
    }

    pub fn with_worksheet_title(mut self, title: impl Into<String>) -> Self {
        self.worksheet_title = Some(title.into());
        self
    }

    pub(crate) fn build(_env: &NodeEnv, args: NodeArgs) -> Result<Box<dyn Node>> {
        let params: OpenWorksheetParams = args.params()?;
        Ok(Box::new(Self {
            spreadsheet: args.slot("spreadsheet")?,
            name: args.name,
            worksheet_title: params.worksheet_title,
        }))
    }
}

impl Default for OpenWorksheetNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for OpenWorksheetNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &OPEN_WORKSHEET
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let spreadsheet = self.spreadsheet.resolve(ctx, &self.name)?;
            let selector = SheetSelector::from_title(self.worksheet_title.as_deref());
            let worksheet = spreadsheet.sheet(&selector).await?;
            info!(node = %self.name, worksheet = worksheet.title(), "Worksheet opened");
            Ok(NodeOutputs::new().with_handle("worksheet", worksheet))
        })
    }
}

// ── CreateWorksheetNode ─────────────────────────────────────────

pub static CREATE_WORKSHEET: NodeDescriptor = NodeDescriptor {
    kind: "create_worksheet",
    description: "Add a worksheet to a spreadsheet.",
    inputs: &[
        InputSpec::context("spreadsheet", "Spreadsheet to add to"),
        InputSpec::mandatory("title", "Title of the new worksheet"),
        InputSpec::parameter("rows", "Row count; [worksheet] default_rows when absent"),
        InputSpec::parameter("cols", "Column count; [worksheet] default_cols when absent"),
    ],
    outputs: &[OutputSpec::published("worksheet", ContextKey::Worksheet, "The new worksheet")],
};

pub struct CreateWorksheetNode {
    name: String,
    spreadsheet: InputSlot<SpreadsheetHandle>,
    title: String,
    rows: u32,
    cols: u32,
}

#[derive(Deserialize)]
struct CreateWorksheetParams {
    title: String,
    #[serde(default)]
    rows: Option<u32>,
    #[serde(default)]
    cols: Option<u32>,
}

impl CreateWorksheetNode {
    /// A node creating a worksheet of the default 1000x26 size.
    pub fn new(title: impl Into<String>) -> Self {
        let defaults = WorksheetConfig::default();
        Self {
            name: CREATE_WORKSHEET.kind.to_string(),
            spreadsheet: InputSlot::context("spreadsheet"),
            title: title.into(),
            rows: defaults.default_rows,
            cols: defaults.default_cols,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_spreadsheet(mut self, spreadsheet: SpreadsheetHandle) -> Self {
        self.spreadsheet.bind(spreadsheet);
        self
    }

    pub fn with_size(mut self, rows: u32, cols: u32) -> Self {
        self.rows = rows;
        self.cols = cols;
        self
    }

    pub(crate) fn build(env: &NodeEnv, args: NodeArgs) -> Result<Box<dyn Node>> {
        let params: CreateWorksheetParams = args.params()?;
        let defaults = env.config.worksheet;
        let rows = params.rows.unwrap_or(defaults.default_rows);
        let cols = params.cols.unwrap_or(defaults.default_cols);
        if rows == 0 || cols == 0 {
            return Err(sheetflow_core::SheetflowError::invalid_node(
                args.name,
                format!("worksheet size {}x{} must be positive", rows, cols),
            ));
        }
        Ok(Box::new(Self {
            spreadsheet: args.slot("spreadsheet")?,
            name: args.name,
            title: params.title,
            rows,
            cols,
        }))
    }
}

impl Node for CreateWorksheetNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &CREATE_WORKSHEET
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let spreadsheet = self.spreadsheet.resolve(ctx, &self.name)?;
            let worksheet = spreadsheet.add_sheet(&self.title, self.rows, self.cols).await?;
            info!(
                node = %self.name,
                spreadsheet = spreadsheet.title(),
                worksheet = worksheet.title(),
                rows = self.rows,
                cols = self.cols,
                "Worksheet created"
            );
            Ok(NodeOutputs::new().with_handle("worksheet", worksheet))
        })
    }
}

// ── DeleteWorksheetNode ─────────────────────────────────────────

pub static DELETE_WORKSHEET: NodeDescriptor = NodeDescriptor {
    kind: "delete_worksheet",
    description: "Delete a worksheet from a spreadsheet by title.",
    inputs: &[
        InputSpec::context("spreadsheet", "Spreadsheet holding the worksheet"),
        InputSpec::mandatory("title", "Title of the worksheet to delete"),
    ],
    outputs: &[],
};

pub struct DeleteWorksheetNode {
    name: String,
    spreadsheet: InputSlot<SpreadsheetHandle>,
    title: String,
}

#[derive(Deserialize)]
struct DeleteWorksheetParams {
    title: String,
}

impl DeleteWorksheetNode {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            name: DELETE_WORKSHEET.kind.to_string(),
            spreadsheet: InputSlot::context("spreadsheet"),
            title: title.into(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_spreadsheet(mut self, spreadsheet: SpreadsheetHandle) -> Self {
        self.spreadsheet.bind(spreadsheet);
        self
    }

    pub(crate) fn build(_env: &NodeEnv, args: NodeArgs) -> Result<Box<dyn Node>> {
        let params: DeleteWorksheetParams = args.params()?;
        Ok(Box::new(Self {
            spreadsheet: args.slot("spreadsheet")?,
            name: args.name,
            title: params.title,
        }))
    }
}

impl Node for DeleteWorksheetNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &DELETE_WORKSHEET
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let spreadsheet = self.spreadsheet.resolve(ctx, &self.name)?;
            let selector = SheetSelector::Title(self.title.clone());
            let worksheet = spreadsheet.sheet(&selector).await?;
            spreadsheet.delete_sheet(&worksheet).await?;
            info!(node = %self.name, worksheet = %self.title, "Worksheet deleted");
            Ok(NodeOutputs::new())
        })
    }
}

// ── ClearWorksheetNode ──────────────────────────────────────────

pub static CLEAR_WORKSHEET: NodeDescriptor = NodeDescriptor {
    kind: "clear_worksheet",
    description: "Clear every cell of a worksheet.",
    inputs: &[InputSpec::context("worksheet", "Worksheet to clear")],
    outputs: &[],
};

pub struct ClearWorksheetNode {
    name: String,
    worksheet: InputSlot<WorksheetHandle>,
}

impl ClearWorksheetNode {
    pub fn new() -> Self {
        Self {
            name: CLEAR_WORKSHEET.kind.to_string(),
            worksheet: InputSlot::context("worksheet"),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_worksheet(mut self, worksheet: WorksheetHandle) -> Self {
        self.worksheet.bind(worksheet);
        self
    }

    pub(crate) fn build(_env: &NodeEnv, args: NodeArgs) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self {
            worksheet: args.slot("worksheet")?,
            name: args.name,
        }))
    }
}

impl Default for ClearWorksheetNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for ClearWorksheetNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &CLEAR_WORKSHEET
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let worksheet = self.worksheet.resolve(ctx, &self.name)?;
            worksheet.clear().await?;
            info!(node = %self.name, worksheet = worksheet.title(), "Worksheet cleared");
            Ok(NodeOutputs::new())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use serde_json::json;
    use sheetflow_core::error::SheetflowError;
    use sheetflow_core::node::run_node;
    use sheetflow_core::AppConfig;
    use sheetflow_test_utils::{mock_spreadsheet, MockConnector};

    #[tokio::test]
    async fn test_create_publishes_new_worksheet() {
        let (spreadsheet, _) = mock_spreadsheet("Budget");
        let mut ctx = ExecutionContext::new();
        ctx.set(spreadsheet.clone());

        run_node(&CreateWorksheetNode::new("Q1"), &mut ctx).await.unwrap();
        let published = ctx.get::<WorksheetHandle>().unwrap();
        assert_eq!(published.title(), "Q1");

        let reopened = spreadsheet.sheet(&SheetSelector::Title("Q1".into())).await.unwrap();
        assert!(reopened.same_as(published));
    }

    #[tokio::test]
    async fn test_create_duplicate_publishes_nothing() {
        let (spreadsheet, _) = mock_spreadsheet("Budget");
        let mut ctx = ExecutionContext::new();
        ctx.set(spreadsheet);

        let err = run_node(&CreateWorksheetNode::new("Sheet1"), &mut ctx).await.unwrap_err();
        assert!(matches!(err, SheetflowError::RemoteOperationFailed { .. }));
        assert!(ctx.get::<WorksheetHandle>().is_none());
    }

    #[test]
    fn test_build_rejects_zero_size() {
        let env = NodeEnv::new(Arc::new(MockConnector::default()), AppConfig::default());
        let args = NodeArgs::new("q1").with_params(json!({ "title": "Q1", "rows": 0 }));
        let err = CreateWorksheetNode::build(&env, args).err().unwrap();
        assert!(matches!(err, SheetflowError::InvalidNode { .. }));
    }

    #[tokio::test]
    async fn test_open_worksheet_by_title_and_default() {
        let (spreadsheet, _) = mock_spreadsheet("Budget");
        spreadsheet.add_sheet("Q1", 10, 10).await.unwrap();
        let mut ctx = ExecutionContext::new();
        ctx.set(spreadsheet);

        run_node(&OpenWorksheetNode::new().with_worksheet_title("Q1"), &mut ctx)
            .await
            .unwrap();
        assert_eq!(ctx.get::<WorksheetHandle>().unwrap().title(), "Q1");

        run_node(&OpenWorksheetNode::new(), &mut ctx).await.unwrap();
        assert_eq!(ctx.get::<WorksheetHandle>().unwrap().title(), "Sheet1");
    }

    #[tokio::test]
    async fn test_delete_worksheet() {
        let (spreadsheet, _) = mock_spreadsheet("Budget");
        spreadsheet.add_sheet("Q1", 10, 10).await.unwrap();
        let mut ctx = ExecutionContext::new();

        let node = DeleteWorksheetNode::new("Q1").with_spreadsheet(spreadsheet.clone());
        run_node(&node, &mut ctx).await.unwrap();
        assert!(spreadsheet.sheet(&SheetSelector::Title("Q1".into())).await.is_err());
        assert!(ctx.is_empty());
    }

    #[tokio::test]
    async fn test_clear_without_worksheet_never_calls_backend() {
        let (spreadsheet, calls) = mock_spreadsheet("Budget");
        let mut ctx = ExecutionContext::new();
        ctx.set(spreadsheet);
        let err = run_node(&ClearWorksheetNode::new(), &mut ctx).await.unwrap_err();
        assert!(matches!(err, SheetflowError::MissingDependency { .. }));
        assert_eq!(calls.count(), 0);
    }
}
