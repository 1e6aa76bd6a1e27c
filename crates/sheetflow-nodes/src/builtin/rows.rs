use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use sheetflow_core::context::ExecutionContext;
use sheetflow_core::error::Result;
use sheetflow_core::handle::WorksheetHandle;
use sheetflow_core::node::{NodeDescriptor, NodeOutputs};
use sheetflow_core::slot::{InputSlot, InputSpec, OutputSpec};
use sheetflow_core::traits::Node;
use sheetflow_core::types::CellValue;

use super::{one_based, to_json};
use crate::registry::{NodeArgs, NodeEnv};

const WORKSHEET_INPUT: InputSpec = InputSpec::context("worksheet", "Worksheet to operate on");

// ── AppendRowNode ───────────────────────────────────────────────

pub static APPEND_ROW: NodeDescriptor = NodeDescriptor {
    kind: "append_row",
    description: "Append a row after the last non-empty row.",
    inputs: &[WORKSHEET_INPUT, InputSpec::mandatory("values", "Row values")],
    outputs: &[],
};

pub struct AppendRowNode {
    name: String,
    worksheet: InputSlot<WorksheetHandle>,
    values: Vec<CellValue>,
}

#[derive(Deserialize)]
struct ValuesParams {
    values: Vec<CellValue>,
}

impl AppendRowNode {
    pub fn new(values: Vec<CellValue>) -> Self {
        Self {
            name: APPEND_ROW.kind.to_string(),
            worksheet: InputSlot::context("worksheet"),
            values,
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
        let params: ValuesParams = args.params()?;
        Ok(Box::new(Self {
            worksheet: args.slot("worksheet")?,
            name: args.name,
            values: params.values,
        }))
    }
}

impl Node for AppendRowNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &APPEND_ROW
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let worksheet = self.worksheet.resolve(ctx, &self.name)?;
            worksheet.append_row(self.values.clone()).await?;
            info!(
                node = %self.name,
                worksheet = worksheet.title(),
                cells = self.values.len(),
                "Row appended"
            );
            Ok(NodeOutputs::new())
        })
    }
}

// ── InsertRowNode ───────────────────────────────────────────────

pub static INSERT_ROW: NodeDescriptor = NodeDescriptor {
    kind: "insert_row",
    description: "Insert a row at a 1-based index, shifting later rows down.",
    inputs: &[
        WORKSHEET_INPUT,
        InputSpec::mandatory("values", "Row values"),
        InputSpec::mandatory("index", "1-based row index the new row ends up at"),
    ],
    outputs: &[],
};

pub struct InsertRowNode {
    name: String,
    worksheet: InputSlot<WorksheetHandle>,
    values: Vec<CellValue>,
    index: u32,
}

#[derive(Deserialize)]
struct InsertRowParams {
    values: Vec<CellValue>,
    index: u32,
}

impl InsertRowNode {
    pub fn new(values: Vec<CellValue>, index: u32) -> Result<Self> {
        let name = INSERT_ROW.kind.to_string();
        let index = one_based(&name, "index", index)?;
        Ok(Self {
            name,
            worksheet: InputSlot::context("worksheet"),
            values,
            index,
        })
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
        let params: InsertRowParams = args.params()?;
        Ok(Box::new(Self {
            worksheet: args.slot("worksheet")?,
            index: one_based(&args.name, "index", params.index)?,
            name: args.name,
            values: params.values,
        }))
    }
}

impl Node for InsertRowNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &INSERT_ROW
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let worksheet = self.worksheet.resolve(ctx, &self.name)?;
            worksheet.insert_row(self.values.clone(), self.index).await?;
            info!(node = %self.name, worksheet = worksheet.title(), index = self.index, "Row inserted");
            Ok(NodeOutputs::new())
        })
    }
}

// ── ReadRowNode / ReadColumnNode ────────────────────────────────

pub static READ_ROW: NodeDescriptor = NodeDescriptor {
    kind: "read_row",
    description: "Read the values of one row.",
    inputs: &[WORKSHEET_INPUT, InputSpec::mandatory("index", "1-based row index")],
    outputs: &[OutputSpec::data("values", "Row values, trailing empties trimmed")],
};

pub static READ_COLUMN: NodeDescriptor = NodeDescriptor {
    kind: "read_column",
    description: "Read the values of one column.",
    inputs: &[WORKSHEET_INPUT, InputSpec::mandatory("index", "1-based column index")],
    outputs: &[OutputSpec::data("values", "Column values, trailing empties trimmed")],
};

#[derive(Deserialize)]
struct IndexParams {
    index: u32,
}

/// Which line of cells a read node fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Row,
    Column,
}

/// Shared body of `read_row` and `read_column`.
struct ReadLine {
    name: String,
    worksheet: InputSlot<WorksheetHandle>,
    index: u32,
    line: Line,
}

impl ReadLine {
    fn new(line: Line, kind: &str, index: u32) -> Result<Self> {
        Ok(Self {
            index: one_based(kind, "index", index)?,
            name: kind.to_string(),
            worksheet: InputSlot::context("worksheet"),
            line,
        })
    }

    fn from_args(line: Line, args: NodeArgs) -> Result<Self> {
        let params: IndexParams = args.params()?;
        Ok(Self {
            worksheet: args.slot("worksheet")?,
            index: one_based(&args.name, "index", params.index)?,
            name: args.name,
            line,
        })
    }

    async fn run(&self, ctx: &ExecutionContext) -> Result<NodeOutputs> {
        let worksheet = self.worksheet.resolve(ctx, &self.name)?;
        let values = match self.line {
            Line::Row => worksheet.get_row(self.index).await?,
            Line::Column => worksheet.get_column(self.index).await?,
        };
        let json = to_json(&values)?;
        info!(
            node = %self.name,
            line = ?self.line,
            index = self.index,
            values = %json,
            "Values read"
        );
        Ok(NodeOutputs::new().with_data("values", json))
    }
}

pub struct ReadRowNode(ReadLine);

impl ReadRowNode {
    pub fn new(index: u32) -> Result<Self> {
        ReadLine::new(Line::Row, READ_ROW.kind, index).map(Self)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.0.name = name.into();
        self
    }

    pub fn with_worksheet(mut self, worksheet: WorksheetHandle) -> Self {
        self.0.worksheet.bind(worksheet);
        self
    }

    pub(crate) fn build(_env: &NodeEnv, args: NodeArgs) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self(ReadLine::from_args(Line::Row, args)?)))
    }
}

impl Node for ReadRowNode {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &READ_ROW
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(self.0.run(ctx))
    }
}

pub struct ReadColumnNode(ReadLine);

impl ReadColumnNode {
    pub fn new(index: u32) -> Result<Self> {
        ReadLine::new(Line::Column, READ_COLUMN.kind, index).map(Self)
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.0.name = name.into();
        self
    }

    pub fn with_worksheet(mut self, worksheet: WorksheetHandle) -> Self {
        self.0.worksheet.bind(worksheet);
        self
    }

    pub(crate) fn build(_env: &NodeEnv, args: NodeArgs) -> Result<Box<dyn Node>> {
        Ok(Box::new(Self(ReadLine::from_args(Line::Column, args)?)))
    }
}

impl Node for ReadColumnNode {
    fn name(&self) -> &str {
        &self.0.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &READ_COLUMN
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(self.0.run(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheetflow_core::error::SheetflowError;
    use sheetflow_core::node::run_node;
    use sheetflow_test_utils::mock_worksheet;

    #[tokio::test]
    async fn test_append_then_read_row() {
        let (ws, _) = mock_worksheet("Sheet1");
        let mut ctx = ExecutionContext::new();
        ctx.set(ws);

        run_node(&AppendRowNode::new(vec!["Jan".into(), 100i64.into()]), &mut ctx)
            .await
            .unwrap();
        let out = run_node(&ReadRowNode::new(1).unwrap(), &mut ctx).await.unwrap();
        assert_eq!(out.data("values"), Some(&json!(["Jan", 100])));
    }

    #[tokio::test]
    async fn test_insert_row_and_read_column() {
        let (ws, _) = mock_worksheet("Sheet1");
        let mut ctx = ExecutionContext::new();
        ctx.set(ws);

        run_node(&AppendRowNode::new(vec!["a".into()]), &mut ctx).await.unwrap();
        run_node(&AppendRowNode::new(vec!["c".into()]), &mut ctx).await.unwrap();
        run_node(&InsertRowNode::new(vec!["b".into()], 2).unwrap(), &mut ctx)
            .await
            .unwrap();

        let out = run_node(&ReadColumnNode::new(1).unwrap(), &mut ctx).await.unwrap();
        assert_eq!(out.data("values"), Some(&json!(["a", "b", "c"])));
    }

    #[test]
    fn test_zero_index_rejected_at_construction() {
        assert!(matches!(
            ReadRowNode::new(0).err().unwrap(),
            SheetflowError::InvalidNode { .. }
        ));
        assert!(ReadColumnNode::new(0).is_err());
        assert!(InsertRowNode::new(vec![], 0).is_err());
    }

    #[tokio::test]
    async fn test_explicit_worksheet_wins() {
        let (in_context, context_calls) = mock_worksheet("Sheet1");
        let (explicit, explicit_calls) = mock_worksheet("Q1");
        let mut ctx = ExecutionContext::new();
        ctx.set(in_context);

        let node = AppendRowNode::new(vec!["x".into()]).with_worksheet(explicit.clone());
        run_node(&node, &mut ctx).await.unwrap();

        assert_eq!(context_calls.count(), 0);
        assert_eq!(explicit_calls.count(), 1);
        assert_eq!(explicit.get_row(1).await.unwrap(), vec![CellValue::from("x")]);
    }
}
