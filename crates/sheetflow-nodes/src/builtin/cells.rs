use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use sheetflow_core::address::{CellAddress, CellRange};
use sheetflow_core::context::ExecutionContext;
use sheetflow_core::error::Result;
use sheetflow_core::handle::WorksheetHandle;
use sheetflow_core::node::{NodeDescriptor, NodeOutputs};
use sheetflow_core::slot::{InputSlot, InputSpec, OutputSpec};
use sheetflow_core::traits::Node;
use sheetflow_core::types::CellValue;

use super::to_json;
use crate::registry::{NodeArgs, NodeEnv};

const WORKSHEET_INPUT: InputSpec = InputSpec::context("worksheet", "Worksheet to operate on");

// ── ReadCellNode ────────────────────────────────────────────────

pub static READ_CELL: NodeDescriptor = NodeDescriptor {
    kind: "read_cell",
    description: "Read the value of one cell.",
    inputs: &[WORKSHEET_INPUT, InputSpec::mandatory("address", "A1 address, e.g. B7")],
    outputs: &[OutputSpec::data("value", "The cell value")],
};

pub struct ReadCellNode {
    name: String,
    worksheet: InputSlot<WorksheetHandle>,
    address: CellAddress,
}

#[derive(Deserialize)]
struct AddressParams {
    address: String,
}

impl ReadCellNode {
    pub fn new(address: CellAddress) -> Self {
        Self {
            name: READ_CELL.kind.to_string(),
            worksheet: InputSlot::context("worksheet"),
            address,
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
        let params: AddressParams = args.params()?;
        Ok(Box::new(Self {
            worksheet: args.slot("worksheet")?,
            address: CellAddress::parse(&params.address)?,
            name: args.name,
        }))
    }
}

impl Node for ReadCellNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &READ_CELL
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let worksheet = self.worksheet.resolve(ctx, &self.name)?;
            let value = worksheet.get_cell(self.address).await?;
            info!(node = %self.name, address = %self.address, value = %value, "Cell read");
            Ok(NodeOutputs::new().with_data("value", to_json(&value)?))
        })
    }
}

// ── UpdateCellNode ──────────────────────────────────────────────

pub static UPDATE_CELL: NodeDescriptor = NodeDescriptor {
    kind: "update_cell",
    description: "Write a value into one cell.",
    inputs: &[
        WORKSHEET_INPUT,
        InputSpec::mandatory("address", "A1 address, e.g. B7"),
        InputSpec::mandatory("value", "Value to write"),
    ],
    outputs: &[],
};

pub struct UpdateCellNode {
    name: String,
    worksheet: InputSlot<WorksheetHandle>,
    address: CellAddress,
    value: CellValue,
}

#[derive(Deserialize)]
struct UpdateCellParams {
    address: String,
    value: CellValue,
}

impl UpdateCellNode {
    pub fn new(address: CellAddress, value: impl Into<CellValue>) -> Self {
        Self {
            name: UPDATE_CELL.kind.to_string(),
            worksheet: InputSlot::context("worksheet"),
            address,
            value: value.into(),
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
        let params: UpdateCellParams = args.params()?;
        Ok(Box::new(Self {
            worksheet: args.slot("worksheet")?,
            address: CellAddress::parse(&params.address)?,
            value: params.value,
            name: args.name,
        }))
    }
}

impl Node for UpdateCellNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &UPDATE_CELL
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let worksheet = self.worksheet.resolve(ctx, &self.name)?;
            worksheet.update_cell(self.address, self.value.clone()).await?;
            info!(node = %self.name, address = %self.address, value = %self.value, "Cell updated");
            Ok(NodeOutputs::new())
        })
    }
}

// ── UpdateRangeNode ─────────────────────────────────────────────

pub static UPDATE_RANGE: NodeDescriptor = NodeDescriptor {
    kind: "update_range",
    description: "Write a block of values starting at the top-left of a range.",
    inputs: &[
        WORKSHEET_INPUT,
        InputSpec::mandatory("range", "A1 range, e.g. A1:C3"),
        InputSpec::mandatory("values", "Rows of values"),
    ],
    outputs: &[],
};

pub struct UpdateRangeNode {
    name: String,
    worksheet: InputSlot<WorksheetHandle>,
    range: CellRange,
    values: Vec<Vec<CellValue>>,
}

#[derive(Deserialize)]
struct UpdateRangeParams {
    range: String,
    values: Vec<Vec<CellValue>>,
}

impl UpdateRangeNode {
    pub fn new(range: CellRange, values: Vec<Vec<CellValue>>) -> Self {
        Self {
            name: UPDATE_RANGE.kind.to_string(),
            worksheet: InputSlot::context("worksheet"),
            range,
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
        let params: UpdateRangeParams = args.params()?;
        Ok(Box::new(Self {
            worksheet: args.slot("worksheet")?,
            range: CellRange::parse(&params.range)?,
            values: params.values,
            name: args.name,
        }))
    }
}

impl Node for UpdateRangeNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &UPDATE_RANGE
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let worksheet = self.worksheet.resolve(ctx, &self.name)?;
            worksheet.update_range(self.range, self.values.clone()).await?;
            info!(node = %self.name, range = %self.range, rows = self.values.len(), "Range updated");
            Ok(NodeOutputs::new())
        })
    }
}

// ── GetAllValuesNode ────────────────────────────────────────────

pub static GET_ALL_VALUES: NodeDescriptor = NodeDescriptor {
    kind: "get_all_values",
    description: "Read every row of a worksheet.",
    inputs: &[WORKSHEET_INPUT],
    outputs: &[OutputSpec::data("values", "Rows of values")],
};

pub struct GetAllValuesNode {
    name: String,
    worksheet: InputSlot<WorksheetHandle>,
}

impl GetAllValuesNode {
    pub fn new() -> Self {
        Self {
            name: GET_ALL_VALUES.kind.to_string(),
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

impl Default for GetAllValuesNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for GetAllValuesNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &GET_ALL_VALUES
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let worksheet = self.worksheet.resolve(ctx, &self.name)?;
            let values = worksheet.get_all_values().await?;
            let json = to_json(&values)?;
            info!(node = %self.name, rows = values.len(), values = %json, "All values read");
            Ok(NodeOutputs::new().with_data("values", json))
        })
    }
}

// ── GetAllRecordsNode ───────────────────────────────────────────

pub static GET_ALL_RECORDS: NodeDescriptor = NodeDescriptor {
    kind: "get_all_records",
    description: "Read every row below the header row as a record keyed by header.",
    inputs: &[WORKSHEET_INPUT],
    outputs: &[OutputSpec::data("records", "One object per data row")],
};

pub struct GetAllRecordsNode {
    name: String,
    worksheet: InputSlot<WorksheetHandle>,
}

impl GetAllRecordsNode {
    pub fn new() -> Self {
        Self {
            name: GET_ALL_RECORDS.kind.to_string(),
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

impl Default for GetAllRecordsNode {
    fn default() -> Self {
        Self::new()
    }
}

impl Node for GetAllRecordsNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &GET_ALL_RECORDS
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let worksheet = self.worksheet.resolve(ctx, &self.name)?;
            let records = worksheet.get_all_records().await?;
            let json = to_json(&records)?;
            info!(node = %self.name, records = records.len(), values = %json, "All records read");
            Ok(NodeOutputs::new().with_data("records", json))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheetflow_core::error::SheetflowError;
    use sheetflow_core::node::run_node;
    use sheetflow_test_utils::{mock_client, mock_worksheet};

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_update_then_read_cell() {
        let (ws, _) = mock_worksheet("Sheet1");
        let mut ctx = ExecutionContext::new();
        ctx.set(ws);

        run_node(&UpdateCellNode::new(addr("B2"), "hello"), &mut ctx).await.unwrap();
        let out = run_node(&ReadCellNode::new(addr("B2")), &mut ctx).await.unwrap();
        assert_eq!(out.data("value"), Some(&json!("hello")));
    }

    #[tokio::test]
    async fn test_explicit_worksheet_overrides_context() {
        let (in_context, context_calls) = mock_worksheet("Sheet1");
        let (explicit, _) = mock_worksheet("Q1");
        explicit.update_cell(addr("A1"), "from explicit".into()).await.unwrap();
        let mut ctx = ExecutionContext::new();
        ctx.set(in_context.clone());

        let node = ReadCellNode::new(addr("A1")).with_worksheet(explicit);
        let out = run_node(&node, &mut ctx).await.unwrap();

        assert_eq!(out.data("value"), Some(&json!("from explicit")));
        assert_eq!(context_calls.count(), 0);
        assert!(ctx.get::<WorksheetHandle>().unwrap().same_as(&in_context));
    }

    #[tokio::test]
    async fn test_missing_worksheet_does_not_touch_client() {
        let (client, calls) = mock_client("a@b.c");
        let mut ctx = ExecutionContext::new();
        ctx.set(client);

        let err = run_node(&GetAllValuesNode::new().named("dump"), &mut ctx)
            .await
            .unwrap_err();
        match err {
            SheetflowError::MissingDependency { node, slot } => {
                assert_eq!(node, "dump");
                assert_eq!(slot, "worksheet");
            }
            other => panic!("expected MissingDependency, got {other:?}"),
        }
        assert_eq!(calls.count(), 0);
    }

    #[tokio::test]
    async fn test_update_range_and_get_all_values() {
        let (ws, _) = mock_worksheet("Sheet1");
        let mut ctx = ExecutionContext::new();
        ctx.set(ws);

        let range = CellRange::parse("A1:B2").unwrap();
        let values = vec![
            vec!["Month".into(), "Amount".into()],
            vec!["Jan".into(), CellValue::Number(100.0)],
        ];
        run_node(&UpdateRangeNode::new(range, values), &mut ctx).await.unwrap();

        let out = run_node(&GetAllValuesNode::new(), &mut ctx).await.unwrap();
        assert_eq!(out.data("values"), Some(&json!([["Month", "Amount"], ["Jan", 100]])));

        let out = run_node(&GetAllRecordsNode::new(), &mut ctx).await.unwrap();
        assert_eq!(out.data("records"), Some(&json!([{ "Month": "Jan", "Amount": 100 }])));
    }

    #[tokio::test]
    async fn test_data_nodes_publish_nothing() {
        let (ws, _) = mock_worksheet("Sheet1");
        let mut ctx = ExecutionContext::new();
        ctx.set(ws.clone());

        run_node(&GetAllValuesNode::new(), &mut ctx).await.unwrap();
        assert_eq!(ctx.keys().len(), 1);
        assert!(ctx.get::<WorksheetHandle>().unwrap().same_as(&ws));
    }
}
