use futures::future::BoxFuture;
use regex::Regex;
use serde::Deserialize;
use tracing::info;

use sheetflow_core::context::ExecutionContext;
use sheetflow_core::error::{Result, SheetflowError};
use sheetflow_core::handle::WorksheetHandle;
use sheetflow_core::node::{NodeDescriptor, NodeOutputs};
use sheetflow_core::slot::{InputSlot, InputSpec, OutputSpec};
use sheetflow_core::traits::Node;
use sheetflow_core::types::CellQuery;

use super::to_json;
use crate::registry::{NodeArgs, NodeEnv};

async fn find(
    node: &str,
    worksheet: &InputSlot<WorksheetHandle>,
    query: &CellQuery,
    ctx: &ExecutionContext,
) -> Result<NodeOutputs> {
    let worksheet = worksheet.resolve(ctx, node)?;
    let cells = worksheet.find_all(query).await?;
    let json = to_json(&cells)?;
    info!(node, worksheet = worksheet.title(), matches = cells.len(), cells = %json, "Search complete");
    Ok(NodeOutputs::new().with_data("cells", json))
}

// ── FindStringMatchesNode ───────────────────────────────────────

pub static FIND_STRING_MATCHES: NodeDescriptor = NodeDescriptor {
    kind: "find_all_string_matches",
    description: "Find every cell whose value equals a string.",
    inputs: &[
        InputSpec::context("worksheet", "Worksheet to search"),
        InputSpec::mandatory("value", "Exact text to look for"),
    ],
    outputs: &[OutputSpec::data("cells", "Matching cells as {row, col, value}")],
};

pub struct FindStringMatchesNode {
    name: String,
    worksheet: InputSlot<WorksheetHandle>,
    query: CellQuery,
}

#[derive(Deserialize)]
struct StringParams {
    value: String,
}

impl FindStringMatchesNode {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            name: FIND_STRING_MATCHES.kind.to_string(),
            worksheet: InputSlot::context("worksheet"),
            query: CellQuery::Text(value.into()),
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
        let params: StringParams = args.params()?;
        Ok(Box::new(Self {
            worksheet: args.slot("worksheet")?,
            name: args.name,
            query: CellQuery::Text(params.value),
        }))
    }
}

impl Node for FindStringMatchesNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &FIND_STRING_MATCHES
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(find(&self.name, &self.worksheet, &self.query, ctx))
    }
}

// ── FindRegexMatchesNode ────────────────────────────────────────

pub static FIND_REGEX_MATCHES: NodeDescriptor = NodeDescriptor {
    kind: "find_all_regex_matches",
    description: "Find every cell whose value contains a match for a regular expression.",
    inputs: &[
        InputSpec::context("worksheet", "Worksheet to search"),
        InputSpec::mandatory("regex", "Pattern, compiled when the node is built"),
    ],
    outputs: &[OutputSpec::data("cells", "Matching cells as {row, col, value}")],
};

pub struct FindRegexMatchesNode {
    name: String,
    worksheet: InputSlot<WorksheetHandle>,
    query: CellQuery,
}

#[derive(Deserialize)]
struct RegexParams {
    regex: String,
}

fn compile(node: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| SheetflowError::invalid_node(node, format!("invalid regex: {}", e)))
}

impl FindRegexMatchesNode {
    pub fn new(pattern: &str) -> Result<Self> {
        let name = FIND_REGEX_MATCHES.kind.to_string();
        let regex = compile(&name, pattern)?;
        Ok(Self {
            name,
            worksheet: InputSlot::context("worksheet"),
            query: CellQuery::Pattern(regex),
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
        let params: RegexParams = args.params()?;
        Ok(Box::new(Self {
            worksheet: args.slot("worksheet")?,
            query: CellQuery::Pattern(compile(&args.name, &params.regex)?),
            name: args.name,
        }))
    }
}

impl Node for FindRegexMatchesNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &FIND_REGEX_MATCHES
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(find(&self.name, &self.worksheet, &self.query, ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheetflow_core::node::run_node;
    use sheetflow_test_utils::mock_worksheet;

    async fn seeded() -> ExecutionContext {
        let (ws, _) = mock_worksheet("Sheet1");
        ws.append_row(vec!["Jan".into(), "January".into()]).await.unwrap();
        ws.append_row(vec!["Feb".into(), "Jan".into()]).await.unwrap();
        let mut ctx = ExecutionContext::new();
        ctx.set(ws);
        ctx
    }

    #[tokio::test]
    async fn test_string_matches_are_exact() {
        let mut ctx = seeded().await;
        let out = run_node(&FindStringMatchesNode::new("Jan"), &mut ctx).await.unwrap();
        assert_eq!(
            out.data("cells"),
            Some(&json!([
                { "row": 1, "col": 1, "value": "Jan" },
                { "row": 2, "col": 2, "value": "Jan" },
            ]))
        );
    }

    #[tokio::test]
    async fn test_regex_matches_search() {
        let mut ctx = seeded().await;
        let node = FindRegexMatchesNode::new(r"^Jan").unwrap();
        let out = run_node(&node, &mut ctx).await.unwrap();
        assert_eq!(out.data("cells").unwrap().as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_invalid_regex_fails_at_construction() {
        let err = FindRegexMatchesNode::new("(unclosed").err().unwrap();
        match err {
            SheetflowError::InvalidNode { node, message } => {
                assert_eq!(node, "find_all_regex_matches");
                assert!(message.contains("invalid regex"));
            }
            other => panic!("expected InvalidNode, got {other:?}"),
        }
    }
}
