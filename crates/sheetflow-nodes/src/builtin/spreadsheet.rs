use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use sheetflow_core::context::ExecutionContext;
use sheetflow_core::error::Result;
use sheetflow_core::handle::{ClientHandle, ContextKey, SpreadsheetHandle};
use sheetflow_core::node::{NodeDescriptor, NodeOutputs};
use sheetflow_core::slot::{InputSlot, InputSpec, OutputSpec};
use sheetflow_core::traits::Node;
use sheetflow_core::types::SheetSelector;

use crate::registry::{NodeArgs, NodeEnv};

const SPREADSHEET_OUTPUTS: &[OutputSpec] = &[
    OutputSpec::published("spreadsheet", ContextKey::Spreadsheet, "The opened spreadsheet"),
    OutputSpec::published("worksheet", ContextKey::Worksheet, "The selected worksheet"),
];

/// Select the worksheet and package both handles as outputs.
async fn spreadsheet_outputs(
    node: &str,
    spreadsheet: SpreadsheetHandle,
    worksheet_title: Option<&str>,
) -> Result<NodeOutputs> {
    let selector = SheetSelector::from_title(worksheet_title);
    let worksheet = spreadsheet.sheet(&selector).await?;
    info!(
        node,
        spreadsheet = spreadsheet.title(),
        id = spreadsheet.id(),
        worksheet = worksheet.title(),
        "Spreadsheet opened"
    );
    Ok(NodeOutputs::new()
        .with_handle("spreadsheet", spreadsheet)
        .with_handle("worksheet", worksheet))
}

// ── OpenSpreadsheetNode ─────────────────────────────────────────

pub static OPEN_SPREADSHEET: NodeDescriptor = NodeDescriptor {
    kind: "open_spreadsheet",
    description: "Open a spreadsheet by title and select a worksheet.",
    inputs: &[
        InputSpec::context("client", "Authenticated client"),
        InputSpec::mandatory("title", "Spreadsheet title"),
        InputSpec::parameter("worksheet_title", "Worksheet to select; the first one when absent"),
    ],
    outputs: SPREADSHEET_OUTPUTS,
};

pub struct OpenSpreadsheetNode {
    name: String,
    client: InputSlot<ClientHandle>,
    title: String,
    worksheet_title: Option<String>,
}

#[derive(Deserialize)]
struct OpenSpreadsheetParams {
    title: String,
    #[serde(default)]
    worksheet_title: Option<String>,
}

impl OpenSpreadsheetNode {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            name: OPEN_SPREADSHEET.kind.to_string(),
            client: InputSlot::context("client"),
            title: title.into(),
            worksheet_title: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_client(mut self, client: ClientHandle) -> Self {
        self.client.bind(client);
        self
    }

    pub fn with_worksheet_title(mut self, title: impl Into<String>) -> Self {
        self.worksheet_title = Some(title.into());
        self
    }

    pub(crate) fn build(_env: &NodeEnv, args: NodeArgs) -> Result<Box<dyn Node>> {
        let params: OpenSpreadsheetParams = args.params()?;
        Ok(Box::new(Self {
            client: args.slot("client")?,
            name: args.name,
            title: params.title,
            worksheet_title: params.worksheet_title,
        }))
    }
}

impl Node for OpenSpreadsheetNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &OPEN_SPREADSHEET
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let client = self.client.resolve(ctx, &self.name)?;
            let spreadsheet = client.open_by_title(&self.title).await?;
            spreadsheet_outputs(&self.name, spreadsheet, self.worksheet_title.as_deref()).await
        })
    }
}

// ── OpenSpreadsheetByUrlNode ────────────────────────────────────

pub static OPEN_SPREADSHEET_BY_URL: NodeDescriptor = NodeDescriptor {
    kind: "open_spreadsheet_by_url",
    description: "Open a spreadsheet by URL and select a worksheet.",
    inputs: &[
        InputSpec::context("client", "Authenticated client"),
        InputSpec::mandatory("url", "Spreadsheet URL"),
        InputSpec::parameter("worksheet_title", "Worksheet to select; the first one when absent"),
    ],
    outputs: SPREADSHEET_OUTPUTS,
};

pub struct OpenSpreadsheetByUrlNode {
    name: String,
    client: InputSlot<ClientHandle>,
    url: String,
    worksheet_title: Option<String>,
}

#[derive(Deserialize)]
struct OpenByUrlParams {
    url: String,
    #[serde(default)]
    worksheet_title: Option<String>,
}

impl OpenSpreadsheetByUrlNode {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            name: OPEN_SPREADSHEET_BY_URL.kind.to_string(),
            client: InputSlot::context("client"),
            url: url.into(),
            worksheet_title: None,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_client(mut self, client: ClientHandle) -> Self {
        self.client.bind(client);
        self
    }

    pub fn with_worksheet_title(mut self, title: impl Into<String>) -> Self {
        self.worksheet_title = Some(title.into());
        self
    }

    pub(crate) fn build(_env: &NodeEnv, args: NodeArgs) -> Result<Box<dyn Node>> {
        let params: OpenByUrlParams = args.params()?;
        Ok(Box::new(Self {
            client: args.slot("client")?,
            name: args.name,
            url: params.url,
            worksheet_title: params.worksheet_title,
        }))
    }
}

impl Node for OpenSpreadsheetByUrlNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &OPEN_SPREADSHEET_BY_URL
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let client = self.client.resolve(ctx, &self.name)?;
            let spreadsheet = client.open_by_url(&self.url).await?;
            spreadsheet_outputs(&self.name, spreadsheet, self.worksheet_title.as_deref()).await
        })
    }
}

// ── CreateSpreadsheetNode ───────────────────────────────────────

pub static CREATE_SPREADSHEET: NodeDescriptor = NodeDescriptor {
    kind: "create_spreadsheet",
    description: "Create a new spreadsheet and select its first worksheet.",
    inputs: &[
        InputSpec::context("client", "Authenticated client"),
        InputSpec::mandatory("title", "Title of the new spreadsheet"),
    ],
    outputs: SPREADSHEET_OUTPUTS,
};

pub struct CreateSpreadsheetNode {
    name: String,
    client: InputSlot<ClientHandle>,
    title: String,
}

#[derive(Deserialize)]
struct CreateSpreadsheetParams {
    title: String,
}

impl CreateSpreadsheetNode {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            name: CREATE_SPREADSHEET.kind.to_string(),
            client: InputSlot::context("client"),
            title: title.into(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_client(mut self, client: ClientHandle) -> Self {
        self.client.bind(client);
        self
    }

    pub(crate) fn build(_env: &NodeEnv, args: NodeArgs) -> Result<Box<dyn Node>> {
        let params: CreateSpreadsheetParams = args.params()?;
        Ok(Box::new(Self {
            client: args.slot("client")?,
            name: args.name,
            title: params.title,
        }))
    }
}

impl Node for CreateSpreadsheetNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &CREATE_SPREADSHEET
    }

    fn execute<'a>(&'a self, ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let client = self.client.resolve(ctx, &self.name)?;
            let spreadsheet = client.create(&self.title).await?;
            info!(node = %self.name, url = %spreadsheet.url(), "Spreadsheet created");
            spreadsheet_outputs(&self.name, spreadsheet, None).await
        })
    }
}
