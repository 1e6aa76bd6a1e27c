use std::path::PathBuf;
use std::sync::Arc;

use futures::future::BoxFuture;
use serde::Deserialize;
use tracing::info;

use sheetflow_core::config::expand_home;
use sheetflow_core::context::ExecutionContext;
use sheetflow_core::credentials::resolve_credentials;
use sheetflow_core::error::Result;
use sheetflow_core::handle::ContextKey;
use sheetflow_core::node::{NodeDescriptor, NodeOutputs};
use sheetflow_core::slot::{InputSpec, OutputSpec};
use sheetflow_core::traits::{Node, SheetsConnector};

use crate::registry::{NodeArgs, NodeEnv};

pub static AUTHENTICATE: NodeDescriptor = NodeDescriptor {
    kind: "authenticate",
    description: "Authenticate with a service-account document from a file or the environment.",
    inputs: &[InputSpec::parameter(
        "json_path",
        "Credential file; falls back to the base64 environment variable when absent or missing",
    )],
    outputs: &[OutputSpec::published("client", ContextKey::Client, "Authenticated client")],
};

/// Resolves credentials and builds a client through the connector.
pub struct AuthenticateNode {
    name: String,
    json_path: Option<PathBuf>,
    env_var: String,
    connector: Arc<dyn SheetsConnector>,
}

#[derive(Deserialize)]
struct AuthenticateParams {
    #[serde(default)]
    json_path: Option<String>,
}

impl AuthenticateNode {
    pub fn new(connector: Arc<dyn SheetsConnector>) -> Self {
        Self {
            name: AUTHENTICATE.kind.to_string(),
            json_path: None,
            env_var: sheetflow_core::config::DEFAULT_CREDENTIALS_ENV.to_string(),
            connector,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_json_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.json_path = Some(path.into());
        self
    }

    /// Read the encoded document from a different environment variable.
    pub fn with_env_var(mut self, env_var: impl Into<String>) -> Self {
        self.env_var = env_var.into();
        self
    }

    pub(crate) fn build(env: &NodeEnv, args: NodeArgs) -> Result<Box<dyn Node>> {
        let params: AuthenticateParams = args.params()?;
        let json_path = params
            .json_path
            .as_deref()
            .map(expand_home)
            .or_else(|| env.config.credentials_path());

        let mut node = Self::new(env.connector.clone())
            .named(args.name)
            .with_env_var(env.config.credentials.env_var.clone());
        node.json_path = json_path;
        Ok(Box::new(node))
    }
}

impl Node for AuthenticateNode {
    fn name(&self) -> &str {
        &self.name
    }

    fn descriptor(&self) -> &'static NodeDescriptor {
        &AUTHENTICATE
    }

    fn execute<'a>(&'a self, _ctx: &'a ExecutionContext) -> BoxFuture<'a, Result<NodeOutputs>> {
        Box::pin(async move {
            let resolved = resolve_credentials(self.json_path.as_deref(), &self.env_var)?;
            let client = self.connector.connect(&resolved.credentials).await?;
            info!(
                node = %self.name,
                source = %resolved.source,
                backend = self.connector.name(),
                account = client.account(),
                "Authenticated"
            );
            Ok(NodeOutputs::new().with_handle("client", client))
        })
    }
}
