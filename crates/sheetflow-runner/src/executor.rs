use std::collections::HashMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info};

use sheetflow_core::context::ExecutionContext;
use sheetflow_core::error::{Result, SheetflowError};
use sheetflow_core::node::{run_node, NodeOutputs};
use sheetflow_nodes::registry::NodeRegistry;

use crate::pipeline::PipelineDef;

/// Result of executing a single step.
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    /// Step id from the pipeline definition.
    pub id: String,
    /// Node kind the step ran.
    pub kind: String,
    /// Execution time in milliseconds.
    pub elapsed_ms: u64,
    /// The step's outputs; handles are rendered as labels.
    pub outputs: serde_json::Value,
}

/// Result of executing a whole pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub pipeline: String,
    pub run_id: String,
    /// Per-step results in execution order.
    pub steps: Vec<StepReport>,
    pub total_elapsed_ms: u64,
}

impl RunReport {
    pub fn step(&self, id: &str) -> Option<&StepReport> {
        self.steps.iter().find(|s| s.id == id)
    }
}

/// Runs pipeline steps in order against one execution context.
///
/// Explicit wiring is resolved from the outputs of earlier steps; anything
/// left unwired falls back to what earlier steps published into the context.
pub struct PipelineExecutor {
    registry: NodeRegistry,
}

impl PipelineExecutor {
    pub fn new(registry: NodeRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    pub fn validate(&self, pipeline: &PipelineDef) -> Result<()> {
        pipeline.validate(&self.registry)
    }

    /// Validate, then execute every step. The first failure aborts the run.
    pub async fn run(&self, pipeline: &PipelineDef, ctx: &mut ExecutionContext) -> Result<RunReport> {
        self.validate(pipeline)?;

        let start = Instant::now();
        let run_id = ctx.run_id().to_string();
        info!(run_id = %run_id, pipeline = %pipeline.name, steps = pipeline.steps.len(), "Pipeline started");

        let mut outputs: HashMap<&str, NodeOutputs> = HashMap::new();
        let mut steps = Vec::with_capacity(pipeline.steps.len());

        for step in &pipeline.steps {
            let mut args = step.args();
            for (slot, source) in step.wires()? {
                let handle = outputs
                    .get(source.step.as_str())
                    .and_then(|out| out.handle(&source.output))
                    .ok_or_else(|| {
                        SheetflowError::Pipeline(format!(
                            "step '{}': {} produced no handle",
                            step.id, source
                        ))
                    })?;
                debug!(step = %step.id, slot = %slot, source = %source, "Wiring explicit input");
                args = args.wire(slot, handle.clone());
            }

            let node = self.registry.build(&step.node, args)?;
            let step_start = Instant::now();
            let out = match run_node(node.as_ref(), ctx).await {
                Ok(out) => out,
                Err(e) => {
                    error!(run_id = %run_id, step = %step.id, kind = %step.node, error = %e, "Pipeline aborted");
                    return Err(e);
                }
            };
            let elapsed_ms = step_start.elapsed().as_millis() as u64;

            steps.push(StepReport {
                id: step.id.clone(),
                kind: step.node.clone(),
                elapsed_ms,
                outputs: out.to_json(),
            });
            outputs.insert(step.id.as_str(), out);
        }

        let total_elapsed_ms = start.elapsed().as_millis() as u64;
        info!(run_id = %run_id, pipeline = %pipeline.name, total_elapsed_ms, "Pipeline complete");

        Ok(RunReport {
            pipeline: pipeline.name.clone(),
            run_id,
            steps,
            total_elapsed_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use serde_json::json;
    use sheetflow_core::handle::WorksheetHandle;
    use sheetflow_core::AppConfig;
    use sheetflow_nodes::registry::NodeEnv;
    use sheetflow_test_utils::{mock_client, MockConnector};

    fn executor() -> PipelineExecutor {
        PipelineExecutor::new(NodeRegistry::with_builtins(NodeEnv::new(
            Arc::new(MockConnector::default()),
            AppConfig::default(),
        )))
    }

    #[tokio::test]
    async fn test_run_with_context_client() {
        let def = PipelineDef::from_toml(
            r#"
name = "budget"
[[steps]]
id = "open"
node = "open_spreadsheet"
params = { title = "Budget" }
[[steps]]
id = "append"
node = "append_row"
params = { values = ["Jan", 100] }
[[steps]]
id = "read"
node = "read_row"
params = { index = 1 }
"#,
        )
        .unwrap();

        let (client, _) = mock_client("a@b.c");
        let mut ctx = ExecutionContext::new();
        ctx.set(client);

        let report = executor().run(&def, &mut ctx).await.unwrap();
        assert_eq!(report.steps.len(), 3);
        assert_eq!(report.run_id, ctx.run_id().to_string());
        assert_eq!(report.step("read").unwrap().outputs["values"], json!(["Jan", 100]));
        assert_eq!(report.step("open").unwrap().outputs["worksheet"], json!("worksheet 'Sheet1'"));
    }

    #[tokio::test]
    async fn test_explicit_wiring_beats_later_publish() {
        let def = PipelineDef::from_toml(
            r#"
name = "wiring"
[[steps]]
id = "open"
node = "open_spreadsheet"
params = { title = "Budget" }
[[steps]]
id = "q1"
node = "create_worksheet"
params = { title = "Q1", rows = 10, cols = 10 }
[[steps]]
id = "append"
node = "append_row"
params = { values = ["to sheet1"] }
wire = { worksheet = "open.worksheet" }
"#,
        )
        .unwrap();

        let (client, _) = mock_client("a@b.c");
        let mut ctx = ExecutionContext::new();
        ctx.set(client);
        executor().run(&def, &mut ctx).await.unwrap();

        let q1 = ctx.get::<WorksheetHandle>().unwrap();
        assert_eq!(q1.title(), "Q1");
        assert!(q1.get_all_values().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_failure_aborts() {
        let def = PipelineDef::from_toml(
            r#"
name = "abort"
[[steps]]
id = "clear"
node = "clear_worksheet"
[[steps]]
id = "open"
node = "open_spreadsheet"
params = { title = "Budget" }
"#,
        )
        .unwrap();

        let (client, calls) = mock_client("a@b.c");
        let mut ctx = ExecutionContext::new();
        ctx.set(client);

        let err = executor().run(&def, &mut ctx).await.unwrap_err();
        assert!(matches!(err, SheetflowError::MissingDependency { ref node, .. } if node == "clear"));
        assert_eq!(calls.count(), 0);
    }

    #[tokio::test]
    async fn test_invalid_pipeline_runs_nothing() {
        let def = PipelineDef::from_toml(
            r#"
name = "invalid"
[[steps]]
id = "open"
node = "open_spreadsheet"
params = { title = "Budget" }
[[steps]]
id = "broken"
node = "read_row"
"#,
        )
        .unwrap();

        let (client, calls) = mock_client("a@b.c");
        let mut ctx = ExecutionContext::new();
        ctx.set(client);

        assert!(executor().run(&def, &mut ctx).await.is_err());
        assert_eq!(calls.count(), 0);
        assert_eq!(ctx.keys().len(), 1);
    }
}
