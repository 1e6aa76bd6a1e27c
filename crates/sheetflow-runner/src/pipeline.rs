use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use sheetflow_core::config::expand_env_vars;
use sheetflow_core::error::{Result, SheetflowError};
use sheetflow_nodes::registry::{NodeArgs, NodeRegistry};

/// A pipeline definition as written in TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineDef {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub steps: Vec<StepDef>,
}

/// One step: a node kind, its parameters and its explicit wiring.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepDef {
    pub id: String,
    pub node: String,
    #[serde(default)]
    pub params: serde_json::Value,
    /// Input slot → `step.output` of an earlier step.
    #[serde(default)]
    pub wire: BTreeMap<String, String>,
}

/// A parsed `step.output` wiring source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireRef {
    pub step: String,
    pub output: String,
}

impl WireRef {
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once('.') {
            Some((step, output)) if !step.is_empty() && !output.is_empty() => Ok(Self {
                step: step.to_string(),
                output: output.to_string(),
            }),
            _ => Err(SheetflowError::Pipeline(format!(
                "wire source '{}' must look like step.output",
                s
            ))),
        }
    }
}

impl fmt::Display for WireRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.step, self.output)
    }
}

impl StepDef {
    /// Parsed wiring, keyed by the target input slot.
    pub fn wires(&self) -> Result<Vec<(String, WireRef)>> {
        self.wire
            .iter()
            .map(|(slot, source)| Ok((slot.clone(), WireRef::parse(source)?)))
            .collect()
    }

    /// Node arguments without wiring.
    pub fn args(&self) -> NodeArgs {
        NodeArgs::new(self.id.clone()).with_params(self.params.clone())
    }
}

impl PipelineDef {
    /// Load a pipeline from a TOML file, with env var expansion.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SheetflowError::Pipeline(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&content)
    }

    /// Parse a pipeline from TOML text, expanding `${ENV_VAR}` references.
    pub fn from_toml(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content);
        toml::from_str(&expanded).map_err(|e| SheetflowError::Pipeline(e.to_string()))
    }

    pub fn step(&self, id: &str) -> Option<&StepDef> {
        self.steps.iter().find(|s| s.id == id)
    }

    /// Check the whole pipeline before anything runs.
    ///
    /// Every step is built once without wiring, so missing mandatory
    /// parameters surface here rather than halfway through a run.
    pub fn validate(&self, registry: &NodeRegistry) -> Result<()> {
        if self.steps.is_empty() {
            return Err(SheetflowError::Pipeline(format!(
                "pipeline '{}' has no steps",
                self.name
            )));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for step in &self.steps {
            if step.id.trim().is_empty() {
                return Err(SheetflowError::Pipeline(format!(
                    "a '{}' step has an empty id",
                    step.node
                )));
            }
            if step.id.contains('.') {
                return Err(SheetflowError::Pipeline(format!(
                    "step id '{}' must not contain '.'",
                    step.id
                )));
            }

            let descriptor = registry
                .descriptor(&step.node)
                .ok_or_else(|| SheetflowError::UnknownNode(step.node.clone()))?;

            for (slot, source) in step.wires()? {
                let input = descriptor.wired_input(&slot).ok_or_else(|| {
                    SheetflowError::Pipeline(format!(
                        "step '{}': '{}' is not a wireable input of {}",
                        step.id, slot, step.node
                    ))
                })?;

                if !seen.contains(source.step.as_str()) {
                    return Err(SheetflowError::Pipeline(format!(
                        "step '{}': wire {} = {} does not refer to an earlier step",
                        step.id, slot, source
                    )));
                }
                let upstream = self
                    .step(&source.step)
                    .and_then(|s| registry.descriptor(&s.node))
                    .ok_or_else(|| {
                        SheetflowError::Pipeline(format!("unknown step '{}'", source.step))
                    })?;
                let output = upstream.output(&source.output).ok_or_else(|| {
                    SheetflowError::Pipeline(format!(
                        "step '{}': {} has no output '{}'",
                        step.id, upstream.kind, source.output
                    ))
                })?;
                let expected = sheetflow_core::slot::context_key_for(input.name);
                if output.publishes.is_none() || output.publishes != expected {
                    return Err(SheetflowError::Pipeline(format!(
                        "step '{}': {} does not produce a handle for '{}'",
                        step.id, source, input.name
                    )));
                }
            }

            registry.build(&step.node, step.args())?;

            if !seen.insert(step.id.as_str()) {
                return Err(SheetflowError::Pipeline(format!(
                    "duplicate step id '{}'",
                    step.id
                )));
            }
        }
        Ok(())
    }
}
