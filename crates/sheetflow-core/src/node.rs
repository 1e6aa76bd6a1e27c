use std::collections::BTreeMap;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info};

use crate::context::ExecutionContext;
use crate::error::{Result, SheetflowError};
use crate::handle::Handle;
use crate::slot::{context_key_for, InputKind, InputSpec, OutputSpec};
use crate::traits::Node;

/// Static description of a node kind.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct NodeDescriptor {
    pub kind: &'static str,
    pub description: &'static str,
    pub inputs: &'static [InputSpec],
    pub outputs: &'static [OutputSpec],
}

impl NodeDescriptor {
    pub fn input(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn output(&self, name: &str) -> Option<&OutputSpec> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Inputs that fall back to the context when not wired.
    pub fn context_inputs(&self) -> impl Iterator<Item = &InputSpec> {
        self.inputs.iter().filter(|i| i.kind == InputKind::Context)
    }

    /// The context input a wiring name refers to, accepting slot aliases.
    pub fn wired_input(&self, name: &str) -> Option<&InputSpec> {
        let key = context_key_for(name)?;
        self.context_inputs()
            .find(|i| i.name == name)
            .or_else(|| self.context_inputs().find(|i| context_key_for(i.name) == Some(key)))
    }
}

/// A value produced on an output slot.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputValue {
    Handle(Handle),
    Data(serde_json::Value),
}

/// Outputs of one node execution, keyed by output slot name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeOutputs {
    values: BTreeMap<String, OutputValue>,
}

impl NodeOutputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handle(mut self, slot: impl Into<String>, handle: impl Into<Handle>) -> Self {
        self.values.insert(slot.into(), OutputValue::Handle(handle.into()));
        self
    }

    pub fn with_data(mut self, slot: impl Into<String>, value: serde_json::Value) -> Self {
        self.values.insert(slot.into(), OutputValue::Data(value));
        self
    }

    pub fn get(&self, slot: &str) -> Option<&OutputValue> {
        self.values.get(slot)
    }

    pub fn handle(&self, slot: &str) -> Option<&Handle> {
        match self.values.get(slot) {
            Some(OutputValue::Handle(h)) => Some(h),
            _ => None,
        }
    }

    pub fn data(&self, slot: &str) -> Option<&serde_json::Value> {
        match self.values.get(slot) {
            Some(OutputValue::Data(v)) => Some(v),
            _ => None,
        }
    }

    /// Data outputs as a JSON object; handles are rendered as labels.
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .values
            .iter()
            .map(|(k, v)| {
                let value = match v {
                    OutputValue::Data(d) => d.clone(),
                    OutputValue::Handle(h) => serde_json::Value::String(h.label()),
                };
                (k.clone(), value)
            })
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Execute a node and publish its context-publishing outputs.
///
/// Publishing happens only after the node succeeds, and always overwrites.
pub async fn run_node(node: &dyn Node, ctx: &mut ExecutionContext) -> Result<NodeOutputs> {
    let descriptor = node.descriptor();
    info!(run_id = %ctx.run_id(), node = node.name(), kind = descriptor.kind, "Executing node");

    let start = Instant::now();
    let outputs = match node.execute(ctx).await {
        Ok(outputs) => outputs,
        Err(e) => {
            error!(node = node.name(), kind = descriptor.kind, error = %e, "Node failed");
            return Err(e);
        }
    };

    // Check every publishing output before touching the context.
    let mut publish = Vec::new();
    for spec in descriptor.outputs {
        let Some(key) = spec.publishes else { continue };
        let handle = match outputs.handle(spec.name) {
            Some(handle) if handle.key() == key => handle,
            Some(handle) => {
                return Err(contract_error(
                    node,
                    spec.name,
                    format!("expected a {} handle, got {}", key, handle.key()),
                ))
            }
            None => return Err(contract_error(node, spec.name, "publishing output missing")),
        };
        publish.push(handle.clone());
    }
    for handle in publish {
        ctx.set(handle);
    }

    debug!(
        node = node.name(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "Node complete"
    );
    Ok(outputs)
}

fn contract_error(node: &dyn Node, slot: &str, message: impl Into<String>) -> SheetflowError {
    let err = SheetflowError::OutputContract {
        node: node.name().to_string(),
        slot: slot.to_string(),
        message: message.into(),
    };
    error!(node = node.name(), kind = node.descriptor().kind, error = %err, "Node output rejected");
    err
}
