//! Input slots and the explicit-over-context resolution policy.
//!
//! An optional handle input either carries a value bound when the node was
//! built (explicit wiring) or is left empty and resolved from the execution
//! context at execution time through [`SLOT_CONTEXT_KEYS`].

use serde::Serialize;
use tracing::debug;

use crate::context::ExecutionContext;
use crate::error::{Result, SheetflowError};
use crate::handle::{ContextHandle, ContextKey};

/// Slot name → context key. Every context-resolved slot must appear here.
///
/// `gc` and `sh` are the names older pipeline definitions use.
pub const SLOT_CONTEXT_KEYS: &[(&str, ContextKey)] = &[
    ("client", ContextKey::Client),
    ("gc", ContextKey::Client),
    ("spreadsheet", ContextKey::Spreadsheet),
    ("sh", ContextKey::Spreadsheet),
    ("worksheet", ContextKey::Worksheet),
];

/// Look up the context key an input slot falls back to.
pub fn context_key_for(slot: &str) -> Option<ContextKey> {
    SLOT_CONTEXT_KEYS
        .iter()
        .find(|(name, _)| *name == slot)
        .map(|(_, key)| *key)
}

/// How an input slot gets its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    /// Must be supplied when the node is built.
    Mandatory,
    /// Explicit handle, or resolved from the context at execution time.
    Context,
    /// Optional parameter with a fixed default; never read from the context.
    Parameter,
}

/// Declared input slot.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct InputSpec {
    pub name: &'static str,
    pub kind: InputKind,
    pub description: &'static str,
}

impl InputSpec {
    pub const fn mandatory(name: &'static str, description: &'static str) -> Self {
        Self { name, kind: InputKind::Mandatory, description }
    }

    pub const fn context(name: &'static str, description: &'static str) -> Self {
        Self { name, kind: InputKind::Context, description }
    }

    pub const fn parameter(name: &'static str, description: &'static str) -> Self {
        Self { name, kind: InputKind::Parameter, description }
    }
}

/// Declared output slot. `publishes` names the context key it is written to.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct OutputSpec {
    pub name: &'static str,
    pub publishes: Option<ContextKey>,
    pub description: &'static str,
}

impl OutputSpec {
    pub const fn data(name: &'static str, description: &'static str) -> Self {
        Self { name, publishes: None, description }
    }

    pub const fn published(name: &'static str, key: ContextKey, description: &'static str) -> Self {
        Self { name, publishes: Some(key), description }
    }
}

/// An optional handle input of type `T`.
#[derive(Debug, Clone)]
pub struct InputSlot<T> {
    slot: &'static str,
    explicit: Option<T>,
}

impl<T: ContextHandle> InputSlot<T> {
    /// Unbound: resolves from the context.
    pub fn context(slot: &'static str) -> Self {
        Self { slot, explicit: None }
    }

    /// Bound to an explicit value that overrides the context.
    pub fn explicit(slot: &'static str, value: T) -> Self {
        Self { slot, explicit: Some(value) }
    }

    pub fn bind(&mut self, value: T) {
        self.explicit = Some(value);
    }

    pub fn slot(&self) -> &'static str {
        self.slot
    }

    pub fn is_bound(&self) -> bool {
        self.explicit.is_some()
    }

    /// Explicit value first, then the context, otherwise `MissingDependency`.
    ///
    /// Never writes to the context.
    pub fn resolve(&self, ctx: &ExecutionContext, node: &str) -> Result<T> {
        if let Some(ref value) = self.explicit {
            debug!(node, slot = self.slot, source = "explicit", "Input resolved");
            return Ok(value.clone());
        }

        let found = context_key_for(self.slot)
            .filter(|key| *key == T::KEY)
            .and_then(|key| ctx.get_raw(key))
            .and_then(T::from_handle);

        match found {
            Some(value) => {
                debug!(node, slot = self.slot, source = "context", "Input resolved");
                Ok(value.clone())
            }
            None => Err(SheetflowError::MissingDependency {
                node: node.to_string(),
                slot: self.slot.to_string(),
            }),
        }
    }
}
