use std::collections::BTreeMap;

use tracing::debug;
use uuid::Uuid;

use crate::handle::{ContextHandle, ContextKey, Handle};

/// Run-scoped store for implicit dependency passing between nodes.
///
/// Nodes publish handles here so later nodes that were not explicitly wired
/// can still find them. Keys are never removed during a run; `set` always
/// overwrites and the last writer wins.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    run_id: Uuid,
    data: BTreeMap<ContextKey, Handle>,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            data: BTreeMap::new(),
        }
    }

    /// Identifier correlating all log events of one run.
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Get the handle stored under a key.
    pub fn get_raw(&self, key: ContextKey) -> Option<&Handle> {
        self.data.get(&key)
    }

    /// Get a typed handle.
    pub fn get<T: ContextHandle>(&self) -> Option<&T> {
        self.data.get(&T::KEY).and_then(T::from_handle)
    }

    /// Store a handle under its role's key, replacing any previous value.
    pub fn set(&mut self, handle: impl Into<Handle>) {
        let handle = handle.into();
        let key = handle.key();
        debug!(run_id = %self.run_id, key = %key, value = %handle.label(), "Context publish");
        if let Some(previous) = self.data.insert(key, handle) {
            debug!(run_id = %self.run_id, key = %key, previous = %previous.label(), "Context value overwritten");
        }
    }

    pub fn contains(&self, key: ContextKey) -> bool {
        self.data.contains_key(&key)
    }

    /// Keys currently present, in vocabulary order.
    pub fn keys(&self) -> Vec<ContextKey> {
        self.data.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
