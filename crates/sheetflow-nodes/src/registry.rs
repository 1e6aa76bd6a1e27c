use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::debug;

use sheetflow_core::config::AppConfig;
use sheetflow_core::error::{Result, SheetflowError};
use sheetflow_core::handle::{ContextHandle, Handle};
use sheetflow_core::node::NodeDescriptor;
use sheetflow_core::slot::InputSlot;
use sheetflow_core::traits::{Node, SheetsConnector};

/// What node factories may depend on besides their own arguments.
#[derive(Clone)]
pub struct NodeEnv {
    pub connector: Arc<dyn SheetsConnector>,
    pub config: AppConfig,
}

impl NodeEnv {
    pub fn new(connector: Arc<dyn SheetsConnector>, config: AppConfig) -> Self {
        Self { connector, config }
    }
}

/// Everything needed to build one node instance.
#[derive(Debug, Clone, Default)]
pub struct NodeArgs {
    /// Instance name for logs and errors; the kind when empty.
    pub name: String,
    /// Literal parameters, a JSON object (or null for none).
    pub params: serde_json::Value,
    /// Explicit handles keyed by input slot.
    pub wiring: HashMap<String, Handle>,
}

impl NodeArgs {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: serde_json::Value) -> Self {
        self.params = params;
        self
    }

    pub fn wire(mut self, slot: impl Into<String>, handle: impl Into<Handle>) -> Self {
        self.wiring.insert(slot.into(), handle.into());
        self
    }

    /// Deserialize the parameters; failures are construction errors.
    pub fn params<P: DeserializeOwned>(&self) -> Result<P> {
        let value = match &self.params {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other.clone(),
        };
        serde_json::from_value(value).map_err(|e| SheetflowError::invalid_node(&self.name, e.to_string()))
    }

    /// The input slot for `slot`, bound when wiring supplies a handle.
    pub fn slot<T: ContextHandle>(&self, slot: &'static str) -> Result<InputSlot<T>> {
        match self.wiring.get(slot) {
            None => Ok(InputSlot::context(slot)),
            Some(handle) => T::from_handle(handle)
                .map(|h| InputSlot::explicit(slot, h.clone()))
                .ok_or_else(|| {
                    SheetflowError::invalid_node(
                        &self.name,
                        format!("slot '{}' expects a {}, got {}", slot, T::KEY, handle.label()),
                    )
                }),
        }
    }
}

type Factory = fn(&NodeEnv, NodeArgs) -> Result<Box<dyn Node>>;

/// Registry of buildable node kinds.
pub struct NodeRegistry {
    env: NodeEnv,
    kinds: HashMap<&'static str, (&'static NodeDescriptor, Factory)>,
}

impl NodeRegistry {
    pub fn new(env: NodeEnv) -> Self {
        Self {
            env,
            kinds: HashMap::new(),
        }
    }

    /// Register a node kind.
    pub fn register(&mut self, descriptor: &'static NodeDescriptor, factory: Factory) {
        self.kinds.insert(descriptor.kind, (descriptor, factory));
    }

    pub fn env(&self) -> &NodeEnv {
        &self.env
    }

    pub fn descriptor(&self, kind: &str) -> Option<&'static NodeDescriptor> {
        self.kinds.get(kind).map(|(d, _)| *d)
    }

    /// Registered kinds, sorted.
    pub fn list(&self) -> Vec<&'static str> {
        let mut kinds: Vec<_> = self.kinds.keys().copied().collect();
        kinds.sort_unstable();
        kinds
    }

    /// All descriptors, sorted by kind.
    pub fn descriptors(&self) -> Vec<&'static NodeDescriptor> {
        let mut all: Vec<_> = self.kinds.values().map(|(d, _)| *d).collect();
        all.sort_by_key(|d| d.kind);
        all
    }

    /// Build a node instance.
    ///
    /// Wiring names are checked against the kind's context inputs (aliases
    /// accepted) before the factory runs. Every construction failure is
    /// reported as `InvalidNode`.
    pub fn build(&self, kind: &str, mut args: NodeArgs) -> Result<Box<dyn Node>> {
        let (descriptor, factory) = self
            .kinds
            .get(kind)
            .ok_or_else(|| SheetflowError::UnknownNode(kind.to_string()))?;

        if args.name.is_empty() {
            args.name = kind.to_string();
        }

        let mut wiring = HashMap::with_capacity(args.wiring.len());
        for (slot, handle) in std::mem::take(&mut args.wiring) {
            let input = descriptor.wired_input(&slot).ok_or_else(|| {
                SheetflowError::invalid_node(
                    &args.name,
                    format!("'{}' is not a wireable input of {}", slot, kind),
                )
            })?;
            wiring.insert(input.name.to_string(), handle);
        }
        args.wiring = wiring;

        debug!(kind, name = %args.name, wired = args.wiring.len(), "Building node");
        let name = args.name.clone();
        factory(&self.env, args).map_err(|e| match e {
            SheetflowError::InvalidNode { .. } => e,
            other => SheetflowError::invalid_node(name, other.to_string()),
        })
    }

    /// Create a registry with every built-in node kind registered.
    pub fn with_builtins(env: NodeEnv) -> Self {
        use crate::builtin::{auth, cells, rows, search, spreadsheet, worksheet};

        let mut registry = Self::new(env);

        // ── Handles ─────────────────────────────────────────────
        registry.register(&auth::AUTHENTICATE, auth::AuthenticateNode::build);
        registry.register(&spreadsheet::OPEN_SPREADSHEET, spreadsheet::OpenSpreadsheetNode::build);
        registry.register(
            &spreadsheet::OPEN_SPREADSHEET_BY_URL,
            spreadsheet::OpenSpreadsheetByUrlNode::build,
        );
        registry.register(
            &spreadsheet::CREATE_SPREADSHEET,
            spreadsheet::CreateSpreadsheetNode::build,
        );
        registry.register(&worksheet::OPEN_WORKSHEET, worksheet::OpenWorksheetNode::build);
        registry.register(&worksheet::CREATE_WORKSHEET, worksheet::CreateWorksheetNode::build);
        registry.register(&worksheet::DELETE_WORKSHEET, worksheet::DeleteWorksheetNode::build);
        registry.register(&worksheet::CLEAR_WORKSHEET, worksheet::ClearWorksheetNode::build);

        // ── Cells ───────────────────────────────────────────────
        registry.register(&cells::READ_CELL, cells::ReadCellNode::build);
        registry.register(&cells::UPDATE_CELL, cells::UpdateCellNode::build);
        registry.register(&cells::UPDATE_RANGE, cells::UpdateRangeNode::build);
        registry.register(&cells::GET_ALL_VALUES, cells::GetAllValuesNode::build);
        registry.register(&cells::GET_ALL_RECORDS, cells::GetAllRecordsNode::build);

        // ── Rows/columns ────────────────────────────────────────
        registry.register(&rows::APPEND_ROW, rows::AppendRowNode::build);
        registry.register(&rows::INSERT_ROW, rows::InsertRowNode::build);
        registry.register(&rows::READ_ROW, rows::ReadRowNode::build);
        registry.register(&rows::READ_COLUMN, rows::ReadColumnNode::build);

        // ── Search ──────────────────────────────────────────────
        registry.register(&search::FIND_STRING_MATCHES, search::FindStringMatchesNode::build);
        registry.register(&search::FIND_REGEX_MATCHES, search::FindRegexMatchesNode::build);

        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use sheetflow_core::handle::WorksheetHandle;
    use sheetflow_test_utils::{mock_client, mock_worksheet, MockConnector};

    fn registry() -> NodeRegistry {
        NodeRegistry::with_builtins(NodeEnv::new(Arc::new(MockConnector::default()), AppConfig::default()))
    }

    fn build_err(kind: &str, args: NodeArgs) -> SheetflowError {
        match registry().build(kind, args) {
            Ok(_) => panic!("building {kind} should fail"),
            Err(e) => e,
        }
    }

    #[test]
    fn test_builtins_registered() {
        let kinds = registry().list();
        for kind in [
            "authenticate",
            "open_spreadsheet",
            "open_spreadsheet_by_url",
            "create_spreadsheet",
            "open_worksheet",
            "create_worksheet",
            "delete_worksheet",
            "clear_worksheet",
            "read_cell",
            "update_cell",
            "update_range",
            "get_all_values",
            "get_all_records",
            "append_row",
            "insert_row",
            "read_row",
            "read_column",
            "find_all_string_matches",
            "find_all_regex_matches",
        ] {
            assert!(kinds.contains(&kind), "missing {kind}");
        }
        assert_eq!(kinds.len(), 19);
    }

    #[test]
    fn test_descriptors_sorted() {
        let descriptors = registry().descriptors();
        let kinds: Vec<_> = descriptors.iter().map(|d| d.kind).collect();
        let mut sorted = kinds.clone();
        sorted.sort_unstable();
        assert_eq!(kinds, sorted);
    }

    #[test]
    fn test_unknown_kind() {
        let err = build_err("explode", NodeArgs::default());
        assert!(matches!(err, SheetflowError::UnknownNode(k) if k == "explode"));
    }

    #[test]
    fn test_missing_mandatory_param_is_invalid_node() {
        let err = build_err("open_spreadsheet", NodeArgs::new("open"));
        match err {
            SheetflowError::InvalidNode { node, message } => {
                assert_eq!(node, "open");
                assert!(message.contains("title"), "{message}");
            }
            other => panic!("expected InvalidNode, got {other:?}"),
        }
    }

    #[test]
    fn test_bad_address_is_invalid_node() {
        let err = build_err("read_cell", NodeArgs::new("r").with_params(json!({ "address": "7B" })));
        assert!(matches!(err, SheetflowError::InvalidNode { .. }));
    }

    #[test]
    fn test_wiring_role_mismatch() {
        let (client, _) = mock_client("a@b.c");
        let err = build_err(
            "append_row",
            NodeArgs::new("append")
                .with_params(json!({ "values": ["x"] }))
                .wire("worksheet", client),
        );
        assert!(matches!(err, SheetflowError::InvalidNode { .. }));
    }

    #[test]
    fn test_wiring_unknown_slot() {
        let (ws, _) = mock_worksheet("Sheet1");
        let err = build_err(
            "open_spreadsheet",
            NodeArgs::new("open")
                .with_params(json!({ "title": "Budget" }))
                .wire("worksheet", ws),
        );
        assert!(matches!(err, SheetflowError::InvalidNode { .. }));
    }

    #[test]
    fn test_alias_wiring_accepted() {
        let (client, _) = mock_client("a@b.c");
        let node = registry()
            .build(
                "open_spreadsheet",
                NodeArgs::new("open")
                    .with_params(json!({ "title": "Budget" }))
                    .wire("gc", client),
            )
            .unwrap();
        assert_eq!(node.name(), "open");
    }

    #[test]
    fn test_name_defaults_to_kind() {
        let node = registry().build("get_all_values", NodeArgs::default()).unwrap();
        assert_eq!(node.name(), "get_all_values");
    }

    #[test]
    fn test_slot_binding() {
        let (ws, _) = mock_worksheet("Q1");
        let args = NodeArgs::new("n").wire("worksheet", ws);
        let bound: InputSlot<WorksheetHandle> = args.slot("worksheet").unwrap();
        assert!(bound.is_bound());
        let unbound: InputSlot<WorksheetHandle> = NodeArgs::new("n").slot("worksheet").unwrap();
        assert!(!unbound.is_bound());
    }
}
