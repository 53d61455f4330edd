use crate::error::GraphError;
use crate::id::Identifier;
use crate::node::Node;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// A node factory: given a node id and the ids to use for its input and
/// output connectors (positionally; an empty slice, or one shorter than
/// the node's actual connector count, means "mint a fresh id for the rest"),
/// produces a node instance wired up accordingly. Ordinary creation mints
/// a fresh id for everything; `Graph::from_document` passes the recorded
/// ids so a reloaded node keeps its original identity.
pub type NodeFactory =
    Arc<dyn Fn(Identifier, &[Identifier], &[Identifier]) -> Box<dyn Node> + Send + Sync>;

/// Metadata about a registered node kind, returned by `available_types`.
#[derive(Debug, Clone)]
pub struct NodeTypeInfo {
    pub type_id: String,
    pub display_name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
}

/// Maps string type ids (and optional case-insensitive display names) to
/// node factories.
///
/// Callers register factories explicitly; this crate never discovers node
/// kinds by reflection or attribute scanning, since concrete business
/// nodes are out of scope here and only the registration contract matters.
#[derive(Default)]
pub struct NodeRegistry {
    factories: HashMap<String, NodeFactory>,
    display_names: HashMap<String, String>,
    info: HashMap<String, NodeTypeInfo>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, type_id: impl Into<String>, factory: NodeFactory) {
        let type_id = type_id.into();
        if self.factories.contains_key(&type_id) {
            warn!(type_id = %type_id, "ignoring duplicate node factory registration");
            return;
        }
        self.info.insert(
            type_id.clone(),
            NodeTypeInfo {
                type_id: type_id.clone(),
                display_name: None,
                category: None,
                description: None,
            },
        );
        self.factories.insert(type_id, factory);
    }

    /// Attach a human-facing name to an already-registered type id.
    /// Case-insensitive; registering the same display name twice for
    /// different type ids overwrites the mapping (last write wins).
    pub fn register_display_name(&mut self, type_id: &str, display_name: impl Into<String>) {
        let display_name = display_name.into();
        let key = display_name.to_lowercase();
        if let Some(existing) = self.display_names.get(&key) {
            if existing != type_id {
                warn!(
                    display_name = %display_name,
                    previous_type_id = %existing,
                    new_type_id = %type_id,
                    "overwriting display name mapping",
                );
            }
        }
        if let Some(info) = self.info.get_mut(type_id) {
            info.display_name = Some(display_name.clone());
        }
        self.display_names.insert(key, type_id.to_string());
    }

    pub fn set_category(&mut self, type_id: &str, category: impl Into<String>) {
        if let Some(info) = self.info.get_mut(type_id) {
            info.category = Some(category.into());
        }
    }

    pub fn set_description(&mut self, type_id: &str, description: impl Into<String>) {
        if let Some(info) = self.info.get_mut(type_id) {
            info.description = Some(description.into());
        }
    }

    pub fn create_by_type(&self, type_id: &str) -> Result<Box<dyn Node>, GraphError> {
        self.create_with_ids(type_id, Identifier::new(), &[], &[])
    }

    pub fn create_by_display_name(&self, display_name: &str) -> Result<Box<dyn Node>, GraphError> {
        let type_id = self
            .display_names
            .get(&display_name.to_lowercase())
            .ok_or_else(|| GraphError::NotFound(display_name.to_string()))?;
        self.create_by_type(type_id)
    }

    /// Construct a node at specific ids — node id plus per-connector input
    /// and output ids — so a caller reconstructing from a persisted
    /// document can restore the original identity rather than minting
    /// fresh ids.
    pub(crate) fn create_with_ids(
        &self,
        type_id: &str,
        node_id: Identifier,
        input_ids: &[Identifier],
        output_ids: &[Identifier],
    ) -> Result<Box<dyn Node>, GraphError> {
        self.factories
            .get(type_id)
            .map(|factory| factory(node_id, input_ids, output_ids))
            .ok_or_else(|| GraphError::NotFound(type_id.to_string()))
    }

    pub fn available_types(&self) -> Vec<&NodeTypeInfo> {
        self.info.values().collect()
    }
}
