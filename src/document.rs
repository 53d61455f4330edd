use crate::id::Identifier;
use crate::types::DataType;
use serde::{Deserialize, Serialize};

/// The persisted shape of a connector: only what's needed to reconstruct
/// its position and type, not the live link set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorRecord {
    pub id: Identifier,
    pub data_type: DataType,
}

/// The persisted shape of a node: its registry type id plus the connector
/// records needed to reconnect it. No business-node state is part of this
/// shape — concrete node kinds and their configuration are out of scope
/// for this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeRecord {
    pub id: Identifier,
    pub type_tag: String,
    pub inputs: Vec<ConnectorRecord>,
    pub outputs: Vec<ConnectorRecord>,
}

/// The persisted shape of a connection: the two connector ids it joins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionRecord {
    pub id: Identifier,
    pub source: Identifier,
    pub target: Identifier,
}

fn graph_kind() -> String {
    "Graph".to_string()
}

/// The full logical shape of a graph, independent of any in-memory
/// representation. Node bodies aren't part of this shape; `type_tag` plus
/// the node registry closes that gap, so a document round-trips through
/// `Graph::to_document` / `Graph::from_document` without any external
/// state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowDocument {
    #[serde(default = "graph_kind")]
    pub kind: String,
    pub nodes: Vec<NodeRecord>,
    pub connections: Vec<ConnectionRecord>,
}
