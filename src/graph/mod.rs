mod cycle;

use crate::connection::Connection;
use crate::connector::{Connector, ConnectorLink};
use crate::document::{ConnectionRecord, ConnectorRecord, NodeRecord, WorkflowDocument};
use crate::error::GraphError;
use crate::id::Identifier;
use crate::node::Node;
use crate::registry::NodeRegistry;
use crate::types::Direction;
use indexmap::IndexMap;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Uniform outcome wrapper for every `Graph` mutation: carries either the
/// produced value or a human-readable cause, never both. The
/// `try_*` family returns this; the plain-named convenience wrappers strip
/// the message and hand back `bool`/`Option<T>` for callers that only care
/// whether the operation succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult<T> {
    value: Option<T>,
    error: Option<String>,
}

impl<T> OperationResult<T> {
    pub fn ok(value: T) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Self {
            value: None,
            error: Some(error.into()),
        }
    }

    pub(crate) fn from_graph_error(error: GraphError) -> Self {
        Self::err(error.to_string())
    }

    pub fn is_ok(&self) -> bool {
        self.value.is_some()
    }

    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// A directed graph of nodes, connectors, and connections.
///
/// Mutation methods take `&mut self`: in Rust the borrow checker's exclusive
/// access *is* the single modification lock — a caller sharing a `Graph`
/// across tasks wraps it in `Arc<Mutex<Graph>>` (or `tokio::sync::RwLock`)
/// themselves, rather than the graph locking itself internally.
#[derive(Debug, Default)]
pub struct Graph {
    nodes: IndexMap<Identifier, Box<dyn Node>>,
    connections: IndexMap<Identifier, Connection>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn get_node_by_id(&self, id: Identifier) -> Option<&dyn Node> {
        self.nodes.get(&id).map(|n| n.as_ref())
    }

    pub fn node_ids(&self) -> impl Iterator<Item = Identifier> + '_ {
        self.nodes.keys().copied()
    }

    pub fn connections(&self) -> impl Iterator<Item = &Connection> {
        self.connections.values()
    }

    pub fn get_connection_by_id(&self, id: Identifier) -> Option<&Connection> {
        self.connections.get(&id)
    }

    /// Register a new node. Fails if its id collides with an existing one,
    /// or if any of its connectors' parent-node back-reference doesn't
    /// actually point at this node.
    pub fn try_add_node(&mut self, node: Box<dyn Node>) -> OperationResult<Identifier> {
        let id = node.id();
        if self.nodes.contains_key(&id) {
            return OperationResult::from_graph_error(GraphError::NullArgument);
        }
        let mismatched = node
            .inputs()
            .iter()
            .chain(node.outputs())
            .any(|c| c.parent_node() != id);
        if mismatched {
            return OperationResult::from_graph_error(GraphError::NullArgument);
        }
        debug!(node = %id, "adding node to graph");
        self.nodes.insert(id, node);
        OperationResult::ok(id)
    }

    pub fn add_node(&mut self, node: Box<dyn Node>) -> Option<Identifier> {
        self.try_add_node(node).into_value()
    }

    /// Remove a node, cascading removal to every connection touching one of
    /// its connectors.
    pub fn try_remove_node(&mut self, id: Identifier) -> OperationResult<()> {
        let Some(node) = self.nodes.get(&id) else {
            return OperationResult::from_graph_error(GraphError::NotFound(id.to_string()));
        };
        let connector_ids: Vec<Identifier> = node
            .inputs()
            .iter()
            .chain(node.outputs())
            .map(|c| c.id())
            .collect();
        let affected: Vec<Identifier> = self
            .connections
            .values()
            .filter(|c| connector_ids.contains(&c.source()) || connector_ids.contains(&c.target()))
            .map(|c| c.id())
            .collect();
        for connection_id in affected {
            self.detach_connection(connection_id);
        }
        self.nodes.shift_remove(&id);
        debug!(node = %id, "removed node from graph");
        OperationResult::ok(())
    }

    pub fn remove_node(&mut self, id: Identifier) -> bool {
        self.try_remove_node(id).is_ok()
    }

    /// Connect a source connector to a target connector, validating
    /// direction, type compatibility, input capacity, and acyclicity before
    /// registering the connection with both connectors.
    pub fn try_add_connection(
        &mut self,
        source_connector: Identifier,
        target_connector: Identifier,
    ) -> OperationResult<Identifier> {
        let Some((source_node, source)) = self.locate_connector(source_connector) else {
            return OperationResult::from_graph_error(GraphError::NotFound(
                source_connector.to_string(),
            ));
        };
        let Some((target_node, target)) = self.locate_connector(target_connector) else {
            return OperationResult::from_graph_error(GraphError::NotFound(
                target_connector.to_string(),
            ));
        };
        let _ = (source_node, target_node);

        if source.direction() != Direction::Output || target.direction() != Direction::Input {
            return OperationResult::from_graph_error(GraphError::DirectionMismatch(format!(
                "source must be Output and target must be Input, got {:?} -> {:?}",
                source.direction(),
                target.direction()
            )));
        }
        let (output_side, input_side) = (source, target);

        if !input_side.data_type().assignable_from(output_side.data_type()) {
            return OperationResult::from_graph_error(GraphError::TypeIncompatible(format!(
                "{} is not assignable to {}",
                output_side.data_type(),
                input_side.data_type()
            )));
        }
        if input_side
            .links()
            .iter()
            .any(|link| link.peer != output_side.id())
        {
            return OperationResult::from_graph_error(GraphError::CapacityExceeded(
                input_side.id(),
            ));
        }

        if cycle::would_create_cycle(
            &self.adjacency(),
            output_side.parent_node(),
            input_side.parent_node(),
        ) {
            return OperationResult::from_graph_error(GraphError::WouldCreateCycle(format!(
                "{} -> {}",
                output_side.parent_node(),
                input_side.parent_node()
            )));
        }

        let connection_id = Identifier::new();
        let link_for_output = ConnectorLink {
            connection: connection_id,
            peer: input_side.id(),
        };
        let link_for_input = ConnectorLink {
            connection: connection_id,
            peer: output_side.id(),
        };

        let output_accepted = self
            .with_connector_mut(output_side.parent_node(), output_side.id(), |connector| {
                connector.add_link(link_for_output, &input_side)
            })
            .unwrap_or(false);
        if !output_accepted {
            return OperationResult::from_graph_error(GraphError::TypeIncompatible(
                "source connector rejected the connection".into(),
            ));
        }

        let input_accepted = self
            .with_connector_mut(input_side.parent_node(), input_side.id(), |connector| {
                connector.add_link(link_for_input, &output_side)
            })
            .unwrap_or(false);
        if !input_accepted {
            self.with_connector_mut(output_side.parent_node(), output_side.id(), |connector| {
                connector.remove_link(connection_id)
            });
            return OperationResult::from_graph_error(GraphError::CapacityExceeded(
                input_side.id(),
            ));
        }

        let connection = Connection::new(
            connection_id,
            output_side.id(),
            output_side.parent_node(),
            input_side.id(),
            input_side.parent_node(),
        );
        debug!(connection = %connection_id, "added connection to graph");
        self.connections.insert(connection_id, connection);
        OperationResult::ok(connection_id)
    }

    pub fn add_connection(
        &mut self,
        source_connector: Identifier,
        target_connector: Identifier,
    ) -> Option<Identifier> {
        self.try_add_connection(source_connector, target_connector)
            .into_value()
    }

    pub fn try_remove_connection(&mut self, connection_id: Identifier) -> OperationResult<()> {
        if !self.connections.contains_key(&connection_id) {
            return OperationResult::from_graph_error(GraphError::NotFound(
                connection_id.to_string(),
            ));
        }
        self.detach_connection(connection_id);
        OperationResult::ok(())
    }

    pub fn remove_connection(&mut self, connection_id: Identifier) -> bool {
        self.try_remove_connection(connection_id).is_ok()
    }

    /// Re-validate every structural invariant that isn't already enforced
    /// by construction: connection endpoints still exist and agree with
    /// their recorded parent node, and the graph as a whole is acyclic.
    pub fn try_validate(&self) -> OperationResult<()> {
        for connection in self.connections.values() {
            let Some((source_node, _)) = self.locate_connector(connection.source()) else {
                return OperationResult::from_graph_error(GraphError::NotFound(format!(
                    "connection {} has a dangling source",
                    connection.id()
                )));
            };
            if source_node != connection.source_node() {
                return OperationResult::from_graph_error(GraphError::ConcurrentModification(
                    format!("connection {} source node mismatch", connection.id()),
                ));
            }
            let Some((target_node, _)) = self.locate_connector(connection.target()) else {
                return OperationResult::from_graph_error(GraphError::NotFound(format!(
                    "connection {} has a dangling target",
                    connection.id()
                )));
            };
            if target_node != connection.target_node() {
                return OperationResult::from_graph_error(GraphError::ConcurrentModification(
                    format!("connection {} target node mismatch", connection.id()),
                ));
            }
        }

        let node_ids: Vec<Identifier> = self.nodes.keys().copied().collect();
        if let Some(path) = cycle::detect_cycle(&node_ids, &self.adjacency()) {
            let rendered = path
                .iter()
                .map(|id| id.short())
                .collect::<Vec<_>>()
                .join(" -> ");
            warn!(cycle = %rendered, "graph validation found a cycle");
            return OperationResult::from_graph_error(GraphError::WouldCreateCycle(rendered));
        }

        OperationResult::ok(())
    }

    pub fn validate(&self) -> bool {
        self.try_validate().is_ok()
    }

    /// Snapshot this graph into its persisted logical shape.
    pub fn to_document(&self) -> WorkflowDocument {
        let nodes = self
            .nodes
            .values()
            .map(|node| NodeRecord {
                id: node.id(),
                type_tag: node.type_id().to_string(),
                inputs: node.inputs().iter().map(connector_record).collect(),
                outputs: node.outputs().iter().map(connector_record).collect(),
            })
            .collect();
        let connections = self
            .connections
            .values()
            .map(|c| ConnectionRecord {
                id: c.id(),
                source: c.source(),
                target: c.target(),
            })
            .collect();
        WorkflowDocument {
            kind: "Graph".to_string(),
            nodes,
            connections,
        }
    }

    /// Rebuild a graph from its persisted shape, using `registry` to
    /// construct each node by its recorded `type_tag`, at the exact node
    /// and connector ids the document recorded — `create_with_ids` passes
    /// those ids straight through to the factory, so node identity and
    /// connector identity both survive the round trip and connection
    /// records can be replayed verbatim without any id translation. Fails
    /// fast on the first problem — an unknown type tag, a connector-shape
    /// mismatch, a factory that didn't honor the requested ids, or a
    /// rejected connection — and never returns a partially populated
    /// graph.
    pub fn from_document(
        doc: &WorkflowDocument,
        registry: &NodeRegistry,
    ) -> Result<Graph, GraphError> {
        let mut graph = Graph::new();

        for record in &doc.nodes {
            let input_ids: Vec<Identifier> = record.inputs.iter().map(|c| c.id).collect();
            let output_ids: Vec<Identifier> = record.outputs.iter().map(|c| c.id).collect();
            let node =
                registry.create_with_ids(&record.type_tag, record.id, &input_ids, &output_ids)?;
            if node.inputs().len() != record.inputs.len() || node.outputs().len() != record.outputs.len()
            {
                return Err(GraphError::NotFound(format!(
                    "type {} produced a different connector shape than the document recorded",
                    record.type_tag
                )));
            }
            if node.id() != record.id
                || node.inputs().iter().map(|c| c.id()).ne(input_ids.iter().copied())
                || node.outputs().iter().map(|c| c.id()).ne(output_ids.iter().copied())
            {
                return Err(GraphError::NotFound(format!(
                    "type {} did not honor the ids it was asked to reconstruct at",
                    record.type_tag
                )));
            }
            graph
                .try_add_node(node)
                .into_value()
                .ok_or(GraphError::NullArgument)?;
        }

        for record in &doc.connections {
            graph
                .try_add_connection(record.source, record.target)
                .into_value()
                .ok_or_else(|| GraphError::NotFound(record.id.to_string()))?;
        }

        Ok(graph)
    }

    /// Node-level adjacency derived from the connection set: one entry per
    /// node (possibly empty), used by cycle detection and traversal.
    pub(crate) fn adjacency(&self) -> HashMap<Identifier, Vec<Identifier>> {
        let mut map: HashMap<Identifier, Vec<Identifier>> =
            self.nodes.keys().map(|&id| (id, Vec::new())).collect();
        for connection in self.connections.values() {
            map.entry(connection.source_node())
                .or_default()
                .push(connection.target_node());
        }
        map
    }

    pub(crate) fn would_create_cycle(&self, from_node: Identifier, to_node: Identifier) -> bool {
        cycle::would_create_cycle(&self.adjacency(), from_node, to_node)
    }

    fn locate_connector(&self, connector_id: Identifier) -> Option<(Identifier, Connector)> {
        for (node_id, node) in &self.nodes {
            if let Some(c) = node
                .input(connector_id)
                .or_else(|| node.output(connector_id))
            {
                return Some((*node_id, c.clone()));
            }
        }
        None
    }

    fn with_connector_mut<R>(
        &mut self,
        node_id: Identifier,
        connector_id: Identifier,
        f: impl FnOnce(&mut Connector) -> R,
    ) -> Option<R> {
        let node = self.nodes.get_mut(&node_id)?;
        let connector = find_connector_mut(node.as_mut(), connector_id)?;
        Some(f(connector))
    }

    fn detach_connection(&mut self, connection_id: Identifier) {
        let Some(connection) = self.connections.shift_remove(&connection_id) else {
            return;
        };
        self.with_connector_mut(connection.source_node(), connection.source(), |c| {
            c.remove_link(connection_id)
        });
        self.with_connector_mut(connection.target_node(), connection.target(), |c| {
            c.remove_link(connection_id)
        });
    }
}

fn find_connector_mut(node: &mut dyn Node, connector_id: Identifier) -> Option<&mut Connector> {
    if let Some(pos) = node.outputs().iter().position(|c| c.id() == connector_id) {
        return node.outputs_mut().get_mut(pos);
    }
    if let Some(pos) = node.inputs().iter().position(|c| c.id() == connector_id) {
        return node.inputs_mut().get_mut(pos);
    }
    None
}

fn connector_record(connector: &Connector) -> ConnectorRecord {
    ConnectorRecord {
        id: connector.id(),
        data_type: connector.data_type().clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ExecutionContext;
    use crate::node::NodeExecutionResult;
    use crate::types::DataType;
    use crate::value::Value;
    use async_trait::async_trait;
    use tokio_util::sync::CancellationToken;

    struct StubNode {
        id: Identifier,
        inputs: Vec<Connector>,
        outputs: Vec<Connector>,
    }

    impl StubNode {
        fn new(input_types: &[&str], output_types: &[&str]) -> Box<dyn Node> {
            Self::with_id(Identifier::new(), input_types, output_types)
        }

        fn with_id(id: Identifier, input_types: &[&str], output_types: &[&str]) -> Box<dyn Node> {
            Self::with_ids(id, input_types, &[], output_types, &[])
        }

        fn with_ids(
            id: Identifier,
            input_types: &[&str],
            input_ids: &[Identifier],
            output_types: &[&str],
            output_ids: &[Identifier],
        ) -> Box<dyn Node> {
            let inputs = input_types
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let cid = input_ids.get(i).copied().unwrap_or_else(Identifier::new);
                    Connector::with_id(cid, id, Direction::Input, DataType::new(*t))
                })
                .collect();
            let outputs = output_types
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let cid = output_ids.get(i).copied().unwrap_or_else(Identifier::new);
                    Connector::with_id(cid, id, Direction::Output, DataType::new(*t))
                })
                .collect();
            Box::new(Self {
                id,
                inputs,
                outputs,
            })
        }
    }

    #[async_trait]
    impl Node for StubNode {
        fn id(&self) -> Identifier {
            self.id
        }
        fn inputs(&self) -> &[Connector] {
            &self.inputs
        }
        fn outputs(&self) -> &[Connector] {
            &self.outputs
        }
        fn inputs_mut(&mut self) -> &mut [Connector] {
            &mut self.inputs
        }
        fn outputs_mut(&mut self) -> &mut [Connector] {
            &mut self.outputs
        }
        fn type_id(&self) -> &str {
            "stub"
        }
        async fn execute(
            &self,
            _ctx: &ExecutionContext,
            _input: Option<Value>,
            _cancel: &CancellationToken,
        ) -> NodeExecutionResult {
            NodeExecutionResult::succeeded(None)
        }
    }

    #[test]
    fn adding_a_node_with_a_colliding_id_fails() {
        let mut graph = Graph::new();
        let id = Identifier::new();
        let a = StubNode::with_id(id, &[], &["number"]);
        assert!(graph.try_add_node(a).is_ok());

        let b = StubNode::with_id(id, &[], &["number"]);
        assert!(graph.try_add_node(b).is_err());
        assert_eq!(graph.node_count(), 1);
    }

    #[test]
    fn connecting_compatible_connectors_succeeds() {
        let mut graph = Graph::new();
        let source = StubNode::new(&[], &["number"]);
        let source_out = source.outputs()[0].id();
        let target = StubNode::new(&["number"], &[]);
        let target_in = target.inputs()[0].id();
        graph.add_node(source);
        graph.add_node(target);

        let result = graph.try_add_connection(source_out, target_in);
        assert!(result.is_ok());
        assert_eq!(graph.connection_count(), 1);
    }

    #[test]
    fn reversed_direction_is_rejected_not_auto_flipped() {
        let mut graph = Graph::new();
        let source = StubNode::new(&[], &["number"]);
        let source_out = source.outputs()[0].id();
        let target = StubNode::new(&["number"], &[]);
        let target_in = target.inputs()[0].id();
        graph.add_node(source);
        graph.add_node(target);

        // Passing the Input connector as `source` and the Output connector
        // as `target` must be rejected, not silently swapped back.
        let result = graph.try_add_connection(target_in, source_out);
        assert!(result.is_err());
        assert!(result.error().unwrap().contains("direction mismatch"));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn self_loop_is_rejected() {
        let mut graph = Graph::new();
        let node = StubNode::new(&["number"], &["number"]);
        let input_id = node.inputs()[0].id();
        let output_id = node.outputs()[0].id();
        graph.add_node(node);

        let result = graph.try_add_connection(output_id, input_id);
        assert!(result.is_err());
    }

    #[test]
    fn a_three_cycle_is_rejected_on_the_closing_edge() {
        let mut graph = Graph::new();
        let a = StubNode::new(&["number"], &["number"]);
        let (a_in, a_out) = (a.inputs()[0].id(), a.outputs()[0].id());
        let b = StubNode::new(&["number"], &["number"]);
        let (b_in, b_out) = (b.inputs()[0].id(), b.outputs()[0].id());
        let c = StubNode::new(&["number"], &["number"]);
        let (c_in, c_out) = (c.inputs()[0].id(), c.outputs()[0].id());
        graph.add_node(a);
        graph.add_node(b);
        graph.add_node(c);

        assert!(graph.try_add_connection(a_out, b_in).is_ok());
        assert!(graph.try_add_connection(b_out, c_in).is_ok());
        assert!(graph.try_add_connection(c_out, a_in).is_err());
        assert_eq!(graph.connection_count(), 2);
    }

    #[test]
    fn reconnecting_an_input_from_the_same_source_is_idempotent() {
        let mut graph = Graph::new();
        let source = StubNode::new(&[], &["number"]);
        let source_out = source.outputs()[0].id();
        let target = StubNode::new(&["number"], &[]);
        let target_in = target.inputs()[0].id();
        graph.add_node(source);
        graph.add_node(target);

        assert!(graph.try_add_connection(source_out, target_in).is_ok());
        assert!(graph.try_add_connection(source_out, target_in).is_ok());
        assert_eq!(graph.connection_count(), 2);
    }

    #[test]
    fn an_input_already_bound_to_one_source_rejects_a_second() {
        let mut graph = Graph::new();
        let source_a = StubNode::new(&[], &["number"]);
        let a_out = source_a.outputs()[0].id();
        let source_b = StubNode::new(&[], &["number"]);
        let b_out = source_b.outputs()[0].id();
        let target = StubNode::new(&["number"], &[]);
        let target_in = target.inputs()[0].id();
        graph.add_node(source_a);
        graph.add_node(source_b);
        graph.add_node(target);

        assert!(graph.try_add_connection(a_out, target_in).is_ok());
        assert!(graph.try_add_connection(b_out, target_in).is_err());
    }

    #[test]
    fn removing_a_node_cascades_to_its_connections() {
        let mut graph = Graph::new();
        let source = StubNode::new(&[], &["number"]);
        let source_id = source.id();
        let source_out = source.outputs()[0].id();
        let target = StubNode::new(&["number"], &[]);
        let target_in = target.inputs()[0].id();
        graph.add_node(source);
        graph.add_node(target);
        graph.try_add_connection(source_out, target_in).into_value().unwrap();

        assert!(graph.remove_node(source_id));
        assert_eq!(graph.connection_count(), 0);
    }

    #[test]
    fn validate_passes_on_an_acyclic_graph() {
        let mut graph = Graph::new();
        let a = StubNode::new(&[], &["number"]);
        let a_out = a.outputs()[0].id();
        let b = StubNode::new(&["number"], &[]);
        let b_in = b.inputs()[0].id();
        graph.add_node(a);
        graph.add_node(b);
        graph.add_connection(a_out, b_in);

        assert!(graph.validate());
    }

    #[test]
    fn document_round_trip_preserves_shape() {
        use crate::registry::NodeRegistry;
        use std::sync::Arc;

        let mut registry = NodeRegistry::new();
        registry.register(
            "stub",
            Arc::new(|id, input_ids, output_ids| {
                StubNode::with_ids(id, &["number"], input_ids, &["number"], output_ids)
            }),
        );

        let mut graph = Graph::new();
        let a = StubNode::new(&[], &["number"]);
        let a_out = a.outputs()[0].id();
        let b = registry.create_by_type("stub").unwrap();
        let b_id = b.id();
        let b_in = b.inputs()[0].id();
        let b_out = b.outputs()[0].id();
        graph.add_node(a);
        graph.add_node(b);
        graph.add_connection(a_out, b_in);

        let doc = graph.to_document();
        assert_eq!(doc.nodes.len(), 2);
        assert_eq!(doc.connections.len(), 1);

        let reloaded = Graph::from_document(&doc, &registry);
        // "a" was built inline (type_id "stub" too, but via StubNode::new,
        // which also reports "stub") so both sides are registered.
        assert!(reloaded.is_ok());
        let reloaded = reloaded.unwrap();
        assert_eq!(reloaded.node_count(), 2);
        assert_eq!(reloaded.connection_count(), 1);
        assert!(reloaded.validate());

        // Identity survives the round trip, not just topology.
        assert!(reloaded.get_node_by_id(b_id).is_some());
        let reloaded_b = reloaded.get_node_by_id(b_id).unwrap();
        assert_eq!(reloaded_b.inputs()[0].id(), b_in);
        assert_eq!(reloaded_b.outputs()[0].id(), b_out);
    }

    #[test]
    fn document_load_fails_fast_on_unknown_type_tag() {
        use crate::registry::NodeRegistry;

        let mut graph = Graph::new();
        graph.add_node(StubNode::new(&[], &["number"]));
        let doc = graph.to_document();

        let empty_registry = NodeRegistry::new();
        let result = Graph::from_document(&doc, &empty_registry);
        assert!(result.is_err());
    }
}
