use crate::id::Identifier;
use crate::types::{DataType, Direction};
use serde::{Deserialize, Serialize};

/// One end of a connection, as recorded on the connector that owns it.
///
/// Denormalizes the *other* endpoint's connector id onto each side so a
/// connector can answer capacity/type questions about its own connections
/// without consulting the owning graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectorLink {
    pub connection: Identifier,
    pub peer: Identifier,
}

/// A typed, directed endpoint attached to exactly one node.
///
/// `parent_node` is set once at construction and never changes — connectors
/// never migrate between nodes — so it doubles as the parent-node
/// back-reference without needing a live reference into the owning `Node`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connector {
    id: Identifier,
    parent_node: Identifier,
    direction: Direction,
    data_type: DataType,
    links: Vec<ConnectorLink>,
}

impl Connector {
    pub fn new(parent_node: Identifier, direction: Direction, data_type: DataType) -> Self {
        Self {
            id: Identifier::new(),
            parent_node,
            direction,
            data_type,
            links: Vec::new(),
        }
    }

    pub fn with_id(
        id: Identifier,
        parent_node: Identifier,
        direction: Direction,
        data_type: DataType,
    ) -> Self {
        Self {
            id,
            parent_node,
            direction,
            data_type,
            links: Vec::new(),
        }
    }

    pub fn id(&self) -> Identifier {
        self.id
    }

    pub fn parent_node(&self) -> Identifier {
        self.parent_node
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    /// Read-only view of this connector's connections.
    pub fn links(&self) -> &[ConnectorLink] {
        &self.links
    }

    pub fn is_connected(&self) -> bool {
        !self.links.is_empty()
    }

    /// Would `other` be an acceptable counterpart for a new connection
    /// touching `self`?
    ///
    /// True iff directions differ, the target type accepts the source
    /// type, and — when `self` is the Input side — every existing link on
    /// `self` already comes from `other` (idempotent reconnection is
    /// allowed; a second, different source is not).
    pub fn validate_connection(&self, other: &Connector) -> bool {
        if self.direction == other.direction {
            return false;
        }
        let (source_type, target_type) = match self.direction {
            Direction::Output => (&self.data_type, &other.data_type),
            Direction::Input => (&other.data_type, &self.data_type),
        };
        if !target_type.assignable_from(source_type) {
            return false;
        }
        if self.direction == Direction::Input {
            self.links.iter().all(|link| link.peer == other.id)
        } else {
            true
        }
    }

    /// Register a connection touching this connector. Returns whether it
    /// was newly added; re-adding the same connection id is a no-op that
    /// still reports `true` for idempotent reconnection against the same
    /// source.
    pub fn add_link(&mut self, link: ConnectorLink, other: &Connector) -> bool {
        if !self.validate_connection(other) {
            return false;
        }
        if self.links.iter().any(|l| l.connection == link.connection) {
            return true;
        }
        self.links.push(link);
        true
    }

    /// Detach a connection by id. Tolerant of an absent id, since this is
    /// also used during cascading removal.
    pub fn remove_link(&mut self, connection: Identifier) -> bool {
        let before = self.links.len();
        self.links.retain(|l| l.connection != connection);
        self.links.len() != before
    }

    /// Every connector satisfies the parent-node back-reference invariant
    /// by construction; exposed for symmetry with `Node::validate` /
    /// `Graph::try_validate` call sites.
    pub fn validate(&self, expected_parent: Identifier) -> bool {
        self.parent_node == expected_parent
    }
}
