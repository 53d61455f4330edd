use crate::id::Identifier;
use thiserror::Error;

/// Failure taxonomy for graph mutations and lookups.
///
/// Mutating operations on `Graph` never propagate this as a Rust error to
/// external callers; it is the cause carried inside `OperationResult`'s
/// error message. Lower-level helpers that are not required to build an
/// `OperationResult` (`Connector`, `Connection`) return it directly.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum GraphError {
    #[error("argument must not be null/empty")]
    NullArgument,
    #[error("not found: {0}")]
    NotFound(String),
    #[error("direction mismatch: {0}")]
    DirectionMismatch(String),
    #[error("incompatible data types: {0}")]
    TypeIncompatible(String),
    #[error("input connector {0} already has a connection from a different source")]
    CapacityExceeded(Identifier),
    #[error("would create a cycle: {0}")]
    WouldCreateCycle(String),
    #[error("concurrent modification invalidated this operation: {0}")]
    ConcurrentModification(String),
}

/// Failure of a traversal operation that has no meaningful partial result:
/// only `topological_sort` can fail this way.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TraversalError {
    #[error("cycle detected while computing a topological order")]
    CycleDetected,
}

/// The error carried by a node's `Failed` result, or by a thrown (panicking)
/// node's translated failure.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum NodeExecutionError {
    #[error("{0}")]
    Failed(String),
    #[error("node panicked: {0}")]
    Panicked(String),
}

impl NodeExecutionError {
    pub fn message(&self) -> &str {
        match self {
            NodeExecutionError::Failed(m) | NodeExecutionError::Panicked(m) => m,
        }
    }
}
