//! workflow-graph
//!
//! A typed node-graph authoring and execution engine: directed graphs of
//! connector-typed nodes, a read-only traversal service, and a cooperative,
//! cancellable async runner that drives a graph through its nodes in
//! topological order while emitting ordered lifecycle events.
//!
//! Concrete business node kinds, the node registry's factory
//! implementations, an editor/UI binding, and distributed or persistent
//! execution are all out of scope for this crate — it defines and drives
//! the contract, not any particular workflow.

pub mod connection;
pub mod connector;
pub mod context;
pub mod document;
pub mod error;
pub mod graph;
pub mod id;
pub mod node;
pub mod registry;
pub mod runner;
pub mod traversal;
pub mod types;
pub mod value;

pub use connection::Connection;
pub use connector::{Connector, ConnectorLink};
pub use context::{ExecutionContext, ExecutionStatus, LogEntry};
pub use document::{ConnectionRecord, ConnectorRecord, NodeRecord, WorkflowDocument};
pub use error::{GraphError, NodeExecutionError, TraversalError};
pub use graph::{Graph, OperationResult};
pub use id::Identifier;
pub use node::{Node, NodeExecutionResult};
pub use registry::{NodeFactory, NodeRegistry, NodeTypeInfo};
pub use runner::{RunnerConfig, WorkflowEvent, WorkflowRunner};
pub use types::{DataType, Direction};
pub use value::{FromValue, Value};
