use crate::error::GraphError;
use crate::id::Identifier;
use crate::value::{FromValue, Value};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::RwLock;

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
    NotStarted,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

/// One append-only entry in a run's log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub node: Option<Identifier>,
    pub message: String,
}

/// Per-run state shared across every node execution.
///
/// The variable map is case-insensitive (keys are lower-cased on write and
/// read). The per-output-connector value map uses `dashmap` for concurrent
/// scoped storage, since node execution can in principle run concurrently
/// with other in-flight work sharing the same context.
#[derive(Debug)]
pub struct ExecutionContext {
    variables: DashMap<String, Value>,
    log: RwLock<Vec<LogEntry>>,
    status: RwLock<ExecutionStatus>,
    current_node: RwLock<Option<Identifier>>,
    connector_outputs: DashMap<Identifier, Value>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self {
            variables: DashMap::new(),
            log: RwLock::new(Vec::new()),
            status: RwLock::new(ExecutionStatus::NotStarted),
            current_node: RwLock::new(None),
            connector_outputs: DashMap::new(),
        }
    }

    /// Set a variable. Rejects a null/whitespace-only `name` with
    /// `GraphError::NullArgument` rather than silently storing it under an
    /// empty key.
    pub fn set_variable(&self, name: &str, value: Value) -> Result<(), GraphError> {
        validate_key(name)?;
        self.variables.insert(name.to_lowercase(), value);
        Ok(())
    }

    /// Look up a variable. Rejects a null/whitespace-only `name` with
    /// `GraphError::NullArgument`; a valid but unset key still comes back
    /// as `Ok(None)`, not an error.
    pub fn get_variable(&self, name: &str) -> Result<Option<Value>, GraphError> {
        validate_key(name)?;
        Ok(self.variables.get(&name.to_lowercase()).map(|v| v.clone()))
    }

    /// Typed, lenient variable lookup: a missing key, an invalid key, and a
    /// type mismatch all come back as `None` rather than an error.
    pub fn try_get_variable<T: FromValue>(&self, name: &str) -> Option<T> {
        self.get_variable(name).ok().flatten().and_then(|v| T::from_value(&v))
    }

    pub fn variables_snapshot(&self) -> HashMap<String, Value> {
        self.variables
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn log(&self, node: Option<Identifier>, message: impl Into<String>) {
        let mut log = self.log.write().expect("log lock poisoned");
        log.push(LogEntry {
            node,
            message: message.into(),
        });
    }

    pub fn log_entries(&self) -> Vec<LogEntry> {
        self.log.read().expect("log lock poisoned").clone()
    }

    pub fn status(&self) -> ExecutionStatus {
        *self.status.read().expect("status lock poisoned")
    }

    pub fn set_status(&self, status: ExecutionStatus) {
        *self.status.write().expect("status lock poisoned") = status;
    }

    pub fn current_node(&self) -> Option<Identifier> {
        *self.current_node.read().expect("current node lock poisoned")
    }

    pub fn set_current_node(&self, node: Option<Identifier>) {
        *self.current_node.write().expect("current node lock poisoned") = node;
    }

    /// Record the value produced on an output connector, for downstream
    /// nodes to read as their activated input.
    pub fn set_connector_output(&self, connector: Identifier, value: Value) {
        self.connector_outputs.insert(connector, value);
    }

    pub fn connector_output(&self, connector: Identifier) -> Option<Value> {
        self.connector_outputs.get(&connector).map(|v| v.clone())
    }

    /// Evaluate a boolean condition against the current variable set; used
    /// by branch-style nodes. Lenient: a missing or non-boolean variable
    /// evaluates to `false` rather than failing the run.
    pub fn evaluate_condition(&self, variable: &str) -> bool {
        self.try_get_variable::<bool>(variable).unwrap_or(false)
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_key(name: &str) -> Result<(), GraphError> {
    if name.trim().is_empty() {
        return Err(GraphError::NullArgument);
    }
    Ok(())
}
