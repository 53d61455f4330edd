use crate::connector::Connector;
use crate::context::ExecutionContext;
use crate::error::NodeExecutionError;
use crate::id::Identifier;
use crate::value::Value;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// The outcome of executing a single node.
///
/// A node never throws across this boundary in a well-behaved
/// implementation; `WorkflowRunner` additionally catches panics and folds
/// them into `NodeExecutionError::Panicked` so a misbehaving node can never
/// take the whole run down uncaught.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeExecutionResult {
    Succeeded {
        /// Which output connector fired, if the node is a branch/gate; a
        /// plain pass-through node leaves this `None` and all downstream
        /// connectors are considered activated.
        activated_output_connector: Option<Identifier>,
        output_data: Option<Value>,
    },
    Failed {
        error: NodeExecutionError,
    },
}

impl NodeExecutionResult {
    pub fn succeeded(output_data: impl Into<Option<Value>>) -> Self {
        NodeExecutionResult::Succeeded {
            activated_output_connector: None,
            output_data: output_data.into(),
        }
    }

    pub fn succeeded_via(connector: Identifier, output_data: impl Into<Option<Value>>) -> Self {
        NodeExecutionResult::Succeeded {
            activated_output_connector: Some(connector),
            output_data: output_data.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        NodeExecutionResult::Failed {
            error: NodeExecutionError::Failed(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, NodeExecutionResult::Succeeded { .. })
    }
}

/// A unit of work in the graph.
///
/// Implementations are supplied by callers — concrete business node kinds
/// are out of scope for this crate; it only defines and drives the
/// contract. `execute` must honor `cancel`: once cancellation is requested
/// it should return promptly rather than keep working, so the runner's
/// cooperative cancellation model actually bounds latency.
#[async_trait]
pub trait Node: Send + Sync {
    fn id(&self) -> Identifier;

    /// The registry type id this node was created from; used to re-create
    /// an equivalent node when loading a document.
    fn type_id(&self) -> &str;

    /// Input connectors, in a stable author-defined order.
    fn inputs(&self) -> &[Connector];

    /// Output connectors, in a stable author-defined order.
    fn outputs(&self) -> &[Connector];

    /// Mutable connector access, used only by `Graph` to register or detach
    /// connections. Node implementations never need to override the
    /// default connector storage behaviour here; this exists so the graph
    /// — not the trait object's caller — is the sole mutator of connection
    /// state.
    fn inputs_mut(&mut self) -> &mut [Connector];

    fn outputs_mut(&mut self) -> &mut [Connector];

    fn input(&self, id: Identifier) -> Option<&Connector> {
        self.inputs().iter().find(|c| c.id() == id)
    }

    fn output(&self, id: Identifier) -> Option<&Connector> {
        self.outputs().iter().find(|c| c.id() == id)
    }

    /// Execute this node's unit of work.
    ///
    /// `input_data` is whatever single scalar value arrived on the
    /// activated input connector; `context` carries run-wide variables and
    /// the per-connector scratch map.
    async fn execute(
        &self,
        context: &ExecutionContext,
        input_data: Option<Value>,
        cancel: &CancellationToken,
    ) -> NodeExecutionResult;
}
