use crate::context::{ExecutionContext, ExecutionStatus};
use crate::error::NodeExecutionError;
use crate::graph::Graph;
use crate::id::Identifier;
use crate::node::NodeExecutionResult;
use crate::value::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tuning for a single `WorkflowRunner::run` call.
///
/// `max_node_execution` is a soft budget: a node that runs past it is
/// logged at `warn!` but not forcibly aborted — this crate has no
/// supervisory timeout/retry machinery, so enforcing it would require
/// cancelling a node that never agreed to stop.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub event_buffer_capacity: usize,
    pub max_node_execution: Option<Duration>,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            event_buffer_capacity: 256,
            max_node_execution: None,
        }
    }
}

/// A lifecycle event emitted by a run, in the order things actually
/// happened.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    WorkflowStarted,
    NodeStarting { node: Identifier },
    NodeCompleted { node: Identifier, output: Option<Value> },
    NodeFailed { node: Identifier, error: NodeExecutionError },
    WorkflowCompleted,
    WorkflowFailed { message: String },
    WorkflowCancelled,
}

/// Drives one execution of a `Graph` in topological order, cooperatively
/// honoring a `CancellationToken` and emitting `WorkflowEvent`s as it goes:
/// a sequential loop over the topologically sorted nodes, pushing a
/// lifecycle event as each step starts and finishes.
pub struct WorkflowRunner {
    config: RunnerConfig,
}

impl WorkflowRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Start a run in the background, returning the receiving end of its
    /// event stream. Scoped to `start`'s reachable subgraph — nodes not
    /// reachable from `start` never execute and never emit events.
    /// Dropping the receiver does not stop the run; use `cancel` for that.
    pub fn run(
        &self,
        graph: Arc<Graph>,
        start: Identifier,
        context: Arc<ExecutionContext>,
        cancel: CancellationToken,
    ) -> mpsc::Receiver<WorkflowEvent> {
        let (tx, rx) = mpsc::channel(self.config.event_buffer_capacity);
        let config = self.config.clone();
        tokio::spawn(async move {
            execute(graph, start, context, cancel, tx, config).await;
        });
        rx
    }
}

async fn execute(
    graph: Arc<Graph>,
    start: Identifier,
    context: Arc<ExecutionContext>,
    cancel: CancellationToken,
    tx: mpsc::Sender<WorkflowEvent>,
    config: RunnerConfig,
) {
    // Pre-start cancellation: silent, no events at all.
    if cancel.is_cancelled() {
        debug!("run cancelled before it started; emitting no events");
        return;
    }

    send(&tx, WorkflowEvent::WorkflowStarted).await;
    context.set_status(ExecutionStatus::Running);

    let order = match graph.topological_sort(start) {
        Ok(order) => order,
        Err(err) => {
            let message = err.to_string();
            warn!(error = %message, "run aborted: graph is not acyclic");
            context.set_status(ExecutionStatus::Failed);
            send(&tx, WorkflowEvent::WorkflowFailed { message }).await;
            return;
        }
    };

    for node_id in order {
        if cancel.is_cancelled() {
            info!("run cancelled before starting the next node");
            context.set_status(ExecutionStatus::Cancelled);
            send(&tx, WorkflowEvent::WorkflowCancelled).await;
            return;
        }

        context.set_current_node(Some(node_id));
        send(&tx, WorkflowEvent::NodeStarting { node: node_id }).await;

        let input_value = graph
            .get_node_by_id(node_id)
            .and_then(|node| node.inputs().first())
            .and_then(|connector| connector.links().first())
            .and_then(|link| context.connector_output(link.peer));

        let started = std::time::Instant::now();
        let result = run_node(Arc::clone(&graph), Arc::clone(&context), node_id, input_value, cancel.clone()).await;
        if let Some(budget) = config.max_node_execution {
            if started.elapsed() > budget {
                warn!(node = %node_id, elapsed_ms = started.elapsed().as_millis(), "node exceeded its soft execution budget");
            }
        }

        match result {
            NodeExecutionResult::Succeeded {
                activated_output_connector,
                output_data,
            } => {
                if let Some(value) = output_data.clone() {
                    record_output(&graph, &context, node_id, activated_output_connector, value);
                }
                send(
                    &tx,
                    WorkflowEvent::NodeCompleted {
                        node: node_id,
                        output: output_data,
                    },
                )
                .await;

                if cancel.is_cancelled() {
                    info!("run cancelled immediately after a node completed");
                    context.set_status(ExecutionStatus::Cancelled);
                    send(&tx, WorkflowEvent::WorkflowCancelled).await;
                    return;
                }
            }
            NodeExecutionResult::Failed { error } => {
                send(
                    &tx,
                    WorkflowEvent::NodeFailed {
                        node: node_id,
                        error: error.clone(),
                    },
                )
                .await;
                context.set_status(ExecutionStatus::Failed);
                send(
                    &tx,
                    WorkflowEvent::WorkflowFailed {
                        message: error.message().to_string(),
                    },
                )
                .await;
                return;
            }
        }
    }

    context.set_status(ExecutionStatus::Completed);
    send(&tx, WorkflowEvent::WorkflowCompleted).await;
}

/// Execute one node on its own task so a panic inside `Node::execute`
/// cannot bring down the run loop: tokio already catches task panics and
/// reports them as a `JoinError`, which we fold into
/// `NodeExecutionError::Panicked`.
async fn run_node(
    graph: Arc<Graph>,
    context: Arc<ExecutionContext>,
    node_id: Identifier,
    input_value: Option<Value>,
    cancel: CancellationToken,
) -> NodeExecutionResult {
    let handle = tokio::spawn(async move {
        let node = graph
            .get_node_by_id(node_id)
            .expect("node from topological order must still be in the graph");
        node.execute(&context, input_value, &cancel).await
    });

    match handle.await {
        Ok(result) => result,
        Err(join_error) => NodeExecutionResult::Failed {
            error: NodeExecutionError::Panicked(join_error.to_string()),
        },
    }
}

/// Store a node's output under the connector(s) it activated. `None`
/// (a plain pass-through node) activates every output connector it has;
/// a branch/gate node activates only the one it names.
fn record_output(
    graph: &Graph,
    context: &ExecutionContext,
    node_id: Identifier,
    activated: Option<Identifier>,
    value: Value,
) {
    let Some(node) = graph.get_node_by_id(node_id) else {
        return;
    };
    match activated {
        Some(connector) => context.set_connector_output(connector, value),
        None => {
            for connector in node.outputs() {
                context.set_connector_output(connector.id(), value.clone());
            }
        }
    }
}

async fn send(tx: &mpsc::Sender<WorkflowEvent>, event: WorkflowEvent) {
    if tx.send(event).await.is_err() {
        debug!("event receiver dropped; run continues without a listener");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::Connector;
    use crate::node::Node;
    use crate::types::{DataType, Direction};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct RecordingNode {
        id: Identifier,
        inputs: Vec<Connector>,
        outputs: Vec<Connector>,
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl RecordingNode {
        fn linear(calls: Arc<AtomicUsize>, fail: bool) -> Box<dyn Node> {
            let id = Identifier::new();
            Box::new(Self {
                id,
                inputs: vec![Connector::new(id, Direction::Input, DataType::new("number"))],
                outputs: vec![Connector::new(id, Direction::Output, DataType::new("number"))],
                calls,
                fail,
            })
        }

        fn source(calls: Arc<AtomicUsize>) -> Box<dyn Node> {
            let id = Identifier::new();
            Box::new(Self {
                id,
                inputs: vec![],
                outputs: vec![Connector::new(id, Direction::Output, DataType::new("number"))],
                calls,
                fail: false,
            })
        }
    }

    #[async_trait]
    impl Node for RecordingNode {
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
            "recording"
        }
        async fn execute(
            &self,
            _ctx: &ExecutionContext,
            input: Option<Value>,
            _cancel: &CancellationToken,
        ) -> NodeExecutionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return NodeExecutionResult::failed("boom");
            }
            let next = input.and_then(|v| v.as_number()).unwrap_or(0.0) + 1.0;
            NodeExecutionResult::succeeded(Value::from(next))
        }
    }

    async fn drain(mut rx: mpsc::Receiver<WorkflowEvent>) -> Vec<WorkflowEvent> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn a_linear_chain_completes_and_chains_values() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let source = RecordingNode::source(calls.clone());
        let source_id = source.id();
        let source_out = source.outputs()[0].id();
        let sink = RecordingNode::linear(calls.clone(), false);
        let sink_in = sink.inputs()[0].id();
        graph.add_node(source);
        graph.add_node(sink);
        graph.add_connection(source_out, sink_in);

        let runner = WorkflowRunner::new(RunnerConfig::default());
        let rx = runner.run(
            Arc::new(graph),
            source_id,
            Arc::new(ExecutionContext::new()),
            CancellationToken::new(),
        );
        let events = drain(rx).await;

        assert!(matches!(events.first(), Some(WorkflowEvent::WorkflowStarted)));
        assert!(matches!(events.last(), Some(WorkflowEvent::WorkflowCompleted)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn a_failing_node_short_circuits_the_run() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let source = RecordingNode::source(calls.clone());
        let source_id = source.id();
        let source_out = source.outputs()[0].id();
        let failing = RecordingNode::linear(calls.clone(), true);
        let failing_in = failing.inputs()[0].id();
        graph.add_node(source);
        graph.add_node(failing);
        graph.add_connection(source_out, failing_in);

        let runner = WorkflowRunner::new(RunnerConfig::default());
        let rx = runner.run(
            Arc::new(graph),
            source_id,
            Arc::new(ExecutionContext::new()),
            CancellationToken::new(),
        );
        let events = drain(rx).await;

        assert!(events
            .iter()
            .any(|e| matches!(e, WorkflowEvent::NodeFailed { .. })));
        assert!(matches!(events.last(), Some(WorkflowEvent::WorkflowFailed { .. })));
    }

    #[tokio::test]
    async fn cancelling_before_start_emits_no_events() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let source = RecordingNode::source(calls.clone());
        let source_id = source.id();
        graph.add_node(source);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let runner = WorkflowRunner::new(RunnerConfig::default());
        let rx = runner.run(
            Arc::new(graph),
            source_id,
            Arc::new(ExecutionContext::new()),
            cancel,
        );
        let events = drain(rx).await;

        assert!(events.is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cancelling_between_nodes_emits_exactly_one_cancelled_event() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut graph = Graph::new();
        let source = RecordingNode::source(calls.clone());
        let source_id = source.id();
        let source_out = source.outputs()[0].id();
        let middle = RecordingNode::linear(calls.clone(), false);
        let (middle_in, middle_out) = (middle.inputs()[0].id(), middle.outputs()[0].id());
        let tail = RecordingNode::linear(calls.clone(), false);
        let tail_in = tail.inputs()[0].id();
        graph.add_node(source);
        graph.add_node(middle);
        graph.add_node(tail);
        graph.add_connection(source_out, middle_in);
        graph.add_connection(middle_out, tail_in);

        let cancel = CancellationToken::new();
        let runner = WorkflowRunner::new(RunnerConfig::default());
        let mut rx = runner.run(
            Arc::new(graph),
            source_id,
            Arc::new(ExecutionContext::new()),
            cancel.clone(),
        );

        // Cancel deterministically once the first node has completed, so
        // the run stops somewhere strictly between the source and the tail.
        let mut events = Vec::new();
        let mut seen_completion = false;
        while let Some(event) = rx.recv().await {
            if matches!(event, WorkflowEvent::NodeCompleted { .. }) && !seen_completion {
                seen_completion = true;
                cancel.cancel();
            }
            events.push(event);
        }

        let cancelled_count = events
            .iter()
            .filter(|e| matches!(e, WorkflowEvent::WorkflowCancelled))
            .count();
        assert_eq!(cancelled_count, 1);
        assert!(!events
            .iter()
            .any(|e| matches!(e, WorkflowEvent::WorkflowCompleted)));
    }
}
