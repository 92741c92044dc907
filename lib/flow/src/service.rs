//! The flow service.
//!
//! `FlowService` owns a [`FlowStore`] and an [`Engine`] on its own task and
//! processes commands one at a time. A run occupies the queue until it
//! finishes, so edits never interleave with a run. Callers talk to it
//! through a cloneable [`FlowHandle`].

use crate::edge::{Edge, EdgeId};
use crate::engine::Engine;
use crate::error::FlowError;
use crate::execution::{ExecutionUpdate, RunEvent, RunReport};
use crate::node::{Node, NodeId, Position};
use crate::state::FlowState;
use crate::store::FlowStore;
use agentflow_agents::{AgentConfig, AgentDispatcher};
use agentflow_core::FlowId;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

const COMMAND_CAPACITY: usize = 64;

type Reply<T> = oneshot::Sender<Result<T, FlowError>>;

enum Command {
    AddNode(Node, Reply<()>),
    RemoveNode(NodeId, Reply<Node>),
    UpdateNodePosition(NodeId, Position, Reply<()>),
    UpdateNodeConfig(NodeId, AgentConfig, Reply<()>),
    AddEdge(Edge, Reply<()>),
    RemoveEdge(EdgeId, Reply<Edge>),
    UpdateExecutionResult(NodeId, ExecutionUpdate, Reply<()>),
    SelectNode(Option<NodeId>, Reply<()>),
    Snapshot(Reply<FlowState>),
    Run(CancellationToken, Reply<RunReport>),
}

/// Owns one flow and serializes every request against it.
pub struct FlowService<D> {
    flow_id: FlowId,
    store: FlowStore,
    engine: Engine<D>,
    commands: mpsc::Receiver<Command>,
}

impl<D: AgentDispatcher + 'static> FlowService<D> {
    /// Creates the service and the handle that feeds it.
    #[must_use]
    pub fn new(store: FlowStore, engine: Engine<D>) -> (Self, FlowHandle) {
        let flow_id = FlowId::new();
        let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
        let handle = FlowHandle {
            flow_id,
            commands: tx,
            events: engine.event_sender(),
        };
        let service = Self {
            flow_id,
            store,
            engine,
            commands: rx,
        };
        (service, handle)
    }

    /// Starts the service on the current tokio runtime.
    #[must_use]
    pub fn spawn(store: FlowStore, engine: Engine<D>) -> FlowHandle {
        let (service, handle) = Self::new(store, engine);
        tokio::spawn(service.serve());
        handle
    }

    /// Processes commands until every handle is dropped.
    #[instrument(skip(self), fields(flow_id = %self.flow_id))]
    pub async fn serve(mut self) {
        info!("flow service started");
        while let Some(command) = self.commands.recv().await {
            self.handle(command).await;
        }
        info!("flow service stopped");
    }

    async fn handle(&mut self, command: Command) {
        // A caller that gave up on its reply is not an error.
        match command {
            Command::AddNode(node, reply) => {
                let _ = reply.send(self.store.add_node(node).map_err(FlowError::from));
            }
            Command::RemoveNode(id, reply) => {
                let _ = reply.send(self.store.remove_node(&id).map_err(FlowError::from));
            }
            Command::UpdateNodePosition(id, position, reply) => {
                let _ = reply.send(
                    self.store
                        .update_node_position(&id, position)
                        .map_err(FlowError::from),
                );
            }
            Command::UpdateNodeConfig(id, config, reply) => {
                let _ = reply.send(
                    self.store
                        .update_node_config(&id, config)
                        .map_err(FlowError::from),
                );
            }
            Command::AddEdge(edge, reply) => {
                let _ = reply.send(self.store.add_edge(edge).map_err(FlowError::from));
            }
            Command::RemoveEdge(id, reply) => {
                let _ = reply.send(self.store.remove_edge(&id).map_err(FlowError::from));
            }
            Command::UpdateExecutionResult(id, update, reply) => {
                let _ = reply.send(
                    self.store
                        .update_execution_result(&id, update)
                        .map_err(FlowError::from),
                );
            }
            Command::SelectNode(id, reply) => {
                let _ = reply.send(self.store.select_node(id).map_err(FlowError::from));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(Ok(self.store.snapshot()));
            }
            Command::Run(cancel, reply) => {
                debug!("run requested");
                let outcome = self.engine.run(&mut self.store, &cancel).await;
                let _ = reply.send(outcome);
            }
        }
    }
}

/// Cloneable client of a [`FlowService`].
#[derive(Clone)]
pub struct FlowHandle {
    flow_id: FlowId,
    commands: mpsc::Sender<Command>,
    events: broadcast::Sender<RunEvent>,
}

impl FlowHandle {
    #[must_use]
    pub fn flow_id(&self) -> FlowId {
        self.flow_id
    }

    /// Subscribes to run events of this flow.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    pub async fn add_node(&self, node: Node) -> agentflow_core::Result<(), FlowError> {
        self.request(|reply| Command::AddNode(node, reply)).await
    }

    pub async fn remove_node(&self, id: NodeId) -> agentflow_core::Result<Node, FlowError> {
        self.request(|reply| Command::RemoveNode(id, reply)).await
    }

    pub async fn update_node_position(
        &self,
        id: NodeId,
        position: Position,
    ) -> agentflow_core::Result<(), FlowError> {
        self.request(|reply| Command::UpdateNodePosition(id, position, reply))
            .await
    }

    pub async fn update_node_config(
        &self,
        id: NodeId,
        config: AgentConfig,
    ) -> agentflow_core::Result<(), FlowError> {
        self.request(|reply| Command::UpdateNodeConfig(id, config, reply))
            .await
    }

    pub async fn add_edge(&self, edge: Edge) -> agentflow_core::Result<(), FlowError> {
        self.request(|reply| Command::AddEdge(edge, reply)).await
    }

    pub async fn remove_edge(&self, id: EdgeId) -> agentflow_core::Result<Edge, FlowError> {
        self.request(|reply| Command::RemoveEdge(id, reply)).await
    }

    pub async fn update_execution_result(
        &self,
        id: NodeId,
        update: ExecutionUpdate,
    ) -> agentflow_core::Result<(), FlowError> {
        self.request(|reply| Command::UpdateExecutionResult(id, update, reply))
            .await
    }

    pub async fn select_node(&self, id: Option<NodeId>) -> agentflow_core::Result<(), FlowError> {
        self.request(|reply| Command::SelectNode(id, reply)).await
    }

    /// Returns a copy of the current flow state.
    pub async fn snapshot(&self) -> agentflow_core::Result<FlowState, FlowError> {
        self.request(Command::Snapshot).await
    }

    /// Runs the flow to completion.
    pub async fn run(&self) -> agentflow_core::Result<RunReport, FlowError> {
        self.run_with_cancel(CancellationToken::new()).await
    }

    /// Runs the flow; cancelling `cancel` stops it before the next dispatch.
    pub async fn run_with_cancel(
        &self,
        cancel: CancellationToken,
    ) -> agentflow_core::Result<RunReport, FlowError> {
        self.request(|reply| Command::Run(cancel, reply)).await
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Reply<T>) -> Command,
    ) -> agentflow_core::Result<T, FlowError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(build(tx))
            .await
            .map_err(|_| FlowError::ServiceStopped)?;
        let reply = rx.await.map_err(|_| FlowError::ServiceStopped)?;
        Ok(reply?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::execution::ExecutionStatus;
    use agentflow_agents::{
        AgentSettings, AgentType, HttpDispatcher, ModelType, ScriptedDispatcher,
        create_default_config,
    };
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value as JsonValue, json};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn node(id: &str, agent_type: AgentType) -> Node {
        let mut config = create_default_config(agent_type, ModelType::OpenAi);
        config.name = id.to_string();
        Node::new(id, config)
    }

    #[tokio::test]
    async fn edits_and_runs_go_through_the_queue() {
        let handle = FlowService::spawn(
            FlowStore::new(),
            Engine::new(ScriptedDispatcher::new().respond("a", Ok(json!({"text": "hello"})))),
        );

        handle.add_node(node("a", AgentType::TextGenerator)).await.expect("add a");
        handle.add_node(node("r", AgentType::Result)).await.expect("add r");
        handle.add_edge(Edge::new("e1", "a", "r")).await.expect("edge");

        let report = handle.run().await.expect("run");
        assert!(report.is_success());

        let state = handle.snapshot().await.expect("snapshot");
        assert!(!state.is_running);
        assert_eq!(
            state.execution_results[&NodeId::from("r")].output,
            Some(json!({"text": "hello"}))
        );
    }

    #[tokio::test]
    async fn rejected_edits_surface_as_reports() {
        let handle = FlowService::spawn(FlowStore::new(), Engine::new(ScriptedDispatcher::new()));
        handle.add_node(node("r1", AgentType::Result)).await.expect("add r1");
        handle.add_node(node("r2", AgentType::Result)).await.expect("add r2");

        let err = handle.add_edge(Edge::new("e1", "r1", "r2")).await.unwrap_err();
        assert!(err.to_string().contains("cannot feed result node"));

        let err = handle.remove_node(NodeId::from("ghost")).await.unwrap_err();
        assert!(err.to_string().contains("node not found: ghost"));
    }

    #[tokio::test]
    async fn removal_cascades_through_the_service() {
        let handle = FlowService::spawn(FlowStore::new(), Engine::new(ScriptedDispatcher::new()));
        handle.add_node(node("a", AgentType::WebSearcher)).await.expect("add a");
        handle.add_node(node("b", AgentType::Translator)).await.expect("add b");
        handle.add_node(node("r", AgentType::Result)).await.expect("add r");
        handle.add_edge(Edge::new("e1", "a", "b")).await.expect("e1");
        handle.add_edge(Edge::new("e2", "b", "r")).await.expect("e2");
        handle.select_node(Some(NodeId::from("b"))).await.expect("select");

        let removed = handle.remove_node(NodeId::from("b")).await.expect("remove");
        assert_eq!(removed.id, NodeId::from("b"));

        let state = handle.snapshot().await.expect("snapshot");
        assert!(state.edges.is_empty());
        assert!(state.selected_node_id.is_none());
    }

    #[tokio::test]
    async fn cycle_is_reported_and_flow_stays_idle() {
        let dispatcher = ScriptedDispatcher::new().with_fallback(json!(null));
        let handle = FlowService::spawn(FlowStore::new(), Engine::new(dispatcher.clone()));
        handle.add_node(node("n1", AgentType::TextGenerator)).await.expect("n1");
        handle.add_node(node("n2", AgentType::TextGenerator)).await.expect("n2");
        handle.add_edge(Edge::new("e1", "n1", "n2")).await.expect("e1");
        handle.add_edge(Edge::new("e2", "n2", "n1")).await.expect("e2");

        let err = handle.run().await.unwrap_err();
        assert!(err.to_string().contains("agent nodes form a cycle: n1, n2"));

        let state = handle.snapshot().await.expect("snapshot");
        assert!(!state.is_running);
        assert!(state.execution_results.is_empty());
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn edits_wait_for_a_running_flow() {
        let dispatcher = ScriptedDispatcher::new()
            .with_fallback(json!("done"))
            .with_delay(Duration::from_millis(50));
        let handle = FlowService::spawn(FlowStore::new(), Engine::new(dispatcher));
        handle.add_node(node("a", AgentType::TextGenerator)).await.expect("add a");

        let mut events = handle.subscribe();
        let runner = handle.clone();
        let run = tokio::spawn(async move { runner.run().await });
        loop {
            match events.recv().await.expect("event stream open") {
                RunEvent::NodeStarted { .. } => break,
                _ => continue,
            }
        }

        // Queued behind the run: sees the finished record, never `running`.
        let state = handle.snapshot().await.expect("snapshot");
        let report = run.await.expect("join").expect("run");
        assert!(report.is_success());
        assert!(!state.is_running);
        assert_eq!(
            state.execution_results[&NodeId::from("a")].status,
            ExecutionStatus::Completed
        );
    }

    #[tokio::test]
    async fn cancelled_token_skips_every_node() {
        let dispatcher = ScriptedDispatcher::new().with_fallback(json!(1));
        let handle = FlowService::spawn(FlowStore::new(), Engine::new(dispatcher.clone()));
        handle.add_node(node("a", AgentType::TextGenerator)).await.expect("add a");

        let token = CancellationToken::new();
        token.cancel();
        let report = handle.run_with_cancel(token).await.expect("run");

        assert!(report.cancelled);
        assert_eq!(report.not_run, vec![NodeId::from("a")]);
        assert!(dispatcher.calls().is_empty());
    }

    #[tokio::test]
    async fn dropped_service_reports_stopped() {
        let (service, handle) =
            FlowService::new(FlowStore::new(), Engine::new(ScriptedDispatcher::new()));
        drop(service);

        let err = handle.snapshot().await.unwrap_err();
        assert!(err.to_string().contains("flow service is no longer running"));
    }

    #[tokio::test]
    async fn search_flow_against_http_backend() {
        let seen: Arc<Mutex<Option<JsonValue>>> = Arc::default();
        let recorder = Arc::clone(&seen);
        let router = Router::new().route(
            "/websearch/search",
            post(move |Json(body): Json<JsonValue>| {
                let recorder = Arc::clone(&recorder);
                async move {
                    if let Ok(mut slot) = recorder.lock() {
                        *slot = Some(body);
                    }
                    Json(json!({"results": [
                        {"title": "Ownership", "url": "https://doc.rust-lang.org/book/ch04-00.html"}
                    ]}))
                }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind loopback");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("serve");
        });

        let handle = FlowService::spawn(
            FlowStore::new(),
            Engine::new(HttpDispatcher::new(format!("http://{addr}"))),
        );
        let mut search = node("n1", AgentType::WebSearcher);
        if let AgentSettings::WebSearcher(settings) = &mut search.config.settings {
            settings.query = "rust ownership".to_string();
            settings.max_results = 4;
        }
        handle.add_node(search).await.expect("add n1");
        handle.add_node(node("n2", AgentType::Result)).await.expect("add n2");
        handle.add_edge(Edge::new("e1", "n1", "n2")).await.expect("edge");

        let report = handle.run().await.expect("run");
        assert!(report.is_success());

        let state = handle.snapshot().await.expect("snapshot");
        let n1 = &state.execution_results[&NodeId::from("n1")];
        let n2 = &state.execution_results[&NodeId::from("n2")];
        assert_eq!(n1.status, ExecutionStatus::Completed);
        assert_eq!(n2.status, ExecutionStatus::Completed);
        assert_eq!(n1.output, n2.output);
        assert!(n2.output.as_ref().is_some_and(|o| o["results"].is_array()));

        let body = seen.lock().expect("lock").clone();
        assert_eq!(
            body,
            Some(json!({"query": "rust ownership", "num_results": 4, "languages": ["en"]}))
        );
    }
}
