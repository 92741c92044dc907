//! The execution engine.
//!
//! A run takes exclusive access to a [`FlowStore`] and:
//! 1. orders the agent nodes (a cycle aborts before anything is touched)
//! 2. dispatches them one at a time, writing `running` then a terminal
//!    record for each
//! 3. copies each completed output into the result nodes it feeds
//!
//! A failing node does not stop the run. Cancellation is checked before
//! each dispatch; nodes not yet dispatched keep their previous records.
//! If the run future is dropped mid-run, the store is released with
//! `is_running` cleared and the in-flight node marked as interrupted.

use crate::error::FlowError;
use crate::execution::{ExecutionUpdate, NodeFailure, RunEvent, RunReport};
use crate::node::NodeId;
use crate::order::execution_order;
use crate::store::{FlowStore, RunGuard};
use agentflow_agents::{AgentDispatcher, ExecutionError};
use agentflow_core::RunId;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

const EVENT_CAPACITY: usize = 256;

/// Engine settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Upper bound on a single dispatch.
    pub node_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            node_timeout: Duration::from_secs(120),
        }
    }
}

/// Runs flows against an [`AgentDispatcher`].
pub struct Engine<D> {
    dispatcher: D,
    config: EngineConfig,
    events: broadcast::Sender<RunEvent>,
}

impl<D: AgentDispatcher> Engine<D> {
    /// Creates an engine with default settings.
    #[must_use]
    pub fn new(dispatcher: D) -> Self {
        Self::with_config(dispatcher, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(dispatcher: D, config: EngineConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            dispatcher,
            config,
            events,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Subscribes to events of every later run.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<RunEvent> {
        self.events.subscribe()
    }

    pub(crate) fn event_sender(&self) -> broadcast::Sender<RunEvent> {
        self.events.clone()
    }

    /// Runs every agent node of `store` once.
    ///
    /// Node failures are recorded on the node and listed in the report;
    /// they are not errors of the run.
    ///
    /// # Errors
    ///
    /// Returns `FlowError::RunInProgress` if the store is already running
    /// and `FlowError::Cycle` if the agent nodes form a cycle. In both cases
    /// nothing is dispatched and no record is touched.
    pub async fn run(
        &self,
        store: &mut FlowStore,
        cancel: &CancellationToken,
    ) -> Result<RunReport, FlowError> {
        if store.is_running() {
            return Err(FlowError::RunInProgress);
        }
        let order = execution_order(store.nodes(), store.edges()).inspect_err(|e| {
            warn!(nodes = ?e.nodes, "refusing to run a cyclic flow");
        })?;

        let run_id = RunId::new();
        let report = {
            let mut running = RunGuard::begin(store);
            self.execute(&mut running, run_id, order, cancel).await?
        };

        if report.cancelled {
            self.publish(RunEvent::RunCancelled {
                run_id,
                not_run: report.not_run.clone(),
            });
        } else {
            self.publish(RunEvent::RunFinished {
                run_id,
                completed: report.completed.len(),
                failed: report.failed.len(),
            });
        }
        info!(%run_id, completed = report.completed.len(), failed = report.failed.len(), cancelled = report.cancelled, "run finished");
        Ok(report)
    }

    #[instrument(skip_all, fields(run_id = %run_id, nodes = order.len()))]
    async fn execute(
        &self,
        store: &mut FlowStore,
        run_id: RunId,
        order: Vec<NodeId>,
        cancel: &CancellationToken,
    ) -> Result<RunReport, FlowError> {
        self.publish(RunEvent::RunStarted {
            run_id,
            order: order.clone(),
        });
        let mut report = RunReport {
            run_id,
            completed: Vec::new(),
            failed: Vec::new(),
            not_run: Vec::new(),
            cancelled: false,
        };

        for (position, node_id) in order.iter().enumerate() {
            if cancel.is_cancelled() {
                debug!(%node_id, "run cancelled before dispatch");
                report.cancelled = true;
                report.not_run.extend_from_slice(&order[position..]);
                break;
            }
            let Some(config) = store.node(node_id).map(|n| n.config.clone()) else {
                debug!(%node_id, "node vanished before dispatch");
                report.not_run.push(node_id.clone());
                continue;
            };

            store.update_execution_result(node_id, ExecutionUpdate::running())?;
            self.publish(RunEvent::NodeStarted {
                run_id,
                node_id: node_id.clone(),
            });

            let started = Instant::now();
            let outcome = match tokio::time::timeout(
                self.config.node_timeout,
                self.dispatcher.execute(&config),
            )
            .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ExecutionError::Timeout {
                    after: self.config.node_timeout,
                }),
            };
            let elapsed = started.elapsed();

            match outcome {
                Ok(output) => {
                    store.update_execution_result(
                        node_id,
                        ExecutionUpdate::completed(output.clone(), elapsed),
                    )?;
                    debug!(%node_id, elapsed_ms = elapsed.as_millis(), "node completed");
                    self.publish(RunEvent::NodeCompleted {
                        run_id,
                        node_id: node_id.clone(),
                        execution_time_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    });
                    self.propagate(store, run_id, node_id, &output)?;
                    report.completed.push(node_id.clone());
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!(%node_id, error = %message, "node failed");
                    store.update_execution_result(
                        node_id,
                        ExecutionUpdate::failed(message.clone(), elapsed),
                    )?;
                    self.publish(RunEvent::NodeFailed {
                        run_id,
                        node_id: node_id.clone(),
                        error: message.clone(),
                    });
                    report.failed.push(NodeFailure {
                        node_id: node_id.clone(),
                        error: message,
                    });
                }
            }
        }

        Ok(report)
    }

    /// Copies `output` into every result node fed by `source`.
    fn propagate(
        &self,
        store: &mut FlowStore,
        run_id: RunId,
        source: &NodeId,
        output: &JsonValue,
    ) -> Result<(), FlowError> {
        let mut targets: Vec<NodeId> = Vec::new();
        for edge in store.edges().iter().filter(|e| &e.source == source) {
            let is_result = store.node(&edge.target).is_some_and(|n| n.is_result());
            if is_result && !targets.contains(&edge.target) {
                targets.push(edge.target.clone());
            }
        }

        for target in targets {
            store.update_execution_result(&target, ExecutionUpdate::propagated(output.clone()))?;
            debug!(%source, %target, "output propagated");
            self.publish(RunEvent::OutputPropagated {
                run_id,
                source: source.clone(),
                target,
            });
        }
        Ok(())
    }

    fn publish(&self, event: RunEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
