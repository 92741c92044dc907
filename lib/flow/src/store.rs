//! The graph store.
//!
//! `FlowStore` owns the nodes, edges and execution records of one flow.
//! Every mutation goes through a method that validates before committing,
//! so a store that exists is always consistent:
//!
//! - node ids and edge ids are unique
//! - edge endpoints resolve to existing nodes
//! - no edge joins two result nodes
//! - records and the selection only name existing nodes
//! - `is_running` is only set through a `RunGuard`, for the length of a run

use crate::edge::{Edge, EdgeId};
use crate::error::GraphError;
use crate::execution::{ExecutionRecord, ExecutionStatus, ExecutionUpdate};
use crate::node::{Node, NodeId, Position};
use crate::state::FlowState;
use crate::validator::validate_connection;
use agentflow_agents::{AgentConfig, ConfigurationError};
use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};
use tracing::{debug, warn};

const INTERRUPTED: &str = "run interrupted";

/// Single source of truth for a flow's graph and execution records.
#[derive(Debug, Clone, Default)]
pub struct FlowStore {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    execution_results: BTreeMap<NodeId, ExecutionRecord>,
    selected_node_id: Option<NodeId>,
    is_running: bool,
}

impl FlowStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a store from a persisted state, re-checking every rule.
    ///
    /// A persisted state cannot have a live run. `is_running` is reset and
    /// any record still marked `running` is turned into an error.
    ///
    /// # Errors
    ///
    /// Returns the first `GraphError` the state violates.
    pub fn from_state(state: FlowState) -> Result<Self, GraphError> {
        let mut store = Self::new();
        for node in state.nodes {
            store.add_node(node)?;
        }
        for edge in state.edges {
            store.add_edge(edge)?;
        }
        for (node_id, mut record) in state.execution_results {
            if store.node(&node_id).is_none() {
                return Err(GraphError::NodeNotFound { node_id });
            }
            if record.status == ExecutionStatus::Running {
                warn!(%node_id, "restoring a record left running; marking it failed");
                interrupt(&mut record);
            }
            store.execution_results.insert(node_id, record);
        }
        store.select_node(state.selected_node_id)?;
        Ok(store)
    }

    /// Returns a copy of the full flow state.
    #[must_use]
    pub fn snapshot(&self) -> FlowState {
        FlowState {
            nodes: self.nodes.clone(),
            edges: self.edges.clone(),
            execution_results: self.execution_results.clone(),
            selected_node_id: self.selected_node_id.clone(),
            is_running: self.is_running,
        }
    }

    /// Nodes in insertion order.
    #[must_use]
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in insertion order.
    #[must_use]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    #[must_use]
    pub fn node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    #[must_use]
    pub fn edge(&self, id: &EdgeId) -> Option<&Edge> {
        self.edges.iter().find(|e| &e.id == id)
    }

    #[must_use]
    pub fn execution_result(&self, id: &NodeId) -> Option<&ExecutionRecord> {
        self.execution_results.get(id)
    }

    #[must_use]
    pub fn execution_results(&self) -> &BTreeMap<NodeId, ExecutionRecord> {
        &self.execution_results
    }

    #[must_use]
    pub fn selected_node_id(&self) -> Option<&NodeId> {
        self.selected_node_id.as_ref()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Adds a node.
    ///
    /// # Errors
    ///
    /// Returns `NodeAlreadyExists` for a duplicate id and `Configuration`
    /// if the node's config does not validate.
    pub fn add_node(&mut self, node: Node) -> Result<(), GraphError> {
        if self.node(&node.id).is_some() {
            return Err(GraphError::NodeAlreadyExists { node_id: node.id });
        }
        if let Err(source) = node.config.validate() {
            return Err(GraphError::Configuration {
                node_id: node.id,
                source,
            });
        }
        debug!(node_id = %node.id, agent_type = %node.agent_type(), "node added");
        self.nodes.push(node);
        Ok(())
    }

    /// Removes a node with its incident edges, its record and its selection.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if no node has this id.
    pub fn remove_node(&mut self, id: &NodeId) -> Result<Node, GraphError> {
        let index = self.index_of(id)?;
        let node = self.nodes.remove(index);

        let before = self.edges.len();
        self.edges.retain(|e| !e.touches(id));
        self.execution_results.remove(id);
        if self.selected_node_id.as_ref() == Some(id) {
            self.selected_node_id = None;
        }
        debug!(node_id = %id, edges_removed = before - self.edges.len(), "node removed");
        Ok(node)
    }

    /// Moves a node on the canvas.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if no node has this id.
    pub fn update_node_position(&mut self, id: &NodeId, position: Position) -> Result<(), GraphError> {
        let index = self.index_of(id)?;
        self.nodes[index].position = position;
        Ok(())
    }

    /// Replaces a node's config. The agent type cannot change.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if no node has this id and `Configuration` if
    /// the config is for another agent type or does not validate.
    pub fn update_node_config(&mut self, id: &NodeId, config: AgentConfig) -> Result<(), GraphError> {
        let index = self.index_of(id)?;
        let expected = self.nodes[index].agent_type();
        let actual = config.agent_type();
        if expected != actual {
            return Err(GraphError::Configuration {
                node_id: id.clone(),
                source: ConfigurationError::AgentTypeMismatch { expected, actual },
            });
        }
        config.validate().map_err(|source| GraphError::Configuration {
            node_id: id.clone(),
            source,
        })?;
        self.nodes[index].config = config;
        Ok(())
    }

    /// Adds an edge after checking the connection rules.
    ///
    /// # Errors
    ///
    /// Returns `ConnectionValidation` with the rule the edge breaks.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        validate_connection(&self.nodes, &self.edges, &edge)?;
        debug!(edge_id = %edge.id, source = %edge.source, target = %edge.target, "edge added");
        self.edges.push(edge);
        Ok(())
    }

    /// Removes an edge.
    ///
    /// # Errors
    ///
    /// Returns `EdgeNotFound` if no edge has this id.
    pub fn remove_edge(&mut self, id: &EdgeId) -> Result<Edge, GraphError> {
        let index = self
            .edges
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| GraphError::EdgeNotFound { edge_id: id.clone() })?;
        Ok(self.edges.remove(index))
    }

    /// Merges a partial record into a node's record, creating it from
    /// `idle` if the node has none yet.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` if no node has this id.
    pub fn update_execution_result(
        &mut self,
        id: &NodeId,
        update: ExecutionUpdate,
    ) -> Result<(), GraphError> {
        self.index_of(id)?;
        self.execution_results.entry(id.clone()).or_default().apply(update);
        Ok(())
    }

    /// Sets or clears the selected node.
    ///
    /// # Errors
    ///
    /// Returns `NodeNotFound` when selecting an unknown node.
    pub fn select_node(&mut self, id: Option<NodeId>) -> Result<(), GraphError> {
        if let Some(node_id) = &id {
            self.index_of(node_id)?;
        }
        self.selected_node_id = id;
        Ok(())
    }

    fn index_of(&self, id: &NodeId) -> Result<usize, GraphError> {
        self.nodes
            .iter()
            .position(|n| &n.id == id)
            .ok_or_else(|| GraphError::NodeNotFound { node_id: id.clone() })
    }
}

fn interrupt(record: &mut ExecutionRecord) {
    record.status = ExecutionStatus::Error;
    record.error = Some(INTERRUPTED.to_string());
}

/// Exclusive access to a store for the length of one run.
///
/// The store reports `is_running` while the guard lives. Dropping the guard,
/// whether the run finished or its future was abandoned, clears the flag
/// and fails every record still marked `running`.
pub(crate) struct RunGuard<'a> {
    store: &'a mut FlowStore,
}

impl<'a> RunGuard<'a> {
    pub(crate) fn begin(store: &'a mut FlowStore) -> Self {
        store.is_running = true;
        Self { store }
    }
}

impl Deref for RunGuard<'_> {
    type Target = FlowStore;

    fn deref(&self) -> &FlowStore {
        self.store
    }
}

impl DerefMut for RunGuard<'_> {
    fn deref_mut(&mut self) -> &mut FlowStore {
        self.store
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        for (node_id, record) in &mut self.store.execution_results {
            if record.status == ExecutionStatus::Running {
                warn!(%node_id, "run ended with the node still running; marking it failed");
                interrupt(record);
            }
        }
        self.store.is_running = false;
    }
}
