//! Error types for the flow crate.
//!
//! - `ConnectionValidationError`: a proposed edge breaks a connection rule
//! - `GraphError`: an edit was rejected at the store boundary
//! - `GraphCycleError`: agent nodes depend on each other in a loop
//! - `FlowError`: everything a caller of a run or of the service can see

use crate::edge::EdgeId;
use crate::node::NodeId;
use agentflow_agents::ConfigurationError;
use std::fmt;

/// Reasons an edge may not be added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionValidationError {
    /// The source id does not name a node in the graph.
    UnknownSource { node_id: NodeId },
    /// The target id does not name a node in the graph.
    UnknownTarget { node_id: NodeId },
    /// Both endpoints are result nodes.
    ResultToResult { source: NodeId, target: NodeId },
    /// The edge starts and ends at the same node.
    SelfLoop { node_id: NodeId },
    /// An edge with this id already exists.
    DuplicateEdgeId { edge_id: EdgeId },
}

impl fmt::Display for ConnectionValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownSource { node_id } => write!(f, "source node {node_id} does not exist"),
            Self::UnknownTarget { node_id } => write!(f, "target node {node_id} does not exist"),
            Self::ResultToResult { source, target } => {
                write!(f, "result node {source} cannot feed result node {target}")
            }
            Self::SelfLoop { node_id } => write!(f, "node {node_id} cannot connect to itself"),
            Self::DuplicateEdgeId { edge_id } => write!(f, "edge {edge_id} already exists"),
        }
    }
}

impl std::error::Error for ConnectionValidationError {}

/// Errors from graph edits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    /// A node with this id is already in the graph.
    NodeAlreadyExists { node_id: NodeId },
    /// Node with the given ID was not found in the graph.
    NodeNotFound { node_id: NodeId },
    /// Edge with the given ID was not found in the graph.
    EdgeNotFound { edge_id: EdgeId },
    /// The edge was rejected by the connection rules.
    ConnectionValidation(ConnectionValidationError),
    /// The node's config was rejected.
    Configuration {
        node_id: NodeId,
        source: ConfigurationError,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NodeAlreadyExists { node_id } => write!(f, "node already exists: {node_id}"),
            Self::NodeNotFound { node_id } => write!(f, "node not found: {node_id}"),
            Self::EdgeNotFound { edge_id } => write!(f, "edge not found: {edge_id}"),
            Self::ConnectionValidation(e) => write!(f, "invalid connection: {e}"),
            Self::Configuration { node_id, source } => {
                write!(f, "invalid configuration for node {node_id}: {source}")
            }
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ConnectionValidation(e) => Some(e),
            Self::Configuration { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<ConnectionValidationError> for GraphError {
    fn from(e: ConnectionValidationError) -> Self {
        Self::ConnectionValidation(e)
    }
}

/// Agent nodes form a dependency cycle, so no run order exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphCycleError {
    /// Nodes that sit on a cycle, in insertion order.
    pub nodes: Vec<NodeId>,
}

impl fmt::Display for GraphCycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.nodes.iter().map(ToString::to_string).collect();
        write!(f, "agent nodes form a cycle: {}", names.join(", "))
    }
}

impl std::error::Error for GraphCycleError {}

/// Errors surfaced by runs and by the flow service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    /// An edit was rejected.
    Graph(GraphError),
    /// The run was aborted before dispatching anything.
    Cycle(GraphCycleError),
    /// A run is already active on this flow.
    RunInProgress,
    /// The service task has shut down.
    ServiceStopped,
}

impl fmt::Display for FlowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Graph(e) => write!(f, "graph edit rejected: {e}"),
            Self::Cycle(e) => write!(f, "run aborted: {e}"),
            Self::RunInProgress => write!(f, "a run is already in progress"),
            Self::ServiceStopped => write!(f, "flow service is no longer running"),
        }
    }
}

impl std::error::Error for FlowError {}

impl From<GraphError> for FlowError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<GraphCycleError> for FlowError {
    fn from(e: GraphCycleError) -> Self {
        Self::Cycle(e)
    }
}
