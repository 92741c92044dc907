//! Edge types for flow graphs.
//!
//! An edge routes the output of its source node towards its target node.
//! Handles name the connection points on the canvas and carry no meaning
//! for execution.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};

define_string_id! {
    /// Caller-supplied, unique identifier of an edge within a flow.
    EdgeId
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edge {
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl Edge {
    /// Creates an edge without handles.
    #[must_use]
    pub fn new(id: impl Into<EdgeId>, source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    /// Sets the canvas handles the edge is attached to.
    #[must_use]
    pub fn with_handles(mut self, source: impl Into<String>, target: impl Into<String>) -> Self {
        self.source_handle = Some(source.into());
        self.target_handle = Some(target.into());
        self
    }

    /// Returns true if `node_id` is either endpoint.
    #[must_use]
    pub fn touches(&self, node_id: &NodeId) -> bool {
        &self.source == node_id || &self.target == node_id
    }
}
