//! The durable shape of a flow.

use crate::edge::Edge;
use crate::execution::ExecutionRecord;
use crate::node::{Node, NodeId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Everything needed to restore a flow: the graph, the latest execution
/// records and the editor selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowState {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub execution_results: BTreeMap<NodeId, ExecutionRecord>,
    #[serde(default)]
    pub selected_node_id: Option<NodeId>,
    #[serde(default)]
    pub is_running: bool,
}
