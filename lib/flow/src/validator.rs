//! Edit-time connection rules.
//!
//! Rules are checked in order and the first failure wins:
//! 1. both endpoints resolve to existing nodes
//! 2. a result node never feeds another result node
//! 3. an edge never starts and ends at the same node
//! 4. edge ids are unique
//!
//! Cycles longer than a self loop are legal while editing; the engine
//! refuses to run them.

use crate::edge::Edge;
use crate::error::ConnectionValidationError;
use crate::node::{Node, NodeId};

/// Checks whether `proposed` may be added to the graph.
///
/// # Errors
///
/// Returns the first rule `proposed` breaks.
pub fn validate_connection(
    nodes: &[Node],
    edges: &[Edge],
    proposed: &Edge,
) -> Result<(), ConnectionValidationError> {
    let find = |id: &NodeId| nodes.iter().find(|n| &n.id == id);

    let source = find(&proposed.source).ok_or_else(|| ConnectionValidationError::UnknownSource {
        node_id: proposed.source.clone(),
    })?;
    let target = find(&proposed.target).ok_or_else(|| ConnectionValidationError::UnknownTarget {
        node_id: proposed.target.clone(),
    })?;

    if source.is_result() && target.is_result() {
        return Err(ConnectionValidationError::ResultToResult {
            source: source.id.clone(),
            target: target.id.clone(),
        });
    }
    if source.id == target.id {
        return Err(ConnectionValidationError::SelfLoop {
            node_id: source.id.clone(),
        });
    }
    if edges.iter().any(|e| e.id == proposed.id) {
        return Err(ConnectionValidationError::DuplicateEdgeId {
            edge_id: proposed.id.clone(),
        });
    }
    Ok(())
}

/// Returns true if `proposed` may be added to the graph.
#[must_use]
pub fn can_connect(nodes: &[Node], edges: &[Edge], proposed: &Edge) -> bool {
    validate_connection(nodes, edges, proposed).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_agents::{AgentType, ModelType, create_default_config};

    fn node(id: &str, agent_type: AgentType) -> Node {
        Node::new(id, create_default_config(agent_type, ModelType::OpenAi))
    }

    fn graph() -> Vec<Node> {
        vec![
            node("search", AgentType::WebSearcher),
            node("writer", AgentType::TextGenerator),
            node("out", AgentType::Result),
            node("log", AgentType::Result),
        ]
    }

    #[test]
    fn agent_to_result_and_agent_to_agent_are_accepted() {
        let nodes = graph();
        assert!(can_connect(&nodes, &[], &Edge::new("e1", "search", "out")));
        assert!(can_connect(&nodes, &[], &Edge::new("e2", "search", "writer")));
    }

    #[test]
    fn result_to_result_is_rejected() {
        let nodes = graph();
        let proposed = Edge::new("e1", "out", "log");

        assert!(!can_connect(&nodes, &[], &proposed));
        assert_eq!(
            validate_connection(&nodes, &[], &proposed),
            Err(ConnectionValidationError::ResultToResult {
                source: NodeId::from("out"),
                target: NodeId::from("log"),
            })
        );
    }

    #[test]
    fn result_to_agent_is_accepted() {
        // Only result -> result is forbidden; a result source is inert at run time.
        assert!(can_connect(&graph(), &[], &Edge::new("e1", "out", "writer")));
    }

    #[test]
    fn unknown_endpoints_are_rejected() {
        let nodes = graph();
        assert!(matches!(
            validate_connection(&nodes, &[], &Edge::new("e1", "ghost", "out")),
            Err(ConnectionValidationError::UnknownSource { .. })
        ));
        assert!(matches!(
            validate_connection(&nodes, &[], &Edge::new("e1", "search", "ghost")),
            Err(ConnectionValidationError::UnknownTarget { .. })
        ));
    }

    #[test]
    fn self_loop_and_duplicate_id_are_rejected() {
        let nodes = graph();
        let existing = vec![Edge::new("e1", "search", "out")];

        assert!(matches!(
            validate_connection(&nodes, &existing, &Edge::new("e2", "writer", "writer")),
            Err(ConnectionValidationError::SelfLoop { .. })
        ));
        assert!(matches!(
            validate_connection(&nodes, &existing, &Edge::new("e1", "writer", "out")),
            Err(ConnectionValidationError::DuplicateEdgeId { .. })
        ));
    }

    #[test]
    fn mutual_agent_edges_are_allowed_at_edit_time() {
        let nodes = graph();
        let existing = vec![Edge::new("e1", "search", "writer")];
        assert!(can_connect(&nodes, &existing, &Edge::new("e2", "writer", "search")));
    }
}
