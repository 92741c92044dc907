//! Run ordering.
//!
//! Only agent nodes are dispatched, so the order is computed over the
//! subgraph of agent nodes and agent -> agent edges. Edges touching a
//! result node never constrain the order.

use crate::edge::Edge;
use crate::error::GraphCycleError;
use crate::node::{Node, NodeId};
use petgraph::Direction;
use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{BTreeSet, HashMap};

/// Returns the agent nodes in a dependency-respecting order.
///
/// Independent nodes keep their insertion order, so the same graph always
/// yields the same order.
///
/// # Errors
///
/// Returns `GraphCycleError` naming every agent node that sits on a cycle.
pub fn execution_order(nodes: &[Node], edges: &[Edge]) -> Result<Vec<NodeId>, GraphCycleError> {
    let mut graph: DiGraph<&NodeId, ()> = DiGraph::new();
    let mut index: HashMap<&NodeId, NodeIndex> = HashMap::new();

    for node in nodes.iter().filter(|n| !n.is_result()) {
        index.insert(&node.id, graph.add_node(&node.id));
    }
    for edge in edges {
        if let (Some(&from), Some(&to)) = (index.get(&edge.source), index.get(&edge.target)) {
            graph.add_edge(from, to, ());
        }
    }

    // Kahn's algorithm. Node indices follow insertion order, so taking the
    // smallest ready index gives the stable tie-break.
    let mut in_degree: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BTreeSet<NodeIndex> = graph
        .node_indices()
        .filter(|n| in_degree[n.index()] == 0)
        .collect();
    let mut order = Vec::with_capacity(graph.node_count());

    while let Some(current) = ready.pop_first() {
        order.push(NodeId::clone(graph[current]));
        for next in graph.neighbors_directed(current, Direction::Outgoing) {
            in_degree[next.index()] -= 1;
            if in_degree[next.index()] == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() == graph.node_count() {
        return Ok(order);
    }

    let mut on_cycle: Vec<NodeIndex> = tarjan_scc(&graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .flatten()
        .collect();
    on_cycle.sort();
    Err(GraphCycleError {
        nodes: on_cycle.into_iter().map(|n| NodeId::clone(graph[n])).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_agents::{AgentType, ModelType, create_default_config};

    fn agent(id: &str) -> Node {
        Node::new(id, create_default_config(AgentType::TextGenerator, ModelType::OpenAi))
    }

    fn sink(id: &str) -> Node {
        Node::new(id, create_default_config(AgentType::Result, ModelType::OpenAi))
    }

    fn ids(order: &[NodeId]) -> Vec<&str> {
        order.iter().map(NodeId::as_str).collect()
    }

    #[test]
    fn independent_nodes_keep_insertion_order() {
        let nodes = vec![agent("c"), agent("a"), agent("b")];
        let order = execution_order(&nodes, &[]).expect("acyclic");
        assert_eq!(ids(&order), vec!["c", "a", "b"]);
    }

    #[test]
    fn dependencies_run_first() {
        let nodes = vec![agent("summarize"), agent("search"), agent("translate")];
        let edges = vec![
            Edge::new("e1", "search", "summarize"),
            Edge::new("e2", "summarize", "translate"),
        ];
        let order = execution_order(&nodes, &edges).expect("acyclic");
        assert_eq!(ids(&order), vec!["search", "summarize", "translate"]);
    }

    #[test]
    fn diamond_is_ordered_with_stable_tie_break() {
        let nodes = vec![agent("d"), agent("b"), agent("c"), agent("a")];
        let edges = vec![
            Edge::new("e1", "a", "b"),
            Edge::new("e2", "a", "c"),
            Edge::new("e3", "b", "d"),
            Edge::new("e4", "c", "d"),
        ];
        let order = execution_order(&nodes, &edges).expect("acyclic");
        assert_eq!(ids(&order), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn result_nodes_are_excluded() {
        let nodes = vec![sink("out"), agent("a"), sink("log")];
        let edges = vec![Edge::new("e1", "a", "out"), Edge::new("e2", "out", "a")];
        let order = execution_order(&nodes, &edges).expect("result edges never form a cycle");
        assert_eq!(ids(&order), vec!["a"]);
    }

    #[test]
    fn parallel_edges_count_once_each() {
        let nodes = vec![agent("b"), agent("a")];
        let edges = vec![Edge::new("e1", "a", "b"), Edge::new("e2", "a", "b")];
        let order = execution_order(&nodes, &edges).expect("acyclic");
        assert_eq!(ids(&order), vec!["a", "b"]);
    }

    #[test]
    fn cycle_names_only_nodes_on_the_cycle() {
        let nodes = vec![agent("n1"), agent("n2"), agent("n3"), agent("free")];
        let edges = vec![
            Edge::new("e1", "n1", "n2"),
            Edge::new("e2", "n2", "n1"),
            Edge::new("e3", "n2", "n3"),
        ];
        let err = execution_order(&nodes, &edges).unwrap_err();
        assert_eq!(err.nodes, vec![NodeId::from("n1"), NodeId::from("n2")]);
    }
}
