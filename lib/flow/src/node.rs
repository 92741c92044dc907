//! Node types for flow graphs.
//!
//! A node wraps one [`AgentConfig`]. Its [`NodeKind`] and agent type are
//! read from the config, so they cannot drift apart. The serialized form
//! still carries both fields for readers of the JSON document, and
//! deserialization rejects a document where they disagree with the config.

use agentflow_agents::{AgentConfig, AgentType};
use serde::{Deserialize, Serialize};

define_string_id! {
    /// Caller-supplied, unique identifier of a node within a flow.
    NodeId
}

/// Whether a node is dispatched or only receives output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Dispatched to a backend during a run.
    Agent,
    /// Display sink; receives propagated output.
    Result,
}

impl NodeKind {
    /// Returns the kind a node of `agent_type` has.
    #[must_use]
    pub const fn of(agent_type: AgentType) -> Self {
        if agent_type.is_executable() {
            Self::Agent
        } else {
            Self::Result
        }
    }
}

/// Canvas coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A node in a flow graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "NodeDocument", try_from = "NodeDocument")]
pub struct Node {
    pub id: NodeId,
    pub position: Position,
    pub config: AgentConfig,
}

impl Node {
    /// Creates a node at the origin.
    #[must_use]
    pub fn new(id: impl Into<NodeId>, config: AgentConfig) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            config,
        }
    }

    /// Places the node at `position`.
    #[must_use]
    pub fn at(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    #[must_use]
    pub fn agent_type(&self) -> AgentType {
        self.config.agent_type()
    }

    #[must_use]
    pub fn kind(&self) -> NodeKind {
        NodeKind::of(self.agent_type())
    }

    #[must_use]
    pub fn is_result(&self) -> bool {
        self.kind() == NodeKind::Result
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeDocument {
    id: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<NodeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    agent_type: Option<AgentType>,
    #[serde(default)]
    position: Position,
    config: AgentConfig,
}

impl From<Node> for NodeDocument {
    fn from(node: Node) -> Self {
        Self {
            kind: Some(node.kind()),
            agent_type: Some(node.agent_type()),
            id: node.id,
            position: node.position,
            config: node.config,
        }
    }
}

impl TryFrom<NodeDocument> for Node {
    type Error = String;

    fn try_from(doc: NodeDocument) -> Result<Self, Self::Error> {
        let actual = doc.config.agent_type();
        match doc.agent_type {
            Some(declared) if declared != actual => {
                return Err(format!(
                    "node {} declares agent type '{declared}' but its config is for '{actual}'",
                    doc.id
                ));
            }
            _ => {}
        }
        match doc.kind {
            Some(kind) if kind != NodeKind::of(actual) => {
                return Err(format!(
                    "node {} declares kind {kind:?} but agent type '{actual}' is not that kind",
                    doc.id
                ));
            }
            _ => {}
        }
        Ok(Self {
            id: doc.id,
            position: doc.position,
            config: doc.config,
        })
    }
}
