//! Flow graph model and execution engine for agentflow.
//!
//! This crate provides:
//!
//! - **Graph Model**: agent and result nodes joined by edges
//! - **Connection Validation**: the rules an edge must satisfy at edit time
//! - **Store**: the single owner of nodes, edges and execution records
//! - **Engine**: dependency-ordered, sequential runs with per-node records
//!   and propagation of outputs into result nodes
//! - **Service**: a command queue that serializes edits and runs

macro_rules! define_string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an ID from any string.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

pub mod edge;
pub mod engine;
pub mod error;
pub mod execution;
pub mod node;
pub mod order;
pub mod service;
pub mod state;
pub mod store;
pub mod validator;

pub use edge::{Edge, EdgeId};
pub use engine::{Engine, EngineConfig};
pub use error::{ConnectionValidationError, FlowError, GraphCycleError, GraphError};
pub use execution::{
    ExecutionRecord, ExecutionStatus, ExecutionUpdate, NodeFailure, RunEvent, RunReport,
};
pub use node::{Node, NodeId, NodeKind, Position};
pub use order::execution_order;
pub use service::{FlowHandle, FlowService};
pub use state::FlowState;
pub use store::FlowStore;
pub use validator::{can_connect, validate_connection};
