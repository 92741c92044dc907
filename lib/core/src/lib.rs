//! Core types shared by the agentflow crates.
//!
//! Provides the `Result` alias used at service boundaries and the
//! ULID-backed identifiers for flows and runs.

pub mod error;
pub mod id;

pub use error::Result;
pub use id::{FlowId, ParseIdError, RunId};
