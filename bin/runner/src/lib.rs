//! Command-line runner for agentflow.
//!
//! Loads a persisted flow document, runs it against the agent backend and
//! reports per-node outcomes.

pub mod config;
pub mod error;
pub mod flow_file;
pub mod summary;
