//! Errors surfaced by the runner.

use agentflow_flow::{GraphCycleError, GraphError};
use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum RunnerError {
    /// The flow file could not be read or written.
    Io { path: PathBuf, reason: String },
    /// The flow file is not a valid flow document.
    Parse { path: PathBuf, reason: String },
    /// The flow document breaks a graph rule.
    InvalidFlow { path: PathBuf, source: GraphError },
    /// The flow's agent nodes form a cycle, so it can never run.
    Cyclic { path: PathBuf, source: GraphCycleError },
    /// The flow service failed or rejected the run.
    Run { reason: String },
    /// Environment configuration could not be loaded.
    Config { reason: String },
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, reason } => write!(f, "{}: {reason}", path.display()),
            Self::Parse { path, reason } => {
                write!(f, "{} is not a valid flow document: {reason}", path.display())
            }
            Self::InvalidFlow { path, source } => {
                write!(f, "{} describes an invalid flow: {source}", path.display())
            }
            Self::Cyclic { path, source } => write!(f, "{} cannot run: {source}", path.display()),
            Self::Run { reason } => write!(f, "run failed: {reason}"),
            Self::Config { reason } => write!(f, "invalid configuration: {reason}"),
        }
    }
}

impl std::error::Error for RunnerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidFlow { source, .. } => Some(source),
            Self::Cyclic { source, .. } => Some(source),
            _ => None,
        }
    }
}
