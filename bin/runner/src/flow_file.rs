//! Reading and writing flow documents.

use crate::error::RunnerError;
use agentflow_flow::{FlowState, FlowStore};
use rootcause::Report;
use std::path::Path;
use tracing::debug;

/// Loads a flow document and rebuilds its store.
///
/// # Errors
///
/// Returns `Io`, `Parse` or `InvalidFlow` depending on where loading stopped.
pub fn load(path: &Path) -> Result<FlowStore, Report<RunnerError>> {
    let raw = std::fs::read_to_string(path).map_err(|e| RunnerError::Io {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let state: FlowState = serde_json::from_str(&raw).map_err(|e| RunnerError::Parse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    debug!(path = %path.display(), nodes = state.nodes.len(), edges = state.edges.len(), "flow document parsed");
    let store = FlowStore::from_state(state).map_err(|source| RunnerError::InvalidFlow {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(store)
}

/// Writes `state` as pretty-printed JSON, replacing the file.
///
/// # Errors
///
/// Returns `Io` if the file cannot be written.
pub fn save(path: &Path, state: &FlowState) -> Result<(), Report<RunnerError>> {
    let io_error = |reason: String| RunnerError::Io {
        path: path.to_path_buf(),
        reason,
    };
    let json = serde_json::to_string_pretty(state).map_err(|e| io_error(e.to_string()))?;
    std::fs::write(path, json + "\n").map_err(|e| io_error(e.to_string()))?;
    debug!(path = %path.display(), "flow document written");
    Ok(())
}
