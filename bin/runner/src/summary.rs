//! Human-readable run summaries.

use agentflow_agents::AgentSettings;
use agentflow_flow::{ExecutionStatus, FlowState, RunReport};
use std::fmt::Write;

/// Renders one line per node, followed by the output of every result node
/// in its configured display format.
#[must_use]
pub fn render(report: &RunReport, state: &FlowState) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{report}");

    for node in &state.nodes {
        let record = state.execution_results.get(&node.id);
        let status = record.map_or(ExecutionStatus::Idle, |r| r.status);
        let _ = write!(out, "  {} [{}] {status}", node.id, node.agent_type());
        if let Some(ms) = record.and_then(|r| r.execution_time_ms) {
            let _ = write!(out, " in {ms}ms");
        }
        if let Some(error) = record.and_then(|r| r.error.as_deref()) {
            let _ = write!(out, ": {error}");
        }
        out.push('\n');
    }

    for node in state.nodes.iter().filter(|n| n.is_result()) {
        let AgentSettings::Result(settings) = &node.config.settings else {
            continue;
        };
        if let Some(output) = state
            .execution_results
            .get(&node.id)
            .and_then(|r| r.output.as_ref())
        {
            let _ = writeln!(out, "\n== {} ({}) ==", node.config.name, node.id);
            let _ = writeln!(out, "{}", settings.render(output));
        }
    }
    out
}
